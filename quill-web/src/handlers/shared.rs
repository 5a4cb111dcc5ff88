// Quill - A minimal multi-user blog built with Rust
// Copyright (C) 2025 Quill Project Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as
// published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use axum::response::Html;
use axum_extra::extract::CookieJar;
use quill_core::pagination::Pagination;
use serde::Deserialize;
use tera::Context;

use crate::{
    auth::CurrentUser, error::AppError, flash::take_flash, template_context::add_base_context,
    AppState,
};

/// Hidden field carried by bare confirmation forms such as delete buttons.
#[derive(Debug, Default, Deserialize)]
pub struct CsrfForm {
    #[serde(default)]
    pub csrf_token: String,
}

/// Base context with the pending flash message consumed from the jar.
pub async fn page_context(
    state: &AppState,
    user: Option<&CurrentUser>,
    jar: CookieJar,
) -> Result<(CookieJar, Context), AppError> {
    let (jar, flash) = take_flash(jar);
    let mut context = Context::new();
    add_base_context(&mut context, state, user, flash.as_deref()).await?;
    Ok((jar, context))
}

pub fn render(state: &AppState, template: &str, context: &Context) -> Result<Html<String>, AppError> {
    state.templates.render(template, context).map(Html).map_err(|e| {
        AppError::internal_server_error("Failed to render page")
            .with_details(format!("{}: {:?}", template, e))
    })
}

/// Page numbers in paths are 1-based integers; anything else is a 404.
pub fn parse_page(raw: &str) -> Result<u32, AppError> {
    match raw.parse::<u32>() {
        Ok(page) if page >= 1 => Ok(page),
        _ => Err(AppError::not_found("Page not found")),
    }
}

/// Pagination for a listing, or 404 when `page` lies past its end.
pub fn paginate(page: u32, per_page: u32, total: i64) -> Result<Pagination, AppError> {
    let pagination = Pagination::new(page, per_page, total);
    if pagination.is_out_of_range() {
        return Err(AppError::not_found("Page not found"));
    }
    Ok(pagination)
}

/// Accept only same-site paths as a post-login destination.
pub fn safe_next(next: Option<&str>) -> Option<String> {
    let next = next?.trim();
    if next.starts_with('/') && !next.starts_with("//") && !next.contains('\\') {
        Some(next.to_string())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_page() {
        assert_eq!(parse_page("1").unwrap(), 1);
        assert_eq!(parse_page("12").unwrap(), 12);
        assert!(parse_page("0").is_err());
        assert!(parse_page("-1").is_err());
        assert!(parse_page("two").is_err());
    }

    #[test]
    fn test_paginate_bounds() {
        assert!(paginate(1, 3, 0).is_ok());
        assert!(paginate(2, 3, 3).is_err());
        assert_eq!(paginate(2, 3, 4).unwrap().offset(), 3);
    }

    #[test]
    fn test_safe_next() {
        assert_eq!(safe_next(Some("/post/new")).as_deref(), Some("/post/new"));
        assert_eq!(safe_next(Some("//evil.example.com")), None);
        assert_eq!(safe_next(Some("https://evil.example.com")), None);
        assert_eq!(safe_next(Some("/\\evil")), None);
        assert_eq!(safe_next(None), None);
    }
}
