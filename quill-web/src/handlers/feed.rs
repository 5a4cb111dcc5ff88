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

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};
use chrono::{SecondsFormat, Utc};
use quill_db::repositories::PostRepository;
use tera::Context;

use crate::{error::AppError, template_context::add_site_context, AppState};

pub const FEED_LENGTH: i64 = 15;
pub const ATOM_CONTENT_TYPE: &str = "application/atom+xml";

/// Atom feed of the most recent posts.
pub async fn recent_feed(State(state): State<AppState>) -> Result<Response, AppError> {
    let posts = PostRepository::new(state.db.clone())
        .recent(FEED_LENGTH)
        .await?;

    let updated = posts
        .iter()
        .map(|post| post.updated_at.max(post.pub_date))
        .max()
        .unwrap_or_else(Utc::now);

    let mut context = Context::new();
    add_site_context(&mut context, &state);
    context.insert("posts", &posts);
    context.insert("updated", &updated.to_rfc3339_opts(SecondsFormat::Secs, true));

    let xml = state.templates.render("recent.atom.xml", &context)?;

    Ok(([(header::CONTENT_TYPE, ATOM_CONTENT_TYPE)], xml).into_response())
}
