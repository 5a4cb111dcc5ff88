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

use anyhow::Result;
use quill_db::repositories::{CategoryRepository, PostRepository, TagRepository};
use serde::Serialize;
use tera::Context;

use crate::{auth::CurrentUser, AppState};

/// A tag or category with how many posts carry it.
#[derive(Debug, Clone, Serialize)]
pub struct NameCount {
    pub name: String,
    pub count: i64,
}

/// Site settings only, no database access.
pub fn add_site_context(context: &mut Context, state: &AppState) {
    let config = &state.config;
    context.insert("site_name", &config.site_name);
    context.insert("site_title", &config.site_title);
    context.insert("site_author", &config.site_author);
    context.insert("site_description", &config.site_description);
    context.insert("site_url", config.site_url());
}

/// Everything `base.html` needs: site settings, the visitor, a pending flash
/// message and the sidebar (archive, tags, categories).
pub async fn add_base_context(
    context: &mut Context,
    state: &AppState,
    user: Option<&CurrentUser>,
    flash: Option<&str>,
) -> Result<()> {
    add_site_context(context, state);

    if let Some(current) = user {
        context.insert("current_user", &current.user);
    }
    if let Some(message) = flash {
        context.insert("flash", message);
    }

    let archive = PostRepository::new(state.db.clone()).archive_months().await?;
    context.insert("archive", &archive);

    let tags: Vec<NameCount> = TagRepository::new(state.db.clone())
        .list_with_counts()
        .await?
        .into_iter()
        .map(|(tag, count)| NameCount {
            name: tag.name,
            count,
        })
        .collect();
    context.insert("tags", &tags);

    let categories: Vec<NameCount> = CategoryRepository::new(state.db.clone())
        .list_with_counts()
        .await?
        .into_iter()
        .map(|(category, count)| NameCount {
            name: category.name,
            count,
        })
        .collect();
    context.insert("categories", &categories);

    Ok(())
}
