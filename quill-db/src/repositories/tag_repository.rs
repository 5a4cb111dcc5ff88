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

use anyhow::{Context, Result};
use quill_core::models::tag::Tag;
use sqlx::SqlitePool;

use super::taxonomy::{self, Taxonomy};

pub struct TagRepository {
    pool: SqlitePool,
}

impl TagRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get_or_create(&self, name: &str) -> Result<Tag> {
        if let Err(e) = Tag::validate_name(name) {
            return Err(anyhow::anyhow!("Invalid tag: {}", e));
        }

        let mut conn = self.pool.acquire().await.context("Failed to acquire connection")?;
        let (id, name) = taxonomy::get_or_create(&mut conn, Taxonomy::Tags, name.trim()).await?;

        Ok(Tag { id: Some(id), name })
    }

    pub async fn find_by_name(&self, name: &str) -> Result<Option<Tag>> {
        let mut conn = self.pool.acquire().await.context("Failed to acquire connection")?;
        let row = taxonomy::find_by_name(&mut conn, Taxonomy::Tags, name).await?;

        Ok(row.map(|(id, name)| Tag { id: Some(id), name }))
    }

    /// Every tag with its post count, most used first.
    pub async fn list_with_counts(&self) -> Result<Vec<(Tag, i64)>> {
        let mut conn = self.pool.acquire().await.context("Failed to acquire connection")?;
        let rows = taxonomy::list_with_counts(&mut conn, Taxonomy::Tags).await?;

        Ok(rows
            .into_iter()
            .map(|(id, name, count)| (Tag { id: Some(id), name }, count))
            .collect())
    }

    pub async fn names_for_post(&self, post_id: i64) -> Result<Vec<String>> {
        let mut conn = self.pool.acquire().await.context("Failed to acquire connection")?;
        taxonomy::names_for_post(&mut conn, Taxonomy::Tags, post_id).await
    }

    pub async fn delete_unused(&self) -> Result<u64> {
        let mut conn = self.pool.acquire().await.context("Failed to acquire connection")?;
        taxonomy::delete_unused(&mut conn, Taxonomy::Tags).await
    }
}
