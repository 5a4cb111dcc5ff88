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
use quill_core::models::category::Category;
use sqlx::SqlitePool;

use super::taxonomy::{self, Taxonomy};

pub struct CategoryRepository {
    pool: SqlitePool,
}

impl CategoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get_or_create(&self, name: &str) -> Result<Category> {
        if let Err(e) = Category::validate_name(name) {
            return Err(anyhow::anyhow!("Invalid category: {}", e));
        }

        let mut conn = self.pool.acquire().await.context("Failed to acquire connection")?;
        let (id, name) = taxonomy::get_or_create(&mut conn, Taxonomy::Categories, name.trim()).await?;

        Ok(Category { id: Some(id), name })
    }

    pub async fn find_by_name(&self, name: &str) -> Result<Option<Category>> {
        let mut conn = self.pool.acquire().await.context("Failed to acquire connection")?;
        let row = taxonomy::find_by_name(&mut conn, Taxonomy::Categories, name).await?;

        Ok(row.map(|(id, name)| Category { id: Some(id), name }))
    }

    /// Every category with its post count, most used first.
    pub async fn list_with_counts(&self) -> Result<Vec<(Category, i64)>> {
        let mut conn = self.pool.acquire().await.context("Failed to acquire connection")?;
        let rows = taxonomy::list_with_counts(&mut conn, Taxonomy::Categories).await?;

        Ok(rows
            .into_iter()
            .map(|(id, name, count)| (Category { id: Some(id), name }, count))
            .collect())
    }

    pub async fn names_for_post(&self, post_id: i64) -> Result<Vec<String>> {
        let mut conn = self.pool.acquire().await.context("Failed to acquire connection")?;
        taxonomy::names_for_post(&mut conn, Taxonomy::Categories, post_id).await
    }

    pub async fn delete_unused(&self) -> Result<u64> {
        let mut conn = self.pool.acquire().await.context("Failed to acquire connection")?;
        taxonomy::delete_unused(&mut conn, Taxonomy::Categories).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::init_in_memory_database;

    #[tokio::test]
    async fn test_get_or_create_is_idempotent() {
        let pool = init_in_memory_database().await.unwrap();
        let repo = CategoryRepository::new(pool);

        let first = repo.get_or_create("Reptiles").await.unwrap();
        let second = repo.get_or_create(" Reptiles ").await.unwrap();

        assert!(first.id.is_some());
        assert_eq!(first, second);
        assert_eq!(repo.list_with_counts().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_get_or_create_rejects_invalid_names() {
        let pool = init_in_memory_database().await.unwrap();
        let repo = CategoryRepository::new(pool);

        assert!(repo.get_or_create("   ").await.is_err());
        assert!(repo.get_or_create("a/b").await.is_err());
    }

    #[tokio::test]
    async fn test_find_by_name() {
        let pool = init_in_memory_database().await.unwrap();
        let repo = CategoryRepository::new(pool);

        assert!(repo.find_by_name("Reptiles").await.unwrap().is_none());
        repo.get_or_create("Reptiles").await.unwrap();
        assert_eq!(repo.find_by_name("Reptiles").await.unwrap().unwrap().name, "Reptiles");
    }

    #[tokio::test]
    async fn test_unused_rows_are_pruned() {
        let pool = init_in_memory_database().await.unwrap();
        let repo = CategoryRepository::new(pool);

        repo.get_or_create("Reptiles").await.unwrap();
        assert_eq!(repo.list_with_counts().await.unwrap()[0].1, 0);
        assert_eq!(repo.delete_unused().await.unwrap(), 1);
        assert!(repo.find_by_name("Reptiles").await.unwrap().is_none());
    }
}
