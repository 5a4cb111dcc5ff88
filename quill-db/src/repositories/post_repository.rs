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
use chrono::{NaiveDate, Utc};
use quill_core::models::category::Category;
use quill_core::models::post::{ArchiveMonth, Post};
use quill_core::models::tag::Tag;
use quill_core::utils::slug::{is_reserved, slug_candidate, slugify};
use sqlx::{SqliteConnection, SqlitePool};

use super::taxonomy::{self, Taxonomy};
use crate::datetime::{format_db_datetime, parse_db_datetime};
use crate::is_unique_violation;

/// Upper bound on slug candidates tried before giving up.
pub const MAX_SLUG_ATTEMPTS: u32 = 100;

type PostRow = (i64, String, String, String, String, String, String, String, String);

const POST_COLUMNS: &str = "p.id, p.author, p.title, p.slug, p.body_markdown, p.body_html, \
                            p.pub_date, p.created_at, p.updated_at";

fn row_to_post(row: PostRow) -> Result<Post> {
    let (id, author, title, slug, body_markdown, body_html, pub_date, created_at, updated_at) =
        row;

    Ok(Post {
        id: Some(id),
        author,
        title,
        slug,
        body_markdown,
        body_html,
        pub_date: parse_db_datetime(&pub_date).context("Invalid posts.pub_date")?,
        created_at: parse_db_datetime(&created_at).context("Invalid posts.created_at")?,
        updated_at: parse_db_datetime(&updated_at).context("Invalid posts.updated_at")?,
        tags: Vec::new(),
        categories: Vec::new(),
    })
}

/// Stored-text bounds `[start, end)` of a calendar month, or `None` when the
/// month does not exist.
pub fn month_bounds(year: i32, month: u32) -> Option<(String, String)> {
    let start = NaiveDate::from_ymd_opt(year, month, 1)?;
    let end = if month == 12 {
        NaiveDate::from_ymd_opt(year.checked_add(1)?, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };

    Some((
        format_db_datetime(&start.and_hms_opt(0, 0, 0)?.and_utc()),
        format_db_datetime(&end.and_hms_opt(0, 0, 0)?.and_utc()),
    ))
}

enum PostFilter {
    All,
    Month { start: String, end: String },
    Tag(String),
    Category(String),
    Author(String),
}

impl PostFilter {
    /// Join and where clauses plus their bind values, in order.
    fn clause(&self) -> (&'static str, Vec<&str>) {
        match self {
            Self::All => ("", Vec::new()),
            Self::Month { start, end } => (
                "WHERE p.pub_date >= ? AND p.pub_date < ?",
                vec![start.as_str(), end.as_str()],
            ),
            Self::Tag(name) => (
                "JOIN post_tags pt ON pt.post_id = p.id \
                 JOIN tags t ON t.id = pt.tag_id \
                 WHERE t.name = ?",
                vec![name.as_str()],
            ),
            Self::Category(name) => (
                "JOIN post_categories pc ON pc.post_id = p.id \
                 JOIN categories c ON c.id = pc.category_id \
                 WHERE c.name = ?",
                vec![name.as_str()],
            ),
            Self::Author(username) => ("WHERE p.author = ?", vec![username.as_str()]),
        }
    }
}

pub struct PostRepository {
    pool: SqlitePool,
}

impl PostRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a post, suffixing its slug until it is free. A concurrent
    /// writer taking the same slug between check and insert moves us on to
    /// the next candidate.
    pub async fn create(&self, post: &Post) -> Result<Post> {
        if let Err(e) = post.is_valid() {
            return Err(anyhow::anyhow!("Invalid post: {}", e));
        }
        validate_taxonomy(post)?;

        let base = post.slug.clone();
        for attempt in 0..MAX_SLUG_ATTEMPTS {
            let slug = slug_candidate(&base, attempt);
            if is_reserved(&slug) || self.slug_exists(&slug).await? {
                continue;
            }

            match self.insert(post, &slug).await {
                Ok(id) => {
                    return self
                        .find_by_id(id)
                        .await?
                        .context("Post disappeared right after insert");
                }
                Err(e) if is_unique_violation(&e) => {
                    tracing::debug!(slug = %slug, "Slug taken concurrently, trying next candidate");
                }
                Err(e) => return Err(e),
            }
        }

        Err(anyhow::anyhow!(
            "No free slug for '{}' after {} attempts",
            base,
            MAX_SLUG_ATTEMPTS
        ))
    }

    async fn insert(&self, post: &Post, slug: &str) -> Result<i64> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        let result = sqlx::query(
            r#"
            INSERT INTO posts (author, title, slug, body_markdown, body_html, pub_date, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&post.author)
        .bind(&post.title)
        .bind(slug)
        .bind(&post.body_markdown)
        .bind(&post.body_html)
        .bind(format_db_datetime(&post.pub_date))
        .bind(format_db_datetime(&post.created_at))
        .bind(format_db_datetime(&post.updated_at))
        .execute(&mut *tx)
        .await
        .context("Failed to create post")?;

        let id = result.last_insert_rowid();
        taxonomy::replace_for_post(&mut tx, Taxonomy::Tags, id, &post.tags).await?;
        taxonomy::replace_for_post(&mut tx, Taxonomy::Categories, id, &post.categories).await?;

        tx.commit().await.context("Failed to commit post")?;
        Ok(id)
    }

    /// First slug derived from `title` that no post owns yet.
    pub async fn unique_slug(&self, title: &str) -> Result<String> {
        let base = slugify(title);
        for attempt in 0..MAX_SLUG_ATTEMPTS {
            let slug = slug_candidate(&base, attempt);
            if !is_reserved(&slug) && !self.slug_exists(&slug).await? {
                return Ok(slug);
            }
        }

        Err(anyhow::anyhow!(
            "No free slug for '{}' after {} attempts",
            base,
            MAX_SLUG_ATTEMPTS
        ))
    }

    pub async fn slug_exists(&self, slug: &str) -> Result<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts WHERE slug = ?")
            .bind(slug)
            .fetch_one(&self.pool)
            .await
            .context("Failed to check slug")?;

        Ok(count > 0)
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Post>> {
        let mut conn = self.pool.acquire().await.context("Failed to acquire connection")?;
        let row = sqlx::query_as::<_, PostRow>(&format!(
            "SELECT {} FROM posts p WHERE p.id = ?",
            POST_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .context("Failed to find post by id")?;

        match row {
            Some(row) => Ok(Some(load_taxonomy(&mut conn, row_to_post(row)?).await?)),
            None => Ok(None),
        }
    }

    pub async fn find_by_slug(&self, slug: &str) -> Result<Option<Post>> {
        let mut conn = self.pool.acquire().await.context("Failed to acquire connection")?;
        let row = sqlx::query_as::<_, PostRow>(&format!(
            "SELECT {} FROM posts p WHERE p.slug = ?",
            POST_COLUMNS
        ))
        .bind(slug)
        .fetch_optional(&mut *conn)
        .await
        .context("Failed to find post by slug")?;

        match row {
            Some(row) => Ok(Some(load_taxonomy(&mut conn, row_to_post(row)?).await?)),
            None => Ok(None),
        }
    }

    /// Save title, body, publish date and taxonomy. The slug never changes.
    pub async fn update(&self, post: &Post) -> Result<()> {
        let id = post
            .id
            .ok_or_else(|| anyhow::anyhow!("Cannot update post without id"))?;

        if let Err(e) = post.is_valid() {
            return Err(anyhow::anyhow!("Invalid post: {}", e));
        }
        validate_taxonomy(post)?;

        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        let result = sqlx::query(
            r#"
            UPDATE posts
            SET title = ?, body_markdown = ?, body_html = ?, pub_date = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&post.title)
        .bind(&post.body_markdown)
        .bind(&post.body_html)
        .bind(format_db_datetime(&post.pub_date))
        .bind(format_db_datetime(&Utc::now()))
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("Failed to update post")?;

        if result.rows_affected() == 0 {
            return Err(anyhow::anyhow!("Post not found"));
        }

        taxonomy::replace_for_post(&mut tx, Taxonomy::Tags, id, &post.tags).await?;
        taxonomy::replace_for_post(&mut tx, Taxonomy::Categories, id, &post.categories).await?;
        taxonomy::delete_unused(&mut tx, Taxonomy::Tags).await?;
        taxonomy::delete_unused(&mut tx, Taxonomy::Categories).await?;

        tx.commit().await.context("Failed to commit post update")?;
        Ok(())
    }

    /// Remove a post. Its links go with it, and so do tags and categories
    /// left without posts.
    pub async fn delete(&self, id: i64) -> Result<()> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        let result = sqlx::query("DELETE FROM posts WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .context("Failed to delete post")?;

        if result.rows_affected() == 0 {
            return Err(anyhow::anyhow!("Post not found"));
        }

        taxonomy::delete_unused(&mut tx, Taxonomy::Tags).await?;
        taxonomy::delete_unused(&mut tx, Taxonomy::Categories).await?;

        tx.commit().await.context("Failed to commit post delete")?;
        Ok(())
    }

    /// All posts, newest first.
    pub async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Post>> {
        self.list_filtered(PostFilter::All, limit, offset).await
    }

    pub async fn count(&self) -> Result<i64> {
        self.count_filtered(PostFilter::All).await
    }

    pub async fn recent(&self, limit: i64) -> Result<Vec<Post>> {
        self.list(limit, 0).await
    }

    /// Posts published in the given month. An impossible month yields nothing.
    pub async fn list_by_month(
        &self,
        year: i32,
        month: u32,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Post>> {
        match month_bounds(year, month) {
            Some((start, end)) => {
                self.list_filtered(PostFilter::Month { start, end }, limit, offset)
                    .await
            }
            None => Ok(Vec::new()),
        }
    }

    pub async fn count_by_month(&self, year: i32, month: u32) -> Result<i64> {
        match month_bounds(year, month) {
            Some((start, end)) => self.count_filtered(PostFilter::Month { start, end }).await,
            None => Ok(0),
        }
    }

    pub async fn list_by_tag(&self, tag: &str, limit: i64, offset: i64) -> Result<Vec<Post>> {
        self.list_filtered(PostFilter::Tag(tag.to_string()), limit, offset)
            .await
    }

    pub async fn count_by_tag(&self, tag: &str) -> Result<i64> {
        self.count_filtered(PostFilter::Tag(tag.to_string())).await
    }

    pub async fn list_by_category(
        &self,
        category: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Post>> {
        self.list_filtered(PostFilter::Category(category.to_string()), limit, offset)
            .await
    }

    pub async fn count_by_category(&self, category: &str) -> Result<i64> {
        self.count_filtered(PostFilter::Category(category.to_string()))
            .await
    }

    pub async fn count_by_author(&self, username: &str) -> Result<i64> {
        self.count_filtered(PostFilter::Author(username.to_string()))
            .await
    }

    /// Months that have posts, newest first. Rows whose date SQLite cannot
    /// read are left out rather than failing the whole sidebar.
    pub async fn archive_months(&self) -> Result<Vec<ArchiveMonth>> {
        let rows = sqlx::query_as::<_, (i64, i64, i64)>(
            r#"
            SELECT CAST(strftime('%Y', pub_date) AS INTEGER) AS y,
                   CAST(strftime('%m', pub_date) AS INTEGER) AS m,
                   COUNT(*)
            FROM posts
            WHERE pub_date GLOB '[0-9][0-9][0-9][0-9]-[0-9][0-9]-*'
              AND strftime('%Y-%m', pub_date) IS NOT NULL
            GROUP BY y, m
            ORDER BY y DESC, m DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list archive months")?;

        Ok(rows
            .into_iter()
            .filter_map(|(year, month, count)| {
                Some(ArchiveMonth {
                    year: i32::try_from(year).ok()?,
                    month: u32::try_from(month).ok()?,
                    count,
                })
            })
            .collect())
    }

    async fn list_filtered(&self, filter: PostFilter, limit: i64, offset: i64) -> Result<Vec<Post>> {
        let (clause, binds) = filter.clause();
        let sql = format!(
            "SELECT {} FROM posts p {} ORDER BY p.pub_date DESC, p.id DESC LIMIT ? OFFSET ?",
            POST_COLUMNS, clause
        );

        let mut conn = self.pool.acquire().await.context("Failed to acquire connection")?;

        let mut query = sqlx::query_as::<_, PostRow>(&sql);
        for value in binds {
            query = query.bind(value);
        }
        let rows = query
            .bind(limit)
            .bind(offset)
            .fetch_all(&mut *conn)
            .await
            .context("Failed to list posts")?;

        let mut posts = Vec::with_capacity(rows.len());
        for row in rows {
            posts.push(load_taxonomy(&mut conn, row_to_post(row)?).await?);
        }
        Ok(posts)
    }

    async fn count_filtered(&self, filter: PostFilter) -> Result<i64> {
        let (clause, binds) = filter.clause();
        let sql = format!("SELECT COUNT(*) FROM posts p {}", clause);

        let mut query = sqlx::query_scalar::<_, i64>(&sql);
        for value in binds {
            query = query.bind(value);
        }
        query
            .fetch_one(&self.pool)
            .await
            .context("Failed to count posts")
    }
}

fn validate_taxonomy(post: &Post) -> Result<()> {
    for name in &post.tags {
        Tag::validate_name(name).map_err(|e| anyhow::anyhow!(e))?;
    }
    for name in &post.categories {
        Category::validate_name(name).map_err(|e| anyhow::anyhow!(e))?;
    }
    Ok(())
}

async fn load_taxonomy(conn: &mut SqliteConnection, mut post: Post) -> Result<Post> {
    if let Some(id) = post.id {
        post.tags = taxonomy::names_for_post(conn, Taxonomy::Tags, id).await?;
        post.categories = taxonomy::names_for_post(conn, Taxonomy::Categories, id).await?;
    }
    Ok(post)
}
