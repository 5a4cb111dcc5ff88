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

//! SQL shared by tags and categories. Both are a unique `name` table joined to
//! posts through a two-column link table.

use anyhow::{Context, Result};
use sqlx::SqliteConnection;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Taxonomy {
    Tags,
    Categories,
}

impl Taxonomy {
    fn table(self) -> &'static str {
        match self {
            Self::Tags => "tags",
            Self::Categories => "categories",
        }
    }

    fn join_table(self) -> &'static str {
        match self {
            Self::Tags => "post_tags",
            Self::Categories => "post_categories",
        }
    }

    fn key(self) -> &'static str {
        match self {
            Self::Tags => "tag_id",
            Self::Categories => "category_id",
        }
    }
}

/// Return the row named `name`, inserting it first if it does not exist.
/// Safe against a concurrent insert of the same name.
pub(crate) async fn get_or_create(
    conn: &mut SqliteConnection,
    taxonomy: Taxonomy,
    name: &str,
) -> Result<(i64, String)> {
    sqlx::query(&format!(
        "INSERT INTO {} (name) VALUES (?) ON CONFLICT(name) DO NOTHING",
        taxonomy.table()
    ))
    .bind(name)
    .execute(&mut *conn)
    .await
    .with_context(|| format!("Failed to insert into {}", taxonomy.table()))?;

    sqlx::query_as::<_, (i64, String)>(&format!(
        "SELECT id, name FROM {} WHERE name = ?",
        taxonomy.table()
    ))
    .bind(name)
    .fetch_one(&mut *conn)
    .await
    .with_context(|| format!("Failed to read back {} row", taxonomy.table()))
}

pub(crate) async fn find_by_name(
    conn: &mut SqliteConnection,
    taxonomy: Taxonomy,
    name: &str,
) -> Result<Option<(i64, String)>> {
    sqlx::query_as::<_, (i64, String)>(&format!(
        "SELECT id, name FROM {} WHERE name = ?",
        taxonomy.table()
    ))
    .bind(name)
    .fetch_optional(&mut *conn)
    .await
    .with_context(|| format!("Failed to look up {} by name", taxonomy.table()))
}

/// Every name with the number of posts carrying it, most used first.
pub(crate) async fn list_with_counts(
    conn: &mut SqliteConnection,
    taxonomy: Taxonomy,
) -> Result<Vec<(i64, String, i64)>> {
    sqlx::query_as::<_, (i64, String, i64)>(&format!(
        r#"
        SELECT t.id, t.name, COUNT(j.post_id) AS post_count
        FROM {table} t
        LEFT JOIN {join} j ON j.{key} = t.id
        GROUP BY t.id, t.name
        ORDER BY post_count DESC, t.name
        "#,
        table = taxonomy.table(),
        join = taxonomy.join_table(),
        key = taxonomy.key(),
    ))
    .fetch_all(&mut *conn)
    .await
    .with_context(|| format!("Failed to list {}", taxonomy.table()))
}

pub(crate) async fn names_for_post(
    conn: &mut SqliteConnection,
    taxonomy: Taxonomy,
    post_id: i64,
) -> Result<Vec<String>> {
    sqlx::query_scalar::<_, String>(&format!(
        r#"
        SELECT t.name
        FROM {table} t
        JOIN {join} j ON j.{key} = t.id
        WHERE j.post_id = ?
        ORDER BY t.name
        "#,
        table = taxonomy.table(),
        join = taxonomy.join_table(),
        key = taxonomy.key(),
    ))
    .bind(post_id)
    .fetch_all(&mut *conn)
    .await
    .with_context(|| format!("Failed to load {} for post", taxonomy.table()))
}

/// Make `names` the complete set linked to the post, creating missing rows.
pub(crate) async fn replace_for_post(
    conn: &mut SqliteConnection,
    taxonomy: Taxonomy,
    post_id: i64,
    names: &[String],
) -> Result<()> {
    sqlx::query(&format!(
        "DELETE FROM {} WHERE post_id = ?",
        taxonomy.join_table()
    ))
    .bind(post_id)
    .execute(&mut *conn)
    .await
    .with_context(|| format!("Failed to clear {}", taxonomy.join_table()))?;

    for name in names {
        let (id, _) = get_or_create(conn, taxonomy, name).await?;
        sqlx::query(&format!(
            "INSERT OR IGNORE INTO {} (post_id, {}) VALUES (?, ?)",
            taxonomy.join_table(),
            taxonomy.key()
        ))
        .bind(post_id)
        .bind(id)
        .execute(&mut *conn)
        .await
        .with_context(|| format!("Failed to link post to {}", taxonomy.table()))?;
    }

    Ok(())
}

/// Remove names no post uses any more.
pub(crate) async fn delete_unused(conn: &mut SqliteConnection, taxonomy: Taxonomy) -> Result<u64> {
    let result = sqlx::query(&format!(
        "DELETE FROM {table} WHERE id NOT IN (SELECT {key} FROM {join})",
        table = taxonomy.table(),
        join = taxonomy.join_table(),
        key = taxonomy.key(),
    ))
    .execute(&mut *conn)
    .await
    .with_context(|| format!("Failed to prune {}", taxonomy.table()))?;

    Ok(result.rows_affected())
}
