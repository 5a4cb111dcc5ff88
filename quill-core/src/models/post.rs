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

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::slug::slugify;

pub const TITLE_MAX_LEN: usize = 50;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Post {
    pub id: Option<i64>,
    /// Username of the author, copied at creation time.
    pub author: String,
    pub title: String,
    pub slug: String,
    pub body_markdown: String,
    pub body_html: String,
    pub pub_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub categories: Vec<String>,
}

impl Post {
    /// Create an unsaved post. The slug is the bare slugified title; the
    /// repository suffixes it if another post already owns it.
    pub fn new(
        author: &str,
        title: &str,
        body_markdown: &str,
        body_html: String,
        pub_date: Option<DateTime<Utc>>,
    ) -> Self {
        let now = Utc::now();
        let title = title.trim().to_string();

        Self {
            id: None,
            author: author.to_string(),
            slug: slugify(&title),
            title,
            body_markdown: body_markdown.to_string(),
            body_html,
            pub_date: pub_date.unwrap_or(now),
            created_at: now,
            updated_at: now,
            tags: Vec::new(),
            categories: Vec::new(),
        }
    }

    pub fn year(&self) -> i32 {
        self.pub_date.year()
    }

    pub fn month(&self) -> u32 {
        self.pub_date.month()
    }

    pub fn is_valid(&self) -> Result<(), String> {
        if self.author.is_empty() {
            return Err("Post author cannot be empty".to_string());
        }
        if self.title.is_empty() {
            return Err("Post title cannot be empty".to_string());
        }
        if self.slug.is_empty() {
            return Err("Post slug cannot be empty".to_string());
        }
        Ok(())
    }
}

/// One entry of the month archive sidebar.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArchiveMonth {
    pub year: i32,
    pub month: u32,
    pub count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_new_post_defaults() {
        let before = Utc::now();
        let post = Post::new("alice", "  Hello World  ", "body", "<p>body</p>".into(), None);

        assert!(post.id.is_none());
        assert_eq!(post.author, "alice");
        assert_eq!(post.title, "Hello World");
        assert_eq!(post.slug, "hello-world");
        assert!(post.pub_date >= before);
        assert_eq!(post.pub_date, post.created_at);
        assert!(post.tags.is_empty());
        assert!(post.is_valid().is_ok());
    }

    #[test]
    fn test_new_post_explicit_pub_date() {
        let date = Utc.with_ymd_and_hms(2011, 3, 14, 15, 9, 26).unwrap();
        let post = Post::new("alice", "Pi day", "body", String::new(), Some(date));

        assert_eq!(post.pub_date, date);
        assert_eq!(post.year(), 2011);
        assert_eq!(post.month(), 3);
    }

    #[test]
    fn test_is_valid() {
        let mut post = Post::new("alice", "Title", "body", String::new(), None);
        post.title = String::new();
        assert!(post.is_valid().is_err());

        let mut post = Post::new("", "Title", "body", String::new(), None);
        assert!(post.is_valid().unwrap_err().contains("author"));
        post.author = "bob".into();
        post.slug = String::new();
        assert!(post.is_valid().unwrap_err().contains("slug"));
    }
}
