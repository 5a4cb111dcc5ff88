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
use quill_core::models::{post::Post, session::Session, user::User};
use quill_db::repositories::{PostRepository, SessionRepository, UserRepository};
use sqlx::SqlitePool;

use crate::{config::Config, markdown::markdown_to_html, templates::init_templates, AppState};

pub const TEST_PASSWORD: &str = "password123";

/// State over an in-memory database, with the default templates written to a
/// fresh directory under the system temp dir.
pub async fn create_test_app_state() -> Result<AppState> {
    let pool = quill_db::init_in_memory_database().await?;

    let templates_dir = std::env::temp_dir()
        .join(format!("quill-test-templates-{}", uuid::Uuid::new_v4()))
        .to_string_lossy()
        .to_string();
    let templates = init_templates(&templates_dir, false)?;

    let config = Config {
        database_url: "sqlite::memory:".to_string(),
        templates_dir,
        ..Config::default()
    };

    Ok(AppState::new(pool, templates, config))
}

pub async fn create_test_user(db: &SqlitePool, username: &str, is_staff: bool) -> Result<User> {
    let mut user = User::new(username, &format!("{}@example.com", username), TEST_PASSWORD)?;
    user.is_staff = is_staff;
    let id = UserRepository::new(db.clone()).create(&user).await?;
    user.id = Some(id);
    Ok(user)
}

pub async fn create_test_session(db: &SqlitePool, user: &User) -> Result<Session> {
    let user_id = user
        .id
        .ok_or_else(|| anyhow::anyhow!("User must be saved first"))?;
    let session = Session::new(user_id);
    SessionRepository::new(db.clone()).create(&session).await?;
    Ok(session)
}

pub async fn create_test_post(
    db: &SqlitePool,
    author: &str,
    title: &str,
    tags: &[&str],
) -> Result<Post> {
    let body = format!("Body of *{}*", title);
    let mut post = Post::new(author, title, &body, markdown_to_html(&body), None);
    post.tags = tags.iter().map(|t| t.to_string()).collect();
    PostRepository::new(db.clone()).create(&post).await
}
