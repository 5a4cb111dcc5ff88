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
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use quill_core::models::session::Session;
use quill_db::repositories::SessionRepository;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::error::AppError;

const CSRF_TOKEN_LENGTH: usize = 32;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CsrfToken {
    pub token: String,
}

impl CsrfToken {
    pub fn new() -> Self {
        let mut bytes = [0u8; CSRF_TOKEN_LENGTH];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self {
            token: URL_SAFE_NO_PAD.encode(bytes),
        }
    }

    pub fn verify(&self, provided_token: &str) -> bool {
        !provided_token.is_empty() && self.token == provided_token
    }
}

impl Default for CsrfToken {
    fn default() -> Self {
        Self::new()
    }
}

/// The session's token, minted and stored on first use.
pub async fn get_or_create_csrf_token(db: &SqlitePool, session: &Session) -> Result<CsrfToken> {
    if let Some(token) = &session.csrf_token {
        return Ok(CsrfToken {
            token: token.clone(),
        });
    }

    let csrf_token = CsrfToken::new();
    SessionRepository::new(db.clone())
        .set_csrf_token(&session.id, &csrf_token.token)
        .await?;

    Ok(csrf_token)
}

/// Reject a form whose hidden `csrf_token` does not match the session.
pub fn verify_csrf(session: &Session, provided: &str) -> Result<(), AppError> {
    match &session.csrf_token {
        Some(token) if (CsrfToken { token: token.clone() }).verify(provided) => Ok(()),
        _ => {
            tracing::warn!(session_id = %session.id, "CSRF token mismatch");
            Err(AppError::forbidden("Invalid CSRF token"))
        }
    }
}
