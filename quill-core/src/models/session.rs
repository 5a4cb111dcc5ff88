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

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_SESSION_HOURS: i64 = 24;

/// A logged-in browser. The cookie `session_id` carries [`Session::id`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub id: String,
    pub user_id: i64,
    pub csrf_token: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Create a new session with default expiration (24 hours)
    pub fn new(user_id: i64) -> Self {
        Self::new_with_expiry(user_id, Duration::hours(DEFAULT_SESSION_HOURS))
    }

    pub fn new_with_expiry(user_id: i64, expiry_duration: Duration) -> Self {
        let now = Utc::now();

        Self {
            id: Uuid::new_v4().to_string(),
            user_id,
            csrf_token: None,
            expires_at: now + expiry_duration,
            created_at: now,
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session() {
        let before = Utc::now();
        let session = Session::new(123);
        let after = Utc::now();

        assert!(Uuid::parse_str(&session.id).is_ok());
        assert_eq!(session.user_id, 123);
        assert!(session.csrf_token.is_none());
        assert!(session.created_at >= before && session.created_at <= after);

        let expected_expiry = session.created_at + Duration::hours(24);
        assert_eq!(session.expires_at, expected_expiry);
    }

    #[test]
    fn test_new_session_unique_ids() {
        let session1 = Session::new(1);
        let session2 = Session::new(1);
        assert_ne!(session1.id, session2.id);
    }

    #[test]
    fn test_is_expired() {
        let session = Session::new_with_expiry(1, Duration::days(365));
        assert!(!session.is_expired());

        let session = Session {
            id: Uuid::new_v4().to_string(),
            user_id: 1,
            csrf_token: None,
            expires_at: Utc::now() - Duration::hours(1),
            created_at: Utc::now() - Duration::hours(2),
        };
        assert!(session.is_expired());
    }
}
