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
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;
use quill_core::models::{session::Session, user::User};
use quill_db::repositories::{SessionRepository, UserRepository};

use crate::{error::AppError, AppState};

pub const SESSION_COOKIE: &str = "session_id";

/// Current authenticated user, extracted from request
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: User,
    pub session: Session,
}

impl CurrentUser {
    /// Owners manage their own things; staff manage everything.
    pub fn can_manage(&self, owner: &str) -> bool {
        self.user.is_staff || self.user.username == owner
    }
}

#[derive(Debug)]
pub enum AuthRejection {
    /// No valid session; send the visitor to the login form.
    LoginRequired { next: String },
    Forbidden(&'static str),
    Internal(String),
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::LoginRequired { next } => Redirect::to(&login_url(&next)).into_response(),
            Self::Forbidden(message) => AppError::forbidden(message).into_response(),
            Self::Internal(details) => AppError::internal_server_error("Internal server error")
                .with_details(details)
                .into_response(),
        }
    }
}

pub fn login_url(next: &str) -> String {
    format!("/login?next={}", urlencoding::encode(next))
}

/// Resolve cookie, session and user. `None` covers every way of not being
/// logged in: no cookie, unknown or expired session, missing or inactive user.
async fn resolve_user(parts: &Parts, state: &AppState) -> Result<Option<CurrentUser>, AuthRejection> {
    let jar = CookieJar::from_headers(&parts.headers);
    let Some(cookie) = jar.get(SESSION_COOKIE) else {
        return Ok(None);
    };

    let session_repo = SessionRepository::new(state.db.clone());
    let session = match session_repo.find_by_id(cookie.value()).await {
        Ok(Some(session)) => session,
        Ok(None) => return Ok(None),
        Err(e) => return Err(AuthRejection::Internal(format!("{:?}", e))),
    };

    if session.is_expired() {
        tracing::debug!(session_id = %session.id, "Session expired");
        return Ok(None);
    }

    let user_repo = UserRepository::new(state.db.clone());
    let user = match user_repo.find_by_id(session.user_id).await {
        Ok(Some(user)) => user,
        Ok(None) => return Ok(None),
        Err(e) => return Err(AuthRejection::Internal(format!("{:?}", e))),
    };

    if !user.is_active {
        return Ok(None);
    }

    Ok(Some(CurrentUser { user, session }))
}

fn requested_path(parts: &Parts) -> String {
    parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string())
}

impl<S> FromRequestParts<S> for CurrentUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        match resolve_user(parts, &app_state).await? {
            Some(current) => Ok(current),
            None => Err(AuthRejection::LoginRequired {
                next: requested_path(parts),
            }),
        }
    }
}

/// Optional authenticated user
#[derive(Debug, Clone)]
pub struct OptionalUser(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for OptionalUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        Ok(OptionalUser(resolve_user(parts, &app_state).await?))
    }
}

/// Require a staff account
#[derive(Debug, Clone)]
pub struct RequireStaff(pub CurrentUser);

impl<S> FromRequestParts<S> for RequireStaff
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let current = CurrentUser::from_request_parts(parts, state).await?;

        if !current.user.is_staff {
            return Err(AuthRejection::Forbidden("Staff access required"));
        }

        Ok(RequireStaff(current))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{create_test_app_state, create_test_session, create_test_user};
    use axum::http::{header, Request, StatusCode};

    fn parts_with_cookie(uri: &str, session_id: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri(uri);
        if let Some(id) = session_id {
            builder = builder.header(header::COOKIE, format!("{}={}", SESSION_COOKIE, id));
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_login_url_encodes_next() {
        assert_eq!(login_url("/post/new"), "/login?next=%2Fpost%2Fnew");
    }

    #[test]
    fn test_can_manage() {
        let mut user = User::new("alice", "alice@example.com", "password123").unwrap();
        let current = CurrentUser {
            session: Session::new(1),
            user: user.clone(),
        };
        assert!(current.can_manage("alice"));
        assert!(!current.can_manage("bob"));

        user.is_staff = true;
        let staff = CurrentUser {
            session: Session::new(1),
            user,
        };
        assert!(staff.can_manage("bob"));
    }

    #[tokio::test]
    async fn test_current_user_from_cookie() {
        let state = create_test_app_state().await.unwrap();
        let user = create_test_user(&state.db, "alice", false).await.unwrap();
        let session = create_test_session(&state.db, &user).await.unwrap();

        let mut parts = parts_with_cookie("/post/new", Some(&session.id));
        let current = CurrentUser::from_request_parts(&mut parts, &state)
            .await
            .unwrap();
        assert_eq!(current.user.username, "alice");
        assert_eq!(current.session.id, session.id);
    }

    #[tokio::test]
    async fn test_missing_session_redirects_to_login() {
        let state = create_test_app_state().await.unwrap();

        let mut parts = parts_with_cookie("/post/new?x=1", Some("nope"));
        let rejection = CurrentUser::from_request_parts(&mut parts, &state)
            .await
            .unwrap_err();
        match &rejection {
            AuthRejection::LoginRequired { next } => assert_eq!(next, "/post/new?x=1"),
            other => panic!("unexpected rejection: {:?}", other),
        }

        let response = rejection.into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers()[header::LOCATION],
            "/login?next=%2Fpost%2Fnew%3Fx%3D1"
        );
    }

    #[tokio::test]
    async fn test_inactive_user_is_anonymous() {
        let state = create_test_app_state().await.unwrap();
        let mut user = create_test_user(&state.db, "alice", false).await.unwrap();
        let session = create_test_session(&state.db, &user).await.unwrap();

        user.deactivate();
        UserRepository::new(state.db.clone()).update(&user).await.unwrap();

        let mut parts = parts_with_cookie("/", Some(&session.id));
        let OptionalUser(current) = OptionalUser::from_request_parts(&mut parts, &state)
            .await
            .unwrap();
        assert!(current.is_none());
    }

    #[tokio::test]
    async fn test_require_staff() {
        let state = create_test_app_state().await.unwrap();
        let user = create_test_user(&state.db, "alice", false).await.unwrap();
        let session = create_test_session(&state.db, &user).await.unwrap();
        let staff = create_test_user(&state.db, "boss", true).await.unwrap();
        let staff_session = create_test_session(&state.db, &staff).await.unwrap();

        let mut parts = parts_with_cookie("/", Some(&session.id));
        let rejection = RequireStaff::from_request_parts(&mut parts, &state)
            .await
            .unwrap_err();
        assert!(matches!(rejection, AuthRejection::Forbidden(_)));

        let mut parts = parts_with_cookie("/", Some(&staff_session.id));
        let RequireStaff(current) = RequireStaff::from_request_parts(&mut parts, &state)
            .await
            .unwrap();
        assert_eq!(current.user.username, "boss");
    }
}
