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
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
    Form,
};
use axum_extra::extract::{
    cookie::{Cookie, SameSite},
    CookieJar,
};
use chrono::Duration;
use quill_core::{
    forms::{FormErrors, LoginForm, RegistrationForm},
    models::{session::Session, user::User},
};
use quill_db::{
    is_unique_violation,
    repositories::{SessionRepository, UserRepository},
};
use serde::Deserialize;

use super::shared::{page_context, render, safe_next};
use crate::{
    auth::{CurrentUser, OptionalUser, SESSION_COOKIE},
    error::AppError,
    flash::set_flash,
    AppState,
};

#[derive(Debug, Default, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

fn session_cookie(state: &AppState, session_id: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, session_id))
        .path("/")
        .http_only(true)
        .secure(state.config.secure_cookies)
        .same_site(SameSite::Lax)
        .build()
}

/// Open a session for `user` and attach its cookie.
async fn start_session(state: &AppState, jar: CookieJar, user: &User) -> Result<CookieJar, AppError> {
    let user_id = user
        .id
        .ok_or_else(|| AppError::internal_server_error("User has no id"))?;

    let session_repo = SessionRepository::new(state.db.clone());
    let session =
        Session::new_with_expiry(user_id, Duration::hours(state.config.session_timeout_hours));
    session_repo.create(&session).await?;

    match session_repo.delete_expired().await {
        Ok(0) => {}
        Ok(purged) => tracing::debug!(purged, "Purged expired sessions"),
        Err(e) => tracing::warn!("Failed to purge expired sessions: {:?}", e),
    }

    tracing::info!(username = %user.username, "User logged in");
    Ok(jar.add(session_cookie(state, session.id)))
}

async fn render_login(
    state: &AppState,
    jar: CookieJar,
    form: &LoginForm,
    errors: &FormErrors,
    next: Option<&str>,
) -> Result<Response, AppError> {
    let (jar, mut context) = page_context(state, None, jar).await?;
    context.insert("form", form);
    context.insert("errors", errors);
    if let Some(next) = next {
        context.insert("next", next);
    }
    Ok((jar, render(state, "login.html", &context)?).into_response())
}

/// Display login form
pub async fn login_form(
    State(state): State<AppState>,
    OptionalUser(current): OptionalUser,
    Query(query): Query<NextQuery>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    if current.is_some() {
        return Ok(Redirect::to("/user").into_response());
    }

    let next = safe_next(query.next.as_deref());
    render_login(&state, jar, &LoginForm::default(), &FormErrors::new(), next.as_deref()).await
}

/// Handle login POST request
pub async fn login(
    State(state): State<AppState>,
    OptionalUser(current): OptionalUser,
    Query(query): Query<NextQuery>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    if current.is_some() {
        return Ok(Redirect::to("/user").into_response());
    }

    let next = safe_next(query.next.as_deref());

    if let Err(errors) = form.validate() {
        return render_login(&state, jar, &form, &errors, next.as_deref()).await;
    }

    let user_repo = UserRepository::new(state.db.clone());
    let user = match user_repo.find_by_username(&form.normalized_username()).await? {
        Some(user) if user.is_active => user,
        _ => {
            let mut errors = FormErrors::new();
            errors.add("username", "Invalid username");
            return render_login(&state, jar, &form, &errors, next.as_deref()).await;
        }
    };

    if !user.verify_password(&form.password)? {
        tracing::info!(username = %user.username, "Failed login attempt");
        let mut errors = FormErrors::new();
        errors.add("password", "Invalid password");
        return render_login(&state, jar, &form, &errors, next.as_deref()).await;
    }

    let jar = start_session(&state, jar, &user).await?;
    let jar = set_flash(jar, &format!("You are logged in as {}", user.username));
    let destination = next.unwrap_or_else(|| "/".to_string());

    Ok((jar, Redirect::to(&destination)).into_response())
}

/// Handle logout
pub async fn logout(
    State(state): State<AppState>,
    current: CurrentUser,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let session_repo = SessionRepository::new(state.db.clone());
    if let Err(e) = session_repo.delete(&current.session.id).await {
        tracing::warn!("Failed to delete session on logout: {:?}", e);
    }

    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    let jar = set_flash(jar, "You were logged out");

    Ok((jar, Redirect::to("/")).into_response())
}

async fn render_register(
    state: &AppState,
    jar: CookieJar,
    form: &RegistrationForm,
    errors: &FormErrors,
) -> Result<Response, AppError> {
    let (jar, mut context) = page_context(state, None, jar).await?;
    context.insert("form", form);
    context.insert("errors", errors);
    Ok((jar, render(state, "register.html", &context)?).into_response())
}

fn already_registered(jar: CookieJar) -> Response {
    let jar = set_flash(jar, "You're already registered");
    (jar, Redirect::to("/user")).into_response()
}

pub async fn register_form(
    State(state): State<AppState>,
    OptionalUser(current): OptionalUser,
    jar: CookieJar,
) -> Result<Response, AppError> {
    if current.is_some() {
        return Ok(already_registered(jar));
    }

    render_register(&state, jar, &RegistrationForm::default(), &FormErrors::new()).await
}

pub async fn register(
    State(state): State<AppState>,
    OptionalUser(current): OptionalUser,
    jar: CookieJar,
    Form(form): Form<RegistrationForm>,
) -> Result<Response, AppError> {
    if current.is_some() {
        return Ok(already_registered(jar));
    }

    if let Err(errors) = form.validate() {
        return render_register(&state, jar, &form, &errors).await;
    }

    let username = form.normalized_username();
    let user_repo = UserRepository::new(state.db.clone());

    let mut user = User::new(&username, form.email.trim(), &form.password)?;
    let exists = user_repo.find_by_username(&username).await?.is_some();
    let created = if exists {
        None
    } else {
        match user_repo.create(&user).await {
            Ok(id) => Some(id),
            Err(e) if is_unique_violation(&e) => None,
            Err(e) => return Err(e.into()),
        }
    };

    let Some(id) = created else {
        let mut errors = FormErrors::new();
        errors.add("username", "User exists already");
        return render_register(&state, jar, &form, &errors).await;
    };
    user.id = Some(id);
    tracing::info!(username = %user.username, "User registered");

    let jar = start_session(&state, jar, &user).await?;
    let jar = set_flash(jar, "You were successfully registered and are logged in");

    Ok((jar, Redirect::to("/")).into_response())
}
