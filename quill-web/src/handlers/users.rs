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
    extract::{Path, State},
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
    Form,
};
use axum_extra::extract::{cookie::Cookie, CookieJar};
use chrono::Utc;
use quill_core::{
    forms::{EditUserForm, FormErrors},
    models::user::User,
};
use quill_db::repositories::{PostRepository, SessionRepository, UserRepository};

use super::shared::{page_context, render, CsrfForm};
use crate::{
    auth::{CurrentUser, SESSION_COOKIE},
    csrf::{get_or_create_csrf_token, verify_csrf},
    error::AppError,
    flash::set_flash,
    AppState,
};

const CSRF_HEADER_NAME: &str = "X-CSRF-Token";

/// The account named in the path, provided the current user may manage it.
async fn managed_user(state: &AppState, current: &CurrentUser, username: &str) -> Result<User, AppError> {
    let user = UserRepository::new(state.db.clone())
        .find_by_username(username)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    if !current.can_manage(&user.username) {
        return Err(AppError::forbidden("You cannot manage this account"));
    }

    Ok(user)
}

async fn render_profile(
    state: &AppState,
    current: &CurrentUser,
    jar: CookieJar,
    profile_user: &User,
    form: &EditUserForm,
    errors: &FormErrors,
) -> Result<Response, AppError> {
    let (jar, mut context) = page_context(state, Some(current), jar).await?;
    let csrf = get_or_create_csrf_token(&state.db, &current.session).await?;
    let post_count = PostRepository::new(state.db.clone())
        .count_by_author(&profile_user.username)
        .await?;

    context.insert("profile_user", profile_user);
    context.insert("post_count", &post_count);
    context.insert("form", form);
    context.insert("errors", errors);
    context.insert("csrf_token", &csrf.token);

    Ok((jar, render(state, "user.html", &context)?).into_response())
}

/// `/user` sends the visitor to their own profile.
pub async fn own_profile(current: CurrentUser) -> Redirect {
    Redirect::to(&format!("/user/{}", current.user.username))
}

pub async fn profile(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(username): Path<String>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let user = managed_user(&state, &current, &username).await?;
    let form = EditUserForm {
        email: user.email.clone(),
        ..EditUserForm::default()
    };

    render_profile(&state, &current, jar, &user, &form, &FormErrors::new()).await
}

pub async fn update_profile(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(username): Path<String>,
    jar: CookieJar,
    Form(form): Form<EditUserForm>,
) -> Result<Response, AppError> {
    let mut user = managed_user(&state, &current, &username).await?;
    verify_csrf(&current.session, &form.csrf_token)?;

    if let Err(errors) = form.validate(&user) {
        return render_profile(&state, &current, jar, &user, &form, &errors).await;
    }

    user.email = form.email.trim().to_string();
    user.set_password(&form.newpass)?;
    user.updated_at = Utc::now();
    UserRepository::new(state.db.clone()).update(&user).await?;
    tracing::info!(username = %user.username, by = %current.user.username, "Account updated");

    let jar = set_flash(jar, "Your account was successfully updated");
    Ok((jar, Redirect::to(&format!("/user/{}", user.username))).into_response())
}

/// Soft-delete: the account is deactivated and its sessions dropped.
async fn deactivate_account(
    state: &AppState,
    current: &CurrentUser,
    jar: CookieJar,
    username: &str,
) -> Result<Response, AppError> {
    let mut user = managed_user(state, current, username).await?;
    let user_id = user
        .id
        .ok_or_else(|| AppError::internal_server_error("User has no id"))?;

    user.deactivate();
    UserRepository::new(state.db.clone()).update(&user).await?;
    let dropped = SessionRepository::new(state.db.clone())
        .delete_for_user(user_id)
        .await?;
    tracing::info!(
        username = %user.username,
        by = %current.user.username,
        sessions = dropped,
        "Account deactivated"
    );

    let jar = if current.user.id == user.id {
        jar.remove(Cookie::build(SESSION_COOKIE).path("/"))
    } else {
        jar
    };
    let jar = set_flash(jar, "Account successfully deleted");

    Ok((jar, Redirect::to("/")).into_response())
}

pub async fn delete_account(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(username): Path<String>,
    jar: CookieJar,
    Form(form): Form<CsrfForm>,
) -> Result<Response, AppError> {
    verify_csrf(&current.session, &form.csrf_token)?;
    deactivate_account(&state, &current, jar, &username).await
}

/// `DELETE /user/{username}`, with the token in the `X-CSRF-Token` header.
pub async fn delete_account_api(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(username): Path<String>,
    headers: HeaderMap,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let token = headers
        .get(CSRF_HEADER_NAME)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    verify_csrf(&current.session, token)?;
    deactivate_account(&state, &current, jar, &username).await
}
