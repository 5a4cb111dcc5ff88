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
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::{
    access::whitelist_middleware, error::AppError, error_middleware::error_page_middleware,
    handlers, request_logging::request_logging_middleware, AppState,
};

pub fn create_router(state: AppState) -> Router {
    // Registration is only reachable from whitelisted peers
    let register = Router::new()
        .route(
            "/register",
            get(handlers::register_form).post(handlers::register),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            whitelist_middleware,
        ));

    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(health))
        .route("/login", get(handlers::login_form).post(handlers::login))
        .route("/logout", get(handlers::logout))
        .merge(register)
        // Accounts
        .route("/user", get(handlers::own_profile))
        .route(
            "/user/{username}",
            get(handlers::profile)
                .post(handlers::update_profile)
                .delete(handlers::delete_account_api),
        )
        .route("/user/{username}/delete", post(handlers::delete_account))
        // Posts
        .route("/posts", get(handlers::list_posts))
        .route("/posts/{page}", get(handlers::list_posts_page))
        .route("/posts/{year}/{month}", get(handlers::list_month))
        .route("/posts/{year}/{month}/{page}", get(handlers::list_month_page))
        .route("/post/new", get(handlers::new_post_form).post(handlers::create_post))
        .route(
            "/post/edit/{slug}",
            get(handlers::edit_post_form).post(handlers::update_post),
        )
        .route("/post/delete/{slug}", post(handlers::delete_post))
        .route("/post/{slug}", get(handlers::show_post))
        // Taxonomy
        .route("/tag/{tag}", get(handlers::list_tag))
        .route("/tag/{tag}/{page}", get(handlers::list_tag_page))
        .route("/category/{category}", get(handlers::list_category))
        .route("/category/{category}/{page}", get(handlers::list_category_page))
        // Feed
        .route("/recent.atom", get(handlers::recent_feed))
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            error_page_middleware,
        ))
        .layer(middleware::from_fn(request_logging_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

async fn not_found() -> AppError {
    AppError::not_found("Page not found")
}
