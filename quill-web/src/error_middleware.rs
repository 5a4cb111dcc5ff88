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
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::{Html, IntoResponse, Response},
};
use tera::Context;

use crate::{error::ErrorMessage, template_context::add_base_context, AppState};

/// Replace plain-text error responses with a rendered `error.html`. When the
/// page cannot be rendered the original response goes out unchanged.
pub async fn error_page_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let response = next.run(request).await;

    let status = response.status();
    if !(status.is_client_error() || status.is_server_error()) || is_html(&response) {
        return response;
    }

    let message = response
        .extensions()
        .get::<ErrorMessage>()
        .map(|m| m.0.clone())
        .unwrap_or_else(|| default_message(status).to_string());

    match render_error_page(&state, status, &message).await {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => {
            tracing::error!("Failed to render error page: {:?}", e);
            response
        }
    }
}

fn is_html(response: &Response) -> bool {
    response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("text/html"))
        .unwrap_or(false)
}

fn default_message(status: StatusCode) -> &'static str {
    match status {
        StatusCode::NOT_FOUND => "The page you're looking for doesn't exist.",
        StatusCode::FORBIDDEN => "You don't have permission to access this page.",
        StatusCode::INTERNAL_SERVER_ERROR => "Something went wrong on our end.",
        _ => status.canonical_reason().unwrap_or("An error occurred"),
    }
}

async fn render_error_page(state: &AppState, status: StatusCode, message: &str) -> anyhow::Result<String> {
    let mut context = Context::new();
    add_base_context(&mut context, state, None, None).await?;

    context.insert("status", &status.as_u16());
    context.insert("reason", status.canonical_reason().unwrap_or("Error"));
    context.insert("message", message);

    state.templates.render("error.html", &context)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::AppError, test_helpers::create_test_app_state};
    use axum::{middleware, routing::get, Router};
    use tower::ServiceExt;

    async fn app() -> Router {
        let state = create_test_app_state().await.unwrap();
        Router::new()
            .route("/missing", get(|| async { AppError::not_found("Post not found") }))
            .route("/ok", get(|| async { "fine" }))
            .fallback(|| async { StatusCode::NOT_FOUND })
            .layer(middleware::from_fn_with_state(state.clone(), error_page_middleware))
            .with_state(state)
    }

    async fn body_of(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_app_error_rendered_as_page() {
        let response = app()
            .await
            .oneshot(Request::builder().uri("/missing").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(is_html(&response));
        let body = body_of(response).await;
        assert!(body.contains("404 Not Found"));
        assert!(body.contains("Post not found"));
    }

    #[tokio::test]
    async fn test_unmatched_route_gets_default_message() {
        let response = app()
            .await
            .oneshot(Request::builder().uri("/nowhere").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(body_of(response).await.contains("looking for"));
    }

    #[tokio::test]
    async fn test_success_untouched() {
        let response = app()
            .await
            .oneshot(Request::builder().uri("/ok").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_of(response).await, "fine");
    }
}
