#![allow(dead_code)]

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{header, Request},
    response::Response,
    Router,
};
use axum_extra::extract::cookie::Cookie;
use axum_test::TestServer;
use quill_core::models::{post::Post, session::Session, user::User};
use quill_db::repositories::{PostRepository, SessionRepository, UserRepository};
use quill_web::{
    config::Config, csrf::get_or_create_csrf_token, markdown::markdown_to_html,
    routes::create_router, templates::init_templates, AppState,
};
use std::net::SocketAddr;
use tower::ServiceExt;

pub const PASSWORD: &str = "password123";

pub async fn test_state(posts_per_page: u32) -> AppState {
    let pool = quill_db::init_in_memory_database().await.unwrap();

    let templates_dir = std::env::temp_dir()
        .join(format!("quill-it-templates-{}", uuid::Uuid::new_v4()))
        .to_string_lossy()
        .to_string();
    let templates = init_templates(&templates_dir, false).unwrap();

    let config = Config {
        database_url: "sqlite::memory:".to_string(),
        templates_dir,
        posts_per_page,
        base_url: "https://blog.example.com".to_string(),
        ..Config::default()
    };

    AppState::new(pool, templates, config)
}

pub fn server(state: &AppState) -> TestServer {
    TestServer::new(create_router(state.clone())).unwrap()
}

pub async fn create_user(state: &AppState, username: &str, is_staff: bool) -> User {
    let mut user = User::new(username, &format!("{}@example.com", username), PASSWORD).unwrap();
    user.is_staff = is_staff;
    let id = UserRepository::new(state.db.clone())
        .create(&user)
        .await
        .unwrap();
    user.id = Some(id);
    user
}

/// Log in through the form and return the session cookie.
pub async fn login(server: &TestServer, username: &str) -> Cookie<'static> {
    let response = server
        .post("/login")
        .form(&[("username", username), ("password", PASSWORD)])
        .await;
    response.cookie("session_id")
}

/// CSRF token bound to the session behind `cookie`.
pub async fn csrf_token(state: &AppState, cookie: &Cookie<'static>) -> String {
    let session: Session = SessionRepository::new(state.db.clone())
        .find_by_id(cookie.value())
        .await
        .unwrap()
        .unwrap();
    get_or_create_csrf_token(&state.db, &session)
        .await
        .unwrap()
        .token
}

pub async fn create_post(
    state: &AppState,
    author: &str,
    title: &str,
    pub_date: &str,
    tags: &[&str],
    categories: &[&str],
) -> Post {
    let date = quill_core::forms::parse_pub_date(pub_date).unwrap();
    let body = format!("About *{}*", title);
    let mut post = Post::new(author, title, &body, markdown_to_html(&body), Some(date));
    post.tags = tags.iter().map(|t| t.to_string()).collect();
    post.categories = categories.iter().map(|c| c.to_string()).collect();
    PostRepository::new(state.db.clone())
        .create(&post)
        .await
        .unwrap()
}

/// Send a request through the router as if it came from `peer`.
pub async fn send_from(state: &AppState, peer: &str, mut request: Request<Body>) -> Response {
    let addr: SocketAddr = peer.parse().unwrap();
    request.extensions_mut().insert(ConnectInfo(addr));
    create_router(state.clone()).oneshot(request).await.unwrap()
}

pub fn form_request(method: &str, uri: &str, body: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub async fn body_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub fn set_cookie_named(response: &Response, name: &str) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with(&format!("{}=", name)))
        .map(|v| v.split(';').next().unwrap_or_default().to_string())
}
