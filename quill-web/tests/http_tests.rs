mod common;

use axum::http::{header, HeaderName, HeaderValue, StatusCode};
use common::*;
use quill_db::repositories::{SessionRepository, UserRepository};

#[tokio::test]
async fn test_health_endpoint() {
    let state = test_state(10).await;
    let server = server(&state);

    let response = server.get("/health").await;
    response.assert_status(StatusCode::OK);
    response.assert_text("OK");
}

#[tokio::test]
async fn test_unknown_path_renders_error_page() {
    let state = test_state(10).await;
    let server = server(&state);

    let response = server.get("/nowhere").await;
    response.assert_status(StatusCode::NOT_FOUND);
    assert!(response.text().contains("404 Not Found"));
}

#[tokio::test]
async fn test_index_without_posts() {
    let state = test_state(10).await;
    let server = server(&state);

    let response = server.get("/").await;
    response.assert_status(StatusCode::OK);
    assert!(response.text().contains("No posts yet."));
}

#[tokio::test]
async fn test_index_lists_recent_posts_and_sidebar() {
    let state = test_state(10).await;
    create_post(&state, "alice", "First Post", "2024-03-01", &["rust"], &["Dev"]).await;

    let server = server(&state);
    let body = server.get("/").await.text();

    assert!(body.contains("/post/first-post"));
    assert!(body.contains("/tag/rust"));
    assert!(body.contains("/category/Dev"));
    assert!(body.contains("/posts/2024/3"));
}

#[tokio::test]
async fn test_login_success_sets_session_and_flash() {
    let state = test_state(10).await;
    create_user(&state, "alice", false).await;
    let server = server(&state);

    let response = server
        .post("/login")
        .form(&[("username", "alice"), ("password", PASSWORD)])
        .await;

    response.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(response.header(header::LOCATION), "/");
    let session = response.cookie("session_id");
    let flash = response.cookie("flash");

    let page = server.get("/").add_cookie(session).add_cookie(flash).await;
    let body = page.text();
    assert!(body.contains("You are logged in as alice"));
    assert!(body.contains("Logout"));
}

#[tokio::test]
async fn test_login_rejects_bad_credentials() {
    let state = test_state(10).await;
    create_user(&state, "alice", false).await;
    let server = server(&state);

    let response = server
        .post("/login")
        .form(&[("username", "alice"), ("password", "wrongpass")])
        .await;
    response.assert_status(StatusCode::OK);
    assert!(response.text().contains("Invalid password"));
    assert!(response.maybe_cookie("session_id").is_none());

    let response = server
        .post("/login")
        .form(&[("username", "nobody"), ("password", PASSWORD)])
        .await;
    response.assert_status(StatusCode::OK);
    assert!(response.text().contains("Invalid username"));
}

#[tokio::test]
async fn test_login_ignores_username_case() {
    let state = test_state(10).await;
    create_user(&state, "alice", false).await;
    let server = server(&state);

    let response = server
        .post("/login")
        .form(&[("username", " Alice "), ("password", PASSWORD)])
        .await;
    response.assert_status(StatusCode::SEE_OTHER);
    assert!(response.maybe_cookie("session_id").is_some());
}

#[tokio::test]
async fn test_login_follows_local_next_only() {
    let state = test_state(10).await;
    create_user(&state, "alice", false).await;
    let server = server(&state);

    let response = server
        .post("/login")
        .add_query_param("next", "/post/new")
        .form(&[("username", "alice"), ("password", PASSWORD)])
        .await;
    assert_eq!(response.header(header::LOCATION), "/post/new");

    let response = server
        .post("/login")
        .add_query_param("next", "https://evil.example.com/")
        .form(&[("username", "alice"), ("password", PASSWORD)])
        .await;
    assert_eq!(response.header(header::LOCATION), "/");
}

#[tokio::test]
async fn test_logout_ends_session() {
    let state = test_state(10).await;
    create_user(&state, "alice", false).await;
    let server = server(&state);
    let cookie = login(&server, "alice").await;

    let response = server.get("/logout").add_cookie(cookie.clone()).await;
    response.assert_status(StatusCode::SEE_OTHER);

    let session = SessionRepository::new(state.db.clone())
        .find_by_id(cookie.value())
        .await
        .unwrap();
    assert!(session.is_none());

    let response = server.get("/post/new").add_cookie(cookie).await;
    response.assert_status(StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn test_protected_pages_redirect_to_login() {
    let state = test_state(10).await;
    let server = server(&state);

    let response = server.get("/post/new").await;
    response.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(
        response.header(header::LOCATION),
        "/login?next=%2Fpost%2Fnew"
    );

    let response = server.get("/user").await;
    response.assert_status(StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn test_create_post_and_duplicate_title() {
    let state = test_state(10).await;
    create_user(&state, "alice", false).await;
    let server = server(&state);
    let cookie = login(&server, "alice").await;
    let token = csrf_token(&state, &cookie).await;

    let form = [
        ("title", "Hello World"),
        ("body", "Some **bold** text"),
        ("tags", "rust, web"),
        ("categories", "Notes"),
        ("pub_date", "2024-05-01 10:30"),
        ("csrf_token", token.as_str()),
    ];

    let response = server
        .post("/post/new")
        .add_cookie(cookie.clone())
        .form(&form)
        .await;
    response.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(response.header(header::LOCATION), "/post/hello-world");

    let response = server
        .post("/post/new")
        .add_cookie(cookie.clone())
        .form(&form)
        .await;
    assert_eq!(response.header(header::LOCATION), "/post/hello-world-2");

    let page = server.get("/post/hello-world").add_cookie(cookie).await;
    page.assert_status(StatusCode::OK);
    let body = page.text();
    assert!(body.contains("<strong>bold</strong>"));
    assert!(body.contains("/tag/rust"));
    assert!(body.contains("/category/Notes"));
    assert!(body.contains("/post/edit/hello-world"));
}

#[tokio::test]
async fn test_create_post_requires_valid_csrf() {
    let state = test_state(10).await;
    create_user(&state, "alice", false).await;
    let server = server(&state);
    let cookie = login(&server, "alice").await;
    csrf_token(&state, &cookie).await;

    let response = server
        .post("/post/new")
        .add_cookie(cookie)
        .form(&[
            ("title", "Hello"),
            ("body", "text"),
            ("tags", "rust"),
            ("categories", ""),
            ("pub_date", ""),
            ("csrf_token", "forged"),
        ])
        .await;
    response.assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_create_post_redisplays_form_errors() {
    let state = test_state(10).await;
    create_user(&state, "alice", false).await;
    let server = server(&state);
    let cookie = login(&server, "alice").await;
    let token = csrf_token(&state, &cookie).await;

    let response = server
        .post("/post/new")
        .add_cookie(cookie)
        .form(&[
            ("title", "Untagged"),
            ("body", "text"),
            ("tags", " , "),
            ("categories", ""),
            ("pub_date", "yesterday"),
            ("csrf_token", token.as_str()),
        ])
        .await;
    response.assert_status(StatusCode::OK);
    let body = response.text();
    assert!(body.contains("This field is required."));
    assert!(body.contains("Use the format YYYY-MM-DD"));
    assert!(body.contains("Untagged"));
}

#[tokio::test]
async fn test_signed_year_is_rejected_and_site_stays_up() {
    let state = test_state(10).await;
    create_user(&state, "alice", false).await;
    let server = server(&state);
    let cookie = login(&server, "alice").await;
    let token = csrf_token(&state, &cookie).await;

    for pub_date in ["-0001-01-01", "+10000-01-01"] {
        let response = server
            .post("/post/new")
            .add_cookie(cookie.clone())
            .form(&[
                ("title", "Time Travel"),
                ("body", "text"),
                ("tags", "history"),
                ("categories", ""),
                ("pub_date", pub_date),
                ("csrf_token", token.as_str()),
            ])
            .await;
        response.assert_status(StatusCode::OK);
        assert!(response.text().contains("Use the format YYYY-MM-DD"));
    }

    server.get("/").await.assert_status(StatusCode::OK);
    server.get("/posts").await.assert_status(StatusCode::OK);
}

#[tokio::test]
async fn test_sidebar_survives_unreadable_stored_date() {
    let state = test_state(10).await;
    create_post(&state, "alice", "Normal Post", "2024-03-15", &["rust"], &[]).await;
    sqlx::query(
        r#"
        INSERT INTO posts (author, title, slug, body_markdown, body_html, pub_date, created_at, updated_at)
        VALUES ('alice', 'Odd', 'odd', 'x', 'x', '+10000-01-01 00:00:00', '2024-01-01 00:00:00', '2024-01-01 00:00:00')
        "#,
    )
    .execute(&state.db)
    .await
    .unwrap();
    let server = server(&state);

    let response = server.get("/posts/2024/3").await;
    response.assert_status(StatusCode::OK);
    assert!(response.text().contains("/post/normal-post"));

    let response = server.get("/tag/rust").await;
    response.assert_status(StatusCode::OK);
}

#[tokio::test]
async fn test_only_author_or_staff_can_edit() {
    let state = test_state(10).await;
    create_user(&state, "alice", false).await;
    create_user(&state, "mallory", false).await;
    create_user(&state, "admin", true).await;
    create_post(&state, "alice", "Owned Post", "2024-01-10", &["rust"], &[]).await;
    let server = server(&state);

    let mallory = login(&server, "mallory").await;
    let response = server.get("/post/edit/owned-post").add_cookie(mallory).await;
    response.assert_status(StatusCode::FORBIDDEN);

    let admin = login(&server, "admin").await;
    let token = csrf_token(&state, &admin).await;
    let response = server
        .post("/post/edit/owned-post")
        .add_cookie(admin)
        .form(&[
            ("title", "Renamed Post"),
            ("body", "edited"),
            ("tags", "web"),
            ("categories", ""),
            ("pub_date", ""),
            ("csrf_token", token.as_str()),
        ])
        .await;
    response.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(response.header(header::LOCATION), "/post/owned-post");

    let body = server.get("/post/owned-post").await.text();
    assert!(body.contains("Renamed Post"));
    assert!(body.contains("2024"));

    // The tag left without posts is gone
    server.get("/tag/rust").await.assert_status(StatusCode::NOT_FOUND);
    server.get("/tag/web").await.assert_status(StatusCode::OK);
}

#[tokio::test]
async fn test_delete_post() {
    let state = test_state(10).await;
    create_user(&state, "alice", false).await;
    create_post(&state, "alice", "Short Lived", "2024-01-10", &["tmp"], &[]).await;
    let server = server(&state);
    let cookie = login(&server, "alice").await;
    let token = csrf_token(&state, &cookie).await;

    let response = server
        .post("/post/delete/short-lived")
        .add_cookie(cookie)
        .form(&[("csrf_token", token.as_str())])
        .await;
    response.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(response.header(header::LOCATION), "/");

    server
        .get("/post/short-lived")
        .await
        .assert_status(StatusCode::NOT_FOUND);
    server.get("/tag/tmp").await.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_pagination_bounds() {
    let state = test_state(2).await;
    for (title, date) in [("One", "2024-01-01"), ("Two", "2024-01-02"), ("Three", "2024-01-03")] {
        create_post(&state, "alice", title, date, &["rust"], &[]).await;
    }
    let server = server(&state);

    let first = server.get("/posts").await.text();
    assert!(first.contains("/post/three"));
    assert!(first.contains("/post/two"));
    assert!(!first.contains("/post/one"));
    assert!(first.contains("/posts/2"));

    let second = server.get("/posts/2").await;
    second.assert_status(StatusCode::OK);
    assert!(second.text().contains("/post/one"));

    server.get("/posts/3").await.assert_status(StatusCode::NOT_FOUND);
    server.get("/posts/0").await.assert_status(StatusCode::NOT_FOUND);
    server.get("/posts/abc").await.assert_status(StatusCode::NOT_FOUND);

    let tagged = server.get("/tag/rust/2").await;
    tagged.assert_status(StatusCode::OK);
    assert!(tagged.text().contains("/post/one"));
}

#[tokio::test]
async fn test_month_archive() {
    let state = test_state(10).await;
    create_post(&state, "alice", "March Post", "2024-03-15", &["rust"], &[]).await;
    create_post(&state, "alice", "April Post", "2024-04-02", &["rust"], &[]).await;
    let server = server(&state);

    let response = server.get("/posts/2024/3").await;
    response.assert_status(StatusCode::OK);
    let body = response.text();
    assert!(body.contains("Posts from March 2024"));
    assert!(body.contains("/post/march-post"));
    assert!(!body.contains("/post/april-post"));

    server.get("/posts/2024/13").await.assert_status(StatusCode::NOT_FOUND);
    server.get("/posts/2024/3/2").await.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_taxonomy_listings() {
    let state = test_state(10).await;
    create_post(&state, "alice", "Tagged", "2024-03-15", &["web dev"], &["Guides"]).await;
    let server = server(&state);

    let response = server.get("/tag/web%20dev").await;
    response.assert_status(StatusCode::OK);
    assert!(response.text().contains("/post/tagged"));

    let response = server.get("/category/Guides").await;
    response.assert_status(StatusCode::OK);
    assert!(response.text().contains("/post/tagged"));

    server.get("/tag/missing").await.assert_status(StatusCode::NOT_FOUND);
    server
        .get("/category/missing")
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_atom_feed() {
    let state = test_state(10).await;
    for i in 1..=20 {
        let title = format!("Entry {}", i);
        let date = format!("2024-01-{:02}", i);
        create_post(&state, "alice", &title, &date, &["rust"], &[]).await;
    }
    let server = server(&state);

    let response = server.get("/recent.atom").await;
    response.assert_status(StatusCode::OK);
    let content_type = response.header(header::CONTENT_TYPE);
    assert!(content_type
        .to_str()
        .unwrap()
        .starts_with("application/atom+xml"));

    let body = response.text();
    assert_eq!(body.matches("<entry>").count(), 15);
    assert!(body.contains("Entry 20"));
    assert!(!body.contains("Entry 5<"));
    assert!(body.contains("https://blog.example.com/post/entry-20"));
}

#[tokio::test]
async fn test_profile_access() {
    let state = test_state(10).await;
    create_user(&state, "alice", false).await;
    create_user(&state, "bobby", false).await;
    create_user(&state, "admin", true).await;
    let server = server(&state);

    let alice = login(&server, "alice").await;
    let response = server.get("/user").add_cookie(alice.clone()).await;
    assert_eq!(response.header(header::LOCATION), "/user/alice");

    server
        .get("/user/alice")
        .add_cookie(alice.clone())
        .await
        .assert_status(StatusCode::OK);
    server
        .get("/user/bobby")
        .add_cookie(alice.clone())
        .await
        .assert_status(StatusCode::FORBIDDEN);
    server
        .get("/user/ghost")
        .add_cookie(alice)
        .await
        .assert_status(StatusCode::NOT_FOUND);

    let admin = login(&server, "admin").await;
    server
        .get("/user/bobby")
        .add_cookie(admin)
        .await
        .assert_status(StatusCode::OK);
}

#[tokio::test]
async fn test_update_profile_changes_password() {
    let state = test_state(10).await;
    create_user(&state, "alice", false).await;
    let server = server(&state);
    let cookie = login(&server, "alice").await;
    let token = csrf_token(&state, &cookie).await;

    let response = server
        .post("/user/alice")
        .add_cookie(cookie.clone())
        .form(&[
            ("email", "new@example.com"),
            ("current", "wrongpass"),
            ("newpass", "newsecret1"),
            ("confirm", "newsecret1"),
            ("csrf_token", token.as_str()),
        ])
        .await;
    response.assert_status(StatusCode::OK);

    let response = server
        .post("/user/alice")
        .add_cookie(cookie)
        .form(&[
            ("email", "new@example.com"),
            ("current", PASSWORD),
            ("newpass", "newsecret1"),
            ("confirm", "newsecret1"),
            ("csrf_token", token.as_str()),
        ])
        .await;
    response.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(response.header(header::LOCATION), "/user/alice");

    let user = UserRepository::new(state.db.clone())
        .find_by_username("alice")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.email, "new@example.com");
    assert!(user.verify_password("newsecret1").unwrap());
}

#[tokio::test]
async fn test_delete_own_account() {
    let state = test_state(10).await;
    create_user(&state, "alice", false).await;
    let server = server(&state);
    let cookie = login(&server, "alice").await;
    let token = csrf_token(&state, &cookie).await;

    let response = server
        .post("/user/alice/delete")
        .add_cookie(cookie.clone())
        .form(&[("csrf_token", token.as_str())])
        .await;
    response.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(response.header(header::LOCATION), "/");

    let user = UserRepository::new(state.db.clone())
        .find_by_username("alice")
        .await
        .unwrap()
        .unwrap();
    assert!(!user.is_active);

    let response = server
        .post("/login")
        .form(&[("username", "alice"), ("password", PASSWORD)])
        .await;
    assert!(response.text().contains("Invalid username"));
}

#[tokio::test]
async fn test_delete_account_api_requires_header_token() {
    let state = test_state(10).await;
    create_user(&state, "alice", false).await;
    let server = server(&state);
    let cookie = login(&server, "alice").await;
    let token = csrf_token(&state, &cookie).await;

    server
        .delete("/user/alice")
        .add_cookie(cookie.clone())
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let response = server
        .delete("/user/alice")
        .add_cookie(cookie)
        .add_header(
            HeaderName::from_static("x-csrf-token"),
            HeaderValue::from_str(&token).unwrap(),
        )
        .await;
    response.assert_status(StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn test_register_from_whitelisted_peer() {
    let state = test_state(10).await;

    let response = send_from(
        &state,
        "127.0.0.1:50000",
        form_request(
            "POST",
            "/register",
            "username=Carol&email=carol%40example.com&password=password123&confirm=password123",
            None,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(set_cookie_named(&response, "session_id").is_some());

    let user = UserRepository::new(state.db.clone())
        .find_by_username("carol")
        .await
        .unwrap();
    assert!(user.is_some());

    let response = send_from(
        &state,
        "127.0.0.1:50001",
        form_request(
            "POST",
            "/register",
            "username=carol&email=other%40example.com&password=password123&confirm=password123",
            None,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("User exists already"));
}

#[tokio::test]
async fn test_register_from_unknown_peer_is_forbidden() {
    let state = test_state(10).await;

    let response = send_from(
        &state,
        "10.1.2.3:50000",
        form_request("GET", "/register", "", None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_register_when_logged_in_redirects() {
    let state = test_state(10).await;
    create_user(&state, "alice", false).await;
    let server = server(&state);
    let cookie = login(&server, "alice").await;

    let response = send_from(
        &state,
        "127.0.0.1:50000",
        form_request(
            "GET",
            "/register",
            "",
            Some(&format!("session_id={}", cookie.value())),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/user");
}
