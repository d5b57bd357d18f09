//! HTTP API tests driven through the router

use std::time::Duration;

use axum::{
    body::{Body, BodyDataStream},
    http::{header, Method, Request, StatusCode},
    Router,
};
use bookclub_server::{
    api,
    config::AdminConfig,
    models::member::Role,
    policy::LendingPolicy,
    repository::Repository,
    AppState,
};
use serde_json::{json, Value};
use tokio_stream::StreamExt;
use tower::ServiceExt;

use crate::common::{config_with, member, state, token, PASSWORD};

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut request = Request::builder()
        .method(method)
        .uri(format!("/api/v1{}", uri));
    if let Some(token) = token {
        request = request.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => request.body(Body::empty()),
    }
    .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

async fn seeded() -> (Router, AppState, String) {
    let state = state();
    member(&state, "admin@club.org", Role::Admin).await;
    let admin_token = token(&state, "admin@club.org").await;
    (api::create_router(state.clone()), state, admin_token)
}

async fn add_book(app: &Router, admin_token: &str, title: &str) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/books",
        Some(admin_token),
        Some(json!({
            "title": title,
            "author": "Jane Austen",
            "description": "A classic"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health_check() {
    let (app, _, _) = seeded().await;

    let (status, body) = send(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = send(&app, Method::GET, "/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn test_register_and_login() {
    let (app, _, _) = seeded().await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/auth/register",
        None,
        Some(json!({ "email": "Alice@Club.org", "password": PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["email"], "alice@club.org");
    assert_eq!(body["role"], "user");

    let (status, _) = send(
        &app,
        Method::POST,
        "/auth/register",
        None,
        Some(json!({ "email": "alice@club.org", "password": PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send(
        &app,
        Method::POST,
        "/auth/login",
        None,
        Some(json!({ "email": "alice@club.org", "password": PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["token"].is_string());
    assert_eq!(body["token_type"], "Bearer");

    let (status, _) = send(
        &app,
        Method::POST,
        "/auth/login",
        None,
        Some(json!({ "email": "alice@club.org", "password": "wrong-password" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_requests_without_token_are_refused() {
    let (app, _, _) = seeded().await;

    let (status, _) = send(&app, Method::GET, "/books", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, Method::GET, "/books", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_only_admins_add_books() {
    let (app, state, admin_token) = seeded().await;
    member(&state, "alice@club.org", Role::User).await;
    let alice = token(&state, "alice@club.org").await;

    let (status, _) = send(
        &app,
        Method::POST,
        "/books",
        Some(&alice),
        Some(json!({ "title": "Emma", "author": "Jane Austen", "description": "d" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        Method::POST,
        "/books",
        Some(&admin_token),
        Some(json!({ "title": "   ", "author": "Jane Austen", "description": "d" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let id = add_book(&app, &admin_token, "Emma").await;
    let (status, body) = send(&app, Method::GET, &format!("/books/{}", id), Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["available"], true);
    assert_eq!(body["borrower"], Value::Null);
}

#[tokio::test]
async fn test_lending_round_trip_over_http() {
    let (app, state, admin_token) = seeded().await;
    member(&state, "alice@club.org", Role::User).await;
    member(&state, "bob@club.org", Role::User).await;
    let alice = token(&state, "alice@club.org").await;
    let bob = token(&state, "bob@club.org").await;
    let id = add_book(&app, &admin_token, "Emma").await;

    let (status, body) = send(&app, Method::POST, &format!("/books/{}/borrow", id), Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["book"]["available"], false);
    assert_eq!(body["book"]["borrower"]["borrowed_by"], "alice@club.org");

    let (status, body) = send(&app, Method::POST, &format!("/books/{}/borrow", id), Some(&bob), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "This book is already borrowed");

    let (status, _) = send(&app, Method::POST, &format!("/books/{}/return", id), Some(&bob), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app, Method::GET, "/me/borrows", Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().map(Vec::len), Some(1));
    assert_eq!(body[0]["title"], "Emma");

    let (status, body) = send(&app, Method::GET, "/borrows", Some(&admin_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["borrowed_by"], "alice@club.org");

    let (status, _) = send(&app, Method::GET, "/borrows", Some(&alice), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app, Method::POST, &format!("/books/{}/return", id), Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["book"]["available"], true);

    let (status, body) = send(&app, Method::POST, &format!("/books/{}/return", id), Some(&alice), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "This book is not currently borrowed");
}

#[tokio::test]
async fn test_borrow_limit_over_http() {
    let (app, state, admin_token) = seeded().await;
    member(&state, "alice@club.org", Role::User).await;
    let alice = token(&state, "alice@club.org").await;

    let mut ids = Vec::new();
    for title in ["Emma", "Persuasion", "Sanditon"] {
        ids.push(add_book(&app, &admin_token, title).await);
    }

    for id in &ids[..2] {
        let (status, _) = send(&app, Method::POST, &format!("/books/{}/borrow", id), Some(&alice), None).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = send(&app, Method::POST, &format!("/books/{}/borrow", ids[2]), Some(&alice), None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["message"], "You can only borrow 2 books at a time");

    let (status, body) = send(&app, Method::GET, "/auth/me", Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["active_borrows"], 2);
    assert_eq!(body["max_borrow"], 2);
    assert_eq!(body["can_borrow"], true);
}

#[tokio::test]
async fn test_unknown_book_is_not_found() {
    let (app, state, _) = seeded().await;
    member(&state, "alice@club.org", Role::User).await;
    let alice = token(&state, "alice@club.org").await;
    let missing = uuid::Uuid::new_v4();

    let (status, _) = send(&app, Method::POST, &format!("/books/{}/borrow", missing), Some(&alice), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_search_filters_catalog() {
    let (app, _, admin_token) = seeded().await;
    add_book(&app, &admin_token, "Emma").await;
    add_book(&app, &admin_token, "Persuasion").await;

    let (status, body) = send(&app, Method::GET, "/books?search=emm", Some(&admin_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().map(Vec::len), Some(1));
    assert_eq!(body[0]["title"], "Emma");
}

#[tokio::test]
async fn test_configured_admin_manages_catalog() {
    let mut config = config_with(LendingPolicy::default());
    config.admin = AdminConfig {
        email: Some("owner@club.org".to_string()),
        password: Some(PASSWORD.to_string()),
    };
    let state = AppState::new(config, Repository::in_memory());
    state
        .services
        .members
        .bootstrap_admin(&state.config.admin)
        .await
        .unwrap();
    let app = api::create_router(state.clone());

    let (status, body) = send(
        &app,
        Method::POST,
        "/auth/login",
        None,
        Some(json!({ "email": "owner@club.org", "password": PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["member"]["role"], "admin");

    let owner = body["token"].as_str().unwrap().to_string();
    add_book(&app, &owner, "Emma").await;
}

#[tokio::test]
async fn test_admin_promotes_member() {
    let (app, state, admin_token) = seeded().await;
    let alice = member(&state, "alice@club.org", Role::User).await;
    let bob = member(&state, "bob@club.org", Role::User).await;
    let alice_token = token(&state, "alice@club.org").await;

    let (status, _) = send(
        &app,
        Method::PUT,
        &format!("/members/{}/role", bob.id),
        Some(&alice_token),
        Some(json!({ "role": "admin" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/members/{}/role", alice.id),
        Some(&admin_token),
        Some(json!({ "role": "admin" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "admin");

    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/members/{}/role", uuid::Uuid::new_v4()),
        Some(&admin_token),
        Some(json!({ "role": "admin" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NoSuchMember");

    // The role travels in the token, so the promotion applies from the next login
    let alice_token = token(&state, "alice@club.org").await;
    add_book(&app, &alice_token, "Persuasion").await;
}

async fn read_until(stream: &mut BodyDataStream, marker: &str) -> String {
    let mut buffer = String::new();
    tokio::time::timeout(Duration::from_secs(5), async {
        while !buffer.contains(marker) {
            let chunk = stream
                .next()
                .await
                .expect("event stream ended")
                .expect("event stream failed");
            buffer.push_str(&String::from_utf8_lossy(&chunk));
        }
    })
    .await
    .expect("timed out waiting for event");
    buffer
}

#[tokio::test]
async fn test_catalog_events_start_with_snapshot() {
    let (app, state, admin_token) = seeded().await;
    let alice = member(&state, "alice@club.org", Role::User).await;
    let alice_token = token(&state, "alice@club.org").await;
    let id = add_book(&app, &admin_token, "Emma").await;

    let request = Request::builder()
        .uri("/api/v1/books/events")
        .header(header::AUTHORIZATION, format!("Bearer {}", alice_token))
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap().to_string();
    assert!(content_type.starts_with("text/event-stream"));

    let mut events = response.into_body().into_data_stream();
    let snapshot = read_until(&mut events, "event: snapshot").await;
    assert!(snapshot.contains("Emma"));
    assert!(!snapshot.contains("event: book_borrowed"));

    let book_id: uuid::Uuid = id.parse().unwrap();
    let _ = state
        .services
        .lending
        .borrow(alice.id, book_id)
        .await
        .unwrap()
        .into_result()
        .unwrap();

    let change = read_until(&mut events, "event: book_borrowed").await;
    assert!(change.contains("alice@club.org"));
}
