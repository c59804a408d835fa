//! Login endpoint behavior: credential outcomes, rate limiting, and the
//! shape of the success response.

use std::sync::Arc;

use foreman::BasicPdfRenderer;
use foreman::config::RateLimit;

use super::{http, login, post_request, start_test_server};

#[tokio::test]
async fn successful_login_returns_principal_and_token() {
    let (server, _store) = start_test_server(Arc::new(BasicPdfRenderer), RateLimit::default()).await;

    let (status, body) = login(server.addr(), "mkowalska", "manager-pass").await;
    assert_eq!(status, 200);
    assert_eq!(body["displayName"], "Maria Kowalska");
    assert_eq!(body["role"], "manager");
    assert!(!body["id"].as_str().unwrap().is_empty());
    assert!(!body["token"].as_str().unwrap().is_empty());

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn wrong_password_is_401() {
    let (server, _store) = start_test_server(Arc::new(BasicPdfRenderer), RateLimit::default()).await;

    let (status, body) = login(server.addr(), "mkowalska", "guessed").await;
    assert_eq!(status, 401);
    assert_eq!(body["error"], "Invalid credentials");

    // Unknown usernames get the same answer, not a different one.
    let (status, body) = login(server.addr(), "nobody", "guessed").await;
    assert_eq!(status, 401);
    assert_eq!(body["error"], "Invalid credentials");

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn unreachable_identity_service_is_503_not_401() {
    let (server, _store) = start_test_server(Arc::new(BasicPdfRenderer), RateLimit::default()).await;

    let (status, _body) = login(server.addr(), "down", "whatever").await;
    assert_eq!(status, 503, "service outage must not read as bad password");

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn login_attempts_are_rate_limited_per_ip() {
    let (server, _store) = start_test_server(
        Arc::new(BasicPdfRenderer),
        RateLimit {
            login_attempts: 2,
            window_secs: 3600,
        },
    )
    .await;

    let (first, _) = login(server.addr(), "mkowalska", "guess-1").await;
    let (second, _) = login(server.addr(), "mkowalska", "guess-2").await;
    assert_eq!(first, 401);
    assert_eq!(second, 401);

    let body = serde_json::json!({ "username": "mkowalska", "password": "guess-3" }).to_string();
    let (status, head, _) = http(
        server.addr(),
        post_request("/api/auth/login", None, &body),
    )
    .await;
    assert_eq!(status, 429);
    assert!(head.to_lowercase().contains("retry-after:"));

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn malformed_login_body_is_400() {
    let (server, _store) = start_test_server(Arc::new(BasicPdfRenderer), RateLimit::default()).await;

    let (status, _, _) = http(
        server.addr(),
        post_request("/api/auth/login", None, "not json"),
    )
    .await;
    assert_eq!(status, 400);

    server.shutdown().await.unwrap();
}
