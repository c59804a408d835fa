//! Report workflow: submit, poll, download, and the failure paths.

use std::sync::Arc;

use foreman::BasicPdfRenderer;
use foreman::config::RateLimit;
use uuid::Uuid;

use super::{
    GatedRenderer, get_request, http, login_token, post_request, start_test_server,
    wait_for_terminal,
};

#[tokio::test]
async fn submit_poll_download_flow() {
    let (server, _store) = start_test_server(Arc::new(BasicPdfRenderer), RateLimit::default()).await;
    let addr = server.addr();
    let token = login_token(addr, "mkowalska", "manager-pass").await;

    // Submit.
    let (status, _, body) = http(
        addr,
        post_request(
            "/api/generate-report/employee-load?dateFrom=2024-03-01&dateTo=2024-03-10",
            Some(&token),
            "",
        ),
    )
    .await;
    assert_eq!(status, 200);
    let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
    let report_id = body["reportId"].as_str().unwrap().to_string();
    assert!(!report_id.is_empty());

    // Poll until terminal.
    let status_body = wait_for_terminal(addr, &token, &report_id).await;
    assert_eq!(status_body["status"], "ready");
    assert!(status_body.get("reason").is_none());

    // Download.
    let (status, head, pdf) = http(
        addr,
        get_request(
            &format!("/api/generate-report/download/{report_id}"),
            Some(&token),
        ),
    )
    .await;
    assert_eq!(status, 200);
    assert!(head.contains("application/pdf"));
    assert!(head.contains(&format!("employee-load-{report_id}.pdf")));
    assert!(pdf.starts_with(b"%PDF-1.4"));

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn download_is_independent_of_the_requesting_session() {
    let (server, _store) = start_test_server(Arc::new(BasicPdfRenderer), RateLimit::default()).await;
    let addr = server.addr();

    // A manager submits the report.
    let manager = login_token(addr, "mkowalska", "manager-pass").await;
    let (_, _, body) = http(
        addr,
        post_request(
            "/api/generate-report/team-efficiency?dateFrom=2024-03-01&dateTo=2024-03-31",
            Some(&manager),
            "",
        ),
    )
    .await;
    let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
    let report_id = body["reportId"].as_str().unwrap().to_string();
    wait_for_terminal(addr, &manager, &report_id).await;

    // A different, sufficiently-authorized principal downloads it later.
    let admin = login_token(addr, "admin", "admin-pass").await;
    let (status, _, pdf) = http(
        addr,
        get_request(
            &format!("/api/generate-report/download/{report_id}"),
            Some(&admin),
        ),
    )
    .await;
    assert_eq!(status, 200);
    assert!(pdf.starts_with(b"%PDF-1.4"));

    // A viewer with the shared id is still denied.
    let viewer = login_token(addr, "jnowak", "viewer-pass").await;
    let (status, _, _) = http(
        addr,
        get_request(
            &format!("/api/generate-report/download/{report_id}"),
            Some(&viewer),
        ),
    )
    .await;
    assert_eq!(status, 403);

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn pending_report_downloads_as_202() {
    let gate = Arc::new(tokio::sync::Notify::new());
    let (server, _store) = start_test_server(
        Arc::new(GatedRenderer {
            gate: Arc::clone(&gate),
            fail_with: None,
        }),
        RateLimit::default(),
    )
    .await;
    let addr = server.addr();
    let token = login_token(addr, "mkowalska", "manager-pass").await;

    let (_, _, body) = http(
        addr,
        post_request(
            "/api/generate-report/employee-load?dateFrom=2024-03-01&dateTo=2024-03-10",
            Some(&token),
            "",
        ),
    )
    .await;
    let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
    let report_id = body["reportId"].as_str().unwrap().to_string();

    // Renderer is gated: status reports pending, download is 202 so the
    // client can tell "still working" from "does not exist".
    let (status, _, status_body) = http(
        addr,
        get_request(
            &format!("/api/generate-report/status/{report_id}"),
            Some(&token),
        ),
    )
    .await;
    assert_eq!(status, 200);
    let status_body: serde_json::Value = serde_json::from_slice(&status_body).unwrap();
    assert_eq!(status_body["status"], "pending");

    let (status, _, download_body) = http(
        addr,
        get_request(
            &format!("/api/generate-report/download/{report_id}"),
            Some(&token),
        ),
    )
    .await;
    assert_eq!(status, 202);
    let download_body: serde_json::Value = serde_json::from_slice(&download_body).unwrap();
    assert_eq!(download_body["status"], "pending");

    // Release the renderer; the same id becomes downloadable.
    gate.notify_one();
    wait_for_terminal(addr, &token, &report_id).await;
    let (status, _, pdf) = http(
        addr,
        get_request(
            &format!("/api/generate-report/download/{report_id}"),
            Some(&token),
        ),
    )
    .await;
    assert_eq!(status, 200);
    assert!(pdf.starts_with(b"%PDF-1.4"));

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn failed_generation_is_queryable_not_lost() {
    let gate = Arc::new(tokio::sync::Notify::new());
    let (server, _store) = start_test_server(
        Arc::new(GatedRenderer {
            gate: Arc::clone(&gate),
            fail_with: Some("task data source unavailable"),
        }),
        RateLimit::default(),
    )
    .await;
    let addr = server.addr();
    let token = login_token(addr, "mkowalska", "manager-pass").await;

    let (status, _, body) = http(
        addr,
        post_request(
            "/api/generate-report/employee-load?dateFrom=2024-03-01&dateTo=2024-03-10",
            Some(&token),
            "",
        ),
    )
    .await;
    // Submission already succeeded: the failure is asynchronous.
    assert_eq!(status, 200);
    let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
    let report_id = body["reportId"].as_str().unwrap().to_string();

    gate.notify_one();
    let status_body = wait_for_terminal(addr, &token, &report_id).await;
    assert_eq!(status_body["status"], "failed");
    assert_eq!(status_body["reason"], "task data source unavailable");

    // Download surfaces the failure without leaking the internal reason.
    let (status, _, download_body) = http(
        addr,
        get_request(
            &format!("/api/generate-report/download/{report_id}"),
            Some(&token),
        ),
    )
    .await;
    assert_eq!(status, 500);
    assert!(!String::from_utf8_lossy(&download_body).contains("data source"));

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn invalid_parameters_are_rejected_before_submission() {
    let (server, _store) = start_test_server(Arc::new(BasicPdfRenderer), RateLimit::default()).await;
    let addr = server.addr();
    let token = login_token(addr, "mkowalska", "manager-pass").await;

    // Reversed date range.
    let (status, _, body) = http(
        addr,
        post_request(
            "/api/generate-report/employee-load?dateFrom=2024-03-10&dateTo=2024-03-01",
            Some(&token),
            "",
        ),
    )
    .await;
    assert_eq!(status, 400);
    let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert!(body["error"].as_str().unwrap().contains("Invalid date range"));

    // Missing team target for construction progress.
    let (status, _, body) = http(
        addr,
        post_request(
            "/api/generate-report/construction-progress?dateFrom=2024-03-01&dateTo=2024-03-10",
            Some(&token),
            "",
        ),
    )
    .await;
    assert_eq!(status, 400);
    let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert!(body["error"].as_str().unwrap().contains("Missing target"));

    // Missing date parameter.
    let (status, _, _) = http(
        addr,
        post_request(
            "/api/generate-report/employee-load?dateFrom=2024-03-01",
            Some(&token),
            "",
        ),
    )
    .await;
    assert_eq!(status, 400);

    // Unknown report kind.
    let (status, _, _) = http(
        addr,
        post_request(
            "/api/generate-report/quarterly-costs?dateFrom=2024-03-01&dateTo=2024-03-10",
            Some(&token),
            "",
        ),
    )
    .await;
    assert_eq!(status, 404);

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn unknown_report_id_is_404() {
    let (server, _store) = start_test_server(Arc::new(BasicPdfRenderer), RateLimit::default()).await;
    let addr = server.addr();
    let token = login_token(addr, "mkowalska", "manager-pass").await;
    let ghost = Uuid::new_v4();

    let (status, _, _) = http(
        addr,
        get_request(&format!("/api/generate-report/status/{ghost}"), Some(&token)),
    )
    .await;
    assert_eq!(status, 404);

    let (status, _, _) = http(
        addr,
        get_request(
            &format!("/api/generate-report/download/{ghost}"),
            Some(&token),
        ),
    )
    .await;
    assert_eq!(status, 404);

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn health_is_open_and_responses_carry_security_headers() {
    let (server, _store) = start_test_server(Arc::new(BasicPdfRenderer), RateLimit::default()).await;
    let addr = server.addr();

    let (status, head, body) = http(addr, get_request("/api/health", None)).await;
    assert_eq!(status, 200);
    let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["status"], "ok");
    assert!(head.contains("X-Content-Type-Options: nosniff") || head.contains("x-content-type-options: nosniff"));

    server.shutdown().await.unwrap();
}
