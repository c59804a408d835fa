//! Access-control enforcement.
//!
//! The same decision table is evaluated three ways: directly against the
//! pure guard, through a client session's pre-flight check, and against the
//! running server. Pre-flight and server-side enforcement must agree for
//! the same inputs — the pre-flight is a UX optimization, the server check
//! is the security boundary.

use std::sync::Arc;

use foreman::config::RateLimit;
use foreman::guard::{self, Access, Decision, DenyReason};
use foreman::session::Session;
use foreman::{BasicPdfRenderer, Credentials, Principal, Role};
use uuid::Uuid;

use super::{TestVerifier, get_request, http, login_token, start_test_server};

fn principal(role: Role) -> Principal {
    Principal::new(Uuid::new_v4(), "Table Entry", role)
}

/// The shared decision table for the status endpoint's requirement
/// (`minimumRole(manager)`): principal role -> expected decision.
fn status_endpoint_table() -> Vec<(Option<Role>, Decision)> {
    vec![
        (None, Decision::Deny(DenyReason::NotAuthenticated)),
        (
            Some(Role::Viewer),
            Decision::Deny(DenyReason::InsufficientRole {
                minimum: Role::Manager,
                actual: Role::Viewer,
            }),
        ),
        (Some(Role::Manager), Decision::Allow),
        (Some(Role::Administrator), Decision::Allow),
    ]
}

#[test]
fn guard_layer_matches_decision_table() {
    let requirement = Access::MinimumRole(Role::Manager);
    for (role, expected) in status_endpoint_table() {
        let p = role.map(principal);
        assert_eq!(guard::authorize(p.as_ref(), &requirement), expected);
    }
}

#[tokio::test]
async fn preflight_layer_matches_decision_table() {
    let requirement = Access::MinimumRole(Role::Manager);
    let accounts = [
        ("jnowak", "viewer-pass", Role::Viewer),
        ("mkowalska", "manager-pass", Role::Manager),
        ("admin", "admin-pass", Role::Administrator),
    ];

    // Unauthenticated session.
    let session = Session::new(Arc::new(TestVerifier));
    assert_eq!(
        session.can_access(&requirement),
        Decision::Deny(DenyReason::NotAuthenticated)
    );

    for (username, password, role) in accounts {
        let session = Session::new(Arc::new(TestVerifier));
        session
            .login(&Credentials {
                username: username.to_string(),
                password: password.to_string(),
            })
            .await
            .unwrap();
        let expected = guard::authorize(Some(&principal(role)), &requirement);
        assert_eq!(session.can_access(&requirement), expected);
    }
}

#[tokio::test]
async fn server_layer_matches_decision_table() {
    let (server, _store) = start_test_server(Arc::new(BasicPdfRenderer), RateLimit::default()).await;
    let addr = server.addr();
    // An id that does not exist: an allowed request reaches the handler and
    // gets 404, a denied one never does.
    let path = format!("/api/generate-report/status/{}", Uuid::new_v4());

    // No token: the guard's NotAuthenticated surfaces as 401.
    let (status, _, _) = http(addr, get_request(&path, None)).await;
    assert_eq!(status, 401);

    // Viewer: InsufficientRole surfaces as 403.
    let viewer = login_token(addr, "jnowak", "viewer-pass").await;
    let (status, _, body) = http(addr, get_request(&path, Some(&viewer))).await;
    assert_eq!(status, 403);
    let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert!(
        body["error"].as_str().unwrap().contains("Insufficient role"),
        "denial must be surfaced, not silently ignored: {body}"
    );

    // Manager and administrator: allowed through to the handler (404 here).
    for (username, password) in [("mkowalska", "manager-pass"), ("admin", "admin-pass")] {
        let token = login_token(addr, username, password).await;
        let (status, _, _) = http(addr, get_request(&path, Some(&token))).await;
        assert_eq!(status, 404);
    }

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn tampered_token_is_not_authenticated() {
    let (server, _store) = start_test_server(Arc::new(BasicPdfRenderer), RateLimit::default()).await;
    let addr = server.addr();

    let mut token = login_token(addr, "mkowalska", "manager-pass").await;
    // Flip a character in the signature.
    let tail = token.pop().unwrap();
    token.push(if tail == 'A' { 'B' } else { 'A' });

    let path = format!("/api/generate-report/status/{}", Uuid::new_v4());
    let (status, _, _) = http(addr, get_request(&path, Some(&token))).await;
    assert_eq!(status, 401);

    server.shutdown().await.unwrap();
}

#[test]
fn exact_role_decision_table() {
    // exactRole(administrator): only the administrator passes.
    let req = Access::ExactRole(Role::Administrator);
    assert!(guard::authorize(Some(&principal(Role::Administrator)), &req).is_allowed());
    assert!(!guard::authorize(Some(&principal(Role::Manager)), &req).is_allowed());

    // The same administrator against exactRole(manager) is a mismatch, not
    // an escalation.
    let req = Access::ExactRole(Role::Manager);
    assert_eq!(
        guard::authorize(Some(&principal(Role::Administrator)), &req),
        Decision::Deny(DenyReason::RoleMismatch {
            required: Role::Manager,
            actual: Role::Administrator,
        })
    );
}
