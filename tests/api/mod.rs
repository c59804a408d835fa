//! Shared harness: a real server over an in-memory database, a fixture
//! identity verifier, a gated renderer, and a minimal raw-TCP HTTP client.

mod auth;
mod guard;
mod reports;

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use uuid::Uuid;

use foreman::config::{Auth, Config, Database, RateLimit, Server as ServerConfig};
use foreman::render::{RenderError, ReportRenderer};
use foreman::router::BoxFuture;
use foreman::session::IdentityVerifier;
use foreman::{
    ArtifactStore, Coordinator, Module, Principal, ReportSpec, Result, Role, Router, api,
};

pub const JWT_SECRET: &str = "integration-test-secret-32-bytes!";

/// Fixture identity verifier with one account per role, plus a username that
/// simulates an unreachable identity service.
pub struct TestVerifier;

impl IdentityVerifier for TestVerifier {
    fn verify_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> BoxFuture<'static, Result<Principal>> {
        let username = username.to_string();
        let password = password.to_string();
        Box::pin(async move {
            let account = match username.as_str() {
                "mkowalska" => Some(("manager-pass", "Maria Kowalska", Role::Manager)),
                "jnowak" => Some(("viewer-pass", "Jan Nowak", Role::Viewer)),
                "admin" => Some(("admin-pass", "Administrator", Role::Administrator)),
                "down" => {
                    return Err(foreman::Error::AuthServiceUnavailable(
                        "identity endpoint unreachable".into(),
                    ));
                }
                _ => None,
            };
            match account {
                Some((expected, name, role)) if expected == password => {
                    // Stable ids so repeated logins agree.
                    let id = Uuid::new_v5(&Uuid::NAMESPACE_OID, username.as_bytes());
                    Ok(Principal::new(id, name, role))
                }
                _ => Err(foreman::Error::InvalidCredentials),
            }
        })
    }
}

/// Renderer that blocks until released, so tests can observe `pending`.
pub struct GatedRenderer {
    pub gate: Arc<tokio::sync::Notify>,
    pub fail_with: Option<&'static str>,
}

impl ReportRenderer for GatedRenderer {
    fn render(&self, _spec: ReportSpec) -> BoxFuture<'static, std::result::Result<Bytes, RenderError>> {
        let gate = Arc::clone(&self.gate);
        let fail_with = self.fail_with;
        Box::pin(async move {
            gate.notified().await;
            match fail_with {
                Some(reason) => Err(RenderError::new(reason)),
                None => Ok(Bytes::from_static(b"%PDF-1.4 gated test report\n%%EOF\n")),
            }
        })
    }
}

/// Start a server on a random port with the given renderer and rate limits.
pub async fn start_test_server(
    renderer: Arc<dyn ReportRenderer>,
    rate_limit: RateLimit,
) -> (foreman::server::Server, Arc<ArtifactStore>) {
    let config = Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        database: Database {
            url: ":memory:".to_string(),
        },
        auth: Auth {
            jwt_secret: JWT_SECRET.to_string(),
            token_expiry_days: 1,
        },
        rate_limit,
    };

    let db = Arc::new(foreman::db::connect(":memory:").await.unwrap());
    let store = Arc::new(ArtifactStore::open(Arc::clone(&db)).await.unwrap());
    let coordinator = Arc::new(Coordinator::new(Arc::clone(&store), renderer));

    let mut router = Router::new();
    api::AuthApi::new(Arc::new(TestVerifier), &config.rate_limit).routes(&mut router);
    api::ReportsApi::new(coordinator, Arc::clone(&store)).routes(&mut router);
    api::HealthApi.routes(&mut router);

    let server = foreman::server::start(config, Some(db), router.into_handle())
        .await
        .unwrap();
    (server, store)
}

/// Send one raw HTTP/1.1 request and return (status, head, body).
pub async fn http(addr: SocketAddr, request: String) -> (u16, String, Vec<u8>) {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut response = Vec::new();
    stream.read_to_end(&mut response).await.unwrap();

    let split = response
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .expect("malformed HTTP response");
    let head = String::from_utf8_lossy(&response[..split]).to_string();
    let body = response[split + 4..].to_vec();

    let status: u16 = head
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|code| code.parse().ok())
        .expect("malformed status line");

    (status, head, body)
}

pub fn get_request(path: &str, token: Option<&str>) -> String {
    let mut req = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n");
    if let Some(token) = token {
        req.push_str(&format!("Authorization: Bearer {token}\r\n"));
    }
    req.push_str("\r\n");
    req
}

pub fn post_request(path: &str, token: Option<&str>, body: &str) -> String {
    let mut req = format!(
        "POST {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\
         Content-Type: application/json\r\nContent-Length: {}\r\n",
        body.len()
    );
    if let Some(token) = token {
        req.push_str(&format!("Authorization: Bearer {token}\r\n"));
    }
    req.push_str("\r\n");
    req.push_str(body);
    req
}

/// Log in and return the parsed response body.
pub async fn login(addr: SocketAddr, username: &str, password: &str) -> (u16, serde_json::Value) {
    let body = serde_json::json!({ "username": username, "password": password }).to_string();
    let (status, _, response) = http(addr, post_request("/api/auth/login", None, &body)).await;
    let value = serde_json::from_slice(&response).unwrap_or(serde_json::Value::Null);
    (status, value)
}

/// Log in and return the session token, panicking on failure.
pub async fn login_token(addr: SocketAddr, username: &str, password: &str) -> String {
    let (status, body) = login(addr, username, password).await;
    assert_eq!(status, 200, "login failed: {body}");
    body["token"].as_str().unwrap().to_string()
}

/// Poll the status endpoint until the report reaches a terminal state.
pub async fn wait_for_terminal(
    addr: SocketAddr,
    token: &str,
    report_id: &str,
) -> serde_json::Value {
    let path = format!("/api/generate-report/status/{report_id}");
    for _ in 0..200 {
        let (status, _, body) = http(addr, get_request(&path, Some(token))).await;
        assert_eq!(status, 200);
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        if value["status"] != "pending" {
            return value;
        }
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
    panic!("report {report_id} never reached a terminal state");
}
