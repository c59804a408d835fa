//! Built-in HTTP API modules.
//!
//! Mirrors the three controller surfaces of the task-management backend:
//! authentication, report generation/retrieval, and health. Every endpoint
//! declares its access requirement at registration; the router enforces it
//! before the handlers below run, and the report handlers re-check at the
//! coordinator so the guard also holds for in-process callers.

use std::sync::Arc;

use hyper::Method;
use schemars::JsonSchema;
use serde::Serialize;
use tracing::info;

use crate::auth;
use crate::config::RateLimit;
use crate::coordinator::Coordinator;
use crate::error::{Error, Result};
use crate::guard::Access;
use crate::module::Module;
use crate::procedure::{Empty, Meta, Procedure};
use crate::rate_limit::RateLimiter;
use crate::report::{ReportArtifact, ReportKind, ReportSpec, Target};
use crate::response;
use crate::role::Role;
use crate::router::{Context, Router};
use crate::session::{Credentials, IdentityVerifier};
use crate::store::ArtifactStore;

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

/// Response body for a successful login, shaped like the legacy user DTO.
#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub id: String,
    pub display_name: String,
    pub role: String,
    pub token: String,
}

/// `POST /api/auth/login` — verify credentials and mint a session token.
struct LoginProcedure {
    verifier: Arc<dyn IdentityVerifier>,
    limiter: Arc<RateLimiter>,
}

impl Procedure for LoginProcedure {
    type Input = Credentials;
    type Output = LoginResponse;

    fn meta(&self) -> Meta {
        Meta::post("/api/auth/login")
            .summary("Authenticate and mint a session token")
            .tag("auth")
    }

    async fn handle(&self, ctx: Context, input: Credentials) -> Result<LoginResponse> {
        if let Some(ip) = ctx.remote
            && let Err(retry_after) = self.limiter.check(ip)
        {
            return Err(Error::TooManyRequests { retry_after });
        }

        let principal = self
            .verifier
            .verify_credentials(&input.username, &input.password)
            .await?;
        let token = auth::create_token(&ctx.config.auth, &principal)?;
        info!(principal = %principal.id, role = %principal.role, "login");

        Ok(LoginResponse {
            id: principal.id.to_string(),
            display_name: principal.display_name,
            role: principal.role.as_str().to_string(),
            token,
        })
    }
}

/// Authentication endpoints.
pub struct AuthApi {
    verifier: Arc<dyn IdentityVerifier>,
    limiter: Arc<RateLimiter>,
}

impl AuthApi {
    pub fn new(verifier: Arc<dyn IdentityVerifier>, limits: &RateLimit) -> Self {
        Self {
            verifier,
            limiter: Arc::new(RateLimiter::from_config(limits)),
        }
    }
}

impl Module for AuthApi {
    fn name(&self) -> &'static str {
        "auth"
    }

    fn routes(&self, router: &mut Router) {
        router.procedure(LoginProcedure {
            verifier: Arc::clone(&self.verifier),
            limiter: Arc::clone(&self.limiter),
        });
    }
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// Response body for a submitted report.
#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub report_id: String,
    pub message: String,
}

/// Response body for a report status query.
#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub report_id: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

fn parse_date(value: &str, name: &str) -> Result<jiff::civil::Date> {
    value
        .parse()
        .map_err(|_| Error::BadRequest(format!("Invalid {name}: {value}")))
}

fn parse_uuid(value: &str, name: &str) -> Result<uuid::Uuid> {
    value
        .parse()
        .map_err(|_| Error::BadRequest(format!("Invalid {name}: {value}")))
}

/// Resolve the optional `teamId` / `targetUserId` query parameters into a
/// report target. The per-kind target rules are checked later by
/// [`ReportSpec::validate`]; this only rejects ambiguous input.
fn parse_target(ctx: &Context) -> Result<Option<Target>> {
    match (ctx.query_param("teamId"), ctx.query_param("targetUserId")) {
        (Some(_), Some(_)) => Err(Error::BadRequest(
            "teamId and targetUserId are mutually exclusive".to_string(),
        )),
        (Some(team), None) => Ok(Some(Target::Team(parse_uuid(team, "teamId")?))),
        (None, Some(user)) => Ok(Some(Target::User(parse_uuid(user, "targetUserId")?))),
        (None, None) => Ok(None),
    }
}

/// `POST /api/generate-report/{kind}` — submit a report for generation.
///
/// The requester is taken from the verified token, never from a query
/// parameter: client-supplied identity is not a security boundary.
struct GenerateReportProcedure {
    coordinator: Arc<Coordinator>,
}

impl Procedure for GenerateReportProcedure {
    type Input = Empty;
    type Output = GenerateResponse;

    fn meta(&self) -> Meta {
        Meta::post("/api/generate-report/{kind}")
            .summary("Submit a report for asynchronous generation")
            .tag("reports")
            .access(Access::MinimumRole(Role::Manager))
    }

    async fn handle(&self, ctx: Context, _input: Empty) -> Result<GenerateResponse> {
        let principal = ctx.require_principal()?;
        let kind: ReportKind = ctx.require_param("kind")?.parse()?;

        let spec = ReportSpec {
            kind,
            date_from: parse_date(ctx.require_query("dateFrom")?, "dateFrom")?,
            date_to: parse_date(ctx.require_query("dateTo")?, "dateTo")?,
            requested_by: principal.id,
            target: parse_target(&ctx)?,
        };

        let report_id = self.coordinator.submit(spec, Some(&principal)).await?;

        Ok(GenerateResponse {
            report_id,
            message: format!("{} generation started", kind.title()),
        })
    }
}

/// `GET /api/generate-report/status/{reportId}` — poll generation status.
struct ReportStatusProcedure {
    coordinator: Arc<Coordinator>,
}

impl Procedure for ReportStatusProcedure {
    type Input = Empty;
    type Output = StatusResponse;

    fn meta(&self) -> Meta {
        Meta::get("/api/generate-report/status/{reportId}")
            .summary("Report generation status")
            .tag("reports")
            .access(Access::MinimumRole(Role::Manager))
    }

    async fn handle(&self, ctx: Context, _input: Empty) -> Result<StatusResponse> {
        let report_id = ctx.require_param("reportId")?;
        let status = self.coordinator.status(report_id).await?;
        Ok(StatusResponse {
            report_id: report_id.to_string(),
            status: status.as_str().to_string(),
            reason: status.reason().map(String::from),
        })
    }
}

/// Report generation and retrieval endpoints.
pub struct ReportsApi {
    coordinator: Arc<Coordinator>,
    store: Arc<ArtifactStore>,
}

impl ReportsApi {
    pub fn new(coordinator: Arc<Coordinator>, store: Arc<ArtifactStore>) -> Self {
        Self { coordinator, store }
    }
}

impl Module for ReportsApi {
    fn name(&self) -> &'static str {
        "reports"
    }

    fn routes(&self, router: &mut Router) {
        router.procedure(GenerateReportProcedure {
            coordinator: Arc::clone(&self.coordinator),
        });
        router.procedure(ReportStatusProcedure {
            coordinator: Arc::clone(&self.coordinator),
        });

        // Download is a binary response, so it bypasses the JSON procedure
        // machinery but keeps the same declared access requirement.
        // Retrieval is authorized against the retrieving principal, not the
        // original requester: ready report ids may be shared or bookmarked.
        let store = Arc::clone(&self.store);
        router.guarded(
            Method::GET,
            "/api/generate-report/download/{reportId}",
            Access::MinimumRole(Role::Manager),
            move |ctx| {
                let store = Arc::clone(&store);
                async move {
                    let report_id = ctx.require_param("reportId")?;
                    let artifact = store.get(report_id).await?;
                    let bytes = store.bytes(report_id).await?;
                    Ok(response::binary(
                        bytes,
                        ReportArtifact::CONTENT_TYPE,
                        Some(&artifact.file_name()),
                    ))
                }
            },
        );
    }
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, JsonSchema)]
pub struct HealthResponse {
    pub status: String,
}

/// `GET /api/health` — liveness probe, also used by clients to distinguish
/// "server down" from "bad credentials".
struct HealthProcedure;

impl Procedure for HealthProcedure {
    type Input = Empty;
    type Output = HealthResponse;

    fn meta(&self) -> Meta {
        Meta::get("/api/health").summary("Health check").tag("system")
    }

    async fn handle(&self, _ctx: Context, _input: Empty) -> Result<HealthResponse> {
        Ok(HealthResponse {
            status: "ok".to_string(),
        })
    }
}

/// Health endpoints.
pub struct HealthApi;

impl Module for HealthApi {
    fn name(&self) -> &'static str {
        "health"
    }

    fn routes(&self, router: &mut Router) {
        router.procedure(HealthProcedure);
    }
}
