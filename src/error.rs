//! Error types with HTTP status code mapping.

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};

use crate::guard::DenyReason;
use crate::report::ReportKind;
use crate::role::Role;

/// Error type for foreman operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    // Authentication errors
    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Identity service unavailable: {0}")]
    AuthServiceUnavailable(String),

    #[error("Token expired")]
    TokenExpired,

    // Authorization errors
    #[error("Role mismatch: requires exactly {required}, principal is {actual}")]
    RoleMismatch { required: Role, actual: Role },

    #[error("Insufficient role: requires at least {minimum}, principal is {actual}")]
    InsufficientRole { minimum: Role, actual: Role },

    #[error("Access denied: {0}")]
    AccessDenied(DenyReason),

    // Report errors
    #[error("Invalid date range: {from} is after {to}")]
    InvalidDateRange {
        from: jiff::civil::Date,
        to: jiff::civil::Date,
    },

    #[error("Missing target for {0} report")]
    MissingTarget(ReportKind),

    #[error("Report generation failed: {0}")]
    GenerationFailed(String),

    #[error("Report not ready")]
    NotReady,

    // Data errors
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Too many requests, retry after {retry_after}s")]
    TooManyRequests { retry_after: u64 },

    // Config errors
    #[error("Configuration error: {0}")]
    Config(String),

    // System errors
    #[error("Invalid address: {0}")]
    AddrParse(#[from] std::net::AddrParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] libsql::Error),

    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Map error to HTTP status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            // Authentication -> 401; identity collaborator down -> 503 so the
            // client can distinguish "try again" from "fix your password"
            Error::NotAuthenticated | Error::InvalidCredentials | Error::TokenExpired => {
                StatusCode::UNAUTHORIZED
            }
            Error::AuthServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,

            // Authorization -> 403
            Error::RoleMismatch { .. }
            | Error::InsufficientRole { .. }
            | Error::AccessDenied(_) => StatusCode::FORBIDDEN,

            // Report lifecycle
            Error::NotReady => StatusCode::ACCEPTED,
            Error::GenerationFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,

            // Data errors -> 4xx
            Error::InvalidDateRange { .. } | Error::MissingTarget(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::BadRequest(_) | Error::AddrParse(_) => StatusCode::BAD_REQUEST,
            Error::TooManyRequests { .. } => StatusCode::TOO_MANY_REQUESTS,

            // Config errors -> 500 (shouldn't happen at runtime)
            Error::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,

            // System errors -> 500
            Error::Io(_)
            | Error::Json(_)
            | Error::Database(_)
            | Error::Jwt(_)
            | Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Convert error into HTTP response.
    ///
    /// Server-error bodies are sanitized: the detail is logged, the client
    /// sees a generic message. `NotReady` is not an error to a polling
    /// client, so it gets a status body rather than an error body.
    pub fn into_response(self) -> Response<Full<Bytes>> {
        let status = self.status_code();

        if matches!(self, Error::NotReady) {
            let body = serde_json::json!({ "status": "pending" });
            return Response::builder()
                .status(status)
                .header("Content-Type", "application/json")
                .body(Full::new(Bytes::from(body.to_string())))
                .unwrap();
        }

        let message = if status.is_server_error() {
            tracing::error!("Internal error: {self}");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };
        let body = serde_json::json!({ "error": message });

        let mut builder = Response::builder()
            .status(status)
            .header("Content-Type", "application/json");
        if let Error::TooManyRequests { retry_after } = &self {
            builder = builder.header("Retry-After", retry_after.to_string());
        }
        builder
            .body(Full::new(Bytes::from(body.to_string())))
            .unwrap()
    }
}

/// Result type alias using foreman's Error.
pub type Result<T> = std::result::Result<T, Error>;
