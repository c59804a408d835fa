//! JWT session tokens.
//!
//! Tokens carry the principal's id, display name, and role, so a request can
//! be re-authorized without an identity lookup. Credential verification is
//! NOT included - that's the responsibility of the [`crate::session`]
//! collaborator.

use hyper::http::HeaderMap;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::config::Auth as AuthConfig;
use crate::error::{Error, Result};
use crate::principal::Principal;
use crate::role::Role;

const MIN_SECRET_LENGTH: usize = 32;

fn validate_secret(config: &AuthConfig) -> Result<()> {
    if config.jwt_secret.len() < MIN_SECRET_LENGTH {
        return Err(Error::Config(format!(
            "JWT secret must be at least {MIN_SECRET_LENGTH} bytes"
        )));
    }
    Ok(())
}

/// JWT claims structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (the principal id)
    pub sub: String,
    /// Display name
    pub name: String,
    /// Canonical role name
    pub role: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
}

/// Create a JWT token for a principal.
pub fn create_token(config: &AuthConfig, principal: &Principal) -> Result<String> {
    validate_secret(config)?;
    let now = jiff::Timestamp::now();
    let hours = config.token_expiry_days as i64 * 24;
    let exp = now + jiff::Span::new().hours(hours);

    let claims = Claims {
        sub: principal.id.to_string(),
        name: principal.display_name.clone(),
        role: principal.role.as_str().to_string(),
        exp: exp.as_second(),
        iat: now.as_second(),
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| Error::Internal(format!("Token creation failed: {e}")))?;

    Ok(token)
}

/// Verify and decode a JWT token.
///
/// # Returns
/// - `Ok(Claims)` if the token is valid
/// - `Err(Error::TokenExpired)` if the token has expired
/// - `Err(Error::NotAuthenticated)` for any other validation failure
pub fn verify_token(config: &AuthConfig, token: &str) -> Result<Claims> {
    validate_secret(config)?;
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => Error::TokenExpired,
        _ => Error::NotAuthenticated,
    })?;

    Ok(token_data.claims)
}

/// Extract the authenticated principal from the Authorization header.
///
/// Expects a Bearer token in the format: `Authorization: Bearer <token>`.
/// A token whose role claim matches no known role is rejected the same as a
/// bad signature: the caller stays unauthenticated.
pub fn extract_principal(headers: &HeaderMap, config: &AuthConfig) -> Result<Principal> {
    let auth_header = headers
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or(Error::NotAuthenticated)?;

    let token = auth_header
        .get(..7)
        .filter(|p| p.eq_ignore_ascii_case("bearer "))
        .map(|_| &auth_header[7..])
        .ok_or(Error::NotAuthenticated)?;

    let claims = verify_token(config, token)?;

    let id = claims.sub.parse().map_err(|_| Error::NotAuthenticated)?;
    let role: Role = claims.role.parse().map_err(|_| Error::NotAuthenticated)?;

    Ok(Principal::new(id, claims.name, role))
}
