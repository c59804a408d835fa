//! Client authentication session.
//!
//! A [`Session`] tracks the current principal for one client instance. It is
//! an explicit object threaded through calls, not process-global state; the
//! interior mutex exists so a single client can share it across tasks, and
//! holds exactly one principal at a time.
//!
//! Credential verification is delegated to an [`IdentityVerifier`]
//! collaborator (an external auth endpoint in production, a fixture in
//! tests).

use std::sync::{Arc, Mutex};

use crate::error::Result;
use crate::guard::{self, Access, Decision};
use crate::principal::Principal;
use crate::router::BoxFuture;

/// Login credentials.
#[derive(Debug, Clone, serde::Deserialize, schemars::JsonSchema)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// External identity check.
///
/// Implementations must distinguish a rejected credential
/// ([`crate::Error::InvalidCredentials`]) from an unreachable identity
/// service ([`crate::Error::AuthServiceUnavailable`]) so callers can tell
/// "fix your password" from "try again later".
pub trait IdentityVerifier: Send + Sync {
    fn verify_credentials(&self, username: &str, password: &str)
    -> BoxFuture<'static, Result<Principal>>;
}

/// Per-client authentication state.
pub struct Session {
    verifier: Arc<dyn IdentityVerifier>,
    current: Mutex<Option<Principal>>,
}

impl Session {
    pub fn new(verifier: Arc<dyn IdentityVerifier>) -> Self {
        Self {
            verifier,
            current: Mutex::new(None),
        }
    }

    /// Authenticate and make the resulting principal current.
    ///
    /// A successful login replaces any previously current principal.
    pub async fn login(&self, credentials: &Credentials) -> Result<Principal> {
        let principal = self
            .verifier
            .verify_credentials(&credentials.username, &credentials.password)
            .await?;
        *self.current.lock().unwrap() = Some(principal.clone());
        Ok(principal)
    }

    /// Clear the current principal. Idempotent; never errors.
    pub fn logout(&self) {
        *self.current.lock().unwrap() = None;
    }

    /// Mark the current principal's credentials as no longer valid.
    ///
    /// The principal stays observable via [`current_principal`](Self::current_principal)
    /// but fails every access check until the client logs in again.
    pub fn invalidate_credentials(&self) {
        if let Some(principal) = self.current.lock().unwrap().as_mut() {
            principal.credential_valid = false;
        }
    }

    pub fn current_principal(&self) -> Option<Principal> {
        self.current.lock().unwrap().clone()
    }

    /// Pre-flight access check for the current principal.
    ///
    /// Evaluates the same pure [`guard::authorize`] the server applies before
    /// executing the operation, so both layers reach the same decision for
    /// the same inputs. This is a UX optimization only - the server-side
    /// check remains the security boundary.
    pub fn can_access(&self, requirement: &Access) -> Decision {
        guard::authorize(self.current.lock().unwrap().as_ref(), requirement)
    }
}
