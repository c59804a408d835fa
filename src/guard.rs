//! Access guard: authorizes an attempted operation against a declared
//! requirement.
//!
//! [`authorize`] is deterministic and side-effect-free. It runs in two
//! places with the same inputs: once as a client pre-flight (a UX
//! optimization — see [`crate::session::Session::can_access`]) and once
//! server-side in the router before any protected handler executes. The
//! server-side evaluation is the security boundary; the pre-flight never is.

use serde::Serialize;

use crate::principal::Principal;
use crate::role::Role;

/// Access requirement attached to an endpoint at registration time.
///
/// Immutable after registration; the router copies it into its route table
/// and never exposes a mutable view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "role")]
pub enum Access {
    /// Open to anyone, including unauthenticated callers.
    None,
    /// Requires exactly the given role.
    ExactRole(Role),
    /// Requires the given role or any role above it in the hierarchy.
    MinimumRole(Role),
}

impl Access {
    /// Whether this requirement implies an authenticated principal.
    pub fn requires_auth(&self) -> bool {
        !matches!(self, Access::None)
    }
}

/// Why an authorization attempt was denied.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DenyReason {
    #[error("not authenticated")]
    NotAuthenticated,

    #[error("requires exactly {required}, principal is {actual}")]
    RoleMismatch { required: Role, actual: Role },

    #[error("requires at least {minimum}, principal is {actual}")]
    InsufficientRole { minimum: Role, actual: Role },
}

/// Outcome of an authorization check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    /// Convert into a `Result`, mapping each deny reason onto the matching
    /// error variant so it surfaces with the right HTTP status.
    pub fn into_result(self) -> crate::Result<()> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny(reason) => Err(reason.into()),
        }
    }
}

impl From<DenyReason> for crate::Error {
    fn from(reason: DenyReason) -> Self {
        match reason {
            DenyReason::NotAuthenticated => crate::Error::NotAuthenticated,
            DenyReason::RoleMismatch { required, actual } => {
                crate::Error::RoleMismatch { required, actual }
            }
            DenyReason::InsufficientRole { minimum, actual } => {
                crate::Error::InsufficientRole { minimum, actual }
            }
        }
    }
}

/// Authorize `principal` against `requirement`.
///
/// - `Access::None` allows any caller, authenticated or not.
/// - An absent principal, or one with invalidated credentials, is denied
///   with [`DenyReason::NotAuthenticated`] for any other requirement.
/// - `ExactRole` and `MinimumRole` compare against the role hierarchy.
pub fn authorize(principal: Option<&Principal>, requirement: &Access) -> Decision {
    if matches!(requirement, Access::None) {
        return Decision::Allow;
    }

    let Some(principal) = principal.filter(|p| p.credential_valid) else {
        return Decision::Deny(DenyReason::NotAuthenticated);
    };

    match *requirement {
        Access::None => Decision::Allow,
        Access::ExactRole(required) => {
            if principal.role.exactly(required) {
                Decision::Allow
            } else {
                Decision::Deny(DenyReason::RoleMismatch {
                    required,
                    actual: principal.role,
                })
            }
        }
        Access::MinimumRole(minimum) => {
            if principal.role.at_least(minimum) {
                Decision::Allow
            } else {
                Decision::Deny(DenyReason::InsufficientRole {
                    minimum,
                    actual: principal.role,
                })
            }
        }
    }
}
