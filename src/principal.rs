//! The authenticated identity attempting an operation.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::role::Role;

/// An authenticated principal.
///
/// Owned by the session for the lifetime of one authenticated login;
/// destroyed on logout or credential invalidation. A principal whose
/// `credential_valid` flag is false is treated by the access guard the same
/// as no principal at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: Uuid,
    pub display_name: String,
    pub role: Role,
    pub credential_valid: bool,
}

impl Principal {
    /// A principal with valid credentials.
    pub fn new(id: Uuid, display_name: impl Into<String>, role: Role) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            role,
            credential_valid: true,
        }
    }
}
