//! Role hierarchy for access control decisions.
//!
//! Roles form a closed, totally ordered set: `Viewer < Manager <
//! Administrator`. All "at least" comparisons used by the access guard go
//! through this single ordering table.
//!
//! Earlier revisions of the system used free-form role strings in two naming
//! schemes (English and Polish). The enum below is the single source of
//! truth; [`Role::from_str`] maps both legacy schemes onto it explicitly so
//! stored tokens and database rows from either era keep working.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A principal's role, ordered by increasing authority.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Read-only team member.
    Viewer,
    /// Team manager; may request and retrieve reports.
    Manager,
    /// Full administrative authority.
    Administrator,
}

impl Role {
    /// Numeric level for runtime comparison. Higher level = more authority.
    pub fn level(self) -> u8 {
        match self {
            Role::Viewer => 1,
            Role::Manager => 2,
            Role::Administrator => 3,
        }
    }

    /// Whether this role carries at least `minimum`'s authority.
    pub fn at_least(self, minimum: Role) -> bool {
        self.level() >= minimum.level()
    }

    /// Whether this role is exactly `required`.
    pub fn exactly(self, required: Role) -> bool {
        self == required
    }

    /// Canonical lowercase name, as stored in tokens and artifact rows.
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Viewer => "viewer",
            Role::Manager => "manager",
            Role::Administrator => "administrator",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a role name matches none of the known schemes.
///
/// Callers must treat an unknown role as implicit denial, never a panic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownRole(pub String);

impl fmt::Display for UnknownRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown role: {}", self.0)
    }
}

impl std::error::Error for UnknownRole {}

impl FromStr for Role {
    type Err = UnknownRole;

    /// Parses canonical names plus the two legacy naming schemes
    /// (`employee`/`manager`/`admin` and `użytkownik`/`kierownik`/
    /// `administrator`). Matching is case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "viewer" | "employee" | "user" | "użytkownik" => Ok(Role::Viewer),
            "manager" | "kierownik" => Ok(Role::Manager),
            "administrator" | "admin" => Ok(Role::Administrator),
            _ => Err(UnknownRole(s.to_string())),
        }
    }
}
