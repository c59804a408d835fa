//! Report specifications and artifacts.
//!
//! A [`ReportSpec`] describes what a caller wants generated; a
//! [`ReportArtifact`] is the durable record the store keeps for it, from
//! `pending` through `ready` or `failed`.

use std::fmt;
use std::str::FromStr;

use jiff::Timestamp;
use jiff::civil::Date;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// The kinds of report the system can produce.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum ReportKind {
    ConstructionProgress,
    EmployeeLoad,
    TeamEfficiency,
}

impl ReportKind {
    /// URL and file-name slug, matching the endpoint paths.
    pub fn slug(self) -> &'static str {
        match self {
            ReportKind::ConstructionProgress => "construction-progress",
            ReportKind::EmployeeLoad => "employee-load",
            ReportKind::TeamEfficiency => "team-efficiency",
        }
    }

    /// Human-readable title used on the rendered document.
    pub fn title(self) -> &'static str {
        match self {
            ReportKind::ConstructionProgress => "Construction Progress Report",
            ReportKind::EmployeeLoad => "Employee Load Report",
            ReportKind::TeamEfficiency => "Team Efficiency Report",
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for ReportKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "construction-progress" => Ok(ReportKind::ConstructionProgress),
            "employee-load" => Ok(ReportKind::EmployeeLoad),
            "team-efficiency" => Ok(ReportKind::TeamEfficiency),
            _ => Err(Error::NotFound(format!("Unknown report kind: {s}"))),
        }
    }
}

/// The entity a report is scoped to, where the kind requires one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type", content = "id")]
pub enum Target {
    User(Uuid),
    Team(Uuid),
}

/// A validated-on-submission description of a report to generate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSpec {
    pub kind: ReportKind,
    pub date_from: Date,
    pub date_to: Date,
    /// Principal id of the requester, taken from the verified session.
    pub requested_by: Uuid,
    pub target: Option<Target>,
}

impl ReportSpec {
    /// Check field constraints: date ordering and the per-kind target rules.
    ///
    /// Runs before any artifact record is created, so an invalid spec leaves
    /// no trace in the store.
    pub fn validate(&self) -> Result<()> {
        if self.date_from > self.date_to {
            return Err(Error::InvalidDateRange {
                from: self.date_from,
                to: self.date_to,
            });
        }
        match (self.kind, &self.target) {
            (ReportKind::ConstructionProgress, Some(Target::Team(_))) => Ok(()),
            (ReportKind::ConstructionProgress, _) => {
                Err(Error::MissingTarget(ReportKind::ConstructionProgress))
            }
            (ReportKind::EmployeeLoad, None | Some(Target::User(_))) => Ok(()),
            (ReportKind::EmployeeLoad, Some(Target::Team(_))) => Err(Error::BadRequest(
                "employee-load reports take a user target, not a team".to_string(),
            )),
            (ReportKind::TeamEfficiency, None) => Ok(()),
            (ReportKind::TeamEfficiency, Some(_)) => Err(Error::BadRequest(
                "team-efficiency reports take no target".to_string(),
            )),
        }
    }
}

/// Generation lifecycle state of an artifact.
///
/// Transitions are monotonic: `Pending -> Ready` or `Pending -> Failed`,
/// never back.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReportStatus {
    Pending,
    Ready,
    Failed { reason: String },
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Pending => "pending",
            ReportStatus::Ready => "ready",
            ReportStatus::Failed { .. } => "failed",
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            ReportStatus::Failed { reason } => Some(reason),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ReportStatus::Pending)
    }
}

/// Durable record of a generated (or in-flight) report.
///
/// Owned exclusively by the artifact store; everyone else holds only the id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReportArtifact {
    /// Opaque server-assigned id.
    pub id: String,
    pub spec: ReportSpec,
    pub created_at: Timestamp,
    pub byte_size: u64,
    pub status: ReportStatus,
}

impl ReportArtifact {
    pub const CONTENT_TYPE: &'static str = "application/pdf";

    /// A fresh `pending` artifact for a just-submitted spec.
    pub fn pending(spec: ReportSpec, created_at: Timestamp) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            spec,
            created_at,
            byte_size: 0,
            status: ReportStatus::Pending,
        }
    }

    /// Download file name, unique per artifact.
    pub fn file_name(&self) -> String {
        format!("{}-{}.pdf", self.spec.kind.slug(), self.id)
    }
}
