//! Durable report artifact store.
//!
//! Maps an opaque report id to its [`ReportArtifact`] record and bytes,
//! backed by libsql so in-flight report state survives restarts and is
//! visible to every server instance sharing the database.
//!
//! Status transitions are monotonic: an artifact is inserted `pending` and
//! flipped once to `ready` or `failed` by a conditional single-row update.
//! The bytes land in the same statement as the `ready` flip, so a reader
//! sees either no row, a `pending` row without bytes, or a complete terminal
//! row - never a partial write.

use bytes::Bytes;
use libsql::{Connection, Value, params};

use crate::db::Handle;
use crate::error::{Error, Result};
use crate::report::{ReportArtifact, ReportSpec, ReportStatus, Target};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS report_artifacts (
    id             TEXT PRIMARY KEY,
    kind           TEXT NOT NULL,
    requested_by   TEXT NOT NULL,
    date_from      TEXT NOT NULL,
    date_to        TEXT NOT NULL,
    target_kind    TEXT,
    target_id      TEXT,
    created_at     TEXT NOT NULL,
    status         TEXT NOT NULL,
    failure_reason TEXT,
    byte_size      INTEGER NOT NULL DEFAULT 0,
    bytes          BLOB
)";

/// Durable mapping from report id to artifact record and bytes.
pub struct ArtifactStore {
    // One shared connection: libsql connections are internally synchronized,
    // and an `:memory:` database is private per connection.
    conn: Connection,
}

impl ArtifactStore {
    /// Create a store and ensure its table exists.
    pub async fn open(db: Handle) -> Result<Self> {
        let conn = db.connect()?;
        conn.execute(SCHEMA, ()).await?;
        Ok(Self { conn })
    }

    /// Insert a fresh `pending` artifact record.
    pub async fn create(&self, artifact: &ReportArtifact) -> Result<()> {
        let (target_kind, target_id) = match artifact.spec.target {
            Some(Target::User(id)) => (Value::Text("user".into()), Value::Text(id.to_string())),
            Some(Target::Team(id)) => (Value::Text("team".into()), Value::Text(id.to_string())),
            None => (Value::Null, Value::Null),
        };
        self.conn
            .execute(
                "INSERT INTO report_artifacts
                 (id, kind, requested_by, date_from, date_to, target_kind, target_id,
                  created_at, status, byte_size)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, 'pending', 0)",
                params![
                    artifact.id.clone(),
                    artifact.spec.kind.slug(),
                    artifact.spec.requested_by.to_string(),
                    artifact.spec.date_from.to_string(),
                    artifact.spec.date_to.to_string(),
                    target_kind,
                    target_id,
                    artifact.created_at.to_string(),
                ],
            )
            .await?;
        Ok(())
    }

    /// Fetch an artifact record (without its bytes).
    pub async fn get(&self, id: &str) -> Result<ReportArtifact> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, kind, requested_by, date_from, date_to, target_kind,
                        target_id, created_at, status, failure_reason, byte_size
                 FROM report_artifacts WHERE id = ?",
                params![id],
            )
            .await?;

        let Some(row) = rows.next().await? else {
            return Err(Error::NotFound(format!("Report {id}")));
        };

        let target_kind = opt_text(row.get_value(5)?);
        let target_id = opt_text(row.get_value(6)?);
        let target = match (target_kind.as_deref(), target_id) {
            (Some("user"), Some(id)) => Some(Target::User(parse(&id, "target_id")?)),
            (Some("team"), Some(id)) => Some(Target::Team(parse(&id, "target_id")?)),
            (None, _) => None,
            (Some(other), _) => {
                return Err(Error::Internal(format!(
                    "artifact row: unknown target kind {other}"
                )));
            }
        };

        let status = match text(row.get_value(8)?, "status")?.as_str() {
            "pending" => ReportStatus::Pending,
            "ready" => ReportStatus::Ready,
            "failed" => ReportStatus::Failed {
                reason: opt_text(row.get_value(9)?).unwrap_or_default(),
            },
            other => {
                return Err(Error::Internal(format!(
                    "artifact row: unknown status {other}"
                )));
            }
        };

        Ok(ReportArtifact {
            id: text(row.get_value(0)?, "id")?,
            spec: ReportSpec {
                kind: text(row.get_value(1)?, "kind")?
                    .parse()
                    .map_err(|_| Error::Internal("artifact row: bad kind".into()))?,
                requested_by: parse(&text(row.get_value(2)?, "requested_by")?, "requested_by")?,
                date_from: parse(&text(row.get_value(3)?, "date_from")?, "date_from")?,
                date_to: parse(&text(row.get_value(4)?, "date_to")?, "date_to")?,
                target,
            },
            created_at: parse(&text(row.get_value(7)?, "created_at")?, "created_at")?,
            byte_size: int(row.get_value(10)?, "byte_size")? as u64,
            status,
        })
    }

    /// Fetch a ready artifact's bytes.
    ///
    /// Returns [`Error::NotReady`] while the artifact is `pending` (so a
    /// polling client can distinguish "still working" from "does not
    /// exist"), [`Error::GenerationFailed`] for a `failed` artifact, and
    /// [`Error::NotFound`] for an unknown id.
    pub async fn bytes(&self, id: &str) -> Result<Bytes> {
        let mut rows = self
            .conn
            .query(
                "SELECT status, failure_reason, bytes FROM report_artifacts WHERE id = ?",
                params![id],
            )
            .await?;

        let Some(row) = rows.next().await? else {
            return Err(Error::NotFound(format!("Report {id}")));
        };

        match text(row.get_value(0)?, "status")?.as_str() {
            "pending" => Err(Error::NotReady),
            "failed" => Err(Error::GenerationFailed(
                opt_text(row.get_value(1)?).unwrap_or_default(),
            )),
            "ready" => match row.get_value(2)? {
                Value::Blob(bytes) => Ok(Bytes::from(bytes)),
                _ => Err(Error::Internal("artifact row: ready without bytes".into())),
            },
            other => Err(Error::Internal(format!(
                "artifact row: unknown status {other}"
            ))),
        }
    }

    /// Transition `pending -> ready`, storing the bytes in the same write.
    ///
    /// Returns false if the artifact was not `pending` (terminal states never
    /// revert) or does not exist.
    pub async fn mark_ready(&self, id: &str, bytes: &[u8]) -> Result<bool> {
        let changed = self
            .conn
            .execute(
                "UPDATE report_artifacts
                 SET status = 'ready', bytes = ?, byte_size = ?
                 WHERE id = ? AND status = 'pending'",
                params![bytes.to_vec(), bytes.len() as i64, id],
            )
            .await?;
        Ok(changed == 1)
    }

    /// Transition `pending -> failed`, recording the reason.
    ///
    /// Returns false if the artifact was not `pending` or does not exist.
    pub async fn mark_failed(&self, id: &str, reason: &str) -> Result<bool> {
        let changed = self
            .conn
            .execute(
                "UPDATE report_artifacts
                 SET status = 'failed', failure_reason = ?
                 WHERE id = ? AND status = 'pending'",
                params![reason, id],
            )
            .await?;
        Ok(changed == 1)
    }
}

fn text(value: Value, col: &str) -> Result<String> {
    match value {
        Value::Text(s) => Ok(s),
        other => Err(Error::Internal(format!(
            "artifact row: {col} is not text: {other:?}"
        ))),
    }
}

fn opt_text(value: Value) -> Option<String> {
    match value {
        Value::Text(s) => Some(s),
        _ => None,
    }
}

fn int(value: Value, col: &str) -> Result<i64> {
    match value {
        Value::Integer(i) => Ok(i),
        other => Err(Error::Internal(format!(
            "artifact row: {col} is not an integer: {other:?}"
        ))),
    }
}

fn parse<T: std::str::FromStr>(s: &str, col: &str) -> Result<T> {
    s.parse()
        .map_err(|_| Error::Internal(format!("artifact row: bad {col}: {s}")))
}
