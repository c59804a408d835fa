//! Report request coordination.
//!
//! [`Coordinator::submit`] validates the spec, authorizes the requester, and
//! records a `pending` artifact before dispatching the render as a detached
//! task. The caller gets the report id back immediately; generation latency
//! never blocks submission. Render completion and failure are reported
//! through the artifact store's monotonic status transitions, queryable by
//! id from any later session.

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::error::{Error, Result};
use crate::guard::{self, Access, Decision};
use crate::principal::Principal;
use crate::render::ReportRenderer;
use crate::report::{ReportArtifact, ReportSpec, ReportStatus};
use crate::role::Role;
use crate::store::ArtifactStore;

/// Accepts report requests and hands them to the rendering collaborator.
pub struct Coordinator {
    store: Arc<ArtifactStore>,
    renderer: Arc<dyn ReportRenderer>,
}

impl Coordinator {
    pub fn new(store: Arc<ArtifactStore>, renderer: Arc<dyn ReportRenderer>) -> Self {
        Self { store, renderer }
    }

    /// Submit a report for generation, returning its artifact id.
    ///
    /// Reports are manager-tier: the requester must hold at least
    /// [`Role::Manager`]. Validation and authorization both run before any
    /// artifact record exists, and a denied requester never reaches the
    /// renderer. The HTTP layer has already checked the route requirement;
    /// this check re-evaluates it at the operation itself so the guard holds
    /// even for in-process callers.
    pub async fn submit(&self, spec: ReportSpec, requester: Option<&Principal>) -> Result<String> {
        spec.validate()?;

        if let Decision::Deny(reason) = guard::authorize(requester, &Access::MinimumRole(Role::Manager)) {
            warn!(kind = %spec.kind, "report submission denied: {reason}");
            return Err(Error::AccessDenied(reason));
        }

        let artifact = ReportArtifact::pending(spec.clone(), jiff::Timestamp::now());
        let id = artifact.id.clone();
        self.store.create(&artifact).await?;
        info!(report_id = %id, kind = %spec.kind, "report submitted");

        // Fire-and-forget: the render task owns its own store handle and
        // reports completion through a status transition.
        let store = Arc::clone(&self.store);
        let renderer = Arc::clone(&self.renderer);
        let task_id = id.clone();
        tokio::spawn(async move {
            match renderer.render(spec).await {
                Ok(bytes) => match store.mark_ready(&task_id, &bytes).await {
                    Ok(true) => info!(report_id = %task_id, size = bytes.len(), "report ready"),
                    Ok(false) => warn!(report_id = %task_id, "report already terminal, dropping render result"),
                    Err(e) => error!(report_id = %task_id, "failed to store report: {e}"),
                },
                Err(render_err) => {
                    warn!(report_id = %task_id, "report generation failed: {render_err}");
                    if let Err(e) = store.mark_failed(&task_id, render_err.reason()).await {
                        error!(report_id = %task_id, "failed to record report failure: {e}");
                    }
                }
            }
        });

        Ok(id)
    }

    /// Current lifecycle status of a submitted report.
    pub async fn status(&self, report_id: &str) -> Result<ReportStatus> {
        Ok(self.store.get(report_id).await?.status)
    }
}
