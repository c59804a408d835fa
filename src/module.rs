//! Module trait for pluggable API modules.
//!
//! Modules implement the `Module` trait to register their routes with the
//! server. The built-in modules live in [`crate::api`].
//!
//! # Example
//!
//! ```ignore
//! use foreman::{Module, Router};
//!
//! pub struct HealthApi;
//!
//! impl Module for HealthApi {
//!     fn name(&self) -> &'static str {
//!         "health"
//!     }
//!
//!     fn routes(&self, router: &mut Router) {
//!         router.get("/api/health", |_ctx| async move {
//!             foreman::response::ok(&serde_json::json!({
//!                 "status": "ok"
//!             }))
//!         });
//!     }
//! }
//! ```

use crate::router::Router;

/// A pluggable API module.
///
/// Modules register their routes with the router and can hold their own
/// state (stores, coordinators, collaborators), captured in closures or
/// procedure values when registering routes.
pub trait Module: Send + Sync {
    /// Module name for identification and logging.
    fn name(&self) -> &'static str;

    /// Register routes with the router.
    fn routes(&self, router: &mut Router);
}
