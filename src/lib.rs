//! Foreman - backend core for construction-team task management.
//!
//! Foreman provides the role-gated authentication and asynchronous report
//! workflow behind the task-management clients:
//!
//! - **Role / Guard**: a closed role hierarchy and a pure access guard that
//!   authorizes every sensitive operation
//! - **Session**: per-client authentication state over a pluggable identity
//!   collaborator
//! - **Coordinator / Store**: report submission that returns an opaque id
//!   immediately and a durable libsql-backed artifact store to poll and
//!   download from later
//! - **Config**: layered configuration (file → env → CLI)
//! - **Router / Server**: hyper-based HTTP server with access requirements
//!   declared per route and enforced before dispatch
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use foreman::{api, ArtifactStore, BasicPdfRenderer, ConfigLoader, Coordinator, Module, Router};
//!
//! #[tokio::main]
//! async fn main() -> foreman::Result<()> {
//!     let loader = ConfigLoader::new("FOREMAN");
//!     let config = loader.load(None, None, None, None, None)?;
//!
//!     let db = Arc::new(foreman::db::connect(&config.database.url).await?);
//!     let store = Arc::new(ArtifactStore::open(Arc::clone(&db)).await?);
//!     let coordinator = Arc::new(Coordinator::new(Arc::clone(&store), Arc::new(BasicPdfRenderer)));
//!
//!     let mut router = Router::new();
//!     api::AuthApi::new(identity_verifier(), &config.rate_limit).routes(&mut router);
//!     api::ReportsApi::new(coordinator, store).routes(&mut router);
//!     api::HealthApi.routes(&mut router);
//!     router.openapi("/api/openapi.json", foreman::Info {
//!         title: "Foreman API",
//!         version: env!("CARGO_PKG_VERSION"),
//!     });
//!
//!     foreman::server::run(config, Some(db), router.into_handle()).await
//! }
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod coordinator;
pub mod db;
pub mod error;
pub mod guard;
pub mod module;
pub mod openapi;
pub mod operation;
pub mod principal;
pub mod procedure;
pub mod rate_limit;
pub mod render;
pub mod report;
pub mod response;
pub mod role;
pub mod router;
pub mod server;
pub mod session;
pub mod store;

// Re-export main types at crate root
pub use config::{Config, ConfigLoader, SharedConfig};
pub use coordinator::Coordinator;
pub use db::Handle as DbHandle;
pub use error::{Error, Result};
pub use guard::{Access, Decision, authorize};
pub use module::Module;
pub use openapi::Info;
pub use principal::Principal;
pub use procedure::{Empty, Meta, Procedure};
pub use render::{BasicPdfRenderer, RenderError, ReportRenderer};
pub use report::{ReportArtifact, ReportKind, ReportSpec, ReportStatus, Target};
pub use role::Role;
pub use router::{Context, Router};
pub use session::{Credentials, IdentityVerifier, Session};
pub use store::ArtifactStore;

// Re-export commonly used dependencies for convenience
pub use hyper::Method;
pub use serde_json::json;
