//! Procedure abstraction for colocated endpoint definitions.
//!
//! A `Procedure` combines input schema, output schema, metadata (path,
//! method, summary, tag, access requirement), and an async handler into a
//! single value. Registering a procedure on the router wires up the HTTP
//! handler, the server-side access check, and OpenAPI metadata in one call.
//! The access requirement declared in [`Meta`] is immutable after
//! registration.

use std::future::Future;

use hyper::Method;
use schemars::JsonSchema;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::guard::Access;
use crate::router::Context;

/// Endpoint metadata builder.
pub struct Meta {
    pub path: &'static str,
    pub method: Method,
    pub summary: &'static str,
    pub tag: &'static str,
    pub status: u16,
    pub access: Access,
}

impl Meta {
    fn new(method: Method, path: &'static str) -> Self {
        Self {
            path,
            method,
            summary: "",
            tag: "",
            status: 200,
            access: Access::None,
        }
    }

    pub fn get(path: &'static str) -> Self {
        Self::new(Method::GET, path)
    }
    pub fn post(path: &'static str) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn summary(mut self, s: &'static str) -> Self {
        self.summary = s;
        self
    }
    pub fn tag(mut self, t: &'static str) -> Self {
        self.tag = t;
        self
    }
    pub fn status(mut self, s: u16) -> Self {
        self.status = s;
        self
    }
    /// Declare the access requirement enforced before the handler runs.
    pub fn access(mut self, a: Access) -> Self {
        self.access = a;
        self
    }
}

/// Marker type for procedures that take no request body.
///
/// Used as the default `Input` type. Deserializes from any JSON value (or
/// empty body) and produces a null JSON Schema so the OpenAPI generator
/// omits the `requestBody`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Empty;

impl<'de> serde::Deserialize<'de> for Empty {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        // Accept and discard any value
        let _ = serde::de::IgnoredAny::deserialize(deserializer)?;
        Ok(Empty)
    }
}

impl JsonSchema for Empty {
    fn schema_name() -> std::borrow::Cow<'static, str> {
        "Empty".into()
    }

    fn json_schema(_: &mut schemars::SchemaGenerator) -> schemars::Schema {
        schemars::Schema::default()
    }
}

/// A procedure is a self-contained endpoint definition: metadata + access
/// requirement + input + output + handler.
///
/// Procedures are values, so they can hold the shared state (stores,
/// coordinators, collaborators) their handler needs.
pub trait Procedure: Send + Sync + 'static {
    /// Request body type. Use `Empty` for procedures with no request body.
    type Input: DeserializeOwned + JsonSchema + Send + 'static;

    /// Response body type.
    type Output: Serialize + JsonSchema;

    /// Endpoint metadata (path, method, summary, tag, status, access).
    fn meta(&self) -> Meta;

    /// The async handler. Runs only after the declared access requirement
    /// allowed the request.
    fn handle(
        &self,
        ctx: Context,
        input: Self::Input,
    ) -> impl Future<Output = crate::Result<Self::Output>> + Send;
}
