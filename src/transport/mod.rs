//! Transport contract
//!
//! A transport performs the actual network exchange. The client core only
//! needs:
//! - a stable `uri` (the introspection cache key)
//! - `introspect()` for procedure discovery
//! - `call()` for invocation
//! - optional `before`/`after` hooks wrapped around every call

pub mod http;
pub mod registry;

pub use http::HttpTransport;
pub use registry::{TransportConstructor, TransportRegistry};

use crate::result::CallResult;
use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

/// Transient record passed through the `before`/`after` hooks of one call.
#[derive(Debug, Clone)]
pub struct CallContext {
    pub procedure_name: String,
    pub arg: Value,
    /// Absent for `before`; populated (success or failure) for `after`.
    pub result: Option<CallResult>,
}

impl CallContext {
    pub fn new(procedure_name: impl Into<String>, arg: Value) -> Self {
        Self {
            procedure_name: procedure_name.into(),
            arg,
            result: None,
        }
    }
}

/// Runs before the transport call. `Ok(Some(_))` short-circuits the call.
#[async_trait]
pub trait BeforeHook: Send + Sync {
    async fn before(&self, ctx: &mut CallContext) -> Result<Option<CallResult>>;
}

/// Runs after the transport call (or after a short-circuiting `before`).
/// `Ok(Some(_))` replaces the final result.
#[async_trait]
pub trait AfterHook: Send + Sync {
    async fn after(&self, ctx: &mut CallContext) -> Result<Option<CallResult>>;
}

/// Transport trait - must be implemented by every wire protocol
#[async_trait]
pub trait Transport: Send + Sync {
    /// Destination identifier, used as the introspection cache key
    fn uri(&self) -> &str;

    /// Ask the remote side which procedures exist.
    ///
    /// A successful result carries a `procedures` field holding a JSON-encoded
    /// object whose keys are procedure names.
    async fn introspect(&self) -> Result<CallResult>;

    /// Invoke a remote procedure
    async fn call(&self, procedure: &str, arg: Value) -> Result<CallResult>;

    fn before(&self) -> Option<&dyn BeforeHook> {
        None
    }

    fn after(&self) -> Option<&dyn AfterHook> {
        None
    }
}
