//! Allclient - transport-agnostic RPC client core
//!
//! Remote procedures are called by name. Unknown names are resolved through
//! an introspection handshake, every call runs through `before`/`after`
//! hooks, and every outcome is reported as a uniform [`CallResult`].

pub mod cache;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod normalize;
pub mod pipeline;
pub mod result;
pub mod transport;

pub use cache::{CacheStats, IntrospectionCache, IntrospectionFailure};
pub use client::{Client, ClientBuilder, ClientFactory};
pub use config::{ClientConfig, ClientOptions, NameMapper};
pub use error::{ClientError, Result, RpcError};
pub use pipeline::CallPipeline;
pub use result::CallResult;
pub use transport::{AfterHook, BeforeHook, CallContext, Transport, TransportRegistry};

/// Allclient version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
