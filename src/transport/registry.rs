//! Scheme registry mapping uri schemes to transport constructors

use super::{HttpTransport, Transport};
use crate::error::{ClientError, Result};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;
use url::Url;

/// Builds a transport for a uri whose scheme was registered
pub type TransportConstructor =
    Arc<dyn Fn(&str) -> anyhow::Result<Arc<dyn Transport>> + Send + Sync>;

/// Scheme registry. Cloning is cheap; registering returns an extended copy.
#[derive(Clone)]
pub struct TransportRegistry {
    constructors: BTreeMap<String, TransportConstructor>,
}

impl TransportRegistry {
    /// A registry with no schemes at all
    pub fn empty() -> Self {
        Self {
            constructors: BTreeMap::new(),
        }
    }

    /// Register (or replace) the constructor for a scheme
    pub fn register<F>(mut self, scheme: &str, constructor: F) -> Self
    where
        F: Fn(&str) -> anyhow::Result<Arc<dyn Transport>> + Send + Sync + 'static,
    {
        self.constructors
            .insert(scheme.to_ascii_lowercase(), Arc::new(constructor));
        self
    }

    pub fn supports(&self, scheme: &str) -> bool {
        self.constructors.contains_key(&scheme.to_ascii_lowercase())
    }

    pub fn schemes(&self) -> Vec<&str> {
        self.constructors.keys().map(String::as_str).collect()
    }

    /// Build the transport for `uri`, failing on unknown schemes
    pub fn resolve(&self, uri: &str) -> Result<Arc<dyn Transport>> {
        let parsed = Url::parse(uri).map_err(|e| ClientError::InvalidUri(format!("{uri}: {e}")))?;
        let scheme = parsed.scheme();

        let constructor = self
            .constructors
            .get(scheme)
            .ok_or_else(|| ClientError::UnsupportedScheme(scheme.to_string()))?;

        debug!("Building {} transport for {}", scheme, uri);
        constructor(uri).map_err(|e| ClientError::InvalidUri(format!("{uri}: {e}")))
    }
}

impl Default for TransportRegistry {
    fn default() -> Self {
        let http = |uri: &str| -> anyhow::Result<Arc<dyn Transport>> {
            Ok(Arc::new(HttpTransport::new(uri)?))
        };
        Self::empty().register("http", http).register("https", http)
    }
}

impl std::fmt::Debug for TransportRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportRegistry")
            .field("schemes", &self.schemes())
            .finish()
    }
}
