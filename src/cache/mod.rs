//! Process-wide introspection cache
//!
//! Maps a transport uri to the procedure names it advertises. Only successful
//! introspections are stored, and stored entries are never refreshed. Failed
//! attempts leave nothing behind, so the next resolution asks again.
//!
//! First-time resolutions for the same uri are not coalesced: every caller
//! that misses runs its own `introspect()` and the first success is kept.

mod stats;

pub use stats::CacheStats;

use crate::error::RpcError;
use crate::normalize;
use crate::result::CallResult;
use crate::transport::Transport;
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, OnceLock, RwLock};
use tracing::{debug, info, warn};

/// Advertised procedure names
pub type ProcedureSet = Arc<BTreeSet<String>>;

/// Why a uri could not be resolved to a procedure listing
#[derive(Debug)]
pub enum IntrospectionFailure {
    /// The transport rejected or answered `success: false`
    Failed {
        uri: String,
        error: anyhow::Error,
    },
    /// The `procedures` listing was unparseable or not a mapping
    Malformed {
        uri: String,
        error: Option<anyhow::Error>,
    },
}

impl IntrospectionFailure {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Failed { .. } => crate::error::INTROSPECTION_FAILED,
            Self::Malformed { .. } => crate::error::MALFORMED_INTROSPECTION,
        }
    }

    pub fn uri(&self) -> &str {
        match self {
            Self::Failed { uri, .. } | Self::Malformed { uri, .. } => uri,
        }
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::Malformed { .. })
    }

    /// Normalized failure result
    pub fn into_result(self) -> CallResult {
        match self {
            Self::Failed { uri, error } => normalize::introspection_failed(&uri, error),
            Self::Malformed { uri, error } => normalize::malformed_introspection(&uri, error),
        }
    }

    /// Underlying error, for callers that opted out of normalization
    pub fn into_error(self) -> anyhow::Error {
        match self {
            Self::Failed { error, .. } => error,
            Self::Malformed { uri, error } => error.unwrap_or_else(|| {
                anyhow::Error::new(RpcError::new(format!(
                    "Malformed introspection from {}",
                    uri
                )))
            }),
        }
    }
}

pub struct IntrospectionCache {
    entries: RwLock<HashMap<String, ProcedureSet>>,
    stats: RwLock<CacheStats>,
}

impl IntrospectionCache {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            stats: RwLock::new(CacheStats::new()),
        }
    }

    /// The cache shared by every client that is not given its own
    pub fn shared() -> Arc<IntrospectionCache> {
        static SHARED: OnceLock<Arc<IntrospectionCache>> = OnceLock::new();
        SHARED
            .get_or_init(|| Arc::new(IntrospectionCache::new()))
            .clone()
    }

    /// Cached listing for a uri, without contacting anything
    pub fn get(&self, uri: &str) -> Option<ProcedureSet> {
        self.entries
            .read()
            .ok()
            .and_then(|entries| entries.get(uri).cloned())
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry and reset statistics. Meant for test isolation.
    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.clear();
        }
        if let Ok(mut stats) = self.stats.write() {
            *stats = CacheStats::new();
        }
        debug!("Cleared introspection cache");
    }

    pub fn stats(&self) -> CacheStats {
        let mut stats = self
            .stats
            .read()
            .map(|s| s.clone())
            .unwrap_or_default();
        stats.entries = self.len();
        stats.calculate_hit_rate();
        stats
    }

    /// Advertised procedure names for the transport's uri.
    ///
    /// Serves from the cache when possible, otherwise introspects, parses and
    /// stores the listing.
    pub async fn resolve(
        &self,
        transport: &dyn Transport,
    ) -> Result<ProcedureSet, IntrospectionFailure> {
        let uri = transport.uri();

        if let Some(found) = self.get(uri) {
            debug!("Introspection cache hit: {}", uri);
            self.record(|s| s.hits += 1);
            return Ok(found);
        }

        debug!("Introspection cache miss: {}", uri);
        self.record(|s| s.misses += 1);

        let outcome = match transport.introspect().await {
            Ok(result) if result.success => parse_procedures(uri, &result),
            Ok(result) => Err(IntrospectionFailure::Failed {
                uri: uri.to_string(),
                error: failed_result_error(result),
            }),
            Err(error) => Err(IntrospectionFailure::Failed {
                uri: uri.to_string(),
                error,
            }),
        };

        match outcome {
            Ok(names) => {
                self.record(|s| s.fetches += 1);
                let mut entries = self
                    .entries
                    .write()
                    .unwrap_or_else(|poisoned| poisoned.into_inner());
                let stored = entries
                    .entry(uri.to_string())
                    .or_insert_with(|| Arc::new(names))
                    .clone();
                info!("Cached {} procedure(s) for {}", stored.len(), uri);
                Ok(stored)
            }
            Err(failure) => {
                warn!("Introspection of {} failed: {}", uri, failure.code());
                self.record(|s| s.failures += 1);
                Err(failure)
            }
        }
    }

    fn record(&self, update: impl FnOnce(&mut CacheStats)) {
        if let Ok(mut stats) = self.stats.write() {
            update(&mut stats);
        }
    }
}

impl Default for IntrospectionCache {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for IntrospectionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntrospectionCache")
            .field("entries", &self.len())
            .finish()
    }
}

/// Keep whatever the server said about a `success: false` introspection.
fn failed_result_error(result: CallResult) -> anyhow::Error {
    match result.error {
        Some(shared) => anyhow::anyhow!("{}", shared),
        None => anyhow::Error::new(RpcError {
            message: result.message,
            code: (!result.code.is_empty()).then_some(result.code),
        }),
    }
}

/// Extract the advertised names from a successful introspection result.
///
/// `procedures` is normally a JSON-encoded object (`{"name": "function"}`);
/// an already-decoded object is accepted as well.
fn parse_procedures(uri: &str, result: &CallResult) -> Result<BTreeSet<String>, IntrospectionFailure> {
    let malformed = |error: Option<anyhow::Error>| IntrospectionFailure::Malformed {
        uri: uri.to_string(),
        error,
    };

    let decoded = match result.get("procedures") {
        Some(Value::String(encoded)) => serde_json::from_str::<Value>(encoded)
            .map_err(|e| malformed(Some(anyhow::Error::new(e))))?,
        Some(other) => other.clone(),
        None => return Err(malformed(None)),
    };

    match decoded {
        Value::Object(map) => Ok(map.into_iter().map(|(name, _)| name).collect()),
        _ => Err(malformed(None)),
    }
}
