//! Client facade and procedure resolution
//!
//! Every call goes through [`Client::call`], which looks the name up in the
//! table of bound procedures and, when it is unknown, resolves it through the
//! introspection cache before running the call pipeline.

use crate::cache::ProcedureSet;
use crate::config::{ClientConfig, ClientOptions};
use crate::error::{ClientError, Result};
use crate::pipeline::CallPipeline;
use crate::result::CallResult;
use crate::transport::{Transport, TransportRegistry};
use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, RwLock};
use tracing::{debug, info, warn};

/// Handler of an explicitly defined client method
pub type LocalHandler = Arc<dyn Fn(Value) -> BoxFuture<'static, Result<CallResult>> + Send + Sync>;

#[derive(Clone)]
enum Procedure {
    /// Bound from introspection; holds the remote procedure name
    Remote(String),
    /// Defined by the user; never replaced by introspection
    Local(LocalHandler),
}

pub struct Client {
    config: ClientConfig,
    pipeline: CallPipeline,
    procedures: RwLock<HashMap<String, Procedure>>,
}

impl Client {
    pub fn new(transport: Arc<dyn Transport>, config: ClientConfig) -> Self {
        Self {
            pipeline: CallPipeline::new(transport, config.never_throw),
            config,
            procedures: RwLock::new(HashMap::new()),
        }
    }

    /// Build a client for `uri` using the transport registered for its scheme
    pub fn connect(uri: &str, config: ClientConfig, registry: &TransportRegistry) -> Result<Self> {
        let transport = registry.resolve(uri)?;
        Ok(Self::new(transport, config))
    }

    pub fn uri(&self) -> &str {
        self.pipeline.transport().uri()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        self.pipeline.transport()
    }

    /// Define an explicit method. Introspection never overrides it.
    pub fn define<F, Fut>(&self, name: &str, handler: F)
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<CallResult>> + Send + 'static,
    {
        let handler: LocalHandler = Arc::new(move |arg| handler(arg).boxed());
        self.table_mut()
            .insert(name.to_string(), Procedure::Local(handler));
    }

    /// Whether `name` is bound (explicitly or from introspection)
    pub fn is_bound(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    /// Sorted names of every bound procedure
    pub fn procedures(&self) -> Vec<String> {
        let mut names = self
            .procedures
            .read()
            .map(|table| table.keys().cloned().collect::<Vec<_>>())
            .unwrap_or_default();
        names.sort();
        names
    }

    /// Call a procedure by name, resolving it first when it is not bound.
    pub async fn call(&self, name: &str, arg: Value) -> Result<CallResult> {
        if let Some(procedure) = self.lookup(name) {
            return self.run(procedure, arg).await;
        }

        if !self.config.dynamic_methods {
            return Err(ClientError::ProcedureNotFound(name.to_string()));
        }

        if !self.config.auto_introspect {
            return self.pipeline.invoke(name, arg).await;
        }

        match self.config.cache.resolve(self.transport().as_ref()).await {
            Ok(advertised) => {
                self.bind(&advertised);
                if let Some(procedure) = self.lookup(name) {
                    return self.run(procedure, arg).await;
                }
                // Advertised, but the mapper chose not to expose it.
                if advertised.contains(name) && self.config.map_name(name).is_none() {
                    return Err(ClientError::ProcedureNotFound(name.to_string()));
                }
            }
            Err(failure) if failure.is_malformed() => {
                return if self.config.never_throw {
                    Ok(failure.into_result())
                } else {
                    Err(failure.into_error().into())
                };
            }
            Err(failure) => {
                debug!(
                    "Calling {} without introspection: {}",
                    name,
                    failure.into_result().message
                );
            }
        }

        match self.lookup(name) {
            Some(procedure) => self.run(procedure, arg).await,
            None => self.pipeline.invoke(name, arg).await,
        }
    }

    /// Run the call pipeline directly, bypassing resolution
    pub async fn invoke(&self, procedure: &str, arg: Value) -> Result<CallResult> {
        self.pipeline.invoke(procedure, arg).await
    }

    /// Ask the transport for its procedure listing, uncached.
    pub async fn introspect(&self) -> Result<CallResult> {
        match self.transport().introspect().await {
            Ok(result) => Ok(result),
            Err(error) if self.config.never_throw => {
                warn!("Introspection of {} failed: {}", self.uri(), error);
                Ok(crate::normalize::introspection_failed(self.uri(), error))
            }
            Err(error) => Err(error.into()),
        }
    }

    /// Resolve the advertised procedures through the cache and bind them.
    ///
    /// On success the result carries the advertised names in `procedures`.
    pub async fn discover(&self) -> Result<CallResult> {
        match self.config.cache.resolve(self.transport().as_ref()).await {
            Ok(advertised) => {
                self.bind(&advertised);
                Ok(CallResult::ok("OK", format!("Introspected {}", self.uri()))
                    .with_field("procedures", json!(advertised.iter().collect::<Vec<_>>())))
            }
            Err(failure) if self.config.never_throw => Ok(failure.into_result()),
            Err(failure) => Err(failure.into_error().into()),
        }
    }

    fn bind(&self, advertised: &ProcedureSet) {
        let mut table = self.table_mut();
        for remote in advertised.iter() {
            let Some(local) = self.config.map_name(remote) else {
                debug!("Name mapper excluded {}", remote);
                continue;
            };
            if table.contains_key(&local) {
                continue;
            }
            debug!("Bound {} -> {}", local, remote);
            table.insert(local, Procedure::Remote(remote.clone()));
        }
        info!("{} procedure(s) bound for {}", table.len(), self.uri());
    }

    fn lookup(&self, name: &str) -> Option<Procedure> {
        self.procedures
            .read()
            .ok()
            .and_then(|table| table.get(name).cloned())
    }

    fn table_mut(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, Procedure>> {
        self.procedures
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn run(&self, procedure: Procedure, arg: Value) -> Result<CallResult> {
        match procedure {
            Procedure::Remote(remote) => self.pipeline.invoke(&remote, arg).await,
            Procedure::Local(handler) => handler(arg).await,
        }
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("uri", &self.uri())
            .field("config", &self.config)
            .field("procedures", &self.procedures())
            .finish()
    }
}

/// Preset of configuration plus scheme registry that produces clients
///
/// Deriving a preset with [`ClientFactory::defaults`] never changes the
/// original factory or clients it already produced.
#[derive(Clone, Debug, Default)]
pub struct ClientFactory {
    config: ClientConfig,
    registry: TransportRegistry,
}

impl ClientFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_registry(registry: TransportRegistry) -> Self {
        Self {
            config: ClientConfig::default(),
            registry,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn registry(&self) -> &TransportRegistry {
        &self.registry
    }

    /// A new factory whose default configuration has `options` applied
    pub fn defaults(&self, options: ClientOptions) -> Self {
        Self {
            config: self.config.apply(options),
            registry: self.registry.clone(),
        }
    }

    /// A new factory that also knows `scheme`
    pub fn register_scheme<F>(&self, scheme: &str, constructor: F) -> Self
    where
        F: Fn(&str) -> anyhow::Result<Arc<dyn Transport>> + Send + Sync + 'static,
    {
        Self {
            config: self.config.clone(),
            registry: self.registry.clone().register(scheme, constructor),
        }
    }

    pub fn connect(&self, uri: &str) -> Result<Client> {
        self.builder().uri(uri).build()
    }

    pub fn with_transport(&self, transport: Arc<dyn Transport>) -> Client {
        Client::new(transport, self.config.clone())
    }

    pub fn builder(&self) -> ClientBuilder {
        ClientBuilder {
            config: self.config.clone(),
            registry: self.registry.clone(),
            uri: None,
            transport: None,
            options: ClientOptions::new(),
        }
    }
}

/// Per-client construction: destination plus overrides of the factory preset
pub struct ClientBuilder {
    config: ClientConfig,
    registry: TransportRegistry,
    uri: Option<String>,
    transport: Option<Arc<dyn Transport>>,
    options: ClientOptions,
}

impl ClientBuilder {
    pub fn uri(mut self, uri: &str) -> Self {
        self.uri = Some(uri.to_string());
        self
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn options(mut self, options: ClientOptions) -> Self {
        self.options = self.options.merge(options);
        self
    }

    /// Configuration errors surface here, whatever `never_throw` says.
    pub fn build(self) -> Result<Client> {
        let config = self.config.apply(self.options);

        let transport = match (self.transport, self.uri) {
            (Some(transport), uri) => {
                if let Some(uri) = uri {
                    debug!("Explicit transport takes precedence over uri {}", uri);
                }
                transport
            }
            (None, Some(uri)) => self.registry.resolve(&uri)?,
            (None, None) => return Err(ClientError::MissingDestination),
        };

        Ok(Client::new(transport, config))
    }
}
