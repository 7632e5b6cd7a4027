//! Client configuration
//!
//! `ClientConfig` is an immutable preset: every `with_*` call and every
//! `apply` produces a new value, so presets can be derived from one another
//! without affecting clients already built from them.

use crate::cache::IntrospectionCache;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Default config directory relative to home directory
pub const DEFAULT_CONFIG_DIR: &str = ".allclient";

/// Default config file name
pub const CONFIG_FILE: &str = "config.toml";

/// Environment variable overriding the config file location
pub const CONFIG_ENV: &str = "ALLCLIENT_CONFIG";

/// Maps a remote procedure name to the local name it is bound under.
/// `None` (or an empty name) keeps the procedure unbound.
pub type NameMapper = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

pub fn identity_mapper() -> NameMapper {
    Arc::new(|name: &str| Some(name.to_string()))
}

#[derive(Clone)]
pub struct ClientConfig {
    /// Report failures as results instead of errors
    pub never_throw: bool,

    /// Allow calling procedures that were never bound explicitly
    pub dynamic_methods: bool,

    /// Introspect before binding an unknown procedure
    pub auto_introspect: bool,

    pub name_mapper: NameMapper,

    /// Introspection cache the client reads and fills
    pub cache: Arc<IntrospectionCache>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            never_throw: true,
            dynamic_methods: true,
            auto_introspect: true,
            name_mapper: identity_mapper(),
            cache: IntrospectionCache::shared(),
        }
    }
}

impl ClientConfig {
    /// Create configuration from options
    pub fn from_options(options: ClientOptions) -> Self {
        Self::default().apply(options)
    }

    /// Derive a new preset with the given overrides
    pub fn apply(&self, options: ClientOptions) -> Self {
        let mut config = self.clone();

        if let Some(never_throw) = options.never_throw {
            config.never_throw = never_throw;
        }

        if let Some(dynamic_methods) = options.dynamic_methods {
            config.dynamic_methods = dynamic_methods;
        }

        if let Some(auto_introspect) = options.auto_introspect {
            config.auto_introspect = auto_introspect;
        }

        if let Some(name_mapper) = options.name_mapper {
            config.name_mapper = name_mapper;
        }

        if let Some(cache) = options.cache {
            config.cache = cache;
        }

        config
    }

    pub fn with_never_throw(&self, never_throw: bool) -> Self {
        self.apply(ClientOptions::new().with_never_throw(never_throw))
    }

    pub fn with_dynamic_methods(&self, dynamic_methods: bool) -> Self {
        self.apply(ClientOptions::new().with_dynamic_methods(dynamic_methods))
    }

    pub fn with_auto_introspect(&self, auto_introspect: bool) -> Self {
        self.apply(ClientOptions::new().with_auto_introspect(auto_introspect))
    }

    pub fn with_name_mapper<F>(&self, mapper: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.apply(ClientOptions::new().with_name_mapper(mapper))
    }

    pub fn with_cache(&self, cache: Arc<IntrospectionCache>) -> Self {
        self.apply(ClientOptions::new().with_cache(cache))
    }

    /// Local name for a remote procedure, if it should be bound at all
    pub fn map_name(&self, remote: &str) -> Option<String> {
        (self.name_mapper)(remote).filter(|local| !local.is_empty())
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("never_throw", &self.never_throw)
            .field("dynamic_methods", &self.dynamic_methods)
            .field("auto_introspect", &self.auto_introspect)
            .finish_non_exhaustive()
    }
}

/// Overrides applied on top of a configuration
///
/// These come from the config file, CLI flags or `ClientFactory::defaults`.
#[derive(Clone, Default)]
pub struct ClientOptions {
    pub never_throw: Option<bool>,
    pub dynamic_methods: Option<bool>,
    pub auto_introspect: Option<bool>,
    pub name_mapper: Option<NameMapper>,
    pub cache: Option<Arc<IntrospectionCache>>,
}

impl ClientOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_never_throw(mut self, never_throw: bool) -> Self {
        self.never_throw = Some(never_throw);
        self
    }

    pub fn with_dynamic_methods(mut self, dynamic_methods: bool) -> Self {
        self.dynamic_methods = Some(dynamic_methods);
        self
    }

    pub fn with_auto_introspect(mut self, auto_introspect: bool) -> Self {
        self.auto_introspect = Some(auto_introspect);
        self
    }

    pub fn with_name_mapper<F>(mut self, mapper: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.name_mapper = Some(Arc::new(mapper));
        self
    }

    pub fn with_cache(mut self, cache: Arc<IntrospectionCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Layer `other` on top of `self`; values set in `other` win.
    pub fn merge(self, other: ClientOptions) -> Self {
        Self {
            never_throw: other.never_throw.or(self.never_throw),
            dynamic_methods: other.dynamic_methods.or(self.dynamic_methods),
            auto_introspect: other.auto_introspect.or(self.auto_introspect),
            name_mapper: other.name_mapper.or(self.name_mapper),
            cache: other.cache.or(self.cache),
        }
    }

    /// Read the `[client]` table of a TOML config file.
    ///
    /// A missing file or missing table yields empty options.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let file: ConfigFile = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        Ok(file.client.map(Into::into).unwrap_or_default())
    }

    /// Load from `$ALLCLIENT_CONFIG` or `~/.allclient/config.toml`
    pub fn load_default() -> Result<Self> {
        Self::load_from_file(&default_config_path())
    }
}

impl std::fmt::Debug for ClientOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientOptions")
            .field("never_throw", &self.never_throw)
            .field("dynamic_methods", &self.dynamic_methods)
            .field("auto_introspect", &self.auto_introspect)
            .field("name_mapper", &self.name_mapper.is_some())
            .field("cache", &self.cache.is_some())
            .finish()
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    client: Option<ClientSection>,
}

#[derive(Debug, Default, Deserialize)]
struct ClientSection {
    never_throw: Option<bool>,
    dynamic_methods: Option<bool>,
    auto_introspect: Option<bool>,
}

impl From<ClientSection> for ClientOptions {
    fn from(section: ClientSection) -> Self {
        Self {
            never_throw: section.never_throw,
            dynamic_methods: section.dynamic_methods,
            auto_introspect: section.auto_introspect,
            ..Self::default()
        }
    }
}

pub fn default_config_path() -> PathBuf {
    if let Some(path) = std::env::var_os(CONFIG_ENV) {
        return PathBuf::from(path);
    }

    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DEFAULT_CONFIG_DIR)
        .join(CONFIG_FILE)
}
