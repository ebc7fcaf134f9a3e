//! Loaded configs and the memoizing loader
//!
//! The cache is an explicit object owned by whoever drives a command and
//! passed to the components that load configs. There is no process-global
//! state and no locking; one command runs per process.

use crate::config::finder::{ConfigFinder, FinderError};
use crate::config::format::{ConfigKind, FormatError, WriteOptions};
use crate::config::node::ConfigNode;
use crate::config::value::Mapping;
use crate::ErrorCategory;
use std::collections::HashMap;
use std::fs;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(transparent)]
    NotFound(#[from] FinderError),
    #[error("Failed to {operation} '{path}': {source}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config '{path}': {source}")]
    Format {
        path: PathBuf,
        #[source]
        source: FormatError,
    },
}

impl ConfigError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ConfigError::NotFound(_) => ErrorCategory::NotFound,
            ConfigError::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound => {
                ErrorCategory::NotFound
            }
            ConfigError::Io { .. } => ErrorCategory::Io,
            ConfigError::Format { .. } => ErrorCategory::MalformedInput,
        }
    }
}

/// A config tree tagged with the format and file it came from
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    kind: ConfigKind,
    path: PathBuf,
    node: ConfigNode,
}

impl LoadedConfig {
    pub fn new(kind: ConfigKind, path: PathBuf, mapping: &Mapping) -> Self {
        Self {
            kind,
            path,
            node: ConfigNode::new(mapping),
        }
    }

    /// An empty config of `kind` that was never read from disk
    pub fn empty(kind: ConfigKind, path: PathBuf) -> Self {
        Self {
            kind,
            path,
            node: ConfigNode::empty(),
        }
    }

    pub fn kind(&self) -> ConfigKind {
        self.kind
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The whole tree. Keyed lookups go through `Deref` to [`ConfigNode`].
    pub fn tree(&self) -> &ConfigNode {
        &self.node
    }

    /// Render `mapping` in this config's format.
    pub fn serialize(&self, mapping: &Mapping, options: &WriteOptions) -> Result<String, FormatError> {
        self.kind.adapter().serialize(mapping, options)
    }
}

impl Deref for LoadedConfig {
    type Target = ConfigNode;

    fn deref(&self) -> &Self::Target {
        &self.node
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    kind: ConfigKind,
    requested: PathBuf,
}

/// Memoized config access keyed by format and requested path
#[derive(Debug, Default)]
pub struct ConfigCache {
    finder: ConfigFinder,
    entries: HashMap<CacheKey, Arc<LoadedConfig>>,
}

impl ConfigCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load `name` starting the search at `base_dir`.
    ///
    /// Parse failures are logged and degrade to an empty config. Missing or
    /// unreadable files are returned as errors.
    pub fn load(
        &mut self,
        kind: ConfigKind,
        name: &str,
        base_dir: &Path,
        no_cache: bool,
    ) -> Result<Arc<LoadedConfig>, ConfigError> {
        self.load_with(kind, name, base_dir, no_cache, false)
    }

    /// Like [`ConfigCache::load`], but parse failures are returned too.
    pub fn load_strict(
        &mut self,
        kind: ConfigKind,
        name: &str,
        base_dir: &Path,
        no_cache: bool,
    ) -> Result<Arc<LoadedConfig>, ConfigError> {
        self.load_with(kind, name, base_dir, no_cache, true)
    }

    /// Load a file by path, relative paths resolved from the working directory.
    pub fn load_path(
        &mut self,
        kind: ConfigKind,
        path: &Path,
        no_cache: bool,
    ) -> Result<Arc<LoadedConfig>, ConfigError> {
        let name = path.to_string_lossy();
        self.load(kind, &name, Path::new("."), no_cache)
    }

    pub fn load_yaml(&mut self, path: &Path, no_cache: bool) -> Result<Arc<LoadedConfig>, ConfigError> {
        self.load_path(ConfigKind::Yaml, path, no_cache)
    }

    /// Drop the cached entry for `kind` and the requested location.
    pub fn invalidate(&mut self, kind: ConfigKind, name: &str, base_dir: &Path) -> bool {
        let key = CacheKey {
            kind,
            requested: base_dir.join(name),
        };
        self.entries.remove(&key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn load_with(
        &mut self,
        kind: ConfigKind,
        name: &str,
        base_dir: &Path,
        no_cache: bool,
        strict: bool,
    ) -> Result<Arc<LoadedConfig>, ConfigError> {
        let key = CacheKey {
            kind,
            requested: base_dir.join(name),
        };

        if !no_cache {
            if let Some(cached) = self.entries.get(&key) {
                debug!(format = %kind, path = %cached.path().display(), "Config cache hit");
                return Ok(Arc::clone(cached));
            }
        }

        let path = self.finder.find(name, base_dir).map_err(|e| {
            warn!(format = %kind, name = name, base_dir = %base_dir.display(), error = %e, "Config lookup failed");
            ConfigError::from(e)
        })?;

        let content = fs::read_to_string(&path).map_err(|source| {
            warn!(format = %kind, path = %path.display(), operation = "read", error = %source, "Config read failed");
            ConfigError::Io {
                operation: "read",
                path: path.clone(),
                source,
            }
        })?;

        let adapter = kind.adapter();
        let mapping = if strict {
            adapter.parse(&content).map_err(|source| {
                warn!(format = %kind, path = %path.display(), operation = "parse", error = %source, "Config parse failed");
                ConfigError::Format {
                    path: path.clone(),
                    source,
                }
            })?
        } else {
            adapter.parse_or_empty(&content, &path.to_string_lossy())
        };

        debug!(format = %kind, path = %path.display(), keys = mapping.len(), "Loaded config");

        let loaded = Arc::new(LoadedConfig::new(kind, path, &mapping));
        self.entries.insert(key, Arc::clone(&loaded));
        Ok(loaded)
    }
}
