//! Environments
//!
//! An `Env` is a typed view over one environment's TOML config. Every
//! derived property is recomputed from the loaded tree on access; call
//! [`Env::reload`] to pick up edits made on disk since construction.

pub mod server_type;

pub use server_type::ServerType;

use crate::config::{ConfigCache, ConfigKind, ConfigNode, LoadedConfig, Mapping};
use crate::paths::ServerPaths;
use crate::ErrorCategory;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// The production environment. The only hard-coded one.
pub const PRODUCTION_ENV: &str = "env1";

/// Directory names under an env that are not world groups
pub const WORLD_GROUP_BLOCKLIST: &[&str] = &["defaultconfigs"];

static ENV_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^env(\d+)$").expect("env name pattern compiles"));

#[derive(Error, Debug)]
pub enum EnvError {
    #[error("Invalid environment name: '{0}' (expected env<N>)")]
    InvalidName(String),
    #[error("Failed to list environments in '{path}': {source}")]
    Listing {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl EnvError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            EnvError::InvalidName(_) => ErrorCategory::InvalidIdentity,
            EnvError::Listing { .. } => ErrorCategory::Io,
        }
    }
}

/// Typed view of the `general` table
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GeneralSettings {
    pub hostname: String,
    pub description: String,
    pub enable_env_protection: bool,
}

impl GeneralSettings {
    fn from_node(general: &ConfigNode) -> Self {
        Self {
            hostname: general.get_str_or("hostname", ""),
            description: general.get_str_or("description", ""),
            enable_env_protection: general.get_bool("enable_env_protection").unwrap_or(false),
        }
    }
}

/// Serializable snapshot of an environment's derived properties
#[derive(Debug, Clone, Serialize)]
pub struct EnvSummary {
    pub name: String,
    pub formatted: String,
    pub hostname: String,
    pub description: String,
    pub alias: String,
    pub server_type: String,
    pub proxy_port: String,
    pub world_groups: Vec<String>,
    pub enable_env_protection: bool,
    pub is_production: bool,
    pub load_error: Option<String>,
    pub config: Mapping,
}

#[derive(Debug, Clone)]
pub struct Env {
    name: String,
    num: String,
    config: Arc<LoadedConfig>,
    load_error: Option<String>,
}

impl Env {
    /// Validate `name`, then load its TOML config, bypassing the cache.
    ///
    /// A missing or unparseable config leaves the env with an empty
    /// configuration; the failure is kept in [`Env::load_error`].
    pub fn load(name: &str, paths: &ServerPaths, cache: &mut ConfigCache) -> Result<Self, EnvError> {
        let num = Self::parse_num(name).ok_or_else(|| EnvError::InvalidName(name.to_string()))?;

        info!(env = name, "Instantiating environment");

        let mut env = Self {
            name: name.to_string(),
            num,
            config: Arc::new(LoadedConfig::empty(
                ConfigKind::Toml,
                paths.env_toml_config_path(name),
            )),
            load_error: None,
        };
        env.reload(paths, cache);
        Ok(env)
    }

    /// Build an env around an already loaded config.
    pub fn from_config(name: &str, config: Arc<LoadedConfig>) -> Result<Self, EnvError> {
        let num = Self::parse_num(name).ok_or_else(|| EnvError::InvalidName(name.to_string()))?;

        Ok(Self {
            name: name.to_string(),
            num,
            config,
            load_error: None,
        })
    }

    /// Re-read the backing TOML from disk.
    pub fn reload(&mut self, paths: &ServerPaths, cache: &mut ConfigCache) {
        let path = paths.env_toml_config_path(&self.name);
        let requested = path.to_string_lossy();

        match cache.load_strict(ConfigKind::Toml, &requested, Path::new("."), true) {
            Ok(config) => {
                self.config = config;
                self.load_error = None;
            }
            Err(e) => {
                warn!(
                    env = %self.name,
                    path = %path.display(),
                    error = %e,
                    "Failed to load environment config, using an empty configuration"
                );
                self.config = Arc::new(LoadedConfig::empty(ConfigKind::Toml, path));
                self.load_error = Some(e.to_string());
            }
        }
    }

    /// Full match of `env<digits>`; no I/O.
    pub fn is_valid(name: &str) -> bool {
        ENV_NAME_RE.is_match(name)
    }

    /// Whether `name` is valid and has a config file on disk.
    pub fn exists(name: &str, paths: &ServerPaths) -> bool {
        Self::is_valid(name) && paths.env_toml_config_path(name).is_file()
    }

    /// Every `env<N>.toml` in the env config directory, sorted.
    pub fn list_all(paths: &ServerPaths, cache: &mut ConfigCache) -> Result<Vec<Env>, EnvError> {
        let dir = paths.env_toml_config_dir();
        let entries = fs::read_dir(&dir).map_err(|source| EnvError::Listing {
            path: dir.clone(),
            source,
        })?;

        let mut envs = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| EnvError::Listing {
                path: dir.clone(),
                source,
            })?;
            let path = entry.path();

            if path.extension().and_then(|e| e.to_str()) != Some("toml") {
                continue;
            }

            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };

            if Self::is_valid(stem) {
                envs.push(Self::load(stem, paths, cache)?);
            } else {
                debug!(file = %path.display(), "Skipping non-environment toml");
            }
        }

        envs.sort();
        Ok(envs)
    }

    /// The digits after `env`, kept as text so any length is accepted.
    fn parse_num(name: &str) -> Option<String> {
        ENV_NAME_RE
            .captures(name)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn num(&self) -> &str {
        &self.num
    }

    pub fn config(&self) -> &LoadedConfig {
        &self.config
    }

    pub fn config_as_mapping(&self) -> Mapping {
        self.config.as_mapping()
    }

    pub fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }

    pub fn general(&self) -> GeneralSettings {
        GeneralSettings::from_node(&self.config.node("general"))
    }

    pub fn hostname(&self) -> String {
        self.general().hostname
    }

    pub fn description(&self) -> String {
        self.general().description
    }

    pub fn enable_env_protection(&self) -> bool {
        self.general().enable_env_protection
    }

    /// `cluster-variables`, or the older `runtime-environment-variables`
    pub fn cluster_vars(&self) -> ConfigNode {
        self.config
            .get_node("cluster-variables")
            .or_else(|| self.config.get_node("runtime-environment-variables"))
            .cloned()
            .unwrap_or_default()
    }

    /// A cluster variable rendered as a string, `""` when absent.
    pub fn cluster_var(&self, key: &str) -> String {
        self.cluster_vars()
            .get_opt(key)
            .filter(|v| !v.is_null())
            .map(|v| v.to_string())
            .unwrap_or_default()
    }

    pub fn alias(&self) -> String {
        self.cluster_var("ENV_ALIAS")
    }

    pub fn proxy_port(&self) -> String {
        self.cluster_var("VELOCITY_PORT")
    }

    pub fn server_type(&self) -> String {
        self.cluster_var("MC_TYPE")
    }

    pub fn known_server_type(&self) -> Option<ServerType> {
        ServerType::from_str(&self.server_type()).ok()
    }

    pub fn mc_version(&self) -> String {
        self.cluster_var("MC_VERSION")
    }

    /// Enabled world groups minus internal pseudo-groups
    pub fn world_groups(&self) -> Vec<String> {
        self.config
            .node("world-groups")
            .get_str_list("enabled_groups")
            .into_iter()
            .filter(|group| !WORLD_GROUP_BLOCKLIST.contains(&group.as_str()))
            .collect()
    }

    pub fn formatted(&self) -> String {
        format!("Env {} - {}", self.num, capitalize(&self.alias()))
    }

    /// True only for `env1`. `enable_env_protection` is a separate flag.
    pub fn is_production(&self) -> bool {
        self.name == PRODUCTION_ENV
    }

    pub fn summary(&self) -> EnvSummary {
        let general = self.general();

        EnvSummary {
            name: self.name.clone(),
            formatted: self.formatted(),
            hostname: general.hostname,
            description: general.description,
            alias: self.alias(),
            server_type: self.server_type(),
            proxy_port: self.proxy_port(),
            world_groups: self.world_groups(),
            enable_env_protection: general.enable_env_protection,
            is_production: self.is_production(),
            load_error: self.load_error.clone(),
            config: self.config_as_mapping(),
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

impl PartialEq for Env {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Env {}

impl Ord for Env {
    fn cmp(&self, other: &Self) -> Ordering {
        if self.name == other.name {
            return Ordering::Equal;
        }
        if self.name == PRODUCTION_ENV {
            return Ordering::Less;
        }
        if other.name == PRODUCTION_ENV {
            return Ordering::Greater;
        }
        self.name.cmp(&other.name)
    }
}

impl PartialOrd for Env {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
