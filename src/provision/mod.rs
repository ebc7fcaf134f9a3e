//! One-time, idempotent provisioning of an environment
//!
//! ```text
//! Env ─ MC_TYPE ─┬─ PAPER / BUKKIT ─→ paper-global.yml (version gated) → bukkit.yml (if absent)
//!                ├─ FABRIC / FORGE ─→ reconcile proxy mod against the registry
//!                └─ anything else  ─→ no-op
//! ```
//!
//! Running [`Provisioner::perform_only_once_actions`] N times leaves the same
//! files on disk as running it once.

pub mod definition;
pub mod jar;
pub mod registry;

pub use definition::PluginModDefinition;
pub use jar::{find_installed, DescriptorKind, JarError, PluginModInfo};
pub use registry::{
    select_release, HttpRegistry, Registry, RegistryError, RegistryFile, RegistryVersion,
    ResolvedRelease, DEFAULT_REGISTRY_URL,
};

use crate::config::writer::set_mode;
use crate::config::{
    set_path, ConfigCache, ConfigError, ConfigKind, ConfigWriter, FormatAdapter, LoadedConfig,
    Value, YamlFormat,
};
use crate::environment::Env;
use crate::paths::ServerPaths;
use crate::ErrorCategory;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

pub const PAPER_GLOBAL_FILE: &str = "paper-global.yml";

pub const PAPER_GLOBAL_HEADER: &str = "#\n\
# This file is largely unmodified from paper defaults except for proxies.velocity values.\n\
# Particularly, proxies.velocity.secret is set to the value in our velocity secrets file.\n\
#\n\n";

#[derive(Error, Debug)]
pub enum ProvisionError {
    #[error("Invalid plugin/mod definition: {0}")]
    InvalidDefinition(String),
    #[error("No {file} defaults for server version '{version}': {reason}")]
    DefaultsUnavailable {
        file: &'static str,
        version: String,
        reason: String,
    },
    #[error("Forwarding secret '{0}' is missing or empty")]
    MissingSecret(PathBuf),
    #[error("Template '{0}' does not exist")]
    MissingTemplate(PathBuf),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Failed to {operation} '{path}': {source}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ProvisionError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ProvisionError::InvalidDefinition(_) => ErrorCategory::InvalidIdentity,
            ProvisionError::DefaultsUnavailable { .. }
            | ProvisionError::MissingSecret(_)
            | ProvisionError::MissingTemplate(_) => ErrorCategory::NotFound,
            ProvisionError::Registry(e) => e.category(),
            ProvisionError::Config(e) => e.category(),
            ProvisionError::Io { .. } => ErrorCategory::Io,
        }
    }
}

/// Knobs for the provisioning routine
#[derive(Debug, Clone, PartialEq)]
pub struct ProvisionSettings {
    /// Registry project of the proxy-compatibility mod
    pub proxy_mod_project_id: String,
    /// Name the mod declares in its jar descriptor
    pub proxy_mod_name: String,
    /// Pinned mod release line; falls back to the env's `MC_VERSION`
    pub proxy_mod_version: Option<String>,
    /// URL template with `{version}` and `{file}` placeholders
    pub default_configs_url: Option<String>,
    /// Oldest server version that ships `paper-global.yml`
    pub paper_global_min_version: String,
    pub registry_url: String,
}

impl Default for ProvisionSettings {
    fn default() -> Self {
        Self {
            proxy_mod_project_id: "8dI2tmqs".to_string(),
            proxy_mod_name: "FabricProxy-Lite".to_string(),
            proxy_mod_version: None,
            default_configs_url: None,
            paper_global_min_version: "1.19".to_string(),
            registry_url: DEFAULT_REGISTRY_URL.to_string(),
        }
    }
}

impl ProvisionSettings {
    /// Defaults overridden by `CLUSTENV_*` environment variables
    pub fn from_env() -> Self {
        let mut settings = Self::default();

        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());

        if let Some(project) = var("CLUSTENV_PROXY_MOD_PROJECT") {
            settings.proxy_mod_project_id = project;
        }
        if let Some(name) = var("CLUSTENV_PROXY_MOD_NAME") {
            settings.proxy_mod_name = name;
        }
        settings.proxy_mod_version = var("CLUSTENV_PROXY_MOD_VERSION");
        settings.default_configs_url = var("CLUSTENV_DEFAULT_CONFIGS_URL");
        if let Some(min) = var("CLUSTENV_PAPER_GLOBAL_MIN_VERSION") {
            settings.paper_global_min_version = min;
        }
        if let Some(url) = var("CLUSTENV_REGISTRY_URL") {
            settings.registry_url = url;
        }

        settings
    }

    fn default_configs_url_for(&self, version: &str, file: &str) -> Option<String> {
        self.default_configs_url
            .as_ref()
            .map(|template| template.replace("{version}", version).replace("{file}", file))
    }
}

/// One thing provisioning did, or decided not to do
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ProvisionAction {
    Wrote { path: PathBuf },
    Skipped { path: PathBuf, reason: String },
    Downloaded { path: PathBuf, version: String },
    Replaced { removed: Vec<PathBuf>, path: PathBuf, version: String },
    UpToDate { path: PathBuf, version: String },
    /// A current jar was kept and extra copies of the same mod removed
    Deduplicated { path: PathBuf, removed: Vec<PathBuf>, version: String },
    NoOp { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProvisionReport {
    pub env: String,
    pub actions: Vec<ProvisionAction>,
}

impl ProvisionReport {
    /// Count of jars fetched from the registry
    pub fn downloads(&self) -> usize {
        self.actions
            .iter()
            .filter(|a| matches!(a, ProvisionAction::Downloaded { .. } | ProvisionAction::Replaced { .. }))
            .count()
    }
}

pub struct Provisioner<R> {
    paths: ServerPaths,
    settings: ProvisionSettings,
    registry: R,
    writer: ConfigWriter,
}

impl<R: Registry> Provisioner<R> {
    pub fn new(paths: ServerPaths, settings: ProvisionSettings, registry: R) -> Self {
        Self {
            paths,
            settings,
            registry,
            writer: ConfigWriter::default(),
        }
    }

    pub fn paths(&self) -> &ServerPaths {
        &self.paths
    }

    pub fn settings(&self) -> &ProvisionSettings {
        &self.settings
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    /// Server-type specific setup, safe to re-run.
    pub fn perform_only_once_actions(
        &self,
        env: &Env,
        cache: &mut ConfigCache,
    ) -> Result<ProvisionReport, ProvisionError> {
        info!(env = env.name(), server_type = %env.server_type(), "Performing 'only once' server type actions");

        let actions = match env.known_server_type() {
            Some(server_type) if server_type.is_modded() => vec![self.reconcile_proxy_mod(env)?],
            Some(_) => self.write_paper_bukkit_configs(env, cache)?,
            None => {
                let reason = format!("No special actions for server type '{}'", env.server_type());
                info!(env = env.name(), "{}", reason);
                vec![ProvisionAction::NoOp { reason }]
            }
        };

        Ok(ProvisionReport {
            env: env.name().to_string(),
            actions,
        })
    }

    pub fn write_paper_bukkit_configs(
        &self,
        env: &Env,
        cache: &mut ConfigCache,
    ) -> Result<Vec<ProvisionAction>, ProvisionError> {
        info!(env = env.name(), "Writing paper/bukkit configs");

        Ok(vec![
            self.write_default_paper_global_yml(env, cache)?,
            self.write_default_bukkit_yml(env)?,
        ])
    }

    /// Write `paper-global.yml` with the cluster's proxy forwarding settings.
    ///
    /// Content comes from the existing file, then the on-disk template, then
    /// the remote default-configs feed for the env's server version.
    pub fn write_default_paper_global_yml(
        &self,
        env: &Env,
        cache: &mut ConfigCache,
    ) -> Result<ProvisionAction, ProvisionError> {
        let target = self.paths.paper_global_yml_path(env.name(), None);
        let version = env.mc_version();

        if !supports_paper_global(&version, &self.settings.paper_global_min_version) {
            let reason = format!(
                "server version {} predates {} (needs {})",
                version, PAPER_GLOBAL_FILE, self.settings.paper_global_min_version
            );
            info!(env = env.name(), "Skipping {}: {}", PAPER_GLOBAL_FILE, reason);
            return Ok(ProvisionAction::Skipped { path: target, reason });
        }

        let source = self.paper_global_source(&target, &version, cache)?;
        let secret = self.forwarding_secret()?;

        let mut mapping = source.as_mapping();
        set_path(&mut mapping, &["proxies", "velocity", "secret"], Value::String(secret));
        set_path(&mut mapping, &["proxies", "velocity", "enabled"], Value::Boolean(true));
        set_path(&mut mapping, &["proxies", "velocity", "online-mode"], Value::Boolean(false));

        self.writer
            .write(&target, ConfigKind::Yaml, &mapping, PAPER_GLOBAL_HEADER)?;
        Ok(ProvisionAction::Wrote { path: target })
    }

    fn paper_global_source(
        &self,
        target: &Path,
        version: &str,
        cache: &mut ConfigCache,
    ) -> Result<Arc<LoadedConfig>, ProvisionError> {
        if target.is_file() {
            debug!(path = %target.display(), "Reusing existing paper-global.yml");
            return Ok(load_yaml_strict(cache, target)?);
        }

        let template = self.paths.paper_global_template_path();
        if template.is_file() {
            debug!(path = %template.display(), "Using paper-global template");
            return Ok(load_yaml_strict(cache, &template)?);
        }

        let Some(url) = self.settings.default_configs_url_for(version, PAPER_GLOBAL_FILE) else {
            return Err(ProvisionError::DefaultsUnavailable {
                file: PAPER_GLOBAL_FILE,
                version: version.to_string(),
                reason: format!(
                    "template '{}' is missing and no default-configs URL is configured",
                    template.display()
                ),
            });
        };

        let unavailable = |reason: String| ProvisionError::DefaultsUnavailable {
            file: PAPER_GLOBAL_FILE,
            version: version.to_string(),
            reason,
        };

        let text = self
            .registry
            .fetch_text(&url)
            .map_err(|e| unavailable(e.to_string()))?;
        let mapping = YamlFormat
            .parse(&text)
            .map_err(|e| unavailable(format!("{} returned unusable YAML: {}", url, e)))?;
        if mapping.is_empty() {
            return Err(unavailable(format!("{} returned an empty document", url)));
        }

        Ok(Arc::new(LoadedConfig::new(ConfigKind::Yaml, target.to_path_buf(), &mapping)))
    }

    fn forwarding_secret(&self) -> Result<String, ProvisionError> {
        let path = self.paths.forwarding_secret_path();
        let secret = match fs::read_to_string(&path) {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Could not read forwarding secret");
                String::new()
            }
        };

        if secret.is_empty() {
            return Err(ProvisionError::MissingSecret(path));
        }
        Ok(secret)
    }

    /// Copy the bukkit.yml template unless the env already has one.
    pub fn write_default_bukkit_yml(&self, env: &Env) -> Result<ProvisionAction, ProvisionError> {
        let target = self.paths.bukkit_yml_path(env.name(), None);
        if target.exists() {
            debug!(path = %target.display(), "bukkit.yml already present");
            return Ok(ProvisionAction::Skipped {
                path: target,
                reason: "already present".to_string(),
            });
        }

        let template = self.paths.bukkit_template_path();
        if !template.is_file() {
            return Err(ProvisionError::MissingTemplate(template));
        }

        info!(env = env.name(), path = %target.display(), "Writing bukkit.yml to defaultconfigs");

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|source| ProvisionError::Io {
                operation: "create directory",
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::copy(&template, &target).map_err(|source| ProvisionError::Io {
            operation: "copy template to",
            path: target.clone(),
            source,
        })?;
        set_mode(&target, self.writer.file_mode)?;

        Ok(ProvisionAction::Wrote { path: target })
    }

    /// Make the env's default-mods directory hold exactly the desired proxy mod release.
    pub fn reconcile_proxy_mod(&self, env: &Env) -> Result<ProvisionAction, ProvisionError> {
        let desired_version = self
            .settings
            .proxy_mod_version
            .clone()
            .unwrap_or_else(|| env.mc_version());

        let definition = PluginModDefinition::new(
            &self.settings.proxy_mod_project_id,
            &desired_version,
            None,
            Some(env),
        )?;
        let release = self.query_for_mod(&definition)?;

        let mods_dir = self.paths.env_default_mods_path(definition.env_name()?);
        let mut installed = find_installed(&mods_dir, &self.settings.proxy_mod_name);

        if installed.is_empty() {
            info!(env = env.name(), version = %release.version, "Proxy mod not installed, downloading");
            let path = self.download_mod(&release, &mods_dir)?;
            return Ok(ProvisionAction::Downloaded {
                path,
                version: release.version,
            });
        }

        if let Some(pos) = installed
            .iter()
            .position(|(path, info)| is_current(path, info, &release))
        {
            let (path, info) = installed.remove(pos);
            let extra: Vec<PathBuf> = installed.into_iter().map(|(jar, _)| jar).collect();
            if extra.is_empty() {
                debug!(jar = %path.display(), version = info.version(), "Proxy mod up to date");
                return Ok(ProvisionAction::UpToDate {
                    path,
                    version: release.version,
                });
            }

            warn!(env = env.name(), kept = %path.display(), extra = extra.len(), "Removing duplicate proxy mod jars");
            let removed = remove_jars(extra)?;
            return Ok(ProvisionAction::Deduplicated {
                path,
                removed,
                version: release.version,
            });
        }

        info!(
            env = env.name(),
            installed = ?installed.iter().map(|(_, info)| info.version()).collect::<Vec<_>>(),
            desired = %release.version,
            "Replacing stale proxy mod"
        );
        let path = self.download_mod(&release, &mods_dir)?;
        let stale = installed
            .into_iter()
            .map(|(jar, _)| jar)
            .filter(|jar| *jar != path)
            .collect();
        let removed = remove_jars(stale)?;

        Ok(ProvisionAction::Replaced {
            removed,
            path,
            version: release.version,
        })
    }

    /// Resolve the newest release of `definition` from the registry.
    pub fn query_for_mod(&self, definition: &PluginModDefinition) -> Result<ResolvedRelease, ProvisionError> {
        let versions = self.registry.project_versions(
            definition.project_id(),
            definition.game_version(),
            definition.loader(),
        )?;

        Ok(select_release(
            &versions,
            definition.project_id(),
            definition.game_version(),
            definition.loader(),
        )?)
    }

    /// Download `release` into `dir` under its registry file name.
    pub fn download_mod(&self, release: &ResolvedRelease, dir: &Path) -> Result<PathBuf, ProvisionError> {
        fs::create_dir_all(dir).map_err(|source| ProvisionError::Io {
            operation: "create directory",
            path: dir.to_path_buf(),
            source,
        })?;

        let dest = dir.join(&release.filename);
        self.registry.download(&release.url, &dest)?;
        info!(path = %dest.display(), version = %release.version, "Downloaded");
        Ok(dest)
    }
}

fn remove_jars(jars: Vec<PathBuf>) -> Result<Vec<PathBuf>, ProvisionError> {
    for jar in &jars {
        fs::remove_file(jar).map_err(|source| ProvisionError::Io {
            operation: "remove",
            path: jar.clone(),
            source,
        })?;
        debug!(jar = %jar.display(), "Removed jar");
    }
    Ok(jars)
}

/// Installed jar matches by declared version, or by carrying the release's file name.
fn is_current(path: &Path, info: &PluginModInfo, release: &ResolvedRelease) -> bool {
    info.version() == release.version
        || path.file_name().and_then(|n| n.to_str()) == Some(release.filename.as_str())
}

fn load_yaml_strict(cache: &mut ConfigCache, path: &Path) -> Result<Arc<LoadedConfig>, ConfigError> {
    cache.load_strict(ConfigKind::Yaml, &path.to_string_lossy(), Path::new("."), true)
}

/// Numeric components of a version string; `None` when it does not start with a number.
fn version_components(version: &str) -> Option<Vec<u64>> {
    let mut components = Vec::new();
    for part in version.trim().split('.') {
        let digits: String = part.chars().take_while(|c| c.is_ascii_digit()).collect();
        if digits.is_empty() {
            break;
        }
        components.push(digits.parse().ok()?);
    }

    if components.is_empty() {
        None
    } else {
        Some(components)
    }
}

/// Whether `version` ships `paper-global.yml`. Non-numeric versions (LATEST, SNAPSHOT) do.
pub fn supports_paper_global(version: &str, min_version: &str) -> bool {
    let (Some(actual), Some(min)) = (version_components(version), version_components(min_version)) else {
        return true;
    };

    let len = actual.len().max(min.len());
    let pad = |v: &[u64]| {
        let mut v = v.to_vec();
        v.resize(len, 0);
        v
    };

    pad(&actual) >= pad(&min)
}
