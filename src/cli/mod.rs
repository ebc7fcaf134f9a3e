//! Command-line interface for clustenv
//!
//! Thin front-end over the library: list and inspect environments, run the
//! provisioning routine for one, and dump any supported config file.

use crate::config::{get_path, ConfigCache, ConfigKind, Value};
use crate::environment::Env;
use crate::paths::ServerPaths;
use crate::provision::{HttpRegistry, ProvisionAction, ProvisionSettings, Provisioner};
use crate::{ClustenvError, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::{debug, info};

/// clustenv command-line interface
#[derive(Parser)]
#[command(name = "clustenv")]
#[command(about = "Manage the environments of a multi-environment server cluster")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct ClustenvCli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Enable JSON output for machine-readable results
    #[arg(long, global = true)]
    pub json: bool,

    /// Repository root holding env tomls, templates and secrets
    #[arg(long, global = true)]
    pub repo_root: Option<PathBuf>,

    /// Root of the per-environment server data
    #[arg(long, global = true)]
    pub data_root: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

impl ClustenvCli {
    /// Paths from the environment, overridden by command-line flags
    pub fn server_paths(&self) -> ServerPaths {
        let mut paths = ServerPaths::from_env();
        if let Some(repo_root) = &self.repo_root {
            paths.repo_root = repo_root.clone();
        }
        if let Some(data_root) = &self.data_root {
            paths.data_root = data_root.clone();
        }
        paths
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Environment commands
    Env(EnvCommands),

    /// Config file commands
    Config(ConfigCommands),
}

#[derive(Args)]
pub struct EnvCommands {
    #[command(subcommand)]
    pub action: EnvActions,
}

#[derive(Subcommand)]
pub enum EnvActions {
    /// List all environments
    List,

    /// Show an environment's derived properties
    Show {
        /// Environment name (env<N>)
        name: String,
    },

    /// Run the one-time provisioning routine for an environment
    Provision {
        /// Environment name (env<N>)
        name: String,

        /// Proxy mod release line to install instead of the env's MC_VERSION
        #[arg(long)]
        mod_version: Option<String>,
    },
}

#[derive(Args)]
pub struct ConfigCommands {
    #[command(subcommand)]
    pub action: ConfigActions,
}

#[derive(Subcommand)]
pub enum ConfigActions {
    /// Print a YAML, TOML or ENV file
    Show {
        /// File to load
        file: PathBuf,

        /// Format, guessed from the extension when omitted
        #[arg(short, long)]
        format: Option<ConfigKind>,

        /// Dotted path of a single value (e.g. proxies.velocity.enabled)
        #[arg(short, long)]
        key: Option<String>,
    },
}

/// CLI command executor
pub struct ClustenvCliExecutor {
    paths: ServerPaths,
    settings: ProvisionSettings,
    cache: ConfigCache,
    json_output: bool,
}

impl ClustenvCliExecutor {
    pub fn new(paths: ServerPaths, settings: ProvisionSettings, json_output: bool) -> Self {
        Self {
            paths,
            settings,
            cache: ConfigCache::new(),
            json_output,
        }
    }

    pub fn execute(&mut self, command: Commands) -> Result<()> {
        match command {
            Commands::Env(env_cmd) => self.execute_env_command(env_cmd),
            Commands::Config(config_cmd) => self.execute_config_command(config_cmd),
        }
    }

    fn execute_env_command(&mut self, cmd: EnvCommands) -> Result<()> {
        match cmd.action {
            EnvActions::List => {
                let envs = Env::list_all(&self.paths, &mut self.cache)?;

                if self.json_output {
                    let summaries: Vec<_> = envs.iter().map(Env::summary).collect();
                    println!("{}", serde_json::to_string_pretty(&summaries)?);
                } else if envs.is_empty() {
                    println!(
                        "No environments found in {}",
                        self.paths.env_toml_config_dir().display()
                    );
                } else {
                    println!("Environments:");
                    for env in envs {
                        println!(
                            "  {:<6} {:<24} {:<8} {}{}",
                            env.name(),
                            env.formatted(),
                            env.server_type(),
                            env.hostname(),
                            if env.is_production() { "  [production]" } else { "" }
                        );
                    }
                }
            }
            EnvActions::Show { name } => {
                let env = self.load_existing(&name)?;

                if self.json_output {
                    println!("{}", serde_json::to_string_pretty(&env.summary())?);
                } else {
                    print_env(&env);
                }
            }
            EnvActions::Provision { name, mod_version } => {
                let env = self.load_existing(&name)?;
                if let Some(reason) = env.load_error() {
                    return Err(ClustenvError::EnvUnavailable {
                        env: name,
                        reason: reason.to_string(),
                    }
                    .into());
                }

                let mut settings = self.settings.clone();
                if mod_version.is_some() {
                    settings.proxy_mod_version = mod_version;
                }

                let registry = HttpRegistry::new(settings.registry_url.clone())?;
                let provisioner = Provisioner::new(self.paths.clone(), settings, registry);

                let report = provisioner
                    .perform_only_once_actions(&env, &mut self.cache)
                    .map_err(|e| ClustenvError::ProvisioningFailed {
                        env: name.clone(),
                        reason: e.to_string(),
                    })?;
                info!(env = %name, downloads = report.downloads(), "Provisioning finished");

                if self.json_output {
                    println!("{}", serde_json::to_string_pretty(&report)?);
                } else {
                    println!("Provisioned {}:", env.formatted());
                    for action in &report.actions {
                        println!("  {}", describe_action(action));
                    }
                }
            }
        }

        Ok(())
    }

    fn execute_config_command(&mut self, cmd: ConfigCommands) -> Result<()> {
        match cmd.action {
            ConfigActions::Show { file, format, key } => {
                let kind = format
                    .or_else(|| ConfigKind::from_path(&file))
                    .ok_or_else(|| {
                        ClustenvError::ConfigurationError(format!(
                            "Cannot tell the format of {}; pass --format",
                            file.display()
                        ))
                    })?;
                debug!(file = %file.display(), format = %kind, "Showing config");

                let config = self.cache.load_path(kind, &file, true)?;
                let mapping = config.as_mapping();

                let value = match &key {
                    Some(key) => {
                        let segments: Vec<&str> = key.split('.').collect();
                        get_path(&mapping, &segments).cloned().ok_or_else(|| {
                            ClustenvError::ConfigurationError(format!(
                                "{} has no value at '{}'",
                                file.display(),
                                key
                            ))
                        })?
                    }
                    None => Value::Mapping(mapping),
                };

                if self.json_output {
                    println!("{}", serde_json::to_string_pretty(&value)?);
                } else {
                    match value {
                        Value::Mapping(_) if key.is_none() => print!("{}", config.tree()),
                        other => println!("{}", other),
                    }
                }
            }
        }

        Ok(())
    }

    fn load_existing(&mut self, name: &str) -> Result<Env> {
        if !Env::exists(name, &self.paths) {
            return Err(ClustenvError::EnvNotFound(name.to_string()).into());
        }
        Ok(Env::load(name, &self.paths, &mut self.cache)?)
    }
}

fn print_env(env: &Env) {
    let general = env.general();

    println!("{}", env.formatted());
    println!("  Name:            {}", env.name());
    println!("  Hostname:        {}", general.hostname);
    println!("  Description:     {}", general.description);
    println!("  Server type:     {}", env.server_type());
    println!("  MC version:      {}", env.mc_version());
    println!("  Proxy port:      {}", env.proxy_port());
    println!("  World groups:    {}", env.world_groups().join(", "));
    println!("  Env protection:  {}", general.enable_env_protection);
    println!("  Production:      {}", env.is_production());
    if let Some(error) = env.load_error() {
        println!("  Load error:      {}", error);
    }
}

fn describe_action(action: &ProvisionAction) -> String {
    match action {
        ProvisionAction::Wrote { path } => format!("wrote {}", path.display()),
        ProvisionAction::Skipped { path, reason } => {
            format!("skipped {} ({})", path.display(), reason)
        }
        ProvisionAction::Downloaded { path, version } => {
            format!("downloaded {} ({})", path.display(), version)
        }
        ProvisionAction::Replaced {
            removed,
            path,
            version,
        } => format!(
            "replaced {} with {} ({})",
            display_paths(removed),
            path.display(),
            version
        ),
        ProvisionAction::UpToDate { path, version } => {
            format!("up to date: {} ({})", path.display(), version)
        }
        ProvisionAction::Deduplicated {
            path,
            removed,
            version,
        } => format!(
            "kept {} ({}), removed duplicates {}",
            path.display(),
            version,
            display_paths(removed)
        ),
        ProvisionAction::NoOp { reason } => reason.clone(),
    }
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
