//! clustenv - multi-environment server cluster manager
//!
//! Each environment (`env1`, `env2`, ...) is a sandboxed server stack with its
//! own TOML configuration, data directories and installed plugins/mods. This
//! crate reads those configurations uniformly across YAML, TOML and ENV files,
//! derives typed views of every environment, and provisions an environment's
//! default config files and proxy mod against a remote package registry.

pub mod cli;
pub mod config;
pub mod environment;
pub mod logging;
pub mod paths;
pub mod provision;

pub use config::{ConfigCache, ConfigNode, ConfigValue};
pub use environment::{Env, ServerType};
pub use paths::ServerPaths;
pub use provision::{ProvisionSettings, Provisioner};

/// Result type alias for clustenv operations
pub type Result<T> = anyhow::Result<T>;

/// Which kind of failure an error represents, independent of the subsystem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Config file, jar descriptor, template or secret missing
    NotFound,
    /// Unparseable config content or a registry response missing fields
    MalformedInput,
    /// Bad environment name or plugin/mod definition
    InvalidIdentity,
    /// Network request failed
    Transport,
    Io,
}

/// Error types surfaced at the command-line boundary
#[derive(thiserror::Error, Debug)]
pub enum ClustenvError {
    #[error("Environment not found: {0}")]
    EnvNotFound(String),

    #[error("Environment {env} failed to load: {reason}")]
    EnvUnavailable { env: String, reason: String },

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Provisioning of {env} failed: {reason}")]
    ProvisioningFailed { env: String, reason: String },
}
