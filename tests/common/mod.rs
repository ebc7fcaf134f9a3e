//! Shared fixtures for the integration tests

#![allow(dead_code)]

use clustenv::ServerPaths;
use std::fs;
use tempfile::TempDir;

/// A throwaway cluster checkout plus data root
pub struct Cluster {
    pub temp_dir: TempDir,
    pub paths: ServerPaths,
}

impl Cluster {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let paths = ServerPaths::new(temp_dir.path().join("repo"), temp_dir.path().join("data"));
        fs::create_dir_all(paths.env_toml_config_dir()).unwrap();
        Self { temp_dir, paths }
    }

    pub fn write_env(&self, name: &str, toml: &str) {
        fs::write(self.paths.env_toml_config_path(name), toml).unwrap();
    }

    pub fn write_secret(&self, secret: &str) {
        let path = self.paths.forwarding_secret_path();
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, secret).unwrap();
    }
}

pub fn env_toml(alias: &str, server_type: &str, version: &str) -> String {
    format!(
        r#"[general]
hostname = "{alias}.example.net"
description = "{alias} environment"
enable_env_protection = false

[cluster-variables]
ENV_ALIAS = "{alias}"
MC_TYPE = "{server_type}"
MC_VERSION = "{version}"
VELOCITY_PORT = 25577

[world-groups]
enabled_groups = ["lobby", "defaultconfigs", "survival"]
"#
    )
}
