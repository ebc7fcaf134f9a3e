//! Filesystem layout of the cluster
//!
//! ```text
//! {repo_root}/gen/env-toml/{env}.toml
//! {repo_root}/secrets/velocity/forwarding.secret
//! {repo_root}/templates/{bukkit,paper-global}.tpl.yml
//! {data_root}/env/{env}/minecraft/defaultmods
//! {data_root}/env/{env}/minecraft/defaultconfigs/server/...
//! {data_root}/env/{env}/minecraft/{world_group}/configs/server/...
//! ```

use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq)]
pub struct ServerPaths {
    /// Checkout holding env tomls, templates and secrets
    pub repo_root: PathBuf,
    /// Host directory holding per-environment server data
    pub data_root: PathBuf,
}

impl Default for ServerPaths {
    fn default() -> Self {
        let repo_root = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let data_root = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("clustenv");

        Self {
            repo_root,
            data_root,
        }
    }
}

impl ServerPaths {
    pub fn new(repo_root: impl Into<PathBuf>, data_root: impl Into<PathBuf>) -> Self {
        Self {
            repo_root: repo_root.into(),
            data_root: data_root.into(),
        }
    }

    /// Defaults overridden by `CLUSTENV_REPO_ROOT` and `MC_FS_ROOT`
    pub fn from_env() -> Self {
        let mut paths = Self::default();

        if let Ok(repo_root) = std::env::var("CLUSTENV_REPO_ROOT") {
            paths.repo_root = PathBuf::from(repo_root);
        }

        if let Ok(data_root) = std::env::var("MC_FS_ROOT") {
            paths.data_root = PathBuf::from(data_root);
        }

        paths
    }

    pub fn env_toml_config_dir(&self) -> PathBuf {
        self.repo_root.join("gen").join("env-toml")
    }

    pub fn env_toml_config_path(&self, env: &str) -> PathBuf {
        self.env_toml_config_dir().join(format!("{}.toml", env))
    }

    pub fn forwarding_secret_path(&self) -> PathBuf {
        self.repo_root
            .join("secrets")
            .join("velocity")
            .join("forwarding.secret")
    }

    pub fn templates_dir(&self) -> PathBuf {
        self.repo_root.join("templates")
    }

    pub fn paper_global_template_path(&self) -> PathBuf {
        self.templates_dir().join("paper-global.tpl.yml")
    }

    pub fn bukkit_template_path(&self) -> PathBuf {
        self.templates_dir().join("bukkit.tpl.yml")
    }

    pub fn env_data_path(&self, env: &str) -> PathBuf {
        self.data_root.join("env").join(env)
    }

    pub fn mc_env_data_path(&self, env: &str) -> PathBuf {
        self.env_data_path(env).join("minecraft")
    }

    pub fn env_default_mods_path(&self, env: &str) -> PathBuf {
        self.mc_env_data_path(env).join("defaultmods")
    }

    pub fn env_default_configs_path(&self, env: &str) -> PathBuf {
        self.mc_env_data_path(env).join("defaultconfigs")
    }

    pub fn env_and_world_group_path(&self, env: &str, world_group: &str) -> PathBuf {
        self.mc_env_data_path(env).join(world_group)
    }

    /// Server configs of `world_group`, or the env-wide defaults when `None`
    pub fn server_configs_path(&self, env: &str, world_group: Option<&str>) -> PathBuf {
        match world_group {
            Some(group) => self
                .env_and_world_group_path(env, group)
                .join("configs")
                .join("server"),
            None => self.env_default_configs_path(env).join("server"),
        }
    }

    pub fn bukkit_yml_path(&self, env: &str, world_group: Option<&str>) -> PathBuf {
        self.server_configs_path(env, world_group).join("bukkit.yml")
    }

    pub fn paper_global_yml_path(&self, env: &str, world_group: Option<&str>) -> PathBuf {
        self.server_configs_path(env, world_group)
            .join("config")
            .join("paper-global.yml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout() {
        let paths = ServerPaths::new("/repo", "/data");

        assert_eq!(
            paths.env_toml_config_path("env2"),
            PathBuf::from("/repo/gen/env-toml/env2.toml")
        );
        assert_eq!(
            paths.env_default_mods_path("env3"),
            PathBuf::from("/data/env/env3/minecraft/defaultmods")
        );
        assert_eq!(
            paths.paper_global_yml_path("env1", None),
            PathBuf::from("/data/env/env1/minecraft/defaultconfigs/server/config/paper-global.yml")
        );
        assert_eq!(
            paths.bukkit_yml_path("env1", Some("survival")),
            PathBuf::from("/data/env/env1/minecraft/survival/configs/server/bukkit.yml")
        );
    }
}
