use crate::environment::{Env, ServerType};
use crate::provision::ProvisionError;

/// A registry project pinned to a game version and loader
#[derive(Debug, Clone, PartialEq)]
pub struct PluginModDefinition {
    project_id: String,
    game_version: String,
    loader: String,
    env_name: Option<String>,
}

impl PluginModDefinition {
    /// The loader comes from `server_type` when given, else from the env's `MC_TYPE`.
    pub fn new(
        project_id: &str,
        game_version: &str,
        server_type: Option<ServerType>,
        env: Option<&Env>,
    ) -> Result<Self, ProvisionError> {
        if project_id.trim().is_empty() {
            return Err(ProvisionError::InvalidDefinition(
                "project id is empty".to_string(),
            ));
        }

        if game_version.trim().is_empty() {
            return Err(ProvisionError::InvalidDefinition(format!(
                "no game version given for project '{}'",
                project_id
            )));
        }

        let loader = match (server_type, env) {
            (Some(server_type), _) => server_type.loader_name(),
            (None, Some(env)) => {
                let declared = env.server_type();
                if declared.trim().is_empty() {
                    return Err(ProvisionError::InvalidDefinition(format!(
                        "{} declares no MC_TYPE to derive a loader from",
                        env.name()
                    )));
                }
                declared.trim().to_lowercase()
            }
            (None, None) => {
                return Err(ProvisionError::InvalidDefinition(format!(
                    "neither a server type nor an env was given for project '{}'",
                    project_id
                )));
            }
        };

        Ok(Self {
            project_id: project_id.to_string(),
            game_version: game_version.to_string(),
            loader,
            env_name: env.map(|e| e.name().to_string()),
        })
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn game_version(&self) -> &str {
        &self.game_version
    }

    pub fn loader(&self) -> &str {
        &self.loader
    }

    /// Env the definition was built for; required before downloading into an env.
    pub fn env_name(&self) -> Result<&str, ProvisionError> {
        self.env_name.as_deref().ok_or_else(|| {
            ProvisionError::InvalidDefinition(format!(
                "project '{}' is not bound to an env",
                self.project_id
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigKind, FormatAdapter, LoadedConfig, TomlFormat};
    use crate::ErrorCategory;
    use std::path::PathBuf;
    use std::sync::Arc;

    fn env(name: &str, toml: &str) -> Env {
        let mapping = TomlFormat.parse(toml).unwrap();
        let config = LoadedConfig::new(ConfigKind::Toml, PathBuf::from("inline.toml"), &mapping);
        Env::from_config(name, Arc::new(config)).unwrap()
    }

    #[test]
    fn test_loader_from_server_type() {
        let def = PluginModDefinition::new("8dI2tmqs", "1.20.1", Some(ServerType::Fabric), None).unwrap();
        assert_eq!(def.loader(), "fabric");
        assert!(def.env_name().is_err());
    }

    #[test]
    fn test_loader_from_env() {
        let env3 = env("env3", "[cluster-variables]\nMC_TYPE = \"FORGE\"\n");
        let def = PluginModDefinition::new("abc", "1.20.1", None, Some(&env3)).unwrap();

        assert_eq!(def.loader(), "forge");
        assert_eq!(def.env_name().unwrap(), "env3");
    }

    #[test]
    fn test_explicit_type_wins_over_env() {
        let env3 = env("env3", "[cluster-variables]\nMC_TYPE = \"FORGE\"\n");
        let def =
            PluginModDefinition::new("abc", "1.20.1", Some(ServerType::Fabric), Some(&env3)).unwrap();
        assert_eq!(def.loader(), "fabric");
    }

    #[test]
    fn test_invalid_definitions() {
        let bare = env("env4", "");

        let cases = [
            PluginModDefinition::new("", "1.20.1", Some(ServerType::Paper), None),
            PluginModDefinition::new("abc", " ", Some(ServerType::Paper), None),
            PluginModDefinition::new("abc", "1.20.1", None, None),
            PluginModDefinition::new("abc", "1.20.1", None, Some(&bare)),
        ];

        for result in cases {
            let err = result.unwrap_err();
            assert!(matches!(err, ProvisionError::InvalidDefinition(_)));
            assert_eq!(err.category(), ErrorCategory::InvalidIdentity);
        }
    }
}
