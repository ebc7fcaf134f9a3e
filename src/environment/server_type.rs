//! Known server software flavours

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ServerType {
    Fabric,
    Forge,
    Paper,
    Bukkit,
}

impl ServerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServerType::Fabric => "FABRIC",
            ServerType::Forge => "FORGE",
            ServerType::Paper => "PAPER",
            ServerType::Bukkit => "BUKKIT",
        }
    }

    /// Loader name as the registry expects it
    pub fn loader_name(&self) -> String {
        self.as_str().to_lowercase()
    }

    /// Mod loaders take jars in the mods directory; Paper/Bukkit take plugins.
    pub fn is_modded(&self) -> bool {
        matches!(self, ServerType::Fabric | ServerType::Forge)
    }
}

impl fmt::Display for ServerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ServerType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "FABRIC" => Ok(ServerType::Fabric),
            "FORGE" => Ok(ServerType::Forge),
            "PAPER" => Ok(ServerType::Paper),
            "BUKKIT" => Ok(ServerType::Bukkit),
            _ => Err(format!("Unknown server type: {}", s)),
        }
    }
}
