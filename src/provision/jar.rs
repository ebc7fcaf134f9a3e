//! Plugin/mod jar inspection
//!
//! A jar is a zip archive. Bukkit-style plugins carry a root-level
//! `plugin.yml`, Fabric mods a root-level `fabric.mod.json`. Either one
//! gives us the name and version we compare against the registry.

use crate::ErrorCategory;
use std::fmt;
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

pub const UNKNOWN_NAME: &str = "unknown-pluginmod-name";
pub const UNKNOWN_VERSION: &str = "unknown-pluginmod-version";

#[derive(Error, Debug)]
pub enum JarError {
    #[error("Failed to open jar '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("'{path}' is not a readable jar: {source}")]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },
    #[error("No plugin.yml or fabric.mod.json found in '{0}'")]
    NoDescriptor(PathBuf),
    #[error("Malformed {kind} in '{path}': {message}")]
    Descriptor {
        path: PathBuf,
        kind: DescriptorKind,
        message: String,
    },
}

impl JarError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            JarError::Io { .. } => ErrorCategory::Io,
            JarError::NoDescriptor(_) => ErrorCategory::NotFound,
            JarError::Archive { .. } | JarError::Descriptor { .. } => ErrorCategory::MalformedInput,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptorKind {
    /// `plugin.yml` (Bukkit/Paper)
    PluginYml,
    /// `fabric.mod.json`
    FabricModJson,
}

impl DescriptorKind {
    pub fn file_name(self) -> &'static str {
        match self {
            DescriptorKind::PluginYml => "plugin.yml",
            DescriptorKind::FabricModJson => "fabric.mod.json",
        }
    }

    pub fn from_file_name(name: &str) -> Option<Self> {
        match name {
            "plugin.yml" => Some(DescriptorKind::PluginYml),
            "fabric.mod.json" => Some(DescriptorKind::FabricModJson),
            _ => None,
        }
    }
}

impl fmt::Display for DescriptorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

/// Identity of a plugin or mod as declared inside its jar
#[derive(Debug, Clone, PartialEq)]
pub struct PluginModInfo {
    kind: DescriptorKind,
    id: Option<String>,
    name: Option<String>,
    version: Option<String>,
}

impl PluginModInfo {
    /// Read the descriptor of the jar at `path`.
    pub fn from_jar(path: &Path) -> Result<Self, JarError> {
        let file = File::open(path).map_err(|source| JarError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut archive = zip::ZipArchive::new(file).map_err(|source| JarError::Archive {
            path: path.to_path_buf(),
            source,
        })?;

        for i in 0..archive.len() {
            let mut entry = archive.by_index(i).map_err(|source| JarError::Archive {
                path: path.to_path_buf(),
                source,
            })?;

            if entry.is_dir() {
                continue;
            }

            let Some(kind) = DescriptorKind::from_file_name(entry.name()) else {
                continue;
            };

            let mut text = String::new();
            entry
                .read_to_string(&mut text)
                .map_err(|e| JarError::Descriptor {
                    path: path.to_path_buf(),
                    kind,
                    message: e.to_string(),
                })?;

            debug!(jar = %path.display(), descriptor = %kind, "Found descriptor");
            return Self::from_descriptor(kind, &text).map_err(|message| JarError::Descriptor {
                path: path.to_path_buf(),
                kind,
                message,
            });
        }

        Err(JarError::NoDescriptor(path.to_path_buf()))
    }

    /// Parse descriptor text of the given kind.
    pub fn from_descriptor(kind: DescriptorKind, text: &str) -> Result<Self, String> {
        let (id, name, version) = match kind {
            DescriptorKind::PluginYml => {
                let doc: serde_yaml::Value = serde_yaml::from_str(text).map_err(|e| e.to_string())?;
                (
                    None,
                    yaml_field(&doc, "name"),
                    yaml_field(&doc, "version"),
                )
            }
            DescriptorKind::FabricModJson => {
                let doc: serde_json::Value = serde_json::from_str(text).map_err(|e| e.to_string())?;
                (
                    json_field(&doc, "id"),
                    json_field(&doc, "name"),
                    json_field(&doc, "version"),
                )
            }
        };

        Ok(Self {
            kind,
            id,
            name,
            version,
        })
    }

    pub fn kind(&self) -> DescriptorKind {
        self.kind
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Declared name, or a fixed placeholder
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or(UNKNOWN_NAME)
    }

    /// Declared version, or a fixed placeholder
    pub fn version(&self) -> &str {
        self.version.as_deref().unwrap_or(UNKNOWN_VERSION)
    }

    /// Case-insensitive match on name or id
    pub fn matches(&self, target: &str) -> bool {
        self.name
            .iter()
            .chain(self.id.iter())
            .any(|candidate| candidate.eq_ignore_ascii_case(target))
    }
}

fn yaml_field(doc: &serde_yaml::Value, key: &str) -> Option<String> {
    match doc.get(key)? {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn json_field(doc: &serde_json::Value, key: &str) -> Option<String> {
    match doc.get(key)? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Every jar in `dir` whose descriptor matches `target`, sorted by path.
///
/// Unreadable jars are skipped with a warning. A missing directory yields nothing.
pub fn find_installed(dir: &Path, target: &str) -> Vec<(PathBuf, PluginModInfo)> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!(dir = %dir.display(), error = %e, "Jar directory not readable");
            return Vec::new();
        }
    };

    let mut jars: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && path.extension().and_then(|e| e.to_str()) == Some("jar"))
        .collect();
    jars.sort();

    jars.into_iter()
        .filter_map(|jar| match PluginModInfo::from_jar(&jar) {
            Ok(info) if info.matches(target) => Some((jar, info)),
            Ok(_) => None,
            Err(e) => {
                warn!(jar = %jar.display(), error = %e, "Skipping unreadable jar");
                None
            }
        })
        .collect()
}
