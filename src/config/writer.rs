//! Whole-file rewrites of generated config files

use crate::config::format::{ConfigKind, WriteOptions};
use crate::config::loader::ConfigError;
use crate::config::value::Mapping;
use std::fs;
use std::path::Path;
use tracing::info;

/// rwxrwxr-x
pub const DEFAULT_FILE_MODE: u32 = 0o775;

#[derive(Debug, Clone)]
pub struct ConfigWriter {
    pub file_mode: u32,
    pub atomic_writes: bool,
    pub options: WriteOptions,
}

impl Default for ConfigWriter {
    fn default() -> Self {
        Self {
            file_mode: DEFAULT_FILE_MODE,
            atomic_writes: true,
            options: WriteOptions::default(),
        }
    }
}

impl ConfigWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serialize `mapping` as `kind`, prefix it with `header` and replace `path`.
    pub fn write(
        &self,
        path: &Path,
        kind: ConfigKind,
        mapping: &Mapping,
        header: &str,
    ) -> Result<(), ConfigError> {
        let body = kind
            .adapter()
            .serialize(mapping, &self.options)
            .map_err(|source| ConfigError::Format {
                path: path.to_path_buf(),
                source,
            })?;

        let mut content = String::with_capacity(header.len() + body.len());
        content.push_str(header);
        content.push_str(&body);

        self.write_text(path, &content)?;
        info!(format = %kind, path = %path.display(), "Wrote config");
        Ok(())
    }

    /// Replace `path` with `content` and apply the configured mode.
    pub fn write_text(&self, path: &Path, content: &str) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
                    operation: "create directory",
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        if self.atomic_writes {
            let temp_path = path.with_extension("tmp");
            write_with_mode(&temp_path, content, self.file_mode)?;
            fs::rename(&temp_path, path).map_err(|source| ConfigError::Io {
                operation: "rename",
                path: temp_path.clone(),
                source,
            })?;
        } else {
            write_with_mode(path, content, self.file_mode)?;
        }

        Ok(())
    }
}

fn write_with_mode(path: &Path, content: &str, mode: u32) -> Result<(), ConfigError> {
    fs::write(path, content).map_err(|source| ConfigError::Io {
        operation: "write",
        path: path.to_path_buf(),
        source,
    })?;

    set_mode(path, mode)
}

/// Apply a POSIX permission mode. No-op off unix.
pub fn set_mode(path: &Path, mode: u32) -> Result<(), ConfigError> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(mode)).map_err(|source| {
            ConfigError::Io {
                operation: "set permissions on",
                path: path.to_path_buf(),
                source,
            }
        })?;
    }

    #[cfg(not(unix))]
    {
        let _ = (path, mode);
    }

    Ok(())
}
