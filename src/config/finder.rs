//! Upward search for named config files

use crate::ErrorCategory;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FinderError {
    #[error("Could not find '{name}' in '{start}' or any of its ancestors")]
    NotFound { name: String, start: PathBuf },
}

impl FinderError {
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::NotFound
    }
}

/// Locates a config file by walking from a base directory up to the root.
#[derive(Debug, Clone, Default)]
pub struct ConfigFinder;

impl ConfigFinder {
    pub fn new() -> Self {
        Self
    }

    /// Check `start/name`, then every ancestor of `start`, root included.
    ///
    /// An absolute `name` is checked as-is.
    pub fn find(&self, name: &str, start: &Path) -> Result<PathBuf, FinderError> {
        let start = if start.is_absolute() {
            start.to_path_buf()
        } else {
            std::env::current_dir()
                .map(|cwd| cwd.join(start))
                .unwrap_or_else(|_| start.to_path_buf())
        };

        for dir in start.ancestors() {
            let candidate = dir.join(name);
            if candidate.is_file() {
                debug!(name = name, path = %candidate.display(), "Found config file");
                return Ok(candidate);
            }
        }

        Err(FinderError::NotFound {
            name: name.to_string(),
            start,
        })
    }
}
