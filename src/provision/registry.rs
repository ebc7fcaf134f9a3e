//! Remote package registry access
//!
//! The HTTP implementation talks to a Modrinth-compatible API:
//! `GET {base}/project/{id}/version?game_versions=["{v}"]&loaders=["{loader}"]`
//! returns an array of version objects, each carrying `files[].{url,filename}`.

use crate::config::writer::{set_mode, DEFAULT_FILE_MODE};
use crate::config::ConfigError;
use crate::ErrorCategory;
use serde::Deserialize;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

pub const DEFAULT_REGISTRY_URL: &str = "https://api.modrinth.com/v2";

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Registry returned no versions for project '{project_id}' (game version '{game_version}', loader '{loader}')")]
    EmptyResult {
        project_id: String,
        game_version: String,
        loader: String,
    },
    #[error("Malformed registry response: expected a '{field}' field in the {context}")]
    MissingField {
        field: &'static str,
        context: &'static str,
    },
    #[error("Registry file name '{0}' is not a plain file name")]
    UnsafeFilename(String),
    #[error("Request to '{url}' failed: {message}")]
    Transport { url: String, message: String },
    #[error("Request to '{url}' returned HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("Could not decode response from '{url}': {message}")]
    Decode { url: String, message: String },
    #[error("Failed to write download to '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Permissions(#[from] ConfigError),
}

impl RegistryError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            RegistryError::EmptyResult { .. }
            | RegistryError::MissingField { .. }
            | RegistryError::UnsafeFilename(_)
            | RegistryError::Decode { .. } => ErrorCategory::MalformedInput,
            RegistryError::Transport { .. } | RegistryError::Status { .. } => {
                ErrorCategory::Transport
            }
            RegistryError::Io { .. } | RegistryError::Permissions(_) => ErrorCategory::Io,
        }
    }
}

/// One downloadable file of a registry version
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RegistryFile {
    pub url: Option<String>,
    pub filename: Option<String>,
}

/// One version object as returned by the registry
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RegistryVersion {
    pub name: Option<String>,
    pub version_number: Option<String>,
    pub files: Option<Vec<RegistryFile>>,
}

/// The release a query settled on
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRelease {
    pub version: String,
    pub url: String,
    pub filename: String,
}

/// Pick the newest version and its primary file, failing on any missing field.
pub fn select_release(
    versions: &[RegistryVersion],
    project_id: &str,
    game_version: &str,
    loader: &str,
) -> Result<ResolvedRelease, RegistryError> {
    let Some(latest) = versions.first() else {
        return Err(RegistryError::EmptyResult {
            project_id: project_id.to_string(),
            game_version: game_version.to_string(),
            loader: loader.to_string(),
        });
    };

    let file = latest
        .files
        .as_ref()
        .and_then(|files| files.first())
        .ok_or(RegistryError::MissingField {
            field: "files",
            context: "project version data",
        })?;

    let url = file.url.clone().ok_or(RegistryError::MissingField {
        field: "url",
        context: "project download file data",
    })?;

    let filename = file.filename.clone().ok_or(RegistryError::MissingField {
        field: "filename",
        context: "project download file data",
    })?;

    if filename.is_empty()
        || filename.contains('/')
        || filename.contains('\\')
        || filename == "."
        || filename == ".."
    {
        return Err(RegistryError::UnsafeFilename(filename));
    }

    let version = latest
        .version_number
        .clone()
        .or_else(|| latest.name.clone())
        .ok_or(RegistryError::MissingField {
            field: "name",
            context: "project version data",
        })?;

    Ok(ResolvedRelease {
        version,
        url,
        filename,
    })
}

/// Blocking access to the package registry
#[cfg_attr(test, mockall::automock)]
pub trait Registry {
    /// Versions of `project_id` compatible with `game_version` and `loader`, newest first
    fn project_versions(
        &self,
        project_id: &str,
        game_version: &str,
        loader: &str,
    ) -> Result<Vec<RegistryVersion>, RegistryError>;

    /// Fetch `url` into `dest`, replacing it.
    fn download(&self, url: &str, dest: &Path) -> Result<(), RegistryError>;

    /// Fetch `url` as text.
    fn fetch_text(&self, url: &str) -> Result<String, RegistryError>;
}

/// Registry client over HTTP
#[derive(Debug, Clone)]
pub struct HttpRegistry {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl HttpRegistry {
    pub fn new(base_url: impl Into<String>) -> Result<Self, RegistryError> {
        let base_url = base_url.into();
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("clustenv/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RegistryError::Transport {
                url: base_url.clone(),
                message: e.to_string(),
            })?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn get(&self, url: &str, query: &[(&str, String)]) -> Result<reqwest::blocking::Response, RegistryError> {
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .map_err(|e| RegistryError::Transport {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(RegistryError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response)
    }
}

impl Registry for HttpRegistry {
    fn project_versions(
        &self,
        project_id: &str,
        game_version: &str,
        loader: &str,
    ) -> Result<Vec<RegistryVersion>, RegistryError> {
        let url = format!("{}/project/{}/version", self.base_url, project_id);
        let query = [
            ("game_versions", format!("[\"{}\"]", game_version)),
            ("loaders", format!("[\"{}\"]", loader)),
        ];

        let body = self
            .get(&url, &query)?
            .text()
            .map_err(|e| RegistryError::Transport {
                url: url.clone(),
                message: e.to_string(),
            })?;
        debug!(url = %url, body = %body, "Registry response");

        serde_json::from_str(&body).map_err(|e| RegistryError::Decode {
            url,
            message: e.to_string(),
        })
    }

    fn download(&self, url: &str, dest: &Path) -> Result<(), RegistryError> {
        info!(url = url, dest = %dest.display(), "Downloading");

        let mut response = self.get(url, &[])?;
        store_download(&mut response, url, dest)
    }

    fn fetch_text(&self, url: &str) -> Result<String, RegistryError> {
        self.get(url, &[])?
            .text()
            .map_err(|e| RegistryError::Transport {
                url: url.to_string(),
                message: e.to_string(),
            })
    }
}

/// Stream `body` to `<dest>.part`, then move it over `dest`.
///
/// The partial file is removed when the transfer fails, so `dest` is
/// either untouched or complete.
fn store_download<R: Read>(body: &mut R, url: &str, dest: &Path) -> Result<(), RegistryError> {
    let part_path = dest.with_extension("part");
    let io_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source: std::io::Error| RegistryError::Io { path, source }
    };

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(io_err(parent))?;
    }

    let mut file = File::create(&part_path).map_err(io_err(&part_path))?;
    if let Err(e) = io::copy(body, &mut file) {
        drop(file);
        if let Err(cleanup) = fs::remove_file(&part_path) {
            warn!(path = %part_path.display(), error = %cleanup, "Could not remove partial download");
        }
        return Err(RegistryError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        });
    }
    drop(file);

    fs::rename(&part_path, dest).map_err(io_err(dest))?;
    set_mode(dest, DEFAULT_FILE_MODE)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn version(number: &str, url: Option<&str>, filename: Option<&str>) -> RegistryVersion {
        RegistryVersion {
            name: Some(format!("Release {}", number)),
            version_number: Some(number.to_string()),
            files: Some(vec![RegistryFile {
                url: url.map(str::to_string),
                filename: filename.map(str::to_string),
            }]),
        }
    }

    #[test]
    fn test_select_release() {
        let versions = vec![
            version("1.2.3", Some("https://x/mod.jar"), Some("mod.jar")),
            version("1.2.2", Some("https://x/old.jar"), Some("old.jar")),
        ];

        let release = select_release(&versions, "proj", "1.20.1", "fabric").unwrap();
        assert_eq!(
            release,
            ResolvedRelease {
                version: "1.2.3".to_string(),
                url: "https://x/mod.jar".to_string(),
                filename: "mod.jar".to_string(),
            }
        );
    }

    #[test]
    fn test_empty_result() {
        let err = select_release(&[], "proj", "1.20.1", "fabric").unwrap_err();
        assert!(matches!(err, RegistryError::EmptyResult { .. }));
        assert_eq!(err.category(), ErrorCategory::MalformedInput);
    }

    #[test]
    fn test_missing_fields_are_named() {
        let no_files = RegistryVersion {
            name: Some("x".to_string()),
            version_number: None,
            files: None,
        };
        let empty_files = RegistryVersion {
            files: Some(vec![]),
            ..no_files.clone()
        };

        for versions in [vec![no_files], vec![empty_files]] {
            let err = select_release(&versions, "p", "v", "l").unwrap_err();
            assert!(matches!(err, RegistryError::MissingField { field: "files", .. }));
        }

        let err = select_release(&[version("1", None, Some("a.jar"))], "p", "v", "l").unwrap_err();
        assert!(matches!(err, RegistryError::MissingField { field: "url", .. }));

        let err = select_release(&[version("1", Some("https://x"), None)], "p", "v", "l").unwrap_err();
        assert!(matches!(err, RegistryError::MissingField { field: "filename", .. }));
    }

    #[test]
    fn test_name_used_when_version_number_absent() {
        let mut v = version("ignored", Some("https://x/a.jar"), Some("a.jar"));
        v.version_number = None;
        v.name = Some("2.0.0".to_string());

        let release = select_release(&[v], "p", "v", "l").unwrap();
        assert_eq!(release.version, "2.0.0");
    }

    #[test]
    fn test_rejects_path_like_filenames() {
        for bad in ["../evil.jar", "dir/a.jar", "", ".."] {
            let err = select_release(&[version("1", Some("https://x"), Some(bad))], "p", "v", "l")
                .unwrap_err();
            assert!(matches!(err, RegistryError::UnsafeFilename(_)));
        }
    }

    #[test]
    fn test_version_decoding_tolerates_missing_fields() {
        let json = r#"[{"name": "v1", "files": [{"url": "https://x/a.jar"}]}, {}]"#;
        let versions: Vec<RegistryVersion> = serde_json::from_str(json).unwrap();

        assert_eq!(versions.len(), 2);
        assert_eq!(versions[0].files.as_ref().unwrap()[0].filename, None);
        assert_eq!(versions[1], RegistryVersion::default());
    }

    /// Yields some bytes, then fails mid-transfer.
    struct BrokenBody {
        sent: bool,
    }

    impl Read for BrokenBody {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.sent {
                return Err(io::Error::new(io::ErrorKind::ConnectionReset, "connection reset"));
            }
            self.sent = true;
            buf[..4].copy_from_slice(b"PK\x03\x04");
            Ok(4)
        }
    }

    #[test]
    fn test_store_download_writes_complete_file() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let dest = temp_dir.path().join("mods").join("mod.jar");

        store_download(&mut &b"jar bytes"[..], "https://x/mod.jar", &dest).unwrap();

        assert_eq!(fs::read(&dest).unwrap(), b"jar bytes");
        assert!(!dest.with_extension("part").exists());
    }

    #[test]
    fn test_failed_download_leaves_no_partial_file() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let dest = temp_dir.path().join("mod.jar");

        let err = store_download(&mut BrokenBody { sent: false }, "https://x/mod.jar", &dest).unwrap_err();

        assert!(matches!(err, RegistryError::Transport { .. }));
        assert!(!dest.exists());
        assert_eq!(fs::read_dir(temp_dir.path()).unwrap().count(), 0);
    }
}
