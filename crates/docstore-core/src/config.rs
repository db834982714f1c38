//! Storage engine settings, loadable from TOML, JSON or YAML

use std::path::{Path, PathBuf};
use std::time::Duration;

use docstore_git::SyncOptions;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Settings for a [`DocumentStore`](crate::DocumentStore).
///
/// Every field has a default, so an empty file is a valid configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding every `<tenant>/<workspace>` subtree
    pub root_dir: PathBuf,

    /// Upper bound on one clone, fetch or push, in seconds
    pub remote_timeout_secs: u64,

    /// `tracing` filter used when `RUST_LOG` is unset
    pub log_filter: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from("./data"),
            remote_timeout_secs: 120,
            log_filter: "info".to_string(),
        }
    }
}

impl StorageConfig {
    /// Configuration with every default but the storage root.
    pub fn with_root(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            ..Self::default()
        }
    }

    /// Load configuration from a file.
    ///
    /// Format is detected from file extension:
    /// - `.toml` -> TOML
    /// - `.json` -> JSON
    /// - `.yaml`, `.yml` -> YAML
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        let format = match extension.as_str() {
            "toml" => "TOML",
            "json" => "JSON",
            "yaml" | "yml" => "YAML",
            _ => return Err(Error::UnsupportedFormat { extension }),
        };

        let content = std::fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;

        let parsed: std::result::Result<Self, String> = match format {
            "TOML" => toml::from_str(&content).map_err(|e| e.to_string()),
            "JSON" => serde_json::from_str(&content).map_err(|e| e.to_string()),
            _ => serde_yaml::from_str(&content).map_err(|e| e.to_string()),
        };

        let config: Self = parsed.map_err(|message| Error::ConfigParse {
            path: path.to_path_buf(),
            format: format.to_string(),
            message,
        })?;

        tracing::debug!(
            path = %path.display(),
            format,
            root = %config.root_dir.display(),
            "Loaded storage config"
        );
        Ok(config)
    }

    pub fn remote_timeout(&self) -> Duration {
        Duration::from_secs(self.remote_timeout_secs)
    }

    pub fn sync_options(&self) -> SyncOptions {
        SyncOptions {
            remote_timeout: self.remote_timeout(),
        }
    }
}
