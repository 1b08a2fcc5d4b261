//! Archive configuration via `marsdb.toml`
//!
//! A virtual store directory may carry a `marsdb.toml`; when it does,
//! opening the directory picks the settings up. Single-file archives and
//! in-memory archives use [`ArchiveConfig::default`] unless one is passed
//! explicitly.

use marsdb_core::{Error, Result};
use marsdb_storage::Format;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Config file name placed in a virtual store directory.
pub const CONFIG_FILE_NAME: &str = "marsdb.toml";

/// Archive configuration loaded from `marsdb.toml`.
///
/// # Example
///
/// ```toml
/// # Worker threads for bulk operations (0 = one per core)
/// workers = 0
/// # Encoding for new files: "binary" (default) or "text"
/// format = "binary"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveConfig {
    /// Worker threads for rebuilds, saves and processing; 0 means one per
    /// available core.
    #[serde(default)]
    pub workers: usize,
    /// Encoding for newly written files: `"binary"` or `"text"`.
    #[serde(default = "default_format_str")]
    pub format: String,
    /// fsync every record file and sidecar after writing.
    #[serde(default)]
    pub sync_writes: bool,
    /// How often bulk operations report progress, in milliseconds.
    #[serde(default = "default_progress_interval_ms")]
    pub progress_interval_ms: u64,
}

fn default_format_str() -> String {
    "binary".to_string()
}

fn default_progress_interval_ms() -> u64 {
    100
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            workers: 0,
            format: default_format_str(),
            sync_writes: false,
            progress_interval_ms: default_progress_interval_ms(),
        }
    }
}

impl ArchiveConfig {
    /// Parse the format string.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not a known format name.
    pub fn format(&self) -> Result<Format> {
        Format::from_name(&self.format)
    }

    /// Effective worker count (resolves 0 to the available parallelism)
    pub fn worker_threads(&self) -> usize {
        resolve_workers(self.workers)
    }

    /// Progress reporting interval
    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms.max(1))
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# marsdb archive configuration
#
# Worker threads for index rebuilds, saves and bulk processing.
#   0 = one per available core
workers = 0

# Encoding for newly written record files and sidecars: "binary" or "text"
#   "binary" = MessagePack, compact and fast
#   "text"   = JSON, human readable
format = "binary"

# fsync every record file and sidecar after writing (default: false)
sync_writes = false

# Progress reporting interval for bulk operations, in milliseconds
progress_interval_ms = 100
"#
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let config: ArchiveConfig = toml::from_str(&content).map_err(|e| {
            Error::Config(format!(
                "Failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        // Validate the format value eagerly
        config.format()?;
        Ok(config)
    }

    /// Config for a virtual store: `<dir>/marsdb.toml` when present,
    /// defaults otherwise.
    pub fn for_store(dir: &Path) -> Result<Self> {
        let path = dir.join(CONFIG_FILE_NAME);
        if path.is_file() {
            Self::from_file(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Write the default config file if it does not already exist.
    ///
    /// Returns `Ok(())` whether the file was created or already existed.
    pub fn write_default_if_missing(path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| {
                Error::Config(format!(
                    "Failed to write default config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content).map_err(|e| {
            Error::Config(format!(
                "Failed to write config file '{}': {}",
                path.display(),
                e
            ))
        })
    }
}

/// Resolve a requested worker count; 0 means one per available core.
pub fn resolve_workers(requested: usize) -> usize {
    if requested > 0 {
        return requested;
    }
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
