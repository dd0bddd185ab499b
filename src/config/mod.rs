//! Configuration management module
//!
//! Handles loading and validation of run settings. Values come
//! from `diskfill.toml` in the user config directory; command-line flags
//! override them.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use serde::{Deserialize, Serialize};
use crate::digest::DigestAlgorithm;
use crate::{DiskFillError, Result, APP_NAME, CONFIG_FILE, DEFAULT_FILE_NAME, MAX_QUEUE_DEPTH, MIB};

pub mod persistence;

/// Settings for one fill-and-verify run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FillConfig {
    /// Name of the test file created in the target directory
    pub file_name: String,
    /// Bytes per write and read operation
    pub chunk_size: u64,
    /// Bytes left free on the device
    pub reserve: u64,
    /// Chunks buffered between generator and writer
    pub queue_depth: usize,
    /// Leave the test file on the device after the run
    pub keep_file: bool,
    /// Digest used by both passes
    pub digest: DigestAlgorithm,
    /// Minimum spacing of progress updates
    pub progress_interval_ms: u64,
    /// Seed for a reproducible byte stream
    pub seed: Option<u64>,
}

impl Default for FillConfig {
    fn default() -> Self {
        Self {
            file_name: DEFAULT_FILE_NAME.to_string(),
            chunk_size: 1024 * MIB, // 1 GiB
            reserve: 512 * MIB,
            queue_depth: 3,
            keep_file: false,
            digest: DigestAlgorithm::Sha256,
            progress_interval_ms: 250,
            seed: None,
        }
    }
}

impl FillConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.file_name.is_empty() {
            return Err(DiskFillError::ConfigError(
                "File name must not be empty".to_string(),
            ));
        }

        if self.file_name.contains(['/', '\\']) || self.file_name == "." || self.file_name == ".." {
            return Err(DiskFillError::ConfigError(format!(
                "File name must be a plain name, not a path: {}",
                self.file_name
            )));
        }

        if self.chunk_size == 0 {
            return Err(DiskFillError::ConfigError(
                "Chunk size must be greater than 0".to_string(),
            ));
        }

        if usize::try_from(self.chunk_size).is_err() {
            return Err(DiskFillError::ConfigError(format!(
                "Chunk size too large for this platform: {} bytes",
                self.chunk_size
            )));
        }

        if self.queue_depth == 0 || self.queue_depth > MAX_QUEUE_DEPTH {
            return Err(DiskFillError::ConfigError(format!(
                "Queue depth must be between 1 and {}: {}",
                MAX_QUEUE_DEPTH, self.queue_depth
            )));
        }

        Ok(())
    }

    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = name.into();
        self
    }

    pub fn with_chunk_size(mut self, bytes: u64) -> Self {
        self.chunk_size = bytes;
        self
    }

    pub fn with_reserve(mut self, bytes: u64) -> Self {
        self.reserve = bytes;
        self
    }

    pub fn with_queue_depth(mut self, depth: usize) -> Self {
        self.queue_depth = depth;
        self
    }

    pub fn with_keep_file(mut self, keep: bool) -> Self {
        self.keep_file = keep;
        self
    }

    pub fn with_digest(mut self, digest: DigestAlgorithm) -> Self {
        self.digest = digest;
        self
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }

    /// Load configuration from `path`, or defaults if it doesn't exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| {
            DiskFillError::ConfigError(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| {
            DiskFillError::ConfigError(format!(
                "Failed to parse config file {}: {}",
                path.display(),
                e
            ))
        })?;

        config.validate()?;
        tracing::debug!(path = %path.display(), "loaded config file");
        Ok(config)
    }

    /// Get the standard configuration file path.
    /// Uses $CONFIG_HOME/diskfill/diskfill.toml
    pub fn config_file_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or_else(|| {
            DiskFillError::ConfigError("Unable to determine config directory".to_string())
        })?;

        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }
}
