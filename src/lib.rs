//! diskfill - fill a drive, read it back, compare digests
//!
//! Writes one large file of pseudorandom data across the free space of a
//! device, forces it to stable storage, reads it back and compares the
//! digests of both passes.

pub mod config;
pub mod console;
pub mod digest;
pub mod io;
pub mod models;
pub mod pipeline;
pub mod plan;
pub mod util;

pub use digest::{DigestAlgorithm, IncrementalDigest};
pub use models::{IntegrityVerdict, PassKind, RunReport, RunResult, RunTarget};
pub use pipeline::{DiskFillTest, ProgressUpdate, TestOutcome};

/// Errors surfaced by the pipelines and the layers around them.
///
/// A digest or size mismatch is not an error: it is reported as
/// [`IntegrityVerdict::Failed`].
#[derive(Debug, thiserror::Error)]
pub enum DiskFillError {
    /// The chunk producer could not generate data
    #[error("data generation failed: {0}")]
    GenerationFailed(String),
    /// The write pass aborted
    #[error("write failed after {bytes_completed} bytes: {source}")]
    WriteFailed {
        bytes_completed: u64,
        #[source]
        source: std::io::Error,
    },
    /// The read pass aborted
    #[error("read failed after {bytes_completed} bytes: {source}")]
    ReadFailed {
        bytes_completed: u64,
        #[source]
        source: std::io::Error,
    },
    /// Teardown was requested while a pass was running
    #[error("cancelled after {bytes_completed} bytes")]
    Cancelled { bytes_completed: u64 },
    /// Configuration validation or parsing error
    #[error("configuration error: {0}")]
    ConfigError(String),
    /// Not enough free space left after the reserve
    #[error("not enough free space: {available} bytes available, {required} bytes required")]
    InsufficientSpace { available: u64, required: u64 },
    /// Report or history persistence error
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for DiskFillError {
    fn from(err: serde_json::Error) -> Self {
        DiskFillError::Persistence(format!("JSON serialization error: {}", err))
    }
}

impl From<toml::de::Error> for DiskFillError {
    fn from(err: toml::de::Error) -> Self {
        DiskFillError::ConfigError(format!("TOML parsing error: {}", err))
    }
}

/// Result type alias for diskfill operations
pub type Result<T> = std::result::Result<T, DiskFillError>;

/// Error reporting helpers for the command-line front end
pub mod error {
    use super::DiskFillError;

    /// Process exit code when both passes completed and the verdict failed
    pub const EXIT_INTEGRITY_FAILED: i32 = 3;

    /// Map an error to the process exit code of the binary.
    ///
    /// Pass failures exit with 1; problems found before any data was written
    /// (bad configuration, not enough space) exit with 2.
    pub fn exit_code(error: &DiskFillError) -> i32 {
        match error {
            DiskFillError::ConfigError(_) | DiskFillError::InsufficientSpace { .. } => 2,
            _ => 1,
        }
    }

    /// Convert error to user-friendly message with suggestions
    pub fn user_friendly_message(error: &DiskFillError) -> String {
        match error {
            DiskFillError::WriteFailed {
                bytes_completed,
                source,
            } if source.raw_os_error() == Some(28) || source.kind() == std::io::ErrorKind::WriteZero => {
                format!(
                    "The device filled up after {} bytes. Increase the reserve and try again.",
                    bytes_completed
                )
            }
            DiskFillError::WriteFailed { .. } => {
                format!("{}. The device may be failing or was removed.", error)
            }
            DiskFillError::ReadFailed { .. } => {
                format!("{}. Data written to the device could not be read back.", error)
            }
            DiskFillError::InsufficientSpace { .. } => {
                format!("{}. Free up space or lower the reserve.", error)
            }
            DiskFillError::ConfigError(msg) => {
                format!("Configuration error: {}. Check your settings.", msg)
            }
            DiskFillError::Cancelled { .. } => "Operation was cancelled by user.".to_string(),
            _ => error.to_string(),
        }
    }
}

// Common constants
pub const APP_NAME: &str = "diskfill";
pub const CONFIG_FILE: &str = "diskfill.toml";
pub const HISTORY_FILE: &str = "history.json";
pub const DEFAULT_FILE_NAME: &str = "disk_fill_test.bin";
pub const MAX_HISTORY: usize = 100;
/// Largest accepted generator-to-writer queue depth
pub const MAX_QUEUE_DEPTH: usize = 1024;
pub const MIB: u64 = 1024 * 1024;
