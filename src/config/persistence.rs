//! Run history persistence
//!
//! Handles saving, loading, and rotation of run reports, plus writing a
//! single report to a caller-chosen file.

use std::fs;
use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use crate::models::RunReport;
use crate::{DiskFillError, Result, APP_NAME, HISTORY_FILE, MAX_HISTORY};

/// History file structure for JSON persistence
#[derive(Debug, Serialize, Deserialize)]
struct HistoryFile {
    version: u32,
    runs: Vec<RunReport>,
}

/// Rotating store of past run reports
#[derive(Debug)]
pub struct ReportHistory {
    history_path: PathBuf,
}

impl ReportHistory {
    /// Open the history at the standard location
    pub fn new() -> Result<Self> {
        Ok(Self {
            history_path: Self::history_file_path()?,
        })
    }

    pub fn at(history_path: PathBuf) -> Self {
        Self { history_path }
    }

    /// Get the standard history file path.
    /// Uses $DATA_HOME/diskfill/history.json
    pub fn history_file_path() -> Result<PathBuf> {
        let data_dir = dirs::data_dir().ok_or_else(|| {
            DiskFillError::Persistence("Unable to determine data directory".to_string())
        })?;

        Ok(data_dir.join(APP_NAME).join(HISTORY_FILE))
    }

    /// Load all reports, oldest first
    pub fn load(&self) -> Result<Vec<RunReport>> {
        if !self.history_path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&self.history_path).map_err(|e| {
            DiskFillError::Persistence(format!(
                "Failed to read history file {}: {}",
                self.history_path.display(),
                e
            ))
        })?;

        let history: HistoryFile = serde_json::from_str(&content).map_err(|e| {
            DiskFillError::Persistence(format!(
                "Failed to parse history file {}: {}",
                self.history_path.display(),
                e
            ))
        })?;

        Ok(history.runs)
    }

    /// Append a report, dropping the oldest beyond [`MAX_HISTORY`]
    pub fn append(&self, report: RunReport) -> Result<()> {
        let mut runs = self.load()?;
        runs.push(report);

        if runs.len() > MAX_HISTORY {
            let excess = runs.len() - MAX_HISTORY;
            runs.drain(..excess);
        }

        write_json(&self.history_path, &HistoryFile { version: 1, runs })
    }
}

/// Write one report as pretty JSON to `path`
pub fn save_report(report: &RunReport, path: &Path) -> Result<()> {
    write_json(path, report)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| {
            DiskFillError::Persistence(format!(
                "Failed to create directory {}: {}",
                parent.display(),
                e
            ))
        })?;
    }

    let content = serde_json::to_string_pretty(value)?;
    fs::write(path, content).map_err(|e| {
        DiskFillError::Persistence(format!("Failed to write {}: {}", path.display(), e))
    })?;

    Ok(())
}
