//! Run planning: how many bytes to write and where

use std::path::Path;
use crate::config::FillConfig;
use crate::io::space::available_space;
use crate::models::RunTarget;
use crate::{DiskFillError, Result, MIB};

/// Free space that must remain above the reserve for a run to start
pub const MIN_HEADROOM: u64 = 16 * MIB;

/// A planned run and the free space it was planned against
#[derive(Debug, Clone)]
pub struct RunPlan {
    pub target: RunTarget,
    pub free_bytes: u64,
}

/// Plan a run in `dir` given `free` bytes currently available.
///
/// The file covers everything above `config.reserve`. `size_limit`, when
/// set, caps the planned size.
pub fn plan_target(
    dir: &Path,
    config: &FillConfig,
    free: u64,
    size_limit: Option<u64>,
) -> Result<RunTarget> {
    config.validate()?;

    if !dir.is_dir() {
        return Err(DiskFillError::ConfigError(format!(
            "Invalid directory: {}",
            dir.display()
        )));
    }

    let required = config.reserve.saturating_add(MIN_HEADROOM);
    if free <= required {
        return Err(DiskFillError::InsufficientSpace {
            available: free,
            required,
        });
    }

    let mut total_bytes = free - config.reserve;
    if let Some(limit) = size_limit {
        total_bytes = total_bytes.min(limit);
    }

    let chunk_size = usize::try_from(config.chunk_size).map_err(|_| {
        DiskFillError::ConfigError(format!("Chunk size too large: {}", config.chunk_size))
    })?;

    let target = RunTarget::new(
        dir.join(&config.file_name),
        total_bytes,
        chunk_size,
        config.queue_depth,
    )?;

    tracing::debug!(
        path = %target.path.display(),
        free,
        reserve = config.reserve,
        total_bytes,
        chunks = target.chunk_count(),
        "planned run"
    );
    Ok(target)
}

/// Query the free space of `dir` and plan a run there
pub fn plan(dir: &Path, config: &FillConfig, size_limit: Option<u64>) -> Result<RunPlan> {
    if !dir.is_dir() {
        return Err(DiskFillError::ConfigError(format!(
            "Invalid directory: {}",
            dir.display()
        )));
    }
    let free_bytes = available_space(dir)?;
    let target = plan_target(dir, config, free_bytes, size_limit)?;
    Ok(RunPlan { target, free_bytes })
}
