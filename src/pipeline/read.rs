//! Read pass
//!
//! One sequential loop on a blocking worker thread: read chunk-sized blocks
//! until end of file, hashing and counting each one.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task;
use crate::digest::DigestAlgorithm;
use crate::io::buffer::BufferPool;
use crate::io::disk::DiskIO;
use crate::models::{PassKind, RunResult, RunTarget};
use crate::pipeline::accounting::{CancelSignal, RunAccounting};
use crate::pipeline::progress::{ProgressTicker, ProgressUpdate, DEFAULT_PROGRESS_INTERVAL};
use crate::{DiskFillError, Result};

/// Read pass executor
pub struct ReadPipeline {
    target: RunTarget,
    disk_io: Arc<dyn DiskIO>,
    digest: DigestAlgorithm,
    progress_interval: Duration,
    cancel: CancelSignal,
}

impl ReadPipeline {
    pub fn new(target: RunTarget, disk_io: Arc<dyn DiskIO>) -> Self {
        Self {
            target,
            disk_io,
            digest: DigestAlgorithm::default(),
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            cancel: CancelSignal::new(),
        }
    }

    pub fn with_digest(mut self, digest: DigestAlgorithm) -> Self {
        self.digest = digest;
        self
    }

    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }

    pub fn with_cancel_signal(mut self, cancel: CancelSignal) -> Self {
        self.cancel = cancel;
        self
    }

    /// Read the target file back to end of file.
    ///
    /// A file shorter or longer than planned is not an error here: the
    /// returned byte count tells the comparator what was actually found.
    pub async fn run(&self, progress_tx: mpsc::Sender<ProgressUpdate>) -> Result<RunResult> {
        let target = &self.target;
        tracing::info!(
            path = %target.path.display(),
            expected_bytes = target.total_bytes,
            chunk_size = target.chunk_size,
            disk_io = self.disk_io.name(),
            "read pass starting"
        );

        let accounting = RunAccounting::start(PassKind::Read, self.digest);
        let ticker = ProgressTicker::spawn(
            PassKind::Read,
            target.total_bytes,
            accounting.counter(),
            accounting.started(),
            self.progress_interval,
            progress_tx,
        );

        let reader = {
            let target = target.clone();
            let disk_io = Arc::clone(&self.disk_io);
            let cancel = self.cancel.clone();
            task::spawn_blocking(move || read_to_end(&target, disk_io.as_ref(), accounting, &cancel))
        };

        let result = reader.await.unwrap_or_else(|e| {
            Err(DiskFillError::ReadFailed {
                bytes_completed: 0,
                source: std::io::Error::new(std::io::ErrorKind::Other, e.to_string()),
            })
        });
        ticker.finish().await;

        match &result {
            Ok(result) => tracing::info!(
                bytes = result.total_bytes,
                elapsed_ms = result.elapsed.as_millis() as u64,
                mibps = result.throughput_mibps(),
                digest = %result.digest,
                "read pass complete"
            ),
            Err(e) => tracing::warn!(error = %e, "read pass aborted"),
        }
        result
    }
}

fn read_to_end(
    target: &RunTarget,
    disk_io: &dyn DiskIO,
    mut accounting: RunAccounting,
    cancel: &CancelSignal,
) -> Result<RunResult> {
    let mut file = disk_io
        .open_sequential_read(&target.path)
        .map_err(|source| DiskFillError::ReadFailed {
            bytes_completed: 0,
            source,
        })?;
    let mut buffer = BufferPool::new(target.chunk_size, 1)?.get_buffer()?;

    loop {
        if cancel.is_cancelled() {
            return Err(DiskFillError::Cancelled {
                bytes_completed: accounting.bytes_processed(),
            });
        }

        let n = file
            .read_chunk(&mut buffer)
            .map_err(|source| DiskFillError::ReadFailed {
                bytes_completed: accounting.bytes_processed(),
                source,
            })?;
        if n == 0 {
            break;
        }
        accounting.record(&buffer[..n]);
    }

    let bytes_read = accounting.bytes_processed();
    if bytes_read != target.total_bytes {
        tracing::warn!(
            expected = target.total_bytes,
            actual = bytes_read,
            "test file length differs from the planned size"
        );
    }

    Ok(accounting.finish())
}
