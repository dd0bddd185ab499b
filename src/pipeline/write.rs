//! Write pass
//!
//! A generator thread fills chunks with pseudorandom bytes and pushes them
//! through a bounded channel; a writer thread appends them to the test file
//! in order, hashing the same bytes, and forces the file to stable storage
//! once the last chunk is written.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task;
use crate::digest::DigestAlgorithm;
use crate::io::buffer::{BufferPool, Chunk};
use crate::io::disk::DiskIO;
use crate::models::{PassKind, RunResult, RunTarget};
use crate::pipeline::accounting::{CancelSignal, RunAccounting};
use crate::pipeline::channel::{self, ChunkReceiver, ChunkSender};
use crate::pipeline::progress::{ProgressTicker, ProgressUpdate, DEFAULT_PROGRESS_INTERVAL};
use crate::pipeline::source::ChunkSource;
use crate::{DiskFillError, Result};

/// How the writer thread stopped without an error
enum WriterOutcome {
    /// Every planned byte was written and synced
    Complete(RunResult),
    /// The generator closed the channel early
    StreamEnded { bytes_completed: u64 },
}

/// Write pass executor
pub struct WritePipeline {
    target: RunTarget,
    disk_io: Arc<dyn DiskIO>,
    digest: DigestAlgorithm,
    seed: Option<u64>,
    progress_interval: Duration,
    cancel: CancelSignal,
}

impl WritePipeline {
    pub fn new(target: RunTarget, disk_io: Arc<dyn DiskIO>) -> Self {
        Self {
            target,
            disk_io,
            digest: DigestAlgorithm::default(),
            seed: None,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            cancel: CancelSignal::new(),
        }
    }

    pub fn with_digest(mut self, digest: DigestAlgorithm) -> Self {
        self.digest = digest;
        self
    }

    /// Make the generated byte stream reproducible
    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
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

    /// Write exactly `total_bytes` to the target path.
    ///
    /// Any write or sync error aborts the pass immediately with
    /// [`DiskFillError::WriteFailed`]; the partial file is left for the
    /// caller to keep or delete.
    pub async fn run(&self, progress_tx: mpsc::Sender<ProgressUpdate>) -> Result<RunResult> {
        let target = &self.target;
        target.validate()?;
        tracing::info!(
            path = %target.path.display(),
            total_bytes = target.total_bytes,
            chunk_size = target.chunk_size,
            chunks = target.chunk_count(),
            queue_depth = target.queue_depth,
            disk_io = self.disk_io.name(),
            "write pass starting"
        );

        // Queue slots plus the chunk being generated and the one being written
        let pool = BufferPool::new(target.chunk_size, target.queue_depth + 2)?;
        let (chunk_tx, chunk_rx) = channel::bounded(target.queue_depth);
        let accounting = RunAccounting::start(PassKind::Write, self.digest);
        let ticker = ProgressTicker::spawn(
            PassKind::Write,
            target.total_bytes,
            accounting.counter(),
            accounting.started(),
            self.progress_interval,
            progress_tx,
        );

        let producer = {
            let target = target.clone();
            let source = ChunkSource::new(pool.clone(), self.seed);
            let cancel = self.cancel.clone();
            task::spawn_blocking(move || produce(&target, source, chunk_tx, &cancel))
        };

        let writer = {
            let target = target.clone();
            let disk_io = Arc::clone(&self.disk_io);
            let cancel = self.cancel.clone();
            task::spawn_blocking(move || {
                write_chunks(&target, disk_io.as_ref(), chunk_rx, pool, accounting, &cancel)
            })
        };

        let written = writer.await.unwrap_or_else(|e| {
            Err(DiskFillError::GenerationFailed(format!("writer task failed: {}", e)))
        });
        let produced = producer.await.unwrap_or_else(|e| {
            Err(DiskFillError::GenerationFailed(format!("generator task failed: {}", e)))
        });
        ticker.finish().await;

        let result = match (written, produced) {
            (Err(e), _) => Err(e),
            (Ok(_), Err(e)) => Err(e),
            (Ok(WriterOutcome::Complete(result)), Ok(())) => Ok(result),
            (Ok(WriterOutcome::StreamEnded { bytes_completed }), Ok(())) => {
                if self.cancel.is_cancelled() {
                    Err(DiskFillError::Cancelled { bytes_completed })
                } else {
                    Err(DiskFillError::GenerationFailed(format!(
                        "generator stopped after {} of {} bytes",
                        bytes_completed, target.total_bytes
                    )))
                }
            }
        };

        match &result {
            Ok(result) => tracing::info!(
                bytes = result.total_bytes,
                elapsed_ms = result.elapsed.as_millis() as u64,
                mibps = result.throughput_mibps(),
                digest = %result.digest,
                "write pass complete"
            ),
            Err(e) => tracing::warn!(error = %e, "write pass aborted"),
        }
        result
    }
}

/// Generator side: one chunk per planned length, in order.
///
/// Dropping `tx` on return closes the channel. A closed channel means the
/// writer gave up, which is not an error of the generator.
fn produce(
    target: &RunTarget,
    mut source: ChunkSource,
    tx: ChunkSender<Chunk>,
    cancel: &CancelSignal,
) -> Result<()> {
    for len in target.chunk_lengths() {
        if cancel.is_cancelled() {
            tracing::debug!(bytes_produced = source.bytes_produced(), "generator cancelled");
            return Ok(());
        }

        let chunk = source.next(len)?;
        if tx.blocking_push(chunk).is_err() {
            tracing::debug!(bytes_produced = source.bytes_produced(), "writer closed the channel");
            return Ok(());
        }
    }
    Ok(())
}

/// Writer side: append, hash, count, recycle; sync once the stream ends
fn write_chunks(
    target: &RunTarget,
    disk_io: &dyn DiskIO,
    mut rx: ChunkReceiver<Chunk>,
    pool: BufferPool,
    mut accounting: RunAccounting,
    cancel: &CancelSignal,
) -> Result<WriterOutcome> {
    let mut file = match disk_io.open_sequential_write(&target.path) {
        Ok(file) => file,
        Err(source) => {
            rx.close();
            return Err(DiskFillError::WriteFailed {
                bytes_completed: 0,
                source,
            });
        }
    };

    loop {
        if cancel.is_cancelled() {
            rx.close();
            return Err(DiskFillError::Cancelled {
                bytes_completed: accounting.bytes_processed(),
            });
        }

        let Some(chunk) = rx.blocking_pop() else {
            break;
        };

        if let Err(source) = file.write_chunk(chunk.as_slice()) {
            rx.close();
            return Err(DiskFillError::WriteFailed {
                bytes_completed: accounting.bytes_processed(),
                source,
            });
        }

        accounting.record(chunk.as_slice());
        pool.recycle(chunk);
    }

    let bytes_completed = accounting.bytes_processed();
    if bytes_completed < target.total_bytes {
        return Ok(WriterOutcome::StreamEnded { bytes_completed });
    }

    tracing::debug!(bytes = bytes_completed, "syncing test file to stable storage");
    file.sync_all().map_err(|source| DiskFillError::WriteFailed {
        bytes_completed,
        source,
    })?;
    drop(file);

    Ok(WriterOutcome::Complete(accounting.finish()))
}
