//! Full test run: write pass, read pass, comparison

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use crate::digest::DigestAlgorithm;
use crate::io::disk::{DiskIO, PlatformDiskIO};
use crate::models::{IntegrityVerdict, PassKind, RunReport, RunResult, RunTarget};
use crate::pipeline::accounting::CancelSignal;
use crate::pipeline::progress::{ProgressUpdate, DEFAULT_PROGRESS_INTERVAL};
use crate::pipeline::read::ReadPipeline;
use crate::pipeline::verify;
use crate::pipeline::write::WritePipeline;
use crate::Result;

/// Results of both passes and their comparison
#[derive(Debug, Clone)]
pub struct TestOutcome {
    pub write: RunResult,
    pub read: RunResult,
    pub verdict: IntegrityVerdict,
}

impl TestOutcome {
    pub fn into_report(self, target: RunTarget, digest: DigestAlgorithm, file_kept: bool) -> RunReport {
        RunReport::new(target, digest, self.write, self.read, self.verdict, file_kept)
    }
}

/// Hooks a [`DiskFillTest`] calls around each pass
#[allow(async_fn_in_trait)]
pub trait PassObserver {
    /// Sender for the updates of `pass`, requested just before it starts.
    ///
    /// The pipeline drops it when the pass ends.
    fn progress_sender(&mut self, pass: PassKind) -> mpsc::Sender<ProgressUpdate>;

    /// Called once a pass has returned `result`, before the next one starts
    async fn pass_complete(&mut self, result: &RunResult) -> Result<()>;
}

/// One subscriber for both passes; updates carry their pass
impl PassObserver for mpsc::Sender<ProgressUpdate> {
    fn progress_sender(&mut self, _pass: PassKind) -> mpsc::Sender<ProgressUpdate> {
        self.clone()
    }

    async fn pass_complete(&mut self, _result: &RunResult) -> Result<()> {
        Ok(())
    }
}

/// Drives one fill-and-verify cycle against a planned target.
///
/// The passes run strictly one after the other; the read pass never
/// starts unless the write pass returned a result.
pub struct DiskFillTest {
    target: RunTarget,
    disk_io: Arc<dyn DiskIO>,
    digest: DigestAlgorithm,
    seed: Option<u64>,
    progress_interval: Duration,
    cancel: CancelSignal,
}

impl DiskFillTest {
    pub fn new(target: RunTarget) -> Self {
        Self {
            target,
            disk_io: Arc::new(PlatformDiskIO::new()),
            digest: DigestAlgorithm::default(),
            seed: None,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            cancel: CancelSignal::new(),
        }
    }

    /// Replace the file-open collaborator (tests inject faults here)
    pub fn with_disk_io(mut self, disk_io: Arc<dyn DiskIO>) -> Self {
        self.disk_io = disk_io;
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

    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }

    /// Handle that stops the running pass between chunks
    pub fn cancel_signal(&self) -> CancelSignal {
        self.cancel.clone()
    }

    pub async fn write_pass(&self, progress_tx: mpsc::Sender<ProgressUpdate>) -> Result<RunResult> {
        WritePipeline::new(self.target.clone(), Arc::clone(&self.disk_io))
            .with_digest(self.digest)
            .with_seed(self.seed)
            .with_progress_interval(self.progress_interval)
            .with_cancel_signal(self.cancel.clone())
            .run(progress_tx)
            .await
    }

    pub async fn read_pass(&self, progress_tx: mpsc::Sender<ProgressUpdate>) -> Result<RunResult> {
        ReadPipeline::new(self.target.clone(), Arc::clone(&self.disk_io))
            .with_digest(self.digest)
            .with_progress_interval(self.progress_interval)
            .with_cancel_signal(self.cancel.clone())
            .run(progress_tx)
            .await
    }

    /// Write, read back and compare.
    ///
    /// Updates of both passes go to `progress_tx`, tagged with their pass.
    pub async fn run(&self, progress_tx: mpsc::Sender<ProgressUpdate>) -> Result<TestOutcome> {
        let mut progress_tx = progress_tx;
        self.run_observed(&mut progress_tx).await
    }

    /// Write, read back and compare, reporting each pass to `observer`
    pub async fn run_observed(&self, observer: &mut impl PassObserver) -> Result<TestOutcome> {
        let write = self.write_pass(observer.progress_sender(PassKind::Write)).await?;
        observer.pass_complete(&write).await?;

        let read = self.read_pass(observer.progress_sender(PassKind::Read)).await?;
        observer.pass_complete(&read).await?;

        let verdict = verify::compare(&write, &read);
        if verdict.is_ok() {
            tracing::info!(digest = %write.digest, "integrity verified");
        } else {
            tracing::warn!(
                write_bytes = write.total_bytes,
                read_bytes = read.total_bytes,
                write_digest = %write.digest,
                read_digest = %read.digest,
                "integrity check failed"
            );
        }

        Ok(TestOutcome {
            write,
            read,
            verdict,
        })
    }
}
