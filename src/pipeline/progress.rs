//! Progress accounting shared by both passes
//!
//! The running pipeline is the only writer of its [`ProgressCounter`]. A
//! [`ProgressTicker`] task samples the counter on a timer, turns samples into
//! [`ProgressUpdate`]s through a [`ProgressReporter`] and hands them to the
//! subscriber without ever waiting on it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use crate::models::PassKind;

/// Default spacing between progress updates
pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_millis(250);

/// Progress update sent during a pass
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressUpdate {
    /// Pass the update belongs to
    pub pass: PassKind,
    /// Bytes processed so far
    pub bytes_processed: u64,
    /// Total bytes to process
    pub total_bytes: u64,
    /// Elapsed time since the pass started
    pub elapsed: Duration,
    /// Rate between the two most recent samples, in bytes per second
    pub instantaneous_rate: f64,
    /// Estimated time remaining; `None` while the rate is zero
    pub eta: Option<Duration>,
}

impl ProgressUpdate {
    /// Calculate completion percentage (0.0 to 1.0)
    pub fn completion_percentage(&self) -> f64 {
        if self.total_bytes == 0 {
            1.0
        } else {
            (self.bytes_processed as f64) / (self.total_bytes as f64)
        }
    }

    /// Instantaneous rate in MiB/s
    pub fn rate_mibps(&self) -> f64 {
        self.instantaneous_rate / (1024.0 * 1024.0)
    }
}

/// One observation of a pass: bytes done after `elapsed`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSample {
    pub elapsed: Duration,
    pub bytes_processed: u64,
}

impl ProgressSample {
    pub fn new(elapsed: Duration, bytes_processed: u64) -> Self {
        Self {
            elapsed,
            bytes_processed,
        }
    }
}

/// Turns samples into rate-limited updates.
///
/// Samples arriving closer than `min_interval` to the last accepted one are
/// dropped, and the rate is computed between the two most recent accepted
/// samples so it reflects current throughput.
#[derive(Debug, Clone)]
pub struct ProgressReporter {
    pass: PassKind,
    total_bytes: u64,
    min_interval: Duration,
    previous: Option<ProgressSample>,
}

impl ProgressReporter {
    pub fn new(pass: PassKind, total_bytes: u64, min_interval: Duration) -> Self {
        Self {
            pass,
            total_bytes,
            min_interval,
            previous: None,
        }
    }

    /// Feed a sample; returns an update unless the sample was rate-limited
    pub fn observe(&mut self, sample: ProgressSample) -> Option<ProgressUpdate> {
        if let Some(previous) = self.previous {
            if sample.elapsed.saturating_sub(previous.elapsed) < self.min_interval {
                return None;
            }
        }
        Some(self.accept(sample))
    }

    /// Feed the last sample of a pass; never rate-limited
    pub fn finish(&mut self, sample: ProgressSample) -> ProgressUpdate {
        self.accept(sample)
    }

    fn accept(&mut self, sample: ProgressSample) -> ProgressUpdate {
        let instantaneous_rate = match self.previous {
            Some(previous) => {
                let dt = sample.elapsed.saturating_sub(previous.elapsed).as_secs_f64();
                let db = sample.bytes_processed.saturating_sub(previous.bytes_processed);
                if dt > 0.0 {
                    db as f64 / dt
                } else {
                    0.0
                }
            }
            None => 0.0,
        };

        let remaining = self.total_bytes.saturating_sub(sample.bytes_processed);
        let eta = if remaining == 0 {
            Some(Duration::ZERO)
        } else if instantaneous_rate > 0.0 {
            Some(Duration::from_secs_f64(remaining as f64 / instantaneous_rate))
        } else {
            None
        };

        self.previous = Some(sample);

        ProgressUpdate {
            pass: self.pass,
            bytes_processed: sample.bytes_processed,
            total_bytes: self.total_bytes,
            elapsed: sample.elapsed,
            instantaneous_rate,
            eta,
        }
    }
}

/// Monotonic byte counter written by a pipeline and read by its ticker
#[derive(Debug, Clone, Default)]
pub struct ProgressCounter(Arc<AtomicU64>);

impl ProgressCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, bytes: u64) {
        self.0.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Reporter spacing for samples taken every `interval`.
///
/// A late tick is followed by an early one, so the gap between two
/// scheduled samples can be well under the tick period.
fn tick_min_gap(interval: Duration) -> Duration {
    interval / 2
}

/// Timer task that publishes progress for one pass
pub struct ProgressTicker {
    stop_tx: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl ProgressTicker {
    /// Start sampling `counter` every `interval` on the current runtime.
    ///
    /// Updates are delivered with `try_send`: when the subscriber lags, the
    /// update is dropped rather than queued.
    pub fn spawn(
        pass: PassKind,
        total_bytes: u64,
        counter: ProgressCounter,
        started: Instant,
        interval: Duration,
        progress_tx: mpsc::Sender<ProgressUpdate>,
    ) -> Self {
        let (stop_tx, mut stop_rx) = oneshot::channel();
        let mut reporter = ProgressReporter::new(pass, total_bytes, tick_min_gap(interval));

        let handle = tokio::spawn(async move {
            let mut ticks = tokio::time::interval(interval.max(Duration::from_millis(1)));
            ticks.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticks.tick() => {
                        let sample = ProgressSample::new(started.elapsed(), counter.get());
                        if let Some(update) = reporter.observe(sample) {
                            if let Err(mpsc::error::TrySendError::Closed(_)) = progress_tx.try_send(update) {
                                break;
                            }
                        }
                    }
                    _ = &mut stop_rx => {
                        let sample = ProgressSample::new(started.elapsed(), counter.get());
                        let _ = progress_tx.try_send(reporter.finish(sample));
                        break;
                    }
                }
            }
        });

        Self { stop_tx, handle }
    }

    /// Publish the final update and wait for the task to exit
    pub async fn finish(self) {
        let _ = self.stop_tx.send(());
        let _ = self.handle.await;
    }
}
