//! Per-pass accounting and the cancellation signal

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use crate::digest::{DigestAlgorithm, IncrementalDigest};
use crate::models::{PassKind, RunResult};
use crate::pipeline::progress::ProgressCounter;

/// Mutable state of the pass currently running.
///
/// Owned by that pass alone; only the byte counter is visible to the
/// progress ticker. Consumed into a [`RunResult`] when the pass ends.
pub struct RunAccounting {
    pass: PassKind,
    started: Instant,
    counter: ProgressCounter,
    bytes_processed: u64,
    digest: Box<dyn IncrementalDigest>,
}

impl RunAccounting {
    /// Start accounting for `pass` now, with a fresh digest
    pub fn start(pass: PassKind, algorithm: DigestAlgorithm) -> Self {
        Self {
            pass,
            started: Instant::now(),
            counter: ProgressCounter::new(),
            bytes_processed: 0,
            digest: algorithm.start(),
        }
    }

    /// Hash `data` and count it as processed
    pub fn record(&mut self, data: &[u8]) {
        self.digest.update(data);
        self.bytes_processed += data.len() as u64;
        self.counter.add(data.len() as u64);
    }

    pub fn bytes_processed(&self) -> u64 {
        self.bytes_processed
    }

    pub fn started(&self) -> Instant {
        self.started
    }

    /// Read-only handle for the progress ticker
    pub fn counter(&self) -> ProgressCounter {
        self.counter.clone()
    }

    /// Close the pass: finalize the digest and take the elapsed time
    pub fn finish(self) -> RunResult {
        let elapsed = self.started.elapsed();
        RunResult::new(self.pass, self.bytes_processed, elapsed, self.digest.finalize())
    }
}

/// Request for prompt teardown of a running pass.
///
/// Checked by the pipeline tasks between chunks.
#[derive(Debug, Clone, Default)]
pub struct CancelSignal(Arc<AtomicBool>);

impl CancelSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_counts_and_hashes() {
        let mut accounting = RunAccounting::start(PassKind::Write, DigestAlgorithm::Sha256);
        let counter = accounting.counter();
        accounting.record(b"ab");
        accounting.record(b"c");
        assert_eq!(accounting.bytes_processed(), 3);
        assert_eq!(counter.get(), 3);

        let result = accounting.finish();
        assert_eq!(result.pass, PassKind::Write);
        assert_eq!(result.total_bytes, 3);
        assert_eq!(
            result.digest,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_cancel_signal_is_shared() {
        let signal = CancelSignal::new();
        let observer = signal.clone();
        assert!(!observer.is_cancelled());
        signal.cancel();
        assert!(observer.is_cancelled());
    }
}
