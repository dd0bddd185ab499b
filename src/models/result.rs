//! Run data models
//!
//! Contains the immutable values a run is described by: the target it
//! writes, the result of each pass, the integrity verdict and the
//! serializable report that bundles them.

use crate::digest::DigestAlgorithm;
use crate::{DiskFillError, Result, MAX_QUEUE_DEPTH};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Which traversal of the test file a value belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassKind {
    Write,
    Read,
}

impl PassKind {
    /// Label used in console output and log fields
    pub fn label(&self) -> &'static str {
        match self {
            PassKind::Write => "Write",
            PassKind::Read => "Read",
        }
    }
}

impl fmt::Display for PassKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Everything one execution needs to know about the file it produces.
///
/// Built once before the write pass and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunTarget {
    /// Destination file path
    pub path: PathBuf,
    /// Exact number of bytes the write pass produces
    pub total_bytes: u64,
    /// Size of every chunk except possibly the last one
    pub chunk_size: usize,
    /// Chunks allowed in flight between producer and writer
    pub queue_depth: usize,
}

impl RunTarget {
    /// Create a run target, rejecting a zero chunk size and a queue depth
    /// outside `1..=MAX_QUEUE_DEPTH`
    pub fn new(path: PathBuf, total_bytes: u64, chunk_size: usize, queue_depth: usize) -> Result<Self> {
        let target = Self {
            path,
            total_bytes,
            chunk_size,
            queue_depth,
        };
        target.validate()?;
        Ok(target)
    }

    /// Check the invariants `new` enforces; the fields are public
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(DiskFillError::ConfigError(
                "Chunk size must be greater than 0".to_string(),
            ));
        }
        if self.queue_depth == 0 || self.queue_depth > MAX_QUEUE_DEPTH {
            return Err(DiskFillError::ConfigError(format!(
                "Queue depth must be between 1 and {}: {}",
                MAX_QUEUE_DEPTH, self.queue_depth
            )));
        }
        Ok(())
    }

    /// Number of chunks needed to cover `total_bytes`
    pub fn chunk_count(&self) -> u64 {
        self.total_bytes.div_ceil(self.chunk_size as u64)
    }

    /// Length of the final chunk, or 0 when nothing is written
    pub fn last_chunk_len(&self) -> usize {
        match self.chunk_count() {
            0 => 0,
            count => (self.total_bytes - self.chunk_size as u64 * (count - 1)) as usize,
        }
    }

    /// Length of every chunk in write order
    pub fn chunk_lengths(&self) -> impl Iterator<Item = usize> {
        let count = self.chunk_count();
        let chunk_size = self.chunk_size;
        let last = self.last_chunk_len();
        (0..count).map(move |i| if i + 1 == count { last } else { chunk_size })
    }
}

/// Summary of one completed pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    /// Pass this result describes
    pub pass: PassKind,
    /// Bytes written or read
    pub total_bytes: u64,
    /// Wall time of the pass, including the durability barrier for writes
    #[serde(with = "duration_serde")]
    pub elapsed: Duration,
    /// Average rate over the whole pass in bytes per second
    pub rate_bytes_per_sec: f64,
    /// Lowercase hex digest of every byte of the pass, in file order
    pub digest: String,
}

impl RunResult {
    /// Create a result, deriving the average rate from bytes and time
    pub fn new(pass: PassKind, total_bytes: u64, elapsed: Duration, digest: String) -> Self {
        let secs = elapsed.as_secs_f64();
        let rate_bytes_per_sec = if secs > 0.0 {
            total_bytes as f64 / secs
        } else {
            0.0
        };

        Self {
            pass,
            total_bytes,
            elapsed,
            rate_bytes_per_sec,
            digest,
        }
    }

    /// Average rate in MiB/s
    pub fn throughput_mibps(&self) -> f64 {
        self.rate_bytes_per_sec / (1024.0 * 1024.0)
    }
}

/// Outcome of comparing the write pass against the read pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum IntegrityVerdict {
    Ok,
    Failed {
        size_mismatch: bool,
        digest_mismatch: bool,
    },
}

impl IntegrityVerdict {
    pub fn is_ok(&self) -> bool {
        matches!(self, IntegrityVerdict::Ok)
    }

    /// Human-readable reason for a failed verdict
    pub fn reason(&self) -> Option<String> {
        match self {
            IntegrityVerdict::Ok => None,
            IntegrityVerdict::Failed {
                size_mismatch,
                digest_mismatch,
            } => {
                let mut reasons = Vec::new();
                if *size_mismatch {
                    reasons.push("size mismatch");
                }
                if *digest_mismatch {
                    reasons.push("digest mismatch");
                }
                Some(reasons.join(", "))
            }
        }
    }
}

impl fmt::Display for IntegrityVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.reason() {
            None => f.write_str("OK"),
            Some(reason) => write!(f, "FAILED ({})", reason),
        }
    }
}

/// Complete record of a run, as written to the report file and history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Timestamp when the run finished
    pub timestamp: DateTime<Utc>,
    /// Target the write pass produced
    pub target: RunTarget,
    /// Digest algorithm used by both passes
    pub digest_algorithm: DigestAlgorithm,
    /// Result of the write pass
    pub write: RunResult,
    /// Result of the read pass
    pub read: RunResult,
    /// Comparison of the two passes
    pub verdict: IntegrityVerdict,
    /// Whether the test file was left on the device
    pub file_kept: bool,
}

impl RunReport {
    pub fn new(
        target: RunTarget,
        digest_algorithm: DigestAlgorithm,
        write: RunResult,
        read: RunResult,
        verdict: IntegrityVerdict,
        file_kept: bool,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            target,
            digest_algorithm,
            write,
            read,
            verdict,
            file_kept,
        }
    }
}

mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_nanos().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let nanos = u128::deserialize(deserializer)?;
        Ok(Duration::from_nanos(nanos as u64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(total: u64, chunk: usize) -> RunTarget {
        RunTarget::new(PathBuf::from("fill.bin"), total, chunk, 3).unwrap()
    }

    #[test]
    fn test_exact_multiple_has_no_short_chunk() {
        let target = target(192, 64);
        assert_eq!(target.chunk_count(), 3);
        assert_eq!(target.last_chunk_len(), 64);
        assert_eq!(target.chunk_lengths().collect::<Vec<_>>(), vec![64, 64, 64]);
    }

    #[test]
    fn test_remainder_goes_to_last_chunk() {
        let target = target(200, 64);
        assert_eq!(target.chunk_count(), 4);
        assert_eq!(target.last_chunk_len(), 8);
        let lengths: Vec<_> = target.chunk_lengths().collect();
        assert_eq!(lengths, vec![64, 64, 64, 8]);
        assert_eq!(lengths.iter().sum::<usize>() as u64, 200);
    }

    #[test]
    fn test_chunk_lengths_cover_total_for_many_sizes() {
        for chunk in [1usize, 3, 7, 64, 4096] {
            for total in [0u64, 1, 63, 64, 65, 1000, 4096 * 3 + 1] {
                let target = target(total, chunk);
                let lengths: Vec<_> = target.chunk_lengths().collect();
                assert_eq!(lengths.iter().map(|&l| l as u64).sum::<u64>(), total);
                assert!(lengths.iter().all(|&l| l > 0 && l <= chunk));
                let short = lengths.iter().filter(|&&l| l < chunk).count();
                if total % chunk as u64 == 0 {
                    assert_eq!(short, 0);
                } else {
                    assert_eq!(short, 1);
                    assert_eq!(*lengths.last().unwrap() as u64, total % chunk as u64);
                }
            }
        }
    }

    #[test]
    fn test_zero_total_has_no_chunks() {
        let target = target(0, 64);
        assert_eq!(target.chunk_count(), 0);
        assert_eq!(target.last_chunk_len(), 0);
        assert_eq!(target.chunk_lengths().count(), 0);
    }

    #[test]
    fn test_target_rejects_zero_chunk_and_depth() {
        assert!(RunTarget::new(PathBuf::from("x"), 10, 0, 1).is_err());
        assert!(RunTarget::new(PathBuf::from("x"), 10, 1, 0).is_err());
    }

    #[test]
    fn test_target_rejects_oversized_depth() {
        assert!(RunTarget::new(PathBuf::from("x"), 64, 64, MAX_QUEUE_DEPTH).is_ok());
        for depth in [MAX_QUEUE_DEPTH + 1, usize::MAX >> 2, usize::MAX] {
            assert!(matches!(
                RunTarget::new(PathBuf::from("x"), 64, 64, depth),
                Err(DiskFillError::ConfigError(_))
            ));
        }
    }

    #[test]
    fn test_run_result_rate() {
        let result = RunResult::new(PassKind::Write, 2 * 1024 * 1024, Duration::from_secs(2), String::new());
        assert!((result.rate_bytes_per_sec - 1024.0 * 1024.0).abs() < 0.01);
        assert!((result.throughput_mibps() - 1.0).abs() < 0.0001);

        let instant = RunResult::new(PassKind::Read, 10, Duration::ZERO, String::new());
        assert_eq!(instant.rate_bytes_per_sec, 0.0);
    }

    #[test]
    fn test_verdict_display() {
        assert_eq!(IntegrityVerdict::Ok.to_string(), "OK");
        let failed = IntegrityVerdict::Failed {
            size_mismatch: true,
            digest_mismatch: true,
        };
        assert_eq!(failed.to_string(), "FAILED (size mismatch, digest mismatch)");
        assert!(!failed.is_ok());
    }

    #[test]
    fn test_report_json_roundtrip() {
        let write = RunResult::new(PassKind::Write, 192, Duration::from_millis(5), "ab".repeat(32));
        let read = RunResult::new(PassKind::Read, 192, Duration::from_millis(3), "ab".repeat(32));
        let report = RunReport::new(
            target(192, 64),
            DigestAlgorithm::Sha256,
            write,
            read,
            IntegrityVerdict::Ok,
            false,
        );

        let json = serde_json::to_string(&report).unwrap();
        let back: RunReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back.target, report.target);
        assert_eq!(back.write, report.write);
        assert_eq!(back.verdict, IntegrityVerdict::Ok);
        assert!(json.contains("\"status\":\"ok\""));
    }
}
