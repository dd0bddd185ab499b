//! Integrity comparison between the write and read passes

use crate::models::{IntegrityVerdict, RunResult};

/// Compare the two passes.
///
/// `Ok` only when both byte counts and both hex digests are equal.
pub fn compare(write: &RunResult, read: &RunResult) -> IntegrityVerdict {
    let size_mismatch = write.total_bytes != read.total_bytes;
    let digest_mismatch = write.digest.as_bytes() != read.digest.as_bytes();

    if size_mismatch || digest_mismatch {
        IntegrityVerdict::Failed {
            size_mismatch,
            digest_mismatch,
        }
    } else {
        IntegrityVerdict::Ok
    }
}
