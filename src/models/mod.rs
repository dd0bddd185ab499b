//! Data models module
//!
//! Contains run targets, per-pass results, the integrity verdict and the
//! report that bundles them.

pub mod result;

// Re-export commonly used types
pub use result::{IntegrityVerdict, PassKind, RunReport, RunResult, RunTarget};
