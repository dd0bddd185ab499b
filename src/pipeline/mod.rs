//! Fill-and-verify pipeline
//!
//! Contains the chunk generator, the bounded channel between generator and
//! writer, both passes, progress reporting and the integrity comparison.

pub mod accounting;
pub mod channel;
pub mod progress;
pub mod read;
pub mod runner;
pub mod source;
pub mod verify;
pub mod write;

// Re-export commonly used types
pub use accounting::CancelSignal;
pub use progress::{ProgressUpdate, DEFAULT_PROGRESS_INTERVAL};
pub use read::ReadPipeline;
pub use runner::{DiskFillTest, PassObserver, TestOutcome};
pub use verify::compare;
pub use write::WritePipeline;
