//! Utility functions module
//!
//! Contains helper functions for units formatting.

pub mod units;

// Re-export commonly used functions
pub use units::{format_bytes, format_mib, format_mibps, human_rate, human_time, mib};
