//! Units formatting utilities
//!
//! Provides functions for human-readable formatting of sizes, durations
//! and throughput as printed by the console.

use std::time::Duration;

const BYTES_PER_MIB: f64 = 1024.0 * 1024.0;

/// Bytes expressed in MiB
pub fn mib(bytes: u64) -> f64 {
    bytes as f64 / BYTES_PER_MIB
}

/// Format bytes into human-readable size with appropriate units
///
/// # Examples
/// ```
/// use diskfill::util::units::format_bytes;
///
/// assert_eq!(format_bytes(1024), "1.0 KiB");
/// assert_eq!(format_bytes(1048576), "1.0 MiB");
/// assert_eq!(format_bytes(1073741824), "1.0 GiB");
/// ```
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KiB", "MiB", "GiB", "TiB", "PiB"];
    const THRESHOLD: f64 = 1024.0;

    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= THRESHOLD && unit_index < UNITS.len() - 1 {
        size /= THRESHOLD;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}

/// Format bytes as MiB with two decimals and thousands separators
///
/// # Examples
/// ```
/// use diskfill::util::units::format_mib;
///
/// assert_eq!(format_mib(3 * 1024 * 1024 / 2), "1.50 MiB");
/// assert_eq!(format_mib(2048 * 1024 * 1024), "2,048.00 MiB");
/// ```
pub fn format_mib(bytes: u64) -> String {
    format!("{} MiB", group_thousands(mib(bytes), 2))
}

/// Format a duration as minutes and fractional seconds
///
/// # Examples
/// ```
/// use std::time::Duration;
/// use diskfill::util::units::human_time;
///
/// assert_eq!(human_time(Duration::from_millis(1500)), "0m 1.50s");
/// assert_eq!(human_time(Duration::from_secs(125)), "2m 5.00s");
/// ```
pub fn human_time(duration: Duration) -> String {
    let total = duration.as_secs_f64();
    let minutes = (total / 60.0).floor();
    let seconds = total - minutes * 60.0;
    format!("{}m {:.2}s", minutes as u64, seconds)
}

/// Average rate in MiB/s; infinite when no time elapsed
///
/// # Examples
/// ```
/// use std::time::Duration;
/// use diskfill::util::units::human_rate;
///
/// assert_eq!(human_rate(100 * 1024 * 1024, Duration::from_secs(2)), "50.00 MiB/s");
/// assert_eq!(human_rate(1, Duration::ZERO), "∞ MiB/s");
/// ```
pub fn human_rate(bytes: u64, elapsed: Duration) -> String {
    let secs = elapsed.as_secs_f64();
    if secs <= 0.0 {
        return "∞ MiB/s".to_string();
    }
    format_mibps(mib(bytes) / secs)
}

/// Format a rate already expressed in MiB/s
pub fn format_mibps(mibps: f64) -> String {
    format!("{} MiB/s", group_thousands(mibps, 2))
}

/// Fixed-point formatting with `,` between groups of three integer digits
fn group_thousands(value: f64, decimals: usize) -> String {
    let formatted = format!("{:.*}", decimals, value);
    let (sign, digits) = match formatted.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", formatted.as_str()),
    };
    let (int_part, frac_part) = match digits.split_once('.') {
        Some((int_part, frac)) => (int_part, Some(frac)),
        None => (digits, None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    match frac_part {
        Some(frac) => format!("{}{}.{}", sign, grouped, frac),
        None => format!("{}{}", sign, grouped),
    }
}
