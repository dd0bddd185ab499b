//! Console rendering for the command-line front end
//!
//! Text blocks are written to a caller-supplied writer. Live progress is
//! drawn with `indicatif`, one bar per pass, from the update stream of a
//! running [`DiskFillTest`](crate::DiskFillTest).

use std::io::{self, Write};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use crate::config::FillConfig;
use crate::digest::DigestAlgorithm;
use crate::models::{IntegrityVerdict, PassKind, RunResult, RunTarget};
use crate::pipeline::{ProgressUpdate, TestOutcome};
use crate::util::units::{format_bytes, format_mib, format_mibps, human_rate, human_time, mib};

/// Configuration block printed before the write pass
pub fn write_banner(
    out: &mut impl Write,
    target: &RunTarget,
    config: &FillConfig,
    free: u64,
) -> io::Result<()> {
    writeln!(out, "=== Test configuration ===")?;
    writeln!(out, "Destination:       {}", target.path.display())?;
    writeln!(out, "Free space:        {}", format_bytes(free))?;
    writeln!(out, "Planned file size: {}", format_mib(target.total_bytes))?;
    writeln!(out, "I/O block:         {}", format_mib(target.chunk_size as u64))?;
    writeln!(out, "Reserve:           {}", format_mib(config.reserve))?;
    writeln!(out, "Queue depth:       {}", target.queue_depth)?;
    writeln!(out, "Digest:            {}", config.digest)?;
    writeln!(out, "==================================")
}

/// Result block printed after each pass
pub fn write_pass_summary(
    out: &mut impl Write,
    result: &RunResult,
    digest: DigestAlgorithm,
) -> io::Result<()> {
    let verb = match result.pass {
        PassKind::Write => "Written",
        PassKind::Read => "Read",
    };
    writeln!(out, "--- {} completed ---", result.pass)?;
    writeln!(
        out,
        "{}: {} in {} ({})",
        verb,
        format_mib(result.total_bytes),
        human_time(result.elapsed),
        human_rate(result.total_bytes, result.elapsed)
    )?;
    writeln!(
        out,
        "{} ({}): {}",
        digest,
        result.pass.label().to_lowercase(),
        result.digest
    )
}

pub fn write_verdict(out: &mut impl Write, verdict: &IntegrityVerdict) -> io::Result<()> {
    match verdict.reason() {
        None => writeln!(out, "\nINTEGRITY OK"),
        Some(reason) => writeln!(out, "\nINTEGRITY FAILED: {}", reason),
    }
}

/// Final table covering both passes
pub fn write_summary(out: &mut impl Write, outcome: &TestOutcome) -> io::Result<()> {
    let TestOutcome {
        write,
        read,
        verdict,
    } = outcome;

    writeln!(out, "\n=== Summary ===")?;
    writeln!(out, "File size:        {}", format_mib(write.total_bytes))?;
    writeln!(
        out,
        "Write time:       {}  | {}",
        human_time(write.elapsed),
        human_rate(write.total_bytes, write.elapsed)
    )?;
    writeln!(
        out,
        "Read time:        {}  | {}",
        human_time(read.elapsed),
        human_rate(read.total_bytes, read.elapsed)
    )?;
    writeln!(
        out,
        "Integrity result: {}",
        if verdict.is_ok() { "OK" } else { "ERROR" }
    )
}

/// Text shown next to a pass's progress bar
pub fn progress_line(update: &ProgressUpdate) -> String {
    let eta = match update.eta {
        Some(eta) => human_time(eta),
        None => "--".to_string(),
    };
    format!(
        "{:6.2}% | {:.0}/{:.0} MiB | {} | ETA {}",
        update.completion_percentage() * 100.0,
        mib(update.bytes_processed),
        mib(update.total_bytes),
        format_mibps(update.rate_mibps()),
        eta
    )
}

/// Draws progress bars from an update stream
pub struct ProgressRenderer {
    hidden: bool,
}

impl ProgressRenderer {
    pub fn new() -> Self {
        Self { hidden: false }
    }

    /// Consume updates without drawing anything
    pub fn hidden() -> Self {
        Self { hidden: true }
    }

    /// Render until every sender of `rx` is dropped.
    ///
    /// A new bar starts whenever the pass of the incoming updates changes.
    pub fn spawn(self, mut rx: mpsc::Receiver<ProgressUpdate>) -> JoinHandle<u64> {
        tokio::spawn(async move {
            let mut current: Option<(PassKind, ProgressBar)> = None;
            let mut rendered = 0u64;

            while let Some(update) = rx.recv().await {
                let switch = !matches!(&current, Some((pass, _)) if *pass == update.pass);
                if switch {
                    if let Some((_, bar)) = current.take() {
                        bar.finish();
                    }
                    current = Some((update.pass, self.bar(update.pass, update.total_bytes)));
                }

                if let Some((_, bar)) = &current {
                    bar.set_position(update.bytes_processed);
                    bar.set_message(progress_line(&update));
                }
                rendered += 1;
            }

            if let Some((_, bar)) = current {
                bar.finish();
            }
            rendered
        })
    }

    fn bar(&self, pass: PassKind, total_bytes: u64) -> ProgressBar {
        let bar = ProgressBar::new(total_bytes);
        if self.hidden {
            bar.set_draw_target(ProgressDrawTarget::hidden());
        }
        let style = ProgressStyle::with_template("{prefix:>5}: [{bar:30.cyan/blue}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");
        bar.set_style(style);
        bar.set_prefix(pass.label());
        bar
    }
}

impl Default for ProgressRenderer {
    fn default() -> Self {
        Self::new()
    }
}
