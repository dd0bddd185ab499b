use std::io::{self, Write};
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use diskfill::config::persistence::{save_report, ReportHistory};
use diskfill::config::FillConfig;
use diskfill::console::{self, ProgressRenderer};
use diskfill::error::{exit_code, user_friendly_message, EXIT_INTEGRITY_FAILED};
use diskfill::io::TestFile;
use diskfill::pipeline::PassObserver;
use diskfill::plan;
use diskfill::{DigestAlgorithm, DiskFillError, DiskFillTest, PassKind, ProgressUpdate, Result, RunResult, MIB};

#[derive(Parser)]
#[command(
    name = "diskfill",
    version,
    about = "Fill a drive with one large file, then read it back and verify its digest",
    long_about = "Writes pseudorandom data across the free space of the target directory's \
                  device, forces it to stable storage, reads it back and compares digests. \
                  Reports write and read times and throughput, and deletes the test file \
                  unless --keep is given."
)]
struct Cli {
    /// Directory on the device to test (e.g. /mnt/usb or E:\)
    target_dir: PathBuf,

    /// Name of the test file created in the target directory
    #[arg(long)]
    filename: Option<String>,

    /// Size of each write and read in MiB
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    chunk_mib: Option<u64>,

    /// Space to leave free on the device in MiB
    #[arg(long)]
    reserve_mib: Option<u64>,

    /// Chunks buffered between generator and writer
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    queue_depth: Option<u64>,

    /// Write at most this many MiB instead of filling the device
    #[arg(long)]
    size_mib: Option<u64>,

    /// Digest used to compare the passes
    #[arg(long, value_enum)]
    digest: Option<DigestArg>,

    /// Seed for a reproducible data stream
    #[arg(long)]
    seed: Option<u64>,

    /// Do not delete the test file at the end
    #[arg(long)]
    keep: bool,

    /// Write the run report as JSON to this path
    #[arg(long)]
    report: Option<PathBuf>,

    /// Do not append the run to the history file
    #[arg(long)]
    no_history: bool,

    /// Read settings from this file instead of the user config file
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DigestArg {
    Sha256,
    Blake3,
}

impl From<DigestArg> for DigestAlgorithm {
    fn from(value: DigestArg) -> Self {
        match value {
            DigestArg::Sha256 => DigestAlgorithm::Sha256,
            DigestArg::Blake3 => DigestAlgorithm::Blake3,
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("\nERROR: {}", user_friendly_message(&e));
            exit_code(&e)
        }
    };
    std::process::exit(code);
}

/// Settings file first, then command-line overrides
fn resolve_config(cli: &Cli) -> Result<FillConfig> {
    let mut config = match &cli.config {
        Some(path) => FillConfig::load_from(path)?,
        None => match FillConfig::config_file_path() {
            Ok(path) => FillConfig::load_from(&path)?,
            Err(e) => {
                tracing::warn!(error = %e, "no config directory, using defaults");
                FillConfig::default()
            }
        },
    };

    if let Some(name) = &cli.filename {
        config.file_name = name.clone();
    }
    if let Some(chunk_mib) = cli.chunk_mib {
        config.chunk_size = chunk_mib
            .checked_mul(MIB)
            .ok_or_else(|| DiskFillError::ConfigError(format!("Chunk size too large: {} MiB", chunk_mib)))?;
    }
    if let Some(reserve_mib) = cli.reserve_mib {
        config.reserve = reserve_mib.saturating_mul(MIB);
    }
    if let Some(depth) = cli.queue_depth {
        config.queue_depth = usize::try_from(depth)
            .map_err(|_| DiskFillError::ConfigError(format!("Queue depth too large: {}", depth)))?;
    }
    if let Some(digest) = cli.digest {
        config.digest = digest.into();
    }
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }
    if cli.keep {
        config.keep_file = true;
    }

    config.validate()?;
    Ok(config)
}

/// Draws a progress bar per pass and prints each pass's summary
struct ConsoleObserver {
    digest: DigestAlgorithm,
    renderer: Option<JoinHandle<u64>>,
}

impl ConsoleObserver {
    fn new(digest: DigestAlgorithm) -> Self {
        Self {
            digest,
            renderer: None,
        }
    }

    /// Wait for the current bar to finish drawing
    async fn settle(&mut self) {
        if let Some(renderer) = self.renderer.take() {
            let _ = renderer.await;
        }
    }
}

impl PassObserver for ConsoleObserver {
    fn progress_sender(&mut self, _pass: PassKind) -> mpsc::Sender<ProgressUpdate> {
        let (tx, rx) = mpsc::channel(64);
        self.renderer = Some(ProgressRenderer::new().spawn(rx));
        tx
    }

    async fn pass_complete(&mut self, result: &RunResult) -> Result<()> {
        self.settle().await;
        console::write_pass_summary(&mut io::stdout(), result, self.digest)?;
        Ok(())
    }
}

async fn run(cli: Cli) -> Result<i32> {
    let config = resolve_config(&cli)?;

    let target_dir = if cli.target_dir.is_absolute() {
        cli.target_dir.clone()
    } else {
        std::env::current_dir()?.join(&cli.target_dir)
    };

    let size_limit = cli.size_mib.map(|mib| mib.saturating_mul(MIB));
    let plan::RunPlan { target, free_bytes } = plan::plan(&target_dir, &config, size_limit)?;

    console::write_banner(&mut io::stdout(), &target, &config, free_bytes)?;

    let test = DiskFillTest::new(target.clone())
        .with_digest(config.digest)
        .with_seed(config.seed)
        .with_progress_interval(config.progress_interval());

    let cancel = test.cancel_signal();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, stopping after the current chunk");
            cancel.cancel();
        }
    });

    // Removes a partial file on every early return unless kept
    let mut test_file = TestFile::new(target.path.clone());
    if config.keep_file {
        test_file.keep_on_drop();
    }

    let mut observer = ConsoleObserver::new(config.digest);
    let outcome = test.run_observed(&mut observer).await;
    observer.settle().await;
    let outcome = outcome?;
    console::write_verdict(&mut io::stdout(), &outcome.verdict)?;

    if config.keep_file {
        println!("\nTest file kept: {}", target.path.display());
    } else {
        match test_file.remove() {
            Ok(()) => println!("\nTemporary file deleted: {}", target.path.display()),
            Err(e) => {
                tracing::warn!(path = %target.path.display(), error = %e, "could not delete test file");
                println!("\nWarning: could not delete the temporary file: {}", e);
            }
        }
    }

    console::write_summary(&mut io::stdout(), &outcome)?;
    io::stdout().flush()?;

    let verdict = outcome.verdict;
    let report = outcome.into_report(target, config.digest, config.keep_file);

    if let Some(path) = &cli.report {
        save_report(&report, path)?;
        println!("Report written to {}", path.display());
    }

    if !cli.no_history {
        let appended = ReportHistory::new().and_then(|history| history.append(report));
        if let Err(e) = appended {
            tracing::warn!(error = %e, "could not record run in history");
        }
    }

    Ok(if verdict.is_ok() { 0 } else { EXIT_INTEGRITY_FAILED })
}
