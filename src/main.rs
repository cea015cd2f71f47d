use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Result, Context};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use pid_rename::{ConfigBuilder, RenameEngine};

/// Rename downloaded programmes using their broadcaster metadata
#[derive(Parser, Debug)]
#[command(name = "pid-rename", version, about)]
struct Cli {
    /// Directory to scan recursively
    directory: PathBuf,

    /// Move episodes into "Show/Series N" directories
    #[arg(short = 's', long = "series-dirs")]
    series_dirs: bool,

    /// Filename suffix keyword marking unconverted files (repeatable)
    #[arg(long = "suffix", value_name = "WORD")]
    suffixes: Vec<String>,

    /// Base URL of the programme metadata service
    #[arg(long, value_name = "URL")]
    metadata_url: Option<String>,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 10, value_name = "SECS")]
    timeout: u64,

    /// Show what would be renamed without touching any files
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("✗ Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let config = ConfigBuilder::new()
        .directory(&cli.directory)
        .organize_into_series(cli.series_dirs)
        .suffixes(cli.suffixes)
        .metadata_url(cli.metadata_url)
        .timeout(Duration::from_secs(cli.timeout))
        .dry_run(cli.dry_run)
        .build()?;

    let engine = RenameEngine::new(config)?;
    let report = engine
        .convert()
        .with_context(|| format!("Failed to scan {}", cli.directory.display()))?;

    let converted = report.success_count();
    let failed = report.failed_count();

    println!("===================");
    println!(
        "Summary: {} converted, {} skipped, {} failed",
        converted,
        report.skipped_count(),
        failed
    );

    if failed == 0 && converted > 0 {
        println!("✓ All pending files converted!");
    } else if converted > 0 {
        println!("⚠ Some files were converted, but there were errors with others.");
    } else if failed > 0 {
        println!("✗ No files were converted.");
    } else {
        println!("ℹ Nothing to convert.");
    }

    Ok(())
}
