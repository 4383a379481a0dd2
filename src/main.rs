//! Magpie main entry point
//!
//! Thin process bootstrap around the scheduler core. Board-specific
//! [`SourceAdapter`] implementations are compiled in here; the core never
//! knows about concrete boards.

use anyhow::{bail, Context};
use clap::Parser;
use magpie::config::{load_config, Config, SourceConfig};
use magpie::executor::Executor;
use magpie::records::{RecordStore, SqliteRecordStore};
use magpie::scheduler::{decide, Scheduler};
use magpie::source::SourceAdapter;
use magpie::state::StateStore;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Magpie: a patient job-board collector
///
/// Magpie runs recurring collection passes against configured job boards,
/// resuming interrupted runs at the last completed page and retrying failed
/// search keywords on the next scheduled run.
#[derive(Parser, Debug)]
#[command(name = "magpie")]
#[command(version = "1.0.0")]
#[command(about = "A patient job-board collector", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Run the named sources now (comma-separated) instead of looping
    #[arg(long, value_delimiter = ',', conflicts_with_all = ["status", "dry_run"])]
    once: Option<Vec<String>>,

    /// Run this source immediately on the first pass, skipping all others
    #[arg(long, value_name = "SOURCE", conflicts_with_all = ["once", "status", "dry_run"])]
    start_at: Option<String>,

    /// Show the current schedule and exit
    #[arg(long, conflicts_with = "dry_run")]
    status: bool,

    /// Validate config and show what would run without running it
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let config = load_config(&cli.config).context("Failed to load configuration")?;

    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.status {
        handle_status(&config)?;
    } else if let Some(names) = cli.once {
        handle_once(config, names).await?;
    } else {
        handle_loop(config, cli.start_at).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("magpie=info,warn"),
            1 => EnvFilter::new("magpie=debug,info"),
            2 => EnvFilter::new("magpie=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Builds the adapter for a configured source
///
/// Board adapters register here by name. The core crate deliberately ships
/// none: selector and login logic for each board lives in its own adapter
/// implementation.
fn adapter_for(source: &SourceConfig) -> anyhow::Result<Box<dyn SourceAdapter>> {
    bail!(
        "No adapter compiled in for source '{}'; register one in adapter_for()",
        source.name
    )
}

/// Builds one executor per configured source
fn build_executors(config: &Config) -> anyhow::Result<Vec<Executor>> {
    config
        .sources
        .iter()
        .map(|source| {
            let adapter = adapter_for(source)?;
            Ok(Executor::new(
                source.clone(),
                config.keywords_for(source).to_vec(),
                adapter,
            ))
        })
        .collect()
}

/// Opens the record database and collapses any duplicates left behind by
/// re-processed pages
fn open_records(config: &Config) -> anyhow::Result<SqliteRecordStore> {
    let mut records = SqliteRecordStore::new(Path::new(&config.output.database_path))
        .context("Failed to open record database")?;

    let merged = records.merge_duplicates()?;
    if merged > 0 {
        tracing::info!("Merged {} duplicate record(s)", merged);
    }

    Ok(records)
}

/// Wires ctrl-c to a cancellation token
fn spawn_interrupt_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, shutting down after current page");
            cancel.cancel();
        }
    });
}

/// Handles the --dry-run mode: validates config and shows what would run
fn handle_dry_run(config: &Config) {
    println!("=== Magpie Dry Run ===\n");

    println!("Scheduler:");
    println!("  Error wait: {}s", config.scheduler.error_wait_seconds);
    println!("  Poll interval: {}s", config.scheduler.poll_interval_seconds);

    println!("\nOutput:");
    println!("  State file: {}", config.output.state_path);
    println!("  Database: {}", config.output.database_path);

    println!("\nSources ({}):", config.sources.len());
    for source in &config.sources {
        println!(
            "  - {} (cadence {}s{})",
            source.name,
            source.cadence_seconds,
            if source.ignore_automatic_schedule {
                ", manual only"
            } else {
                ""
            }
        );
        for keyword in config.keywords_for(source) {
            println!("    * {}", keyword);
        }
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the --status mode: shows the current schedule decisions
fn handle_status(config: &Config) -> anyhow::Result<()> {
    let store = StateStore::open(Path::new(&config.output.state_path))?;
    let records = open_records(config)?;
    let now = chrono::Utc::now();

    println!("Schedule as of {}:\n", now.to_rfc3339());
    for source in &config.sources {
        if source.ignore_automatic_schedule {
            println!("  {:<20} manual only", source.name);
            continue;
        }

        let state = store.state(&source.name);
        let decision = decide(
            now,
            source,
            &state,
            None,
            config.scheduler.error_wait_seconds,
        );

        println!(
            "  {:<20} {:?} ({}s remaining), {} record(s), {} failed keyword(s){}",
            source.name,
            decision.status,
            decision.seconds_remaining,
            records.count_by_source(&source.name)?,
            state.failed_keywords.len(),
            if state.has_resume() { ", resume pending" } else { "" }
        );
    }

    println!("\nTotal records: {}", records.count_records()?);
    Ok(())
}

/// Handles the --once mode: runs the named sources immediately
async fn handle_once(config: Config, names: Vec<String>) -> anyhow::Result<()> {
    let store = StateStore::open(Path::new(&config.output.state_path))?;
    let _records = open_records(&config)?;
    let executors = build_executors(&config)?;

    let cancel = CancellationToken::new();
    spawn_interrupt_handler(cancel.clone());

    let mut scheduler = Scheduler::new(config.scheduler.clone(), store, executors)
        .with_cancellation(cancel);

    scheduler.run_explicit(&names).await?;
    Ok(())
}

/// Handles the default mode: the continuous scheduling loop
async fn handle_loop(config: Config, start_at: Option<String>) -> anyhow::Result<()> {
    if let Some(name) = &start_at {
        if config.source(name).is_none() {
            bail!("--start-at names unknown source '{}'", name);
        }
    }

    let store = StateStore::open(Path::new(&config.output.state_path))?;
    let _records = open_records(&config)?;
    let executors = build_executors(&config)?;

    let cancel = CancellationToken::new();
    spawn_interrupt_handler(cancel.clone());

    let mut scheduler = Scheduler::new(config.scheduler.clone(), store, executors)
        .with_cancellation(cancel);

    tracing::info!("Starting scheduling loop over {} source(s)", config.sources.len());
    scheduler.run_loop(start_at).await?;

    tracing::info!("Scheduler stopped");
    Ok(())
}
