//! Main application entry point (CLI binary).
//!
//! This is a thin wrapper around the `domain_watch` library that handles:
//! - Command-line argument parsing
//! - Environment variable loading (.env file)
//! - Logger initialization
//! - Wiring the capture source and Ctrl-C shutdown
//! - User-facing output formatting
//!
//! All core functionality is implemented in the library crate.

use anyhow::{Context, Result};
use clap::Parser;
use std::process;

use domain_watch::config::CAPTURE_CHANNEL_CAPACITY;
use domain_watch::initialization::init_logger_with;
use domain_watch::{capture, run_monitor, Config, MonitorHandle};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file (if it exists)
    // This allows setting GOOGLE_SAFE_BROWSING_API_KEY in .env without exporting it manually
    // Try loading from current directory first, then from the executable's directory
    if dotenvy::dotenv().is_err() {
        // If .env not found in current dir, try next to the executable
        if let Ok(exe_path) = std::env::current_exe() {
            if let Some(exe_dir) = exe_path.parent() {
                let env_path = exe_dir.join(".env");
                if env_path.exists() {
                    let _ = dotenvy::from_path(&env_path);
                }
            }
        }
    }

    // Parse command-line arguments into Config
    let config = Config::parse();

    // Initialize logger based on config
    let log_level = config.log_level.clone();
    let log_format = config.log_format.clone();
    init_logger_with(log_level.into(), log_format).context("Failed to initialize logger")?;

    // Capture feed: replay a query log file (or stdin with "-") into the
    // intake channel. The run ends when the feed is exhausted or on Ctrl-C.
    let (tx, rx) = capture::channel(CAPTURE_CHANNEL_CAPACITY);
    let source = config.file.clone();
    let feed_task = tokio::spawn(async move {
        if let Err(e) = capture::feed_query_log(&source, tx).await {
            log::error!("Capture feed failed: {e}");
        }
    });

    let handle = MonitorHandle::new();
    let ctrlc_handle = handle.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::info!("Ctrl-C received; shutting down");
            ctrlc_handle.stop();
        }
    });

    let result = run_monitor(config, rx, handle.token()).await;
    feed_task.abort();

    match result {
        Ok(report) => {
            // Print user-friendly summary
            println!(
                "✅ Observed {} domain{} across {} capture event{} ({} enriched, {} failed, {} dropped) in {:.1}s",
                report.unique_domains,
                if report.unique_domains == 1 { "" } else { "s" },
                report.events,
                if report.events == 1 { "" } else { "s" },
                report.enriched,
                report.enrichment_failures,
                report.dropped,
                report.elapsed_seconds
            );
            println!("Event log saved in {}", report.db_path.display());
            Ok(())
        }
        Err(e) => {
            eprintln!("domain_watch error: {:#}", e);
            process::exit(1);
        }
    }
}
