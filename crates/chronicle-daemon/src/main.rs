//! Watcher daemon binary for Chronicle.
//!
//! This is the entry point that wires together configuration, the store,
//! and the watcher loop. It loads configuration, initializes structured
//! logging, connects to `PostgreSQL`, and runs the loop until the process
//! is terminated externally.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `chronicle.yaml` (defaults when absent)
//! 2. Initialize structured logging (tracing)
//! 3. Connect to the store and ensure the event tables exist
//! 4. Run the watcher loop (directory refresh, snapshot scans, log tailing)
//!
//! There is no graceful-shutdown surface: the process runs until killed.
//! Any unclassified failure escaping the loop is logged once here and the
//! process exits without restarting.

mod config;
mod error;
mod runner;

use std::path::Path;

use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::DaemonConfig;

/// Application entry point for the watcher daemon.
///
/// # Errors
///
/// Returns an error if startup fails or an unclassified failure escapes
/// the watcher loop.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let config = load_config()?;

    // 2. Initialize structured logging. RUST_LOG overrides the configured
    //    level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.logging.level.clone())),
        )
        .with_target(true)
        .init();

    info!("chronicle-daemon starting");
    info!(
        log_files = config.watch.log_paths.len(),
        colony_dir = %config.sources.colony_dir.display(),
        state_path = %config.sources.state_path.display(),
        "Configuration loaded"
    );

    // 3-4. Connect and run. The loop only returns on failure.
    if let Err(error) = runner::run(&config).await {
        tracing::error!(error = %error, "Fatal error, shutting down");
        return Err(error.into());
    }

    Ok(())
}

/// Load the daemon configuration from `chronicle.yaml`.
///
/// Looks for the config file relative to the current working directory.
fn load_config() -> Result<DaemonConfig, crate::error::DaemonError> {
    let config_path = Path::new("chronicle.yaml");
    if config_path.exists() {
        let config = DaemonConfig::from_file(config_path)?;
        Ok(config)
    } else {
        Ok(DaemonConfig::default())
    }
}
