//! Error types for the daemon binary.
//!
//! [`DaemonError`] is the top-level error type that wraps all failure modes
//! during startup. Once the watcher loop runs, failures are handled in
//! place; only unclassified ones travel through here to terminate the
//! process.

/// Top-level error for the daemon binary.
///
/// Each variant wraps a specific subsystem error, providing a single error
/// type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: crate::config::ConfigError,
    },

    /// A store operation failed during startup.
    #[error("store error: {source}")]
    Store {
        /// The underlying data-layer error.
        #[from]
        source: chronicle_db::DbError,
    },
}
