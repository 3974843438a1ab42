//! PostgreSQL data layer for the Chronicle watcher.
//!
//! `PostgreSQL` is the durable store for derived events. The watcher re-derives
//! events freely (restarts, rescans, rotated logs), so the store is where
//! exactly-once is enforced: every insert goes through a duplicate check
//! keyed on the event's identity.
//!
//! # Modules
//!
//! - [`postgres`] -- Connection pool and configuration
//! - [`event_sink`] -- Idempotent schema setup and deduplicating inserts
//! - [`error`] -- Shared error types

pub mod error;
pub mod event_sink;
pub mod postgres;

// Re-export primary types for convenience.
pub use error::DbError;
pub use event_sink::{ColonyEventRow, EventSink, InsertOutcome};
pub use postgres::{PostgresConfig, PostgresPool};
