//! Extraction and diffing core for the Chronicle watcher.
//!
//! The simulation this daemon observes emits no discrete events of its own.
//! This crate turns its two unreliable outputs — append-only text logs and
//! periodically rewritten per-colony snapshot files — into typed events with
//! exactly-once semantics, using only local persisted state.
//!
//! # Modules
//!
//! - [`tail`] -- Rotation/truncation-resilient log tailing
//! - [`pattern`] -- Fixed recognizers over free-text log lines
//! - [`snapshot`] -- Snapshot file loading and colony file discovery
//! - [`building`] -- Duck-typed building extraction and name resolution
//! - [`directory`] -- Colony id -> name/owner directory and the name cache
//! - [`state`] -- Persisted scan state and the construction/level-up differ
//!
//! Every unit of work (one log line, one snapshot file, one colony) is
//! isolated: failures surface as typed `Result`/`Option` values that callers
//! skip, never as panics or errors crossing into sibling units.

pub mod building;
pub mod directory;
pub mod pattern;
pub mod snapshot;
pub mod state;
pub mod tail;

// Re-export primary entry points for convenience.
pub use building::{extract_buildings, pretty_name, FALLBACK_BUILDING_NAME};
pub use directory::{refresh_directory, NameCache};
pub use pattern::extract_line_event;
pub use snapshot::{colony_snapshot_files, load_snapshot, SnapshotError};
pub use state::{diff_colony, load_state, save_state, ColonyState, ScanState, StateError};
pub use tail::{LogTailer, StartPosition};
