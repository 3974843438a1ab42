//! Snapshot file loading and colony file discovery.
//!
//! Snapshots are per-colony structured documents sampled periodically by the
//! simulation — a generic nested key->value/list shape, parsed here into
//! [`serde_json::Value`] trees. One colony's unreadable or corrupt file must
//! never abort a scan, so loading returns a typed error the caller skips.

use std::path::{Path, PathBuf};

use serde_json::Value;

/// Errors that can occur when loading one snapshot file.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// The file could not be read.
    #[error("failed to read snapshot file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// The content is not a valid snapshot document.
    #[error("failed to parse snapshot file: {source}")]
    Parse {
        /// The underlying parse error.
        #[from]
        source: serde_json::Error,
    },
}

/// Load one snapshot file into a tree.
pub fn load_snapshot(path: &Path) -> Result<Value, SnapshotError> {
    let bytes = std::fs::read(path)?;
    let tree = serde_json::from_slice(&bytes)?;
    Ok(tree)
}

/// Extract a colony id from a snapshot file name.
///
/// File names embed the id after a `colony` marker with optional `-`/`_`
/// separators (`colony7.dat`, `colony-12.dat`, `colony_3_backup.dat`).
pub fn colony_id_from_file_name(name: &str) -> Option<i64> {
    let lower = name.to_ascii_lowercase();
    for (index, _) in lower.match_indices("colony") {
        let rest = lower.get(index.saturating_add("colony".len())..)?;
        let digits_start = rest
            .find(|c: char| c != '-' && c != '_')
            .unwrap_or(rest.len());
        let candidate = rest.get(digits_start..)?;
        let digits_end = candidate
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(candidate.len());
        let digits = candidate.get(..digits_end)?;
        if digits.is_empty() {
            continue;
        }
        if let Ok(id) = digits.parse() {
            return Some(id);
        }
    }
    None
}

/// List the colony snapshot files in a directory, paired with their ids and
/// sorted by id.
///
/// A missing or unreadable directory yields an empty list — the next cycle
/// retries.
pub fn colony_snapshot_files(dir: &Path) -> Vec<(i64, PathBuf)> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(error) => {
            tracing::debug!(
                dir = %dir.display(),
                error = %error,
                "Snapshot directory unavailable"
            );
            return Vec::new();
        }
    };

    let mut files: Vec<(i64, PathBuf)> = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !name.to_ascii_lowercase().starts_with("colony") {
            continue;
        }
        if let Some(id) = colony_id_from_file_name(name) {
            files.push((id, path));
        }
    }
    files.sort_by_key(|(id, _)| *id);
    files
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn parses_colony_ids_from_file_names() {
        assert_eq!(colony_id_from_file_name("colony7.dat"), Some(7));
        assert_eq!(colony_id_from_file_name("colony-12.dat"), Some(12));
        assert_eq!(colony_id_from_file_name("Colony_3_backup.dat"), Some(3));
        assert_eq!(colony_id_from_file_name("colony.dat"), None);
        assert_eq!(colony_id_from_file_name("settlement9.dat"), None);
    }

    #[test]
    fn loads_valid_snapshot_and_rejects_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("colony1.dat");
        let bad = dir.path().join("colony2.dat");
        fs::write(&good, r#"{"Name": "Riverside"}"#).unwrap();
        fs::write(&bad, b"\x1f\x8b half a write").unwrap();

        let tree = load_snapshot(&good).unwrap();
        assert_eq!(tree.get("Name").and_then(|v| v.as_str()), Some("Riverside"));
        assert!(load_snapshot(&bad).is_err());
        assert!(load_snapshot(&dir.path().join("colony3.dat")).is_err());
    }

    #[test]
    fn lists_colony_files_sorted_by_id() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("colony10.dat"), "{}").unwrap();
        fs::write(dir.path().join("colony2.dat"), "{}").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignore me").unwrap();

        let files = colony_snapshot_files(dir.path());
        let ids: Vec<i64> = files.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![2, 10]);
    }

    #[test]
    fn missing_directory_yields_empty_list() {
        let dir = tempfile::tempdir().unwrap();
        let gone = dir.path().join("absent");
        assert!(colony_snapshot_files(&gone).is_empty());
    }
}
