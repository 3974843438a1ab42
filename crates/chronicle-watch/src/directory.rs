//! Colony directory: id -> name/owner, rebuilt wholesale every refresh.
//!
//! Names and owners come from each colony snapshot's root metadata. Owners
//! are sometimes recorded as opaque unique identifiers; those are resolved
//! to display names through a best-effort name cache file. Stale entries for
//! removed colonies simply disappear on the next refresh.

use std::collections::BTreeMap;
use std::path::Path;

use serde_json::Value;

use chronicle_types::ColonyInfo;

use crate::snapshot::{colony_snapshot_files, load_snapshot};

/// Root metadata keys that may hold the colony name.
const NAME_KEYS: [&str; 4] = ["Name", "name", "colonyName", "colonyname"];

/// Root metadata keys that may hold the owner.
const OWNER_KEYS: [&str; 6] = ["Owner", "owner", "Mayor", "mayor", "colonyOwner", "colonyowner"];

/// Sub-keys probed when the owner value is a compound.
const OWNER_SUB_KEYS: [&str; 8] = [
    "name",
    "Name",
    "ownerName",
    "playerName",
    "UUID",
    "uuid",
    "Id",
    "id",
];

/// Shortest length at which an owner value is treated as an opaque id.
const OPAQUE_ID_MIN_LEN: usize = 32;

/// Minimum number of `-` separators in an opaque id.
const OPAQUE_ID_MIN_SEPARATORS: usize = 4;

/// Best-effort map from opaque unique identifiers to display names.
///
/// Loaded from a JSON file that is either an array of entries carrying an
/// id (`uuid` or `id`) and a `name`, or a flat `{id: name}` object. A
/// missing or corrupt file yields an empty cache.
#[derive(Debug, Default)]
pub struct NameCache {
    entries: BTreeMap<String, String>,
}

impl NameCache {
    /// Load the cache from `path`, best-effort.
    pub fn load(path: &Path) -> Self {
        let value: Value = match std::fs::read(path)
            .ok()
            .and_then(|bytes| serde_json::from_slice(&bytes).ok())
        {
            Some(value) => value,
            None => {
                tracing::debug!(path = %path.display(), "Name cache unavailable");
                return Self::default();
            }
        };

        let mut entries = BTreeMap::new();
        match value {
            Value::Array(items) => {
                for item in items {
                    let Some(object) = item.as_object() else {
                        continue;
                    };
                    let id = object
                        .get("uuid")
                        .or_else(|| object.get("id"))
                        .and_then(Value::as_str);
                    let name = object.get("name").and_then(Value::as_str);
                    if let (Some(id), Some(name)) = (id, name) {
                        entries.insert(id.to_ascii_lowercase(), name.to_owned());
                    }
                }
            }
            Value::Object(map) => {
                for (id, name) in map {
                    if let Some(name) = name.as_str() {
                        entries.insert(id.to_ascii_lowercase(), name.to_owned());
                    }
                }
            }
            _ => {}
        }
        Self { entries }
    }

    /// Look up a display name by opaque id, case-insensitively.
    pub fn resolve(&self, id: &str) -> Option<&str> {
        self.entries
            .get(&id.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Whether an owner value looks like an opaque unique identifier rather
/// than a display name.
fn looks_like_opaque_id(value: &str) -> bool {
    value.len() >= OPAQUE_ID_MIN_LEN && value.matches('-').count() >= OPAQUE_ID_MIN_SEPARATORS
}

/// Scalar metadata values render as text; compounds and lists do not.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

/// Resolve the owner field from a snapshot root: the first present owner
/// key wins, whether usable or not (matching the source system's layout,
/// which never splits owner data across keys).
fn owner_of(root: &Value, cache: &NameCache) -> String {
    let Some(object) = root.as_object() else {
        return String::new();
    };
    let Some(candidate) = OWNER_KEYS.iter().find_map(|key| object.get(*key)) else {
        return String::new();
    };

    let mut owner = match candidate {
        Value::Object(map) => OWNER_SUB_KEYS
            .iter()
            .find_map(|key| map.get(*key).and_then(scalar_text))
            .unwrap_or_default(),
        other => scalar_text(other).unwrap_or_default(),
    };

    if looks_like_opaque_id(&owner) {
        if let Some(name) = cache.resolve(&owner) {
            owner = name.to_owned();
        }
    }
    owner.trim().to_owned()
}

fn name_of(root: &Value) -> String {
    root.as_object()
        .and_then(|object| {
            NAME_KEYS
                .iter()
                .find_map(|key| object.get(*key).and_then(scalar_text))
        })
        .unwrap_or_default()
        .trim()
        .to_owned()
}

/// Rebuild the colony directory from the snapshot directory and name cache.
///
/// Unreadable or unparseable snapshot files are skipped; they only mean the
/// affected colony has no directory entry until the next refresh.
pub fn refresh_directory(colony_dir: &Path, cache: &NameCache) -> BTreeMap<i64, ColonyInfo> {
    let mut directory = BTreeMap::new();
    for (colony_id, path) in colony_snapshot_files(colony_dir) {
        let root = match load_snapshot(&path) {
            Ok(root) => root,
            Err(error) => {
                tracing::debug!(
                    path = %path.display(),
                    error = %error,
                    "Skipping unreadable colony file in directory refresh"
                );
                continue;
            }
        };
        directory.insert(
            colony_id,
            ColonyInfo {
                name: name_of(&root),
                owner: owner_of(&root, cache),
            },
        );
    }
    directory
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::fs;

    use super::*;

    const OPAQUE_ID: &str = "01234567-89ab-cdef-0123-456789abcdef";

    fn write_cache(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("usercache.json");
        let body = format!(r#"[{{"uuid": "{OPAQUE_ID}", "name": "Steve"}}]"#);
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn cache_resolves_case_insensitively() {
        let dir = tempfile::tempdir().unwrap();
        let cache = NameCache::load(&write_cache(dir.path()));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.resolve(&OPAQUE_ID.to_ascii_uppercase()), Some("Steve"));
        assert_eq!(cache.resolve("unknown"), None);
    }

    #[test]
    fn missing_or_corrupt_cache_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(NameCache::load(&dir.path().join("absent.json")).is_empty());

        let corrupt = dir.path().join("corrupt.json");
        fs::write(&corrupt, "not json").unwrap();
        assert!(NameCache::load(&corrupt).is_empty());
    }

    #[test]
    fn refresh_builds_directory_from_snapshots() {
        let dir = tempfile::tempdir().unwrap();
        let cache = NameCache::load(&write_cache(dir.path()));
        let colonies = dir.path().join("colonies");
        fs::create_dir(&colonies).unwrap();

        fs::write(
            colonies.join("colony1.dat"),
            format!(r#"{{"Name": "Riverside", "Owner": "{OPAQUE_ID}"}}"#),
        )
        .unwrap();
        fs::write(
            colonies.join("colony2.dat"),
            r#"{"name": "Hilltop", "owner": {"name": "Alex"}}"#,
        )
        .unwrap();
        fs::write(colonies.join("colony3.dat"), "corrupt {{").unwrap();

        let directory = refresh_directory(&colonies, &cache);
        assert_eq!(directory.len(), 2);

        let first = directory.get(&1).unwrap();
        assert_eq!(first.name, "Riverside");
        assert_eq!(first.owner, "Steve");

        let second = directory.get(&2).unwrap();
        assert_eq!(second.name, "Hilltop");
        assert_eq!(second.owner, "Alex");
    }

    #[test]
    fn unresolved_opaque_owner_is_kept_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let colonies = dir.path().join("colonies");
        fs::create_dir(&colonies).unwrap();
        let other_id = "fedcba98-7654-3210-fedc-ba9876543210";
        fs::write(
            colonies.join("colony5.dat"),
            format!(r#"{{"Name": "Lakeside", "Mayor": "{other_id}"}}"#),
        )
        .unwrap();

        let directory = refresh_directory(&colonies, &NameCache::default());
        assert_eq!(directory.get(&5).unwrap().owner, other_id);
    }

    #[test]
    fn short_owner_names_are_not_treated_as_ids() {
        assert!(!looks_like_opaque_id("Steve"));
        assert!(!looks_like_opaque_id("a-b-c-d-e"));
        assert!(looks_like_opaque_id(OPAQUE_ID));
    }
}
