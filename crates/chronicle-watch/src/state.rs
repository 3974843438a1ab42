//! Persisted scan state and the construction/level-up differ.
//!
//! The scan state maps each colony to its last successfully scanned building
//! set, keyed by position. Comparing a fresh extraction against it is what
//! turns state samples into discrete events: a building appearing at level
//! >= 1 was constructed; a level strictly above the stored one is a
//! level-up. Anything else — unchanged, decreased, or removed — emits
//! nothing, and the fresh set replaces the stored one either way.
//!
//! The state file is replaced atomically (temp sibling + rename) so a crash
//! mid-write can never leave a torn file; the worst case is re-deriving the
//! previous scan's events, which the store's duplicate checks absorb.

use std::collections::BTreeMap;
use std::path::Path;

use chronicle_types::{BuildingRecord, ColonyAction, ColonyEvent, StoredBuilding};

/// One colony's stored building set, keyed by position key (`"x,y,z"`).
pub type ColonyState = BTreeMap<String, StoredBuilding>;

/// The persisted mapping of colony id to stored building set.
pub type ScanState = BTreeMap<i64, ColonyState>;

/// Errors that can occur while persisting the scan state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    /// Writing or renaming the state file failed.
    #[error("failed to write state file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Serializing the state failed.
    #[error("failed to serialize state: {source}")]
    Serialization {
        /// The underlying serialization error.
        #[from]
        source: serde_json::Error,
    },
}

/// Load the scan state, best-effort.
///
/// A missing or corrupt file yields an empty state: the next scan then has
/// first-scan semantics and the store's duplicate checks bound the
/// re-derived events.
pub fn load_state(path: &Path) -> ScanState {
    match std::fs::read(path) {
        Ok(bytes) => match serde_json::from_slice(&bytes) {
            Ok(state) => state,
            Err(error) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %error,
                    "Scan state file corrupt, starting from empty state"
                );
                ScanState::new()
            }
        },
        Err(_) => ScanState::new(),
    }
}

/// Atomically replace the scan state file.
///
/// Writes to a temporary sibling and renames it over the target in one
/// step; missing parent directories are created first.
pub fn save_state(path: &Path, state: &ScanState) -> Result<(), StateError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let bytes = serde_json::to_vec(state)?;
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = std::path::PathBuf::from(tmp);
    std::fs::write(&tmp, bytes)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

/// Compare a colony's fresh extraction against its stored state.
///
/// Returns the derived events and the replacement state for the colony.
/// The caller owns attaching colony name/owner from the directory and
/// recording the events; this function is pure.
pub fn diff_colony(
    colony_id: i64,
    buildings: &[BuildingRecord],
    prior: Option<&ColonyState>,
) -> (Vec<ColonyEvent>, ColonyState) {
    let mut events = Vec::new();
    let mut next = ColonyState::new();

    for building in buildings {
        let key = building.position.key();
        let previous = prior.and_then(|state| state.get(&key));

        match previous {
            None if building.level >= 1 => {
                events.push(colony_event(
                    colony_id,
                    ColonyAction::Constructed,
                    building,
                    format!(
                        "snapshot constructed {} L{} @ {}",
                        building.name, building.level, building.position
                    ),
                ));
            }
            Some(stored) if building.level > stored.level => {
                events.push(colony_event(
                    colony_id,
                    ColonyAction::Level(building.level),
                    building,
                    format!(
                        "snapshot level-up {} -> L{} @ {}",
                        building.name, building.level, building.position
                    ),
                ));
            }
            // Unchanged, decreased, or a level-0 site: nothing to record.
            _ => {}
        }

        next.insert(key, StoredBuilding::from(building));
    }

    (events, next)
}

fn colony_event(
    colony_id: i64,
    action: ColonyAction,
    building: &BuildingRecord,
    raw_text: String,
) -> ColonyEvent {
    ColonyEvent {
        colony_id,
        colony_name: None,
        owner: None,
        action,
        building_id: building.building_id.clone(),
        building_name: building.name.clone(),
        block_id: building.block_id.clone(),
        position: building.position,
        raw_text,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chronicle_types::Position;

    use super::*;

    fn record(x: i32, level: u32) -> BuildingRecord {
        BuildingRecord {
            position: Position::new(x, 64, 0),
            level,
            building_id: String::new(),
            block_id: "modns:blockhutbuilder".to_owned(),
            name: "Builder Hut".to_owned(),
        }
    }

    fn state_of(buildings: &[BuildingRecord]) -> ColonyState {
        diff_colony(1, buildings, None).1
    }

    #[test]
    fn new_building_at_level_one_is_constructed() {
        let (events, next) = diff_colony(1, &[record(0, 1)], None);
        assert_eq!(events.len(), 1);
        let event = events.first().unwrap();
        assert_eq!(event.action, ColonyAction::Constructed);
        assert_eq!(event.position, Position::new(0, 64, 0));
        assert!(next.contains_key("0,64,0"));
    }

    #[test]
    fn level_zero_site_is_not_constructed_yet() {
        let (events, next) = diff_colony(1, &[record(0, 0)], None);
        assert!(events.is_empty());
        // The site is still remembered for the next comparison.
        assert_eq!(next.get("0,64,0").unwrap().level, 0);
    }

    #[test]
    fn level_jump_emits_single_event_at_final_level() {
        let prior = state_of(&[record(0, 1)]);
        let (events, _) = diff_colony(1, &[record(0, 3)], Some(&prior));
        assert_eq!(events.len(), 1);
        assert_eq!(events.first().unwrap().action, ColonyAction::Level(3));
    }

    #[test]
    fn unchanged_scan_is_idempotent() {
        let buildings = [record(0, 2), record(1, 3)];
        let prior = state_of(&buildings);
        let (events, next) = diff_colony(1, &buildings, Some(&prior));
        assert!(events.is_empty());
        assert_eq!(next, prior);
    }

    #[test]
    fn level_decrease_emits_nothing() {
        let prior = state_of(&[record(0, 3)]);
        let (events, next) = diff_colony(1, &[record(0, 2)], Some(&prior));
        assert!(events.is_empty());
        // The decreased level still replaces the stored one.
        assert_eq!(next.get("0,64,0").unwrap().level, 2);
    }

    #[test]
    fn removed_building_is_dropped_without_event() {
        let prior = state_of(&[record(0, 2), record(1, 1)]);
        let (events, next) = diff_colony(1, &[record(0, 2)], Some(&prior));
        assert!(events.is_empty());
        assert_eq!(next.len(), 1);
        assert!(!next.contains_key("1,64,0"));
    }

    #[test]
    fn state_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("scan_state.json");

        let mut state = ScanState::new();
        state.insert(7, state_of(&[record(0, 2)]));
        save_state(&path, &state).unwrap();

        assert_eq!(load_state(&path), state);
        // No temp sibling left behind.
        assert!(!path.with_extension("json.tmp").exists());
        assert_eq!(
            std::fs::read_dir(path.parent().unwrap()).unwrap().count(),
            1
        );
    }

    #[test]
    fn missing_or_corrupt_state_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.json");
        assert!(load_state(&missing).is_empty());

        let corrupt = dir.path().join("corrupt.json");
        std::fs::write(&corrupt, "{ torn").unwrap();
        assert!(load_state(&corrupt).is_empty());
    }
}
