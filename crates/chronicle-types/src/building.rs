//! Building records extracted from colony snapshots.

use serde::{Deserialize, Serialize};

use crate::position::Position;

/// A building discovered in a colony snapshot.
///
/// Identity within a colony is the [`Position`]; the extractor keeps at most
/// one record per position (the highest level wins when the same position
/// appears more than once in a snapshot tree).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildingRecord {
    /// Block position identifying this building.
    pub position: Position,
    /// Current construction level (0 = site placed, not yet built).
    pub level: u32,
    /// Building class identifier from the snapshot, if present.
    pub building_id: String,
    /// Block identifier from the snapshot, if present.
    pub block_id: String,
    /// Human-readable display name (`"Building"` when no hint resolved).
    pub name: String,
}

/// The persisted form of a building, stored in the scan state keyed by
/// position.
///
/// Carries everything the differ needs to compare against the next scan and
/// to describe the building in an emitted event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredBuilding {
    /// Construction level at the last completed scan.
    pub level: u32,
    /// Display name at the last completed scan.
    pub name: String,
    /// Building class identifier.
    #[serde(default)]
    pub building_id: String,
    /// Block identifier.
    #[serde(default)]
    pub block_id: String,
}

impl From<&BuildingRecord> for StoredBuilding {
    fn from(record: &BuildingRecord) -> Self {
        Self {
            level: record.level,
            name: record.name.clone(),
            building_id: record.building_id.clone(),
            block_id: record.block_id.clone(),
        }
    }
}
