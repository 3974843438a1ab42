//! Colony directory entries.

use serde::{Deserialize, Serialize};

/// Name and owner of a colony, resolved from snapshot root metadata and the
/// name cache.
///
/// Directory entries are transient: the whole `id -> ColonyInfo` map is
/// rebuilt on every refresh, never partially updated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColonyInfo {
    /// Colony display name (empty when the snapshot carried none).
    pub name: String,
    /// Owner display name, or the verbatim opaque id when unresolved.
    pub owner: String,
}
