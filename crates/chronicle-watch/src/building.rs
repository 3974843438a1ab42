//! Duck-typed building extraction from snapshot trees.
//!
//! The snapshot schema is neither fully known nor stable, so building
//! discovery works by shape, not by fixed path: after scanning the known
//! building-list keys, the extractor walks the entire tree and treats any
//! compound node exposing `x`/`y`/`z` fields or a `location` field as a
//! candidate, regardless of nesting depth or parent key.
//!
//! The same physical structure can appear more than once in a tree (indexed
//! both by list and by nested reference), so candidates sharing a position
//! collapse to the record with the highest level.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use serde_json::{Map, Value};

use chronicle_types::{BuildingRecord, Position};

/// Display name used when no hint resolves.
pub const FALLBACK_BUILDING_NAME: &str = "Building";

/// Keys that hold an explicit building list at the snapshot root.
const BUILDING_LIST_KEYS: [&str; 4] = ["buildings", "Buildings", "buildingList", "BuildingList"];

/// Level-like field names, tried in order.
const LEVEL_KEYS: [&str; 3] = ["buildingLevel", "level", "Level"];

/// Preferred name-hint fields, tried in order before the deep scan.
const NAME_HINT_KEYS: [&str; 12] = [
    "buildingName",
    "name",
    "hut",
    "style",
    "schematicName",
    "schematic",
    "blueprint",
    "type",
    "building",
    "class",
    "blockId",
    "block",
];

/// Common building-type keywords matched as substrings, last resort.
const BUILDING_KEYWORDS: [&str; 15] = [
    "citizen hut",
    "builder",
    "warehouse",
    "cook",
    "sawmill",
    "lumberjack",
    "residence",
    "town hall",
    "barracks",
    "guard",
    "library",
    "university",
    "plantation",
    "miner",
    "fisher",
];

/// Cap on string leaves visited by the deep name scan.
const DEEP_STRING_LIMIT: usize = 64;

/// Extract the building set from a parsed snapshot tree.
///
/// At most one record per position is returned; when the same position
/// appears more than once, the highest level wins (ties keep the first
/// seen).
pub fn extract_buildings(root: &Value) -> Vec<BuildingRecord> {
    let mut candidates: Vec<&Map<String, Value>> = Vec::new();

    // Primary path: explicit building lists under known keys.
    if let Some(object) = root.as_object() {
        for key in BUILDING_LIST_KEYS {
            if let Some(Value::Array(items)) = object.get(key) {
                for item in items {
                    if let Some(map) = item.as_object() {
                        if position_of(map).is_some() {
                            candidates.push(map);
                        }
                    }
                }
            }
        }
    }

    // Fallback path: structural duck-typing over the whole tree.
    collect_positioned_nodes(root, &mut candidates);

    let mut best: BTreeMap<Position, BuildingRecord> = BTreeMap::new();
    for map in candidates {
        let Some(position) = position_of(map) else {
            continue;
        };
        let record = BuildingRecord {
            position,
            level: level_of(map),
            building_id: first_string(map, &["buildingId", "building", "class"]),
            block_id: first_string(map, &["blockId", "block"]),
            name: resolve_name(map),
        };
        match best.entry(position) {
            Entry::Vacant(slot) => {
                slot.insert(record);
            }
            Entry::Occupied(mut slot) => {
                if record.level > slot.get().level {
                    slot.insert(record);
                }
            }
        }
    }

    best.into_values().collect()
}

/// Recursively collect every compound node that exposes a position shape.
fn collect_positioned_nodes<'a>(value: &'a Value, out: &mut Vec<&'a Map<String, Value>>) {
    match value {
        Value::Object(map) => {
            let has_axes =
                map.contains_key("x") && map.contains_key("y") && map.contains_key("z");
            if has_axes || map.contains_key("location") {
                out.push(map);
            }
            for child in map.values() {
                collect_positioned_nodes(child, out);
            }
        }
        Value::Array(items) => {
            for child in items {
                collect_positioned_nodes(child, out);
            }
        }
        _ => {}
    }
}

/// Integer view of a scalar leaf; numbers encoded as strings are accepted.
fn as_int(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
}

fn saturate_i32(value: i64) -> i32 {
    i32::try_from(value).unwrap_or(if value < 0 { i32::MIN } else { i32::MAX })
}

/// Position of a candidate: direct `x`/`y`/`z` fields preferred, nested
/// `location` compound (missing axes default to 0) otherwise.
fn position_of(map: &Map<String, Value>) -> Option<Position> {
    if let (Some(x), Some(y), Some(z)) = (
        map.get("x").and_then(as_int),
        map.get("y").and_then(as_int),
        map.get("z").and_then(as_int),
    ) {
        return Some(Position::new(
            saturate_i32(x),
            saturate_i32(y),
            saturate_i32(z),
        ));
    }
    let location = map.get("location")?.as_object()?;
    let axis = |key: &str| location.get(key).and_then(as_int).unwrap_or(0);
    Some(Position::new(
        saturate_i32(axis("x")),
        saturate_i32(axis("y")),
        saturate_i32(axis("z")),
    ))
}

/// First level-like field that parses as an integer; absent or unparseable
/// levels default to 0. Negative values clamp to 0.
fn level_of(map: &Map<String, Value>) -> u32 {
    for key in LEVEL_KEYS {
        if let Some(level) = map.get(key).and_then(as_int) {
            return u32::try_from(level).unwrap_or(if level < 0 { 0 } else { u32::MAX });
        }
    }
    0
}

/// First non-empty string value among `keys`.
fn first_string(map: &Map<String, Value>, keys: &[&str]) -> String {
    keys.iter()
        .filter_map(|key| map.get(*key).and_then(Value::as_str))
        .find(|text| !text.is_empty())
        .map(str::to_owned)
        .unwrap_or_default()
}

/// Resolve a display name for a candidate: preferred hint fields first,
/// then a bounded depth-first scan over string leaves, else the literal
/// fallback.
fn resolve_name(map: &Map<String, Value>) -> String {
    for key in NAME_HINT_KEYS {
        if let Some(name) = map.get(key).and_then(Value::as_str).and_then(pretty_name) {
            return name;
        }
    }
    let mut leaves = Vec::new();
    for child in map.values() {
        collect_string_leaves(child, &mut leaves);
    }
    for leaf in leaves {
        if let Some(name) = pretty_name(leaf) {
            return name;
        }
    }
    FALLBACK_BUILDING_NAME.to_owned()
}

/// Depth-first string-leaf collection, capped at [`DEEP_STRING_LIMIT`].
fn collect_string_leaves<'a>(value: &'a Value, out: &mut Vec<&'a str>) {
    if out.len() >= DEEP_STRING_LIMIT {
        return;
    }
    match value {
        Value::String(text) => out.push(text),
        Value::Object(map) => {
            for child in map.values() {
                collect_string_leaves(child, out);
            }
        }
        Value::Array(items) => {
            for child in items {
                collect_string_leaves(child, out);
            }
        }
        _ => {}
    }
}

/// Turn an identifier-ish hint into a display name.
///
/// Tried in order, first match wins:
///
/// 1. A namespaced hut block id (`<ns>:blockhut<tail>`): title-case the
///    tail and append `" Hut"` unless the tail already ends in `hut`.
/// 2. Any namespaced id (`<ns>:<name>`): title-case the name.
/// 3. A dotted class path containing `.building.`: title-case the segment
///    after it.
/// 4. A known building-type keyword appearing as a substring: title-case
///    the keyword.
///
/// Returns `None` when nothing matches; callers fall back to
/// [`FALLBACK_BUILDING_NAME`].
pub fn pretty_name(hint: &str) -> Option<String> {
    let lower = hint.to_ascii_lowercase();

    if let Some(tail) = namespaced_id_tail(&lower, "blockhut") {
        let base = humanize(tail);
        return Some(if tail.ends_with("hut") {
            base
        } else {
            format!("{base} Hut")
        });
    }

    if let Some(tail) = namespaced_id_tail(&lower, "") {
        return Some(humanize(tail));
    }

    if let Some(segment) = class_path_segment(&lower) {
        return Some(humanize(segment));
    }

    for keyword in BUILDING_KEYWORDS {
        if lower.contains(keyword) {
            return Some(humanize(keyword));
        }
    }

    None
}

fn is_id_char(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_'
}

/// Find `<ns>:<prefix><tail>` anywhere in a lowercased hint and return the
/// tail. The namespace and tail must contain at least one letter each, so
/// incidental colons (timestamps and the like) do not match.
fn namespaced_id_tail<'a>(lower: &'a str, prefix: &str) -> Option<&'a str> {
    for (colon, _) in lower.match_indices(':') {
        let before = lower.get(..colon)?;
        let namespace: String = before
            .chars()
            .rev()
            .take_while(|&c| is_id_char(c))
            .collect();
        if !namespace.chars().any(|c| c.is_ascii_lowercase()) {
            continue;
        }
        let after = lower.get(colon.saturating_add(1)..)?;
        let Some(rest) = after.strip_prefix(prefix) else {
            continue;
        };
        let end = rest.find(|c: char| !is_id_char(c)).unwrap_or(rest.len());
        let tail = rest.get(..end)?;
        if tail.chars().any(|c| c.is_ascii_lowercase()) {
            return Some(tail);
        }
    }
    None
}

/// Segment after `.building.` in a dotted class path.
fn class_path_segment(lower: &str) -> Option<&str> {
    let start = lower.find(".building.")?.saturating_add(".building.".len());
    let rest = lower.get(start..)?;
    let end = rest
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(rest.len());
    let segment = rest.get(..end)?;
    if segment.is_empty() {
        None
    } else {
        Some(segment)
    }
}

/// Underscores to spaces, then each word capitalized.
fn humanize(text: &str) -> String {
    text.replace('_', " ")
        .split(|c: char| c.is_whitespace() || c == '-')
        .filter(|word| !word.is_empty())
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    chars.next().map_or_else(String::new, |first| {
        first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect()
    })
}
