//! Derived events and their action vocabulary.
//!
//! Chronicle records two kinds of facts: a player earning an advancement
//! (a permanent, one-time fact) and a colony building being constructed or
//! upgraded (synthesized from snapshot diffs or observed in debug log lines).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::position::Position;

/// What happened to a colony building.
///
/// The canonical text form (`constructed`, `level_N`, or free text) is what
/// the store persists and what the duplicate check compares against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColonyAction {
    /// A building appeared at level 1 or above where none was known before.
    Constructed,
    /// A building's level rose to the given value.
    Level(u32),
    /// A free-text action observed in a log line (`new`, `upgraded`, ...).
    Other(String),
}

impl ColonyAction {
    /// Parse the canonical text form back into an action.
    ///
    /// `constructed` and `level_N` map to their structured variants;
    /// anything else is kept verbatim as [`ColonyAction::Other`].
    pub fn parse(text: &str) -> Self {
        if text == "constructed" {
            return Self::Constructed;
        }
        if let Some(n) = text.strip_prefix("level_").and_then(|n| n.parse().ok()) {
            return Self::Level(n);
        }
        Self::Other(text.to_owned())
    }
}

impl fmt::Display for ColonyAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constructed => f.write_str("constructed"),
            Self::Level(n) => write!(f, "level_{n}"),
            Self::Other(text) => f.write_str(text),
        }
    }
}

/// A player advancement announced in the simulation log.
///
/// Uniqueness key: (player, title) — recorded at most once, ever.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvancementEvent {
    /// Player name, 1-16 word characters.
    pub player: String,
    /// Advancement title as announced (without the surrounding brackets).
    pub title: String,
}

/// A colony building event, ready to be recorded.
///
/// Uniqueness key: (`colony_id`, action, `building_name`, position) within
/// the store's recency window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColonyEvent {
    /// Numeric colony identifier.
    pub colony_id: i64,
    /// Colony display name from the directory, when known.
    pub colony_name: Option<String>,
    /// Colony owner from the directory, when known.
    pub owner: Option<String>,
    /// What happened.
    pub action: ColonyAction,
    /// Building class identifier.
    pub building_id: String,
    /// Human-readable building name.
    pub building_name: String,
    /// Block identifier.
    pub block_id: String,
    /// Building position ((0,0,0) when the source carried none).
    pub position: Position,
    /// The raw text this event was derived from (log line or diff summary).
    pub raw_text: String,
}

/// A building action recognized in a debug log line.
///
/// This is the extractor's output before the colony directory lookup turns
/// it into a full [`ColonyEvent`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildingAction {
    /// Numeric colony identifier named in the line.
    pub colony_id: i64,
    /// Action verb from the line (`event` when absent).
    pub action: ColonyAction,
    /// Building class token, empty when absent.
    pub building_class: String,
    /// Block identifier, empty when absent.
    pub block_id: String,
    /// Position from the line, (0,0,0) when absent.
    pub position: Position,
}

/// A typed event recognized in a single log line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineEvent {
    /// An advancement announcement.
    Advancement(AdvancementEvent),
    /// A building action debug line.
    Building(BuildingAction),
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn action_text_round_trips() {
        for action in [
            ColonyAction::Constructed,
            ColonyAction::Level(3),
            ColonyAction::Other("upgraded".to_owned()),
        ] {
            assert_eq!(ColonyAction::parse(&action.to_string()), action);
        }
    }

    #[test]
    fn level_text_form() {
        assert_eq!(ColonyAction::Level(5).to_string(), "level_5");
    }

    #[test]
    fn malformed_level_is_free_text() {
        assert_eq!(
            ColonyAction::parse("level_up"),
            ColonyAction::Other("level_up".to_owned())
        );
    }

    #[test]
    fn colony_event_round_trips_through_json() {
        let event = ColonyEvent {
            colony_id: 7,
            colony_name: Some("Riverside".to_owned()),
            owner: None,
            action: ColonyAction::Level(3),
            building_id: "com.mod.BuildingBuilder".to_owned(),
            building_name: "Builder Hut".to_owned(),
            block_id: "modns:blockhutbuilder".to_owned(),
            position: Position::new(10, 64, 20),
            raw_text: "snapshot level-up Builder Hut -> L3 @ 10,64,20".to_owned(),
        };

        let json = serde_json::to_string(&event).unwrap();
        let back: ColonyEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}
