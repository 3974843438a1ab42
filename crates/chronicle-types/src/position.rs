//! Integer block positions.
//!
//! A building's identity within a colony is its position. Positions also
//! have a canonical `"x,y,z"` key form used as the map key in the persisted
//! scan state, so the same value round-trips through JSON object keys.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A 3D integer position identifying a building within a colony.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Position {
    /// East-west coordinate.
    pub x: i32,
    /// Vertical coordinate.
    pub y: i32,
    /// North-south coordinate.
    pub z: i32,
}

impl Position {
    /// Create a position from its three coordinates.
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Canonical `"x,y,z"` key used in the persisted scan state.
    pub fn key(&self) -> String {
        format!("{},{},{}", self.x, self.y, self.z)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.x, self.y, self.z)
    }
}

/// Error returned when parsing a position key fails.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid position key: {key:?}")]
pub struct ParsePositionError {
    /// The string that failed to parse.
    pub key: String,
}

impl FromStr for Position {
    type Err = ParsePositionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(',').map(str::trim);
        let parse = |part: Option<&str>| part.and_then(|p| p.parse::<i32>().ok());
        match (parse(parts.next()), parse(parts.next()), parse(parts.next())) {
            (Some(x), Some(y), Some(z)) if parts.next().is_none() => Ok(Self { x, y, z }),
            _ => Err(ParsePositionError { key: s.to_owned() }),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn key_round_trips() {
        let pos = Position::new(10, -64, 203);
        let parsed: Position = pos.key().parse().unwrap();
        assert_eq!(parsed, pos);
    }

    #[test]
    fn rejects_malformed_keys() {
        assert!("10,20".parse::<Position>().is_err());
        assert!("10,20,z".parse::<Position>().is_err());
        assert!("1,2,3,4".parse::<Position>().is_err());
        assert!("".parse::<Position>().is_err());
    }

    #[test]
    fn accepts_spaces_after_commas() {
        let parsed: Position = "1, 2, 3".parse().unwrap();
        assert_eq!(parsed, Position::new(1, 2, 3));
    }
}
