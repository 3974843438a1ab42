//! Fixed recognizers over free-text log lines.
//!
//! Two recognizers run against each new log line, first match wins:
//!
//! 1. **Advancement**: `<player> has (made|completed|reached|earned) [the]
//!    (advancement|challenge|goal) [<title>]` — a player earning a one-time
//!    achievement.
//! 2. **Building action**: `colony <id> - [<verb>] building [<class>]
//!    [for Block{<id>}] [at BlockPos{x=.., y=.., z=..}]` — a debug line
//!    about a colony building.
//!
//! Both are case-insensitive. Lines matching neither are simply not events;
//! discarding them is routine, not an error.

use chronicle_types::{AdvancementEvent, BuildingAction, ColonyAction, LineEvent, Position};

/// Verbs accepted in building-action lines.
const ACTION_VERBS: [&str; 6] = [
    "new",
    "finished",
    "constructed",
    "upgraded",
    "built",
    "created",
];

/// Verbs announcing an advancement.
const ADVANCEMENT_VERBS: [&str; 4] = ["made", "completed", "reached", "earned"];

/// Nouns naming the kind of achievement.
const ADVANCEMENT_KINDS: [&str; 3] = ["advancement", "challenge", "goal"];

/// Action recorded when a building-action line carries no verb.
const DEFAULT_ACTION: &str = "event";

/// Apply both recognizers to one log line.
pub fn extract_line_event(line: &str) -> Option<LineEvent> {
    if let Some(advancement) = extract_advancement(line) {
        return Some(LineEvent::Advancement(advancement));
    }
    if let Some(action) = extract_building_action(line) {
        return Some(LineEvent::Building(action));
    }
    None
}

/// Whitespace-separated tokens with their byte offsets into the line.
fn tokens_with_offsets(line: &str) -> Vec<(usize, &str)> {
    let mut tokens = Vec::new();
    let mut start: Option<usize> = None;
    for (index, ch) in line.char_indices() {
        if ch.is_whitespace() {
            if let Some(s) = start.take() {
                if let Some(token) = line.get(s..index) {
                    tokens.push((s, token));
                }
            }
        } else if start.is_none() {
            start = Some(index);
        }
    }
    if let Some(s) = start {
        if let Some(token) = line.get(s..) {
            tokens.push((s, token));
        }
    }
    tokens
}

/// A player name: 1-16 word characters.
fn is_valid_player(token: &str) -> bool {
    (1..=16).contains(&token.len())
        && token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Strip surrounding punctuation from a word token before comparison.
fn clean_word(token: &str) -> &str {
    token.trim_matches(|c: char| !c.is_ascii_alphanumeric())
}

fn word_in(token: &str, set: &[&str]) -> bool {
    let cleaned = clean_word(token);
    set.iter().any(|word| cleaned.eq_ignore_ascii_case(word))
}

fn extract_advancement(line: &str) -> Option<AdvancementEvent> {
    let tokens = tokens_with_offsets(line);
    for (index, (_, token)) in tokens.iter().enumerate() {
        if !token.eq_ignore_ascii_case("has") {
            continue;
        }
        let Some(&(_, player)) = index.checked_sub(1).and_then(|i| tokens.get(i)) else {
            continue;
        };
        if !is_valid_player(player) {
            continue;
        }
        let Some(&(_, verb)) = tokens.get(index.saturating_add(1)) else {
            continue;
        };
        if !word_in(verb, &ADVANCEMENT_VERBS) {
            continue;
        }
        let mut kind_index = index.saturating_add(2);
        if let Some(&(_, maybe_the)) = tokens.get(kind_index) {
            if clean_word(maybe_the).eq_ignore_ascii_case("the") {
                kind_index = kind_index.saturating_add(1);
            }
        }
        let Some(&(kind_offset, kind)) = tokens.get(kind_index) else {
            continue;
        };
        if !word_in(kind, &ADVANCEMENT_KINDS) {
            continue;
        }
        // Title: the first bracketed span after the kind keyword.
        let Some(rest) = line.get(kind_offset.saturating_add(kind.len())..) else {
            continue;
        };
        let Some(open) = rest.find('[') else {
            continue;
        };
        let Some(after_open) = rest.get(open.saturating_add(1)..) else {
            continue;
        };
        let Some(close) = after_open.find(']') else {
            continue;
        };
        let Some(title) = after_open.get(..close).map(str::trim) else {
            continue;
        };
        if title.is_empty() {
            continue;
        }
        return Some(AdvancementEvent {
            player: player.to_owned(),
            title: title.to_owned(),
        });
    }
    None
}

/// Value between `{` and `}` after a case-insensitive marker such as
/// `Block{` or `BlockPos{`.
fn braced_value<'a>(line: &'a str, marker_lower: &str) -> Option<&'a str> {
    let lower = line.to_ascii_lowercase();
    let start = lower.find(marker_lower)?.saturating_add(marker_lower.len());
    let rest = line.get(start..)?;
    let close = rest.find('}')?;
    rest.get(..close)
}

/// Parse `x=.., y=.., z=..` from a `BlockPos{...}` body. All three axes
/// must be present for the position to count.
fn parse_block_pos(line: &str) -> Option<Position> {
    let body = braced_value(line, "blockpos{")?;
    let mut x = None;
    let mut y = None;
    let mut z = None;
    for part in body.split(',') {
        let (key, value) = part.split_once('=')?;
        let value: i32 = value.trim().parse().ok()?;
        match key.trim().to_ascii_lowercase().as_str() {
            "x" => x = Some(value),
            "y" => y = Some(value),
            "z" => z = Some(value),
            _ => return None,
        }
    }
    Some(Position::new(x?, y?, z?))
}

/// A building class token: dotted identifier characters only.
fn is_class_token(token: &str) -> bool {
    !token.is_empty()
        && token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_')
}

fn extract_building_action(line: &str) -> Option<BuildingAction> {
    let tokens = tokens_with_offsets(line);
    for (index, (_, token)) in tokens.iter().enumerate() {
        if !clean_word(token).eq_ignore_ascii_case("colony") {
            continue;
        }
        if let Some(action) = match_building_action(line, &tokens, index) {
            return Some(action);
        }
    }
    None
}

fn match_building_action(
    line: &str,
    tokens: &[(usize, &str)],
    colony_index: usize,
) -> Option<BuildingAction> {
    let (_, id_token) = tokens.get(colony_index.saturating_add(1))?;
    let colony_id: i64 = id_token.trim_end_matches('-').parse().ok()?;

    let mut cursor = colony_index.saturating_add(2);
    // Skip a standalone "-" separator between the id and the rest.
    while tokens
        .get(cursor)
        .is_some_and(|(_, t)| !t.is_empty() && t.chars().all(|c| c == '-'))
    {
        cursor = cursor.saturating_add(1);
    }

    let (_, next) = tokens.get(cursor)?;
    let next = next.trim_start_matches('-');
    let verb = if ACTION_VERBS
        .iter()
        .any(|v| next.eq_ignore_ascii_case(v))
    {
        cursor = cursor.saturating_add(1);
        Some(next.to_ascii_lowercase())
    } else {
        None
    };

    let (_, building_token) = tokens.get(cursor)?;
    if !building_token
        .trim_start_matches('-')
        .eq_ignore_ascii_case("building")
    {
        return None;
    }
    cursor = cursor.saturating_add(1);

    let building_class = tokens
        .get(cursor)
        .map(|&(_, t)| t)
        .filter(|t| {
            !t.eq_ignore_ascii_case("for") && !t.eq_ignore_ascii_case("at") && is_class_token(t)
        })
        .unwrap_or_default()
        .to_owned();

    let block_id = braced_value(line, "block{").unwrap_or_default().to_owned();
    let position = parse_block_pos(line).unwrap_or_default();
    let action = ColonyAction::parse(&verb.unwrap_or_else(|| DEFAULT_ACTION.to_owned()));

    Some(BuildingAction {
        colony_id,
        action,
        building_class,
        block_id,
        position,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn advancement(line: &str) -> Option<AdvancementEvent> {
        match extract_line_event(line) {
            Some(LineEvent::Advancement(event)) => Some(event),
            _ => None,
        }
    }

    fn building(line: &str) -> Option<BuildingAction> {
        match extract_line_event(line) {
            Some(LineEvent::Building(action)) => Some(action),
            _ => None,
        }
    }

    #[test]
    fn recognizes_made_advancement() {
        let event =
            advancement("[12:00:00]: Steve has made the advancement [Stone Age]").unwrap();
        assert_eq!(event.player, "Steve");
        assert_eq!(event.title, "Stone Age");
    }

    #[test]
    fn recognizes_verb_and_kind_variants() {
        for line in [
            "[12:00:00]: Alex has completed the challenge [Over 9000]",
            "[12:00:00]: Alex has reached the goal [Sky High]",
            "[12:00:00]: Alex has earned advancement [No The]",
        ] {
            assert!(advancement(line).is_some(), "should match: {line}");
        }
    }

    #[test]
    fn advancement_is_case_insensitive() {
        let event = advancement("[x]: steve HAS MADE THE ADVANCEMENT [Hot Stuff]").unwrap();
        assert_eq!(event.player, "steve");
        assert_eq!(event.title, "Hot Stuff");
    }

    #[test]
    fn rejects_overlong_player_names() {
        assert!(
            advancement("[x]: ThisNameIsWayTooLongToBeValid has made the advancement [T]")
                .is_none()
        );
    }

    #[test]
    fn rejects_unbracketed_titles() {
        assert!(advancement("[x]: Steve has made the advancement Stone Age").is_none());
    }

    #[test]
    fn recognizes_full_building_action() {
        let action = building(
            "[debug]: colony 7 - finished building com.mod.BuildingBuilder \
             for Block{modns:blockhutbuilder} at BlockPos{x=-12, y=70, z=44}",
        )
        .unwrap();
        assert_eq!(action.colony_id, 7);
        assert_eq!(action.action, ColonyAction::Other("finished".to_owned()));
        assert_eq!(action.building_class, "com.mod.BuildingBuilder");
        assert_eq!(action.block_id, "modns:blockhutbuilder");
        assert_eq!(action.position, Position::new(-12, 70, 44));
    }

    #[test]
    fn building_action_defaults_apply() {
        let action = building("colony 3 - building").unwrap();
        assert_eq!(action.colony_id, 3);
        assert_eq!(action.action, ColonyAction::Other("event".to_owned()));
        assert!(action.building_class.is_empty());
        assert!(action.block_id.is_empty());
        assert_eq!(action.position, Position::default());
    }

    #[test]
    fn constructed_verb_maps_to_structured_action() {
        let action = building("Colony 12 - constructed building").unwrap();
        assert_eq!(action.action, ColonyAction::Constructed);
    }

    #[test]
    fn building_action_without_separator_dash() {
        let action = building("colony 4 upgraded building warehouse").unwrap();
        assert_eq!(action.colony_id, 4);
        assert_eq!(action.action, ColonyAction::Other("upgraded".to_owned()));
        assert_eq!(action.building_class, "warehouse");
    }

    #[test]
    fn ordinary_lines_are_not_events() {
        for line in [
            "",
            "[12:00:00]: Steve joined the game",
            "colony count is now 5",
            "[chat] <Steve> has anyone seen my sword",
        ] {
            assert!(extract_line_event(line).is_none(), "should not match: {line}");
        }
    }

    #[test]
    fn advancement_wins_over_building_on_one_line() {
        // First recognizer takes precedence when a line could feed both.
        let line = "Steve has made the advancement [colony 3 - building]";
        assert!(matches!(
            extract_line_event(line),
            Some(LineEvent::Advancement(_))
        ));
    }
}
