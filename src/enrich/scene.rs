//! Scene update extraction: movement phrases and time-of-day words.

use std::sync::LazyLock;

use regex::Regex;

use super::find_word;
use crate::types::SceneUpdate;

static MOVEMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\byou\s+(?:finally\s+)?(?:arrive\s+(?:at|in)|enter|reach|step\s+(?:into|onto)|find\s+yourself\s+in|emerge\s+(?:into|onto|in)|travel\s+to|make\s+your\s+way\s+(?:to|into))\s+([^.,;:!?\n]+)",
    )
    .expect("movement pattern is valid")
});

/// Words that end a destination phrase ("the old mill as dusk settles").
const DESTINATION_BREAKS: &[&str] = &[
    " as ", " where ", " and ", " while ", " just ", " when ", " to find ", " only to ",
];

/// Maximum words kept from a destination phrase.
const MAX_DESTINATION_WORDS: usize = 8;

/// Keyword → canonical time of day.
const TIME_WORDS: &[(&str, &str)] = &[
    ("dawn", "dawn"),
    ("sunrise", "dawn"),
    ("daybreak", "dawn"),
    ("morning", "morning"),
    ("noon", "noon"),
    ("midday", "noon"),
    ("afternoon", "afternoon"),
    ("dusk", "dusk"),
    ("sunset", "dusk"),
    ("twilight", "dusk"),
    ("evening", "evening"),
    ("midnight", "midnight"),
    ("nightfall", "night"),
    ("night falls", "night"),
    ("night", "night"),
];

/// A scene update when the text moves the party or names a time of day.
pub fn extract(content: &str) -> Option<SceneUpdate> {
    let movement = MOVEMENT.captures(content);
    let new_location = movement
        .as_ref()
        .and_then(|caps| caps.get(1))
        .map(|m| destination(m.as_str()))
        .filter(|d| !d.is_empty());
    let time_of_day = time_of_day(&content.to_lowercase());

    if movement.is_none() && time_of_day.is_none() {
        return None;
    }
    Some(SceneUpdate {
        location_changed: movement.is_some(),
        new_location,
        time_of_day,
    })
}

fn destination(raw: &str) -> String {
    let lower = raw.to_ascii_lowercase();
    let cut = DESTINATION_BREAKS
        .iter()
        .filter_map(|b| lower.find(b))
        .min()
        .unwrap_or(raw.len());
    raw[..cut]
        .split_whitespace()
        .take(MAX_DESTINATION_WORDS)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Earliest time-of-day word in the (lowercased) text.
fn time_of_day(text: &str) -> Option<String> {
    TIME_WORDS
        .iter()
        .filter_map(|(word, canonical)| find_word(text, word).map(|pos| (pos, *canonical)))
        .min_by_key(|(pos, _)| *pos)
        .map(|(_, canonical)| canonical.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arrival_with_time() {
        let update = extract("You arrive at the old mill as dusk settles over the fields.").unwrap();
        assert!(update.location_changed);
        assert_eq!(update.new_location.as_deref(), Some("the old mill"));
        assert_eq!(update.time_of_day.as_deref(), Some("dusk"));
    }

    #[test]
    fn time_only() {
        let update = extract("By morning the storm has passed.").unwrap();
        assert!(!update.location_changed);
        assert!(update.new_location.is_none());
        assert_eq!(update.time_of_day.as_deref(), Some("morning"));
    }

    #[test]
    fn movement_only() {
        let update = extract("You step into the Gilded Tankard. Smoke hangs low.").unwrap();
        assert_eq!(update.new_location.as_deref(), Some("the Gilded Tankard"));
        assert!(update.time_of_day.is_none());
    }

    #[test]
    fn knights_are_not_night() {
        assert!(extract("A knight bows to the crowd.").is_none());
    }
}
