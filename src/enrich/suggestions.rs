//! Action suggestion extraction.
//!
//! A suggestion is only reported when the text proposes something to the
//! player ("you could", "what do you do"...). The domain keywords then pick
//! entries from a fixed taxonomy.

use super::contains_word;
use crate::types::{ActionSuggestion, SuggestionKind};

const PROPOSAL_PHRASES: &[&str] = &[
    "you could",
    "you might",
    "you may",
    "you can",
    "perhaps you",
    "consider",
    "what do you do",
    "will you",
    "do you",
];

const TAXONOMY: &[(SuggestionKind, &str, &[&str])] = &[
    (
        SuggestionKind::SkillCheck,
        "Attempt a skill check",
        &[
            "search",
            "investigate",
            "examine",
            "inspect",
            "climb",
            "sneak",
            "hide",
            "listen",
            "track",
        ],
    ),
    (
        SuggestionKind::Attack,
        "Attack",
        &["attack", "fight", "strike", "charge", "draw your", "ambush"],
    ),
    (
        SuggestionKind::Dialogue,
        "Start a conversation",
        &[
            "talk",
            "speak",
            "ask",
            "persuade",
            "negotiate",
            "convince",
            "question",
            "bargain",
        ],
    ),
];

/// Suggested actions, at most one per kind, in taxonomy order.
pub fn extract(content: &str) -> Vec<ActionSuggestion> {
    let text = content.to_lowercase();
    if !PROPOSAL_PHRASES.iter().any(|p| contains_word(&text, p)) {
        return Vec::new();
    }
    TAXONOMY
        .iter()
        .filter(|(_, _, keywords)| keywords.iter().any(|k| contains_word(&text, k)))
        .map(|(kind, description, _)| ActionSuggestion {
            kind: *kind,
            description: description.to_string(),
        })
        .collect()
}
