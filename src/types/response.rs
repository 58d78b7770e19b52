//! Generated narration and its derived annotations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::request::RequestType;

/// Rendered narration returned by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedResponse {
    /// Unique per inference call (cache hits return the original id).
    pub id: String,
    pub request_type: RequestType,
    pub content: String,
    pub metadata: ResponseMetadata,
    #[serde(default)]
    pub annotations: Annotations,
    pub created_at: DateTime<Utc>,
}

/// Bookkeeping for one generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseMetadata {
    pub processing_time_ms: u64,
    pub model: String,
    /// `ceil(chars / 4)`. An approximation, not a tokenizer count.
    pub token_estimate: usize,
    /// Length/punctuation heuristic in `[0, 1]`. Not calibrated.
    pub confidence: f32,
    /// Backend attempts used, including the successful one.
    pub attempts: u32,
}

/// Structured hints extracted from generated text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Annotations {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dice_rolls: Vec<DiceRequirement>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<ActionSuggestion>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scene_updates: Vec<SceneUpdate>,
}

impl Annotations {
    pub fn is_empty(&self) -> bool {
        self.dice_rolls.is_empty() && self.suggestions.is_empty() && self.scene_updates.is_empty()
    }
}

/// Kind of roll the narration asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiceRollKind {
    /// "roll Dexterity against 15"
    AbilityCheck,
    /// "Perception check DC 12"
    SkillCheck,
    /// "roll a d20", "roll 2d6"
    Die,
}

/// A dice roll requested by the narration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceRequirement {
    pub kind: DiceRollKind,
    /// What the roll is for, e.g. `Dexterity` or `1d20`.
    pub purpose: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<u32>,
}

/// Fixed taxonomy of suggested player actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionKind {
    SkillCheck,
    Attack,
    Dialogue,
}

/// A suggested next action for the player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionSuggestion {
    pub kind: SuggestionKind,
    pub description: String,
}

/// Scene state change hinted at by the narration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneUpdate {
    pub location_changed: bool,
    /// Destination named after the movement phrase, when one could be read.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_of_day: Option<String>,
}
