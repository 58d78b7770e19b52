//! Narration request types

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::profile::ProfileOverrides;
use crate::SkaldError;

/// The fixed set of narration categories.
///
/// Drives template selection and model routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestType {
    NarrativeResponse,
    SceneDescription,
    NpcDialogue,
    CombatNarration,
    QuestGeneration,
    StoryProgression,
    WorldBuilding,
    RandomEncounter,
    ConsequenceAnalysis,
}

impl RequestType {
    /// Every request type, in declaration order.
    pub const ALL: [RequestType; 9] = [
        RequestType::NarrativeResponse,
        RequestType::SceneDescription,
        RequestType::NpcDialogue,
        RequestType::CombatNarration,
        RequestType::QuestGeneration,
        RequestType::StoryProgression,
        RequestType::WorldBuilding,
        RequestType::RandomEncounter,
        RequestType::ConsequenceAnalysis,
    ];

    /// Wire name, e.g. `scene_description`.
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestType::NarrativeResponse => "narrative_response",
            RequestType::SceneDescription => "scene_description",
            RequestType::NpcDialogue => "npc_dialogue",
            RequestType::CombatNarration => "combat_narration",
            RequestType::QuestGeneration => "quest_generation",
            RequestType::StoryProgression => "story_progression",
            RequestType::WorldBuilding => "world_building",
            RequestType::RandomEncounter => "random_encounter",
            RequestType::ConsequenceAnalysis => "consequence_analysis",
        }
    }

    /// Which configured model slot serves this category.
    pub fn model_slot(&self) -> ModelSlot {
        match self {
            RequestType::NpcDialogue => ModelSlot::Dialogue,
            RequestType::CombatNarration | RequestType::RandomEncounter => ModelSlot::Combat,
            RequestType::QuestGeneration => ModelSlot::Quest,
            RequestType::NarrativeResponse
            | RequestType::SceneDescription
            | RequestType::StoryProgression
            | RequestType::WorldBuilding
            | RequestType::ConsequenceAnalysis => ModelSlot::Narrative,
        }
    }
}

impl fmt::Display for RequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for RequestType {
    type Err = SkaldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RequestType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| SkaldError::InvalidInput(format!("unknown request type: {s}")))
    }
}

/// Model slots a deployment configures ids for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelSlot {
    Narrative,
    Dialogue,
    Combat,
    Quest,
}

/// Narrative tone requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    Serious,
    Humorous,
    Dramatic,
    Mysterious,
    Lighthearted,
}

impl Tone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tone::Serious => "serious",
            Tone::Humorous => "humorous",
            Tone::Dramatic => "dramatic",
            Tone::Mysterious => "mysterious",
            Tone::Lighthearted => "lighthearted",
        }
    }
}

/// Output constraints. Part of the cache key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Constraints {
    /// Maximum response length, in words.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tone: Option<Tone>,
    /// Language code used for template lookup (default: `en`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default)]
    pub require_dice: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub topic_filters: Vec<String>,
}

impl Constraints {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_length(mut self, words: u32) -> Self {
        self.max_length = Some(words);
        self
    }

    pub fn tone(mut self, tone: Tone) -> Self {
        self.tone = Some(tone);
        self
    }

    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn require_dice(mut self, required: bool) -> Self {
        self.require_dice = required;
        self
    }

    pub fn topic_filter(mut self, topic: impl Into<String>) -> Self {
        self.topic_filters.push(topic.into());
        self
    }
}

/// A structured narration request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrationRequest {
    pub request_type: RequestType,
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub character_id: Option<String>,
    /// Free-form values merged into the template variables.
    #[serde(default)]
    pub additional_context: BTreeMap<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraints: Option<Constraints>,
    /// Per-call generation overrides. Not part of the cache key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overrides: Option<ProfileOverrides>,
}

impl NarrationRequest {
    pub fn new(request_type: RequestType, session_id: impl Into<String>) -> Self {
        Self {
            request_type,
            session_id: session_id.into(),
            player_action: None,
            character_id: None,
            additional_context: BTreeMap::new(),
            constraints: None,
            overrides: None,
        }
    }

    pub fn player_action(mut self, action: impl Into<String>) -> Self {
        self.player_action = Some(action.into());
        self
    }

    pub fn character(mut self, character_id: impl Into<String>) -> Self {
        self.character_id = Some(character_id.into());
        self
    }

    pub fn context(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.additional_context.insert(key.into(), value.into());
        self
    }

    pub fn constraints(mut self, constraints: Constraints) -> Self {
        self.constraints = Some(constraints);
        self
    }

    pub fn overrides(mut self, overrides: ProfileOverrides) -> Self {
        self.overrides = Some(overrides);
        self
    }

    /// Template language requested by the constraints, if any.
    pub fn language(&self) -> Option<&str> {
        self.constraints.as_ref().and_then(|c| c.language.as_deref())
    }
}
