//! Data exchanged with the session and character collaborators.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// World and session state used to ground a prompt.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionContext {
    #[serde(default)]
    pub session_id: String,
    /// Account that owns the session; scopes character lookups.
    #[serde(default)]
    pub owner_id: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub time_of_day: Option<String>,
    #[serde(default)]
    pub weather: Option<String>,
    #[serde(default)]
    pub active_quests: Vec<String>,
    #[serde(default)]
    pub present_npcs: Vec<String>,
    /// Most recent player-facing actions, oldest first.
    #[serde(default)]
    pub recent_actions: Vec<String>,
}

/// One record in a session's action log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionLogEntry {
    pub session_id: String,
    pub actor: String,
    pub action_type: String,
    #[serde(default)]
    pub player_action: Option<String>,
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub details: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

/// Character data the narration may reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterSheet {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    #[serde(default)]
    pub race: Option<String>,
    #[serde(default)]
    pub class: Option<String>,
    #[serde(default = "default_level")]
    pub level: u32,
}

fn default_level() -> u32 {
    1
}
