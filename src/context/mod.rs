//! Context assembly for prompt rendering.
//!
//! [`ContextBuilder`] turns a [`NarrationRequest`] into a flat
//! [`Variables`] bag: session/world state from the [`SessionProvider`],
//! the character sheet from the [`CharacterProvider`] when the request names
//! one, and the last few narrator responses for continuity. Optional data
//! that is missing gets an explicit default so templates still read well.
//!
//! Precedence, lowest to highest: defaults, session state, character sheet,
//! request constraints, `additional_context`.

mod memory;
mod providers;

use std::sync::Arc;

use serde_json::{Value, json};
use tracing::{debug, warn};

pub use memory::{MemoryCharacterStore, MemorySessionStore};
pub use providers::{CharacterProvider, NARRATOR_ACTOR, SessionProvider};

use crate::templates::Variables;
use crate::types::{CharacterSheet, NarrationRequest, SessionContext};
use crate::{Result, SkaldError};

/// Default number of prior narrator responses pulled into the prompt.
pub const DEFAULT_HISTORY_WINDOW: usize = 5;

/// Default reply length, in words, when the request sets none.
pub const DEFAULT_MAX_LENGTH: u32 = 150;

const DEFAULTS: &[(&str, &str)] = &[
    ("characterName", "the adventurer"),
    ("characterRace", "wandering"),
    ("characterClass", "adventurer"),
    ("locationName", "an unknown place"),
    ("timeOfDay", "day"),
    ("weather", "clear"),
    ("activeQuests", "none"),
    ("presentNpcs", "none"),
    ("recentActions", "none"),
    ("previousResponses", "This is the start of the story."),
    ("playerAction", "looks around"),
    ("tone", "immersive"),
    ("diceInstruction", ""),
    ("npcName", "the stranger"),
    ("npcPersonality", "guarded but curious"),
    ("enemies", "unseen foes"),
    ("questTheme", "a local mystery"),
    ("terrain", "wilderness"),
];

const DICE_INSTRUCTION: &str = "When the outcome is uncertain, ask the player for a roll \
using the form \"roll <ability> against <difficulty>\".";

/// Builds template variables from collaborator data.
pub struct ContextBuilder {
    sessions: Arc<dyn SessionProvider>,
    characters: Option<Arc<dyn CharacterProvider>>,
    history_window: usize,
}

impl ContextBuilder {
    pub fn new(sessions: Arc<dyn SessionProvider>) -> Self {
        Self {
            sessions,
            characters: None,
            history_window: DEFAULT_HISTORY_WINDOW,
        }
    }

    pub fn with_characters(mut self, characters: Arc<dyn CharacterProvider>) -> Self {
        self.characters = Some(characters);
        self
    }

    pub fn with_history_window(mut self, window: usize) -> Self {
        self.history_window = window;
        self
    }

    pub fn history_window(&self) -> usize {
        self.history_window
    }

    /// Assemble the variable bag for a request.
    ///
    /// Fails with [`SkaldError::Context`] when the session is unavailable or
    /// the character lookup errors. A character that does not exist, or a
    /// history lookup that fails, only falls back to defaults.
    pub async fn build(&self, request: &NarrationRequest) -> Result<Variables> {
        let session = self
            .sessions
            .get_ai_context(&request.session_id)
            .await
            .map_err(as_context_error)?;

        let character = self.character(request, &session).await?;
        let history = self.previous_responses(&request.session_id).await;

        let mut vars = DEFAULTS
            .iter()
            .map(|(k, v)| (k.to_string(), Value::from(*v)))
            .collect::<Variables>();

        vars.insert("sessionId".into(), json!(request.session_id));
        vars.insert("requestType".into(), json!(request.request_type.as_str()));
        vars.insert("characterLevel".into(), json!(1));
        vars.insert("maxLength".into(), json!(DEFAULT_MAX_LENGTH));

        apply_session(&mut vars, &session);
        if let Some(ref c) = character {
            apply_character(&mut vars, c);
        }
        if !history.is_empty() {
            vars.insert("previousResponses".into(), json!(history.join("\n")));
        }
        if let Some(ref action) = request.player_action {
            vars.insert("playerAction".into(), json!(action));
        }
        if let Some(ref constraints) = request.constraints {
            if let Some(tone) = constraints.tone {
                vars.insert("tone".into(), json!(tone.as_str()));
            }
            if let Some(max) = constraints.max_length {
                vars.insert("maxLength".into(), json!(max));
            }
            if let Some(ref language) = constraints.language {
                vars.insert("language".into(), json!(language));
            }
            if constraints.require_dice {
                vars.insert("diceInstruction".into(), json!(DICE_INSTRUCTION));
            }
            if !constraints.topic_filters.is_empty() {
                vars.insert(
                    "topicFilters".into(),
                    json!(constraints.topic_filters.join(", ")),
                );
            }
        }

        for (key, value) in &request.additional_context {
            vars.insert(key.clone(), value.clone());
        }
        // world building describes the current place unless told otherwise
        if !vars.contains_key("worldElement")
            && let Some(location) = vars.get("locationName").cloned()
        {
            vars.insert("worldElement".into(), location);
        }

        debug!(
            session = %request.session_id,
            variables = vars.len(),
            history = history.len(),
            "context built"
        );
        Ok(vars)
    }

    async fn character(
        &self,
        request: &NarrationRequest,
        session: &SessionContext,
    ) -> Result<Option<CharacterSheet>> {
        let Some(ref character_id) = request.character_id else {
            return Ok(None);
        };
        let Some(ref characters) = self.characters else {
            warn!(character = %character_id, "no character provider configured, using defaults");
            return Ok(None);
        };
        characters
            .get_character(character_id, &session.owner_id)
            .await
            .map_err(as_context_error)
    }

    /// Prior narrator responses, oldest first.
    async fn previous_responses(&self, session_id: &str) -> Vec<String> {
        if self.history_window == 0 {
            return Vec::new();
        }
        match self
            .sessions
            .get_action_log(session_id, Some(NARRATOR_ACTOR), self.history_window, 0)
            .await
        {
            Ok(entries) => entries
                .into_iter()
                .rev()
                .filter_map(|e| e.response)
                .filter(|r| !r.trim().is_empty())
                .collect(),
            Err(e) => {
                warn!(session = %session_id, error = %e, "history unavailable, continuing without it");
                Vec::new()
            }
        }
    }
}

fn apply_session(vars: &mut Variables, session: &SessionContext) {
    let mut set = |key: &str, value: &Option<String>| {
        if let Some(v) = value.as_deref().filter(|v| !v.trim().is_empty()) {
            vars.insert(key.to_string(), json!(v));
        }
    };
    set("locationName", &session.location);
    set("timeOfDay", &session.time_of_day);
    set("weather", &session.weather);

    for (key, items, sep) in [
        ("activeQuests", &session.active_quests, ", "),
        ("presentNpcs", &session.present_npcs, ", "),
        ("recentActions", &session.recent_actions, "; "),
    ] {
        if !items.is_empty() {
            vars.insert(key.to_string(), json!(items.join(sep)));
        }
    }
}

fn apply_character(vars: &mut Variables, character: &CharacterSheet) {
    vars.insert("characterName".into(), json!(character.name));
    vars.insert("characterLevel".into(), json!(character.level));
    if let Some(ref race) = character.race {
        vars.insert("characterRace".into(), json!(race));
    }
    if let Some(ref class) = character.class {
        vars.insert("characterClass".into(), json!(class));
    }
}

fn as_context_error(err: SkaldError) -> SkaldError {
    match err {
        SkaldError::Context(_) => err,
        other => SkaldError::Context(other.to_string()),
    }
}
