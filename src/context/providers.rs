//! Collaborator contracts.
//!
//! The engine does not own sessions, characters or the action log. An
//! embedding application implements these traits over its own store and
//! hands them to the builder.

use async_trait::async_trait;

use crate::Result;
use crate::types::{ActionLogEntry, CharacterSheet, SessionContext};

/// Actor name the engine uses for its own action-log entries.
pub const NARRATOR_ACTOR: &str = "ai_narrator";

/// Access to session and world state.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Location, time, weather, quests, NPCs and recent actions for a session.
    ///
    /// Unknown sessions should be reported as [`SkaldError::Context`](crate::SkaldError::Context).
    async fn get_ai_context(&self, session_id: &str) -> Result<SessionContext>;

    /// Action log entries, newest first, optionally filtered by actor.
    async fn get_action_log(
        &self,
        session_id: &str,
        actor: Option<&str>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<ActionLogEntry>>;

    /// Append an entry to a session's action log.
    async fn log_action(&self, entry: ActionLogEntry) -> Result<()>;
}

/// Access to character sheets.
#[async_trait]
pub trait CharacterProvider: Send + Sync {
    /// Look up a character owned by `owner_id`. `Ok(None)` when it does not exist.
    async fn get_character(
        &self,
        character_id: &str,
        owner_id: &str,
    ) -> Result<Option<CharacterSheet>>;
}
