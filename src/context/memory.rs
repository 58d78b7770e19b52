//! In-memory collaborators for embedding applications, tools and tests.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::providers::{CharacterProvider, SessionProvider};
use crate::types::{ActionLogEntry, CharacterSheet, SessionContext};
use crate::{Result, SkaldError};

/// Sessions and action logs held in process memory.
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, SessionContext>>,
    logs: RwLock<HashMap<String, Vec<ActionLogEntry>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a session, keyed on `context.session_id`.
    pub async fn insert_session(&self, context: SessionContext) {
        self.sessions
            .write()
            .await
            .insert(context.session_id.clone(), context);
    }

    /// Every log entry for a session, oldest first.
    pub async fn entries(&self, session_id: &str) -> Vec<ActionLogEntry> {
        self.logs
            .read()
            .await
            .get(session_id)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl SessionProvider for MemorySessionStore {
    async fn get_ai_context(&self, session_id: &str) -> Result<SessionContext> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .cloned()
            .ok_or_else(|| SkaldError::Context(format!("unknown session '{session_id}'")))
    }

    async fn get_action_log(
        &self,
        session_id: &str,
        actor: Option<&str>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<ActionLogEntry>> {
        let logs = self.logs.read().await;
        let Some(entries) = logs.get(session_id) else {
            return Ok(Vec::new());
        };
        Ok(entries
            .iter()
            .rev()
            .filter(|e| actor.is_none_or(|a| e.actor == a))
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn log_action(&self, entry: ActionLogEntry) -> Result<()> {
        if !self.sessions.read().await.contains_key(&entry.session_id) {
            return Err(SkaldError::Context(format!(
                "unknown session '{}'",
                entry.session_id
            )));
        }
        self.logs
            .write()
            .await
            .entry(entry.session_id.clone())
            .or_default()
            .push(entry);
        Ok(())
    }
}

/// Character sheets held in process memory.
#[derive(Default)]
pub struct MemoryCharacterStore {
    characters: RwLock<HashMap<String, CharacterSheet>>,
}

impl MemoryCharacterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, character: CharacterSheet) {
        self.characters
            .write()
            .await
            .insert(character.id.clone(), character);
    }
}

#[async_trait]
impl CharacterProvider for MemoryCharacterStore {
    async fn get_character(
        &self,
        character_id: &str,
        owner_id: &str,
    ) -> Result<Option<CharacterSheet>> {
        match self.characters.read().await.get(character_id) {
            Some(c) if c.owner_id != owner_id => Err(SkaldError::Context(format!(
                "character '{character_id}' does not belong to '{owner_id}'"
            ))),
            found => Ok(found.cloned()),
        }
    }
}
