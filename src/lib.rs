//! Skald - narration engine for tabletop role-playing sessions
//!
//! This crate turns a structured narration request into text from a local
//! language model. It renders a prompt from session and character context,
//! routes the request to a model profile, retries transient backend
//! failures, caches responses for a short TTL, and coalesces identical
//! concurrent requests into a single inference call.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use skald::{
//!     MemorySessionStore, NarrationRequest, RequestType, SessionContext, Skald,
//! };
//!
//! #[tokio::main]
//! async fn main() -> skald::Result<()> {
//!     let sessions = Arc::new(MemorySessionStore::new());
//!     sessions
//!         .insert_session(SessionContext {
//!             session_id: "s1".into(),
//!             location: Some("the Prancing Pony".into()),
//!             ..Default::default()
//!         })
//!         .await;
//!
//!     let engine = Skald::builder()
//!         .ollama("http://localhost:11434")
//!         .sessions(sessions)
//!         .build()?;
//!     let _sweep = engine.start_maintenance();
//!
//!     let response = engine
//!         .process(
//!             NarrationRequest::new(RequestType::NarrativeResponse, "s1")
//!                 .player_action("I ask the barkeep about the missing caravan"),
//!         )
//!         .await?;
//!
//!     println!("{}", response.content);
//!     for roll in &response.annotations.dice_rolls {
//!         println!("roll requested: {}", roll.purpose);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Heuristics
//!
//! Token estimates, confidence scores and annotations (dice rolls,
//! suggestions, scene updates) are heuristics. They are useful hints for a
//! user interface, not authoritative readings of the text.

pub mod cache;
pub mod config;
pub mod context;
pub mod engine;
pub mod enrich;
pub mod error;
pub mod providers;
pub mod telemetry;
pub mod templates;
pub mod types;

// Re-export main types at crate root
pub use cache::{CacheConfig, CacheInfo, ResponseCache};
pub use config::Config;
pub use context::{
    CharacterProvider, ContextBuilder, MemoryCharacterStore, MemorySessionStore, SessionProvider,
};
pub use engine::{
    HealthReport, MaintenanceHandle, NarrationEngine, PreloadResult, Skald, SkaldBuilder,
    UsageSnapshot,
};
pub use enrich::{Enricher, HeuristicEnricher};
pub use error::{FailureClass, InferenceFailure, Result, SkaldError};
pub use providers::{
    ConfidenceThresholds, InferenceBackend, ModelAssignments, ModelRouter, OllamaBackend,
    RetryConfig,
};
pub use templates::{TemplateIssue, TemplateRegistry, Variables};

// Re-export all types
pub use types::{
    ActionLogEntry, ActionSuggestion, Annotations, CharacterSheet, Constraints, DiceRequirement,
    DiceRollKind, GeneratedResponse, ModelProfile, ModelSlot, NarrationRequest, ProfileOverrides,
    PromptTemplate, RequestType, ResponseMetadata, SceneUpdate, SessionContext, SuggestionKind,
    Tone,
};
