//! Public types for the narration API.

mod profile;
mod request;
mod response;
mod session;
mod template;

pub use profile::{ModelProfile, ProfileOverrides};
pub use request::{Constraints, ModelSlot, NarrationRequest, RequestType, Tone};
pub use response::{
    ActionSuggestion, Annotations, DiceRequirement, DiceRollKind, GeneratedResponse,
    ResponseMetadata, SceneUpdate, SuggestionKind,
};
pub use session::{ActionLogEntry, CharacterSheet, SessionContext};
pub use template::PromptTemplate;
