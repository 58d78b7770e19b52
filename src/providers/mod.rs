//! Model routing and inference backends.
//!
//! - [`ModelRouter`] picks a generation profile per request type, applies
//!   caller overrides and runs the backend call under the retry policy.
//! - [`InferenceBackend`] is the transport seam; [`OllamaBackend`] is the
//!   HTTP implementation.

pub mod heuristics;
pub mod ollama;
pub mod retry;
pub mod router;
pub mod traits;

pub use heuristics::{ConfidenceThresholds, estimate_tokens};
pub use ollama::OllamaBackend;
pub use retry::RetryConfig;
pub use router::{DEFAULT_MODEL, ModelAssignments, ModelRouter, default_profiles};
pub use traits::{BackendReply, BackendRequest, GenerationOptions, InferenceBackend};
