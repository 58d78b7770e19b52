//! Skald error types

use std::time::Duration;

use crate::types::RequestType;

/// Skald error types.
///
/// `Clone` so a single leader outcome can be handed to every caller that
/// joined the same in-flight request.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SkaldError {
    // Collaborator errors
    #[error("context unavailable: {0}")]
    Context(String),

    // Template errors
    #[error("no template for {request_type} ({language})")]
    TemplateNotFound {
        request_type: RequestType,
        language: String,
    },

    #[error("template error: {0}")]
    Template(String),

    // Backend errors, after retries are exhausted
    #[error("inference failed on model '{model}' after {attempts} attempt(s): {failure}")]
    Inference {
        model: String,
        attempts: u32,
        failure: InferenceFailure,
    },

    /// Heuristic post-processing failed. Recovered inside the engine.
    #[error("enrichment failed: {0}")]
    Enrichment(String),

    // Data errors
    #[error("JSON error: {0}")]
    Json(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    // Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The task computing a narration aborted before producing an outcome.
    #[error("narration task failed: {0}")]
    Task(String),
}

impl From<serde_json::Error> for SkaldError {
    fn from(err: serde_json::Error) -> Self {
        SkaldError::Json(err.to_string())
    }
}

impl SkaldError {
    /// The backend failure behind an `Inference` error, if any.
    pub fn inference_failure(&self) -> Option<&InferenceFailure> {
        match self {
            SkaldError::Inference { failure, .. } => Some(failure),
            _ => None,
        }
    }
}

/// A single failed call to the inference backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InferenceFailure {
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    #[error("connection refused: {0}")]
    ConnectionRefused(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("malformed backend response: {0}")]
    Decode(String),

    #[error("empty response from model")]
    EmptyResponse,
}

/// Backoff bucket a failure falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    RateLimited,
    ConnectionRefused,
    Other,
}

impl InferenceFailure {
    pub fn class(&self) -> FailureClass {
        match self {
            InferenceFailure::RateLimited { .. } => FailureClass::RateLimited,
            InferenceFailure::ConnectionRefused(_) => FailureClass::ConnectionRefused,
            _ => FailureClass::Other,
        }
    }

    /// Server-provided wait hint, when the backend sent one.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            InferenceFailure::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

/// Result type alias for Skald operations
pub type Result<T> = std::result::Result<T, SkaldError>;
