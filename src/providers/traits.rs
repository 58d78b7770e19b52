//! Inference backend trait.
//!
//! The [`ModelRouter`](super::ModelRouter) talks to the language model
//! through this seam, so routing and retry policy can be exercised against
//! mock backends and the concrete transport can be swapped.
//!
//! A backend performs exactly one attempt per call. Retries, backoff and
//! per-attempt timeouts are the router's job.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::InferenceFailure;
use crate::types::ModelProfile;

/// Sampling options sent with a generation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationOptions {
    pub temperature: f32,
    pub top_p: f32,
    pub repeat_penalty: f32,
    /// Maximum tokens to generate.
    pub num_predict: u32,
    /// Context window size.
    pub num_ctx: u32,
}

impl From<&ModelProfile> for GenerationOptions {
    fn from(profile: &ModelProfile) -> Self {
        Self {
            temperature: profile.temperature,
            top_p: profile.top_p,
            repeat_penalty: profile.repeat_penalty,
            num_predict: profile.max_tokens,
            num_ctx: profile.context_window,
        }
    }
}

/// One generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendRequest {
    pub model: String,
    pub prompt: String,
    pub options: GenerationOptions,
}

impl BackendRequest {
    pub fn new(prompt: impl Into<String>, profile: &ModelProfile) -> Self {
        Self {
            model: profile.model.clone(),
            prompt: prompt.into(),
            options: GenerationOptions::from(profile),
        }
    }
}

/// Raw backend output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendReply {
    pub text: String,
    /// False when generation stopped early; the router retries such replies.
    pub done: bool,
}

/// A language-model backend.
#[async_trait]
pub trait InferenceBackend: Send + Sync {
    /// Backend name for logging/debugging.
    fn name(&self) -> &str;

    /// Issue one generation attempt.
    async fn generate(&self, request: &BackendRequest)
    -> Result<BackendReply, InferenceFailure>;

    /// Model identifiers the backend can serve.
    async fn list_models(&self) -> Result<Vec<String>, InferenceFailure>;

    /// Liveness probe. Default: the model listing succeeds.
    async fn health(&self) -> bool {
        self.list_models().await.is_ok()
    }
}
