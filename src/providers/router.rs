//! Model routing and the inference client.
//!
//! [`ModelRouter`] maps a [`RequestType`] to a [`ModelProfile`], merges
//! caller overrides, and issues the backend call under the retry policy and
//! a per-attempt timeout.
//!
//! Profiles live in a read-mostly table; [`ModelRouter::set_profile`]
//! publishes a whole new table so readers never see a partial update.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, instrument};

use super::heuristics::{ConfidenceThresholds, estimate_tokens};
use super::retry::{RetryConfig, with_retry};
use super::traits::{BackendReply, BackendRequest, InferenceBackend};
use crate::error::InferenceFailure;
use crate::telemetry;
use crate::types::{
    Annotations, GeneratedResponse, ModelProfile, ModelSlot, ProfileOverrides, RequestType,
    ResponseMetadata,
};
use crate::{Result, SkaldError};

/// Model used when no slot-specific id is configured.
pub const DEFAULT_MODEL: &str = "llama3.1";

/// Backend model id per slot. Unset slots fall back to `default_model`.
///
/// ```toml
/// [models]
/// default_model = "llama3.1"
/// dialogue = "mistral"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelAssignments {
    pub default_model: String,
    pub narrative: Option<String>,
    pub dialogue: Option<String>,
    pub combat: Option<String>,
    pub quest: Option<String>,
}

impl Default for ModelAssignments {
    fn default() -> Self {
        Self {
            default_model: DEFAULT_MODEL.to_string(),
            narrative: None,
            dialogue: None,
            combat: None,
            quest: None,
        }
    }
}

impl ModelAssignments {
    /// Model id for a slot.
    pub fn model_for(&self, slot: ModelSlot) -> &str {
        let assigned = match slot {
            ModelSlot::Narrative => self.narrative.as_deref(),
            ModelSlot::Dialogue => self.dialogue.as_deref(),
            ModelSlot::Combat => self.combat.as_deref(),
            ModelSlot::Quest => self.quest.as_deref(),
        };
        assigned.unwrap_or(&self.default_model)
    }
}

/// Built-in generation profile for each request type.
pub fn default_profiles(models: &ModelAssignments) -> HashMap<RequestType, ModelProfile> {
    RequestType::ALL
        .into_iter()
        .map(|t| {
            let base = ModelProfile::new(models.model_for(t.model_slot()));
            let profile = match t {
                RequestType::NarrativeResponse => base.temperature(0.8).max_tokens(400),
                RequestType::SceneDescription => base.temperature(0.7).max_tokens(350),
                RequestType::NpcDialogue => {
                    base.temperature(0.9).max_tokens(250).repeat_penalty(1.15)
                }
                RequestType::CombatNarration => base.temperature(0.75).max_tokens(300),
                RequestType::QuestGeneration => base.temperature(0.85).max_tokens(600),
                RequestType::StoryProgression => base.temperature(0.8).max_tokens(450),
                RequestType::WorldBuilding => base
                    .temperature(0.9)
                    .max_tokens(700)
                    .context_window(8192),
                RequestType::RandomEncounter => base.temperature(0.85).max_tokens(350),
                RequestType::ConsequenceAnalysis => {
                    base.temperature(0.6).max_tokens(400).top_p(0.85)
                }
            };
            (t, profile)
        })
        .collect()
}

/// Routes requests to models and drives the backend.
pub struct ModelRouter {
    backend: Arc<dyn InferenceBackend>,
    profiles: ArcSwap<HashMap<RequestType, ModelProfile>>,
    retry: RetryConfig,
    timeout: Duration,
    confidence: ConfidenceThresholds,
}

impl ModelRouter {
    pub fn new(backend: Arc<dyn InferenceBackend>, models: &ModelAssignments) -> Self {
        Self {
            backend,
            profiles: ArcSwap::from_pointee(default_profiles(models)),
            retry: RetryConfig::default(),
            timeout: super::ollama::DEFAULT_TIMEOUT,
            confidence: ConfidenceThresholds::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Bound on a single backend attempt.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_confidence(mut self, thresholds: ConfidenceThresholds) -> Self {
        self.confidence = thresholds;
        self
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry
    }

    /// Default profile for `request_type` with caller overrides applied.
    pub fn resolve(
        &self,
        request_type: RequestType,
        overrides: Option<&ProfileOverrides>,
    ) -> ModelProfile {
        let profile = self
            .profiles
            .load()
            .get(&request_type)
            .cloned()
            .unwrap_or_else(|| ModelProfile::new(DEFAULT_MODEL));
        match overrides {
            Some(o) => profile.merged(o),
            None => profile,
        }
    }

    /// Replace the default profile for one request type.
    pub fn set_profile(&self, request_type: RequestType, profile: ModelProfile) {
        self.profiles.rcu(|current| {
            let mut next = HashMap::clone(current);
            next.insert(request_type, profile.clone());
            next
        });
        debug!(%request_type, model = %profile.model, "profile replaced");
    }

    /// Snapshot of the profile table.
    pub fn profiles(&self) -> HashMap<RequestType, ModelProfile> {
        HashMap::clone(&self.profiles.load())
    }

    /// Distinct model ids referenced by the profile table.
    pub fn configured_models(&self) -> Vec<String> {
        self.profiles
            .load()
            .values()
            .map(|p| p.model.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Issue one logical inference call (retries included).
    #[instrument(skip(self, prompt, overrides), fields(model = tracing::field::Empty))]
    pub async fn generate(
        &self,
        prompt: &str,
        request_type: RequestType,
        overrides: Option<&ProfileOverrides>,
    ) -> Result<GeneratedResponse> {
        let profile = self.resolve(request_type, overrides);
        tracing::Span::current().record("model", profile.model.as_str());
        let request = BackendRequest::new(prompt, &profile);

        let started = Instant::now();
        let outcome = with_retry(&self.retry, &profile.model, || self.attempt(&request)).await;
        let elapsed = started.elapsed();

        metrics::histogram!(telemetry::INFERENCE_DURATION_SECONDS,
            "model" => profile.model.clone(),
        )
        .record(elapsed.as_secs_f64());

        match outcome {
            Ok((reply, attempts)) => {
                metrics::counter!(telemetry::INFERENCE_TOTAL,
                    "model" => profile.model.clone(),
                    "status" => "ok",
                )
                .increment(1);
                let content = reply.text.trim().to_string();
                debug!(attempts, chars = content.len(), "generation complete");
                Ok(GeneratedResponse {
                    id: uuid::Uuid::new_v4().to_string(),
                    request_type,
                    metadata: ResponseMetadata {
                        processing_time_ms: elapsed.as_millis() as u64,
                        model: profile.model,
                        token_estimate: estimate_tokens(&content),
                        confidence: self.confidence.score(&content),
                        attempts,
                    },
                    content,
                    annotations: Annotations::default(),
                    created_at: Utc::now(),
                })
            }
            Err((failure, attempts)) => {
                metrics::counter!(telemetry::INFERENCE_TOTAL,
                    "model" => profile.model.clone(),
                    "status" => "error",
                )
                .increment(1);
                Err(SkaldError::Inference {
                    model: profile.model,
                    attempts,
                    failure,
                })
            }
        }
    }

    async fn attempt(
        &self,
        request: &BackendRequest,
    ) -> std::result::Result<BackendReply, InferenceFailure> {
        let reply = tokio::time::timeout(self.timeout, self.backend.generate(request))
            .await
            .map_err(|_| InferenceFailure::Timeout(self.timeout))??;
        if !reply.done {
            return Err(InferenceFailure::Decode(
                "reply ended before generation finished (done = false)".to_string(),
            ));
        }
        if reply.text.trim().is_empty() {
            return Err(InferenceFailure::EmptyResponse);
        }
        Ok(reply)
    }

    /// Backend liveness.
    pub async fn health(&self) -> bool {
        self.backend.health().await
    }

    /// Models the backend reports as available.
    pub async fn list_models(&self) -> Result<Vec<String>> {
        self.backend
            .list_models()
            .await
            .map_err(|failure| SkaldError::Inference {
                model: String::new(),
                attempts: 1,
                failure,
            })
    }

    /// Load a model into backend memory with a single empty-prompt call.
    pub async fn preload(&self, model: &str) -> Result<()> {
        let mut profile = ModelProfile::new(model);
        profile.max_tokens = 1;
        let request = BackendRequest::new("", &profile);
        tokio::time::timeout(self.timeout, self.backend.generate(&request))
            .await
            .map_err(|_| InferenceFailure::Timeout(self.timeout))
            .and_then(|r| r)
            .map(|_| ())
            .map_err(|failure| SkaldError::Inference {
                model: model.to_string(),
                attempts: 1,
                failure,
            })
    }
}
