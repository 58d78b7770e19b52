//! The narration engine.
//!
//! [`NarrationEngine::process`] drives one request through
//! cache → in-flight join → context → template → inference → enrichment,
//! with at most one inference call in flight per cache key.
//!
//! # Coalescing
//!
//! The first caller for a key (the leader) spawns the pipeline as a task and
//! publishes a shared handle to its outcome in the in-flight map. Callers
//! arriving while it runs (followers) await the same handle and receive the
//! same `Ok` or `Err`; they never start work of their own. The task stores
//! the cache entry before it leaves the in-flight map, so a new caller always
//! finds one or the other. Because the pipeline runs in its own task, a
//! caller that stops waiting does not cancel it.

mod builder;
mod maintenance;
mod stats;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared, join_all};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::time::Instant;
use tracing::{Instrument, debug, info, instrument, warn};

pub use builder::{Skald, SkaldBuilder};
pub use maintenance::MaintenanceHandle;
pub use stats::{UsageSnapshot, UsageStats};

use crate::cache::{CacheInfo, ResponseCache, cache_key};
use crate::config::Config;
use crate::context::{ContextBuilder, NARRATOR_ACTOR, SessionProvider};
use crate::enrich::{Enricher, enrich_guarded};
use crate::providers::ModelRouter;
use crate::telemetry;
use crate::templates::{TemplateRegistry, render_body};
use crate::types::{ActionLogEntry, GeneratedResponse, NarrationRequest};
use crate::{Result, SkaldError};

type SharedOutcome = Shared<BoxFuture<'static, Result<GeneratedResponse>>>;

/// Backend and engine status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub backend: String,
    pub backend_healthy: bool,
    /// Models the backend reports. Empty when the backend is unreachable.
    pub models: Vec<String>,
    /// Models the profile table routes to.
    pub configured_models: Vec<String>,
    pub cache_entries: usize,
    pub in_flight: usize,
    pub stats: UsageSnapshot,
}

/// Outcome of warming one model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreloadResult {
    pub model: String,
    pub loaded: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Shared handle to the engine. Cheap to clone.
#[derive(Clone)]
pub struct NarrationEngine {
    inner: Arc<EngineInner>,
}

impl std::fmt::Debug for NarrationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NarrationEngine").finish_non_exhaustive()
    }
}

pub(crate) struct EngineInner {
    config: Config,
    templates: Arc<TemplateRegistry>,
    router: Arc<ModelRouter>,
    context: ContextBuilder,
    sessions: Arc<dyn SessionProvider>,
    enricher: Arc<dyn Enricher>,
    cache: ResponseCache,
    in_flight: Mutex<HashMap<String, SharedOutcome>>,
    stats: UsageStats,
}

enum Role {
    Leader,
    Follower,
}

impl NarrationEngine {
    /// Produce narration for a request.
    ///
    /// Identical requests within the cache TTL are answered from the cache;
    /// identical concurrent requests share one inference call and one outcome.
    #[instrument(skip_all, fields(request_type = %request.request_type, session = %request.session_id))]
    pub async fn process(&self, request: NarrationRequest) -> Result<GeneratedResponse> {
        let inner = &self.inner;
        let request_type = request.request_type.as_str();
        UsageStats::incr(&inner.stats.requests);
        metrics::counter!(telemetry::REQUESTS_TOTAL, "request_type" => request_type).increment(1);

        let key = cache_key(&request)?;
        if let Some(response) = inner.cached(&key, request_type) {
            return Ok(response);
        }

        let (outcome, role) = {
            let mut in_flight = lock(&inner.in_flight);
            match in_flight.get(&key) {
                Some(existing) => (existing.clone(), Role::Follower),
                None => {
                    // a leader may have finished between the first lookup and the lock
                    if let Some(response) = inner.cached(&key, request_type) {
                        return Ok(response);
                    }
                    let outcome = EngineInner::spawn_leader(Arc::clone(inner), key.clone(), request);
                    in_flight.insert(key.clone(), outcome.clone());
                    (outcome, Role::Leader)
                }
            }
        };

        UsageStats::incr(&inner.stats.cache_misses);
        metrics::counter!(telemetry::CACHE_MISSES_TOTAL, "request_type" => request_type)
            .increment(1);
        match role {
            Role::Leader => debug!(%key, "leading new computation"),
            Role::Follower => {
                UsageStats::incr(&inner.stats.coalesced);
                metrics::counter!(telemetry::COALESCED_TOTAL, "request_type" => request_type)
                    .increment(1);
                debug!(%key, "joining in-flight computation");
            }
        }

        outcome.await
    }

    /// Backend liveness, available models, and engine counters.
    pub async fn check_health(&self) -> HealthReport {
        let router = &self.inner.router;
        let (backend_healthy, models) = match router.list_models().await {
            Ok(models) => (true, models),
            Err(e) => {
                warn!(error = %e, "backend health check failed");
                (false, Vec::new())
            }
        };
        HealthReport {
            backend: router.backend_name().to_string(),
            backend_healthy,
            models,
            configured_models: router.configured_models(),
            cache_entries: self.inner.cache.len(),
            in_flight: self.in_flight(),
            stats: self.stats(),
        }
    }

    pub fn cache_info(&self) -> CacheInfo {
        self.inner.cache.info()
    }

    /// Drop every cached response. In-flight computations are unaffected.
    pub fn clear_cache(&self) {
        self.inner.cache.clear();
        info!("response cache cleared");
    }

    /// Evict expired cache entries now. Returns how many were removed.
    pub fn sweep_cache(&self) -> usize {
        self.inner.cache.sweep()
    }

    /// Warm every distinct configured model with one empty-prompt call.
    pub async fn preload_models(&self) -> Vec<PreloadResult> {
        let router = &self.inner.router;
        let models = router.configured_models();
        let outcomes = join_all(models.iter().map(|m| router.preload(m))).await;
        models
            .into_iter()
            .zip(outcomes)
            .map(|(model, outcome)| match outcome {
                Ok(()) => {
                    info!(%model, "model preloaded");
                    PreloadResult {
                        model,
                        loaded: true,
                        error: None,
                    }
                }
                Err(e) => {
                    warn!(%model, error = %e, "model preload failed");
                    PreloadResult {
                        model,
                        loaded: false,
                        error: Some(e.to_string()),
                    }
                }
            })
            .collect()
    }

    /// Effective configuration.
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn templates(&self) -> &TemplateRegistry {
        &self.inner.templates
    }

    pub fn router(&self) -> &ModelRouter {
        &self.inner.router
    }

    pub fn stats(&self) -> UsageSnapshot {
        self.inner.stats.snapshot()
    }

    /// Number of keys currently being computed.
    pub fn in_flight(&self) -> usize {
        lock(&self.inner.in_flight).len()
    }

    /// Start the periodic cache sweep at the configured interval.
    pub fn start_maintenance(&self) -> MaintenanceHandle {
        maintenance::spawn(&self.inner, self.inner.config.cache.sweep_interval)
    }
}

impl EngineInner {
    /// Serve from the cache, counting the hit.
    fn cached(&self, key: &str, request_type: &'static str) -> Option<GeneratedResponse> {
        let entry = self.cache.get(key)?;
        UsageStats::incr(&self.stats.cache_hits);
        metrics::counter!(telemetry::CACHE_HITS_TOTAL, "request_type" => request_type)
            .increment(1);
        debug!(%key, hits = entry.hits(), "cache hit");
        Some(entry.response.clone())
    }

    /// Spawn the pipeline for `key` and return a shareable handle to its outcome.
    ///
    /// Must be called with the in-flight lock held.
    fn spawn_leader(inner: Arc<Self>, key: String, request: NarrationRequest) -> SharedOutcome {
        let task = tokio::spawn(
            async move {
                let outcome = {
                    let _registered = InFlightGuard {
                        in_flight: &inner.in_flight,
                        key: &key,
                    };
                    let outcome = inner.run_pipeline(&request).await;
                    if let Ok(ref response) = outcome {
                        inner.cache.insert(&key, response.clone());
                    }
                    outcome
                };
                if let Ok(ref response) = outcome {
                    inner.log_exchange(&request, response);
                }
                outcome
            }
            .instrument(tracing::Span::current()),
        );
        async move {
            task.await
                .unwrap_or_else(|e| Err(SkaldError::Task(e.to_string())))
        }
        .boxed()
        .shared()
    }

    async fn run_pipeline(&self, request: &NarrationRequest) -> Result<GeneratedResponse> {
        let started = Instant::now();

        let variables = self.context.build(request).await?;
        let language = request
            .language()
            .unwrap_or(self.config.context.default_language.as_str());
        let template = self.templates.get(request.request_type, language)?;
        let prompt = render_body(&template.body, &variables);
        debug!(template = %template.id, chars = prompt.len(), "prompt rendered");

        UsageStats::incr(&self.stats.inference_calls);
        let mut response = self
            .router
            .generate(&prompt, request.request_type, request.overrides.as_ref())
            .await
            .inspect_err(|_| UsageStats::incr(&self.stats.inference_failures))?;

        match enrich_guarded(self.enricher.as_ref(), &response.content) {
            Ok(annotations) => response.annotations = annotations,
            Err(e) => {
                UsageStats::incr(&self.stats.enrichment_failures);
                metrics::counter!(telemetry::ENRICHMENT_FAILURES_TOTAL).increment(1);
                warn!(enricher = self.enricher.name(), error = %e, "enrichment skipped");
            }
        }

        response.metadata.processing_time_ms = started.elapsed().as_millis() as u64;
        Ok(response)
    }

    /// Append the exchange to the session's action log without waiting on it.
    fn log_exchange(self: &Arc<Self>, request: &NarrationRequest, response: &GeneratedResponse) {
        let entry = ActionLogEntry {
            session_id: request.session_id.clone(),
            actor: NARRATOR_ACTOR.to_string(),
            action_type: request.request_type.as_str().to_string(),
            player_action: request.player_action.clone(),
            response: Some(response.content.clone()),
            details: json!({
                "response_id": response.id,
                "model": response.metadata.model,
                "processing_time_ms": response.metadata.processing_time_ms,
                "token_estimate": response.metadata.token_estimate,
            }),
            timestamp: Utc::now(),
        };
        let inner = Arc::clone(self);
        tokio::spawn(async move {
            let session = entry.session_id.clone();
            if let Err(e) = inner.sessions.log_action(entry).await {
                UsageStats::incr(&inner.stats.action_log_failures);
                warn!(%session, error = %e, "failed to record narration in action log");
            }
        });
    }
}

/// Removes a key from the in-flight map when the leader task ends, however it ends.
struct InFlightGuard<'a> {
    in_flight: &'a Mutex<HashMap<String, SharedOutcome>>,
    key: &'a str,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        lock(self.in_flight).remove(self.key);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
