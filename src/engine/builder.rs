//! Builder for configuring engine instances

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::info;

use super::{EngineInner, NarrationEngine, UsageStats};
use crate::cache::{CacheConfig, ResponseCache};
use crate::config::Config;
use crate::context::{CharacterProvider, ContextBuilder, SessionProvider};
use crate::enrich::{Enricher, HeuristicEnricher};
use crate::providers::{InferenceBackend, ModelRouter, OllamaBackend, RetryConfig};
use crate::templates::TemplateRegistry;
use crate::{Result, SkaldError};

/// Main entry point for creating engine instances.
pub struct Skald;

impl Skald {
    /// Create a new builder for configuring the engine.
    pub fn builder() -> SkaldBuilder {
        SkaldBuilder::new()
    }
}

/// Builder for configuring engine instances.
pub struct SkaldBuilder {
    config: Config,
    sessions: Option<Arc<dyn SessionProvider>>,
    characters: Option<Arc<dyn CharacterProvider>>,
    backend: Option<Arc<dyn InferenceBackend>>,
    enricher: Option<Arc<dyn Enricher>>,
    templates: Option<Arc<TemplateRegistry>>,
}

impl SkaldBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
            sessions: None,
            characters: None,
            backend: None,
            enricher: None,
            templates: None,
        }
    }

    /// Start from a loaded configuration. Later builder calls override it.
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Session and action-log collaborator (required).
    pub fn sessions(mut self, sessions: Arc<dyn SessionProvider>) -> Self {
        self.sessions = Some(sessions);
        self
    }

    /// Character sheet collaborator. Without one, character fields use defaults.
    pub fn characters(mut self, characters: Arc<dyn CharacterProvider>) -> Self {
        self.characters = Some(characters);
        self
    }

    /// Use a custom inference backend instead of Ollama.
    pub fn backend(mut self, backend: Arc<dyn InferenceBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Configure the Ollama backend URL.
    pub fn ollama(mut self, url: impl Into<String>) -> Self {
        self.config.backend.base_url = url.into();
        self
    }

    /// Set the per-attempt backend timeout (seconds).
    pub fn timeout(mut self, secs: u64) -> Self {
        self.config.backend.timeout_secs = secs;
        self
    }

    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.config.retry = retry;
        self
    }

    pub fn cache(mut self, cache: CacheConfig) -> Self {
        self.config.cache = cache;
        self
    }

    /// Number of prior narrator responses pulled into each prompt.
    pub fn history_window(mut self, window: usize) -> Self {
        self.config.context.history_window = window;
        self
    }

    /// Replace the default heuristic enricher.
    pub fn enricher(mut self, enricher: Arc<dyn Enricher>) -> Self {
        self.enricher = Some(enricher);
        self
    }

    /// Use a prepared template registry instead of the built-in templates.
    pub fn templates(mut self, templates: Arc<TemplateRegistry>) -> Self {
        self.templates = Some(templates);
        self
    }

    /// Build the engine.
    pub fn build(self) -> Result<NarrationEngine> {
        let sessions = self.sessions.ok_or_else(|| {
            SkaldError::Configuration("no session provider configured".to_string())
        })?;
        let config = self.config;
        let cache = ResponseCache::new(&config.cache)?;
        if config.backend.timeout_secs == 0 {
            return Err(SkaldError::Configuration(
                "backend timeout must be greater than zero".to_string(),
            ));
        }

        let timeout = config.backend.timeout();
        let backend = self.backend.unwrap_or_else(|| {
            Arc::new(OllamaBackend::with_base_url(
                config.backend.base_url.clone(),
                timeout,
            ))
        });
        let router = ModelRouter::new(backend, &config.models)
            .with_retry(config.retry.clone())
            .with_timeout(timeout)
            .with_confidence(config.confidence.clone());

        let mut context = ContextBuilder::new(Arc::clone(&sessions))
            .with_history_window(config.context.history_window);
        if let Some(characters) = self.characters {
            context = context.with_characters(characters);
        }

        let templates = self
            .templates
            .unwrap_or_else(|| Arc::new(TemplateRegistry::with_defaults()));
        let enricher = self
            .enricher
            .unwrap_or_else(|| Arc::new(HeuristicEnricher));

        info!(
            backend = router.backend_name(),
            templates = templates.len(),
            models = ?router.configured_models(),
            "narration engine ready"
        );

        Ok(NarrationEngine {
            inner: Arc::new(EngineInner {
                cache,
                config,
                templates,
                router: Arc::new(router),
                context,
                sessions,
                enricher,
                in_flight: Mutex::new(HashMap::new()),
                stats: UsageStats::default(),
            }),
        })
    }
}

impl Default for SkaldBuilder {
    fn default() -> Self {
        Self::new()
    }
}
