//! TTL cache for generated narration.
//!
//! Entries live in a bounded moka cache. moka's own time-to-live is only a
//! memory backstop; expiry as the engine sees it is decided by each entry's
//! deadline on the tokio clock, so reads, sweeps and tests agree on one
//! notion of "now".
//!
//! # Key
//!
//! [`cache_key`] encodes `(request_type, session_id, player_action,
//! constraints)` and nothing else. `character_id`, `additional_context` and
//! profile overrides are deliberately outside the key, so two characters in
//! one session issuing the same request share a cached narration.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::debug;

use crate::types::{Constraints, GeneratedResponse, NarrationRequest, RequestType};
use crate::{Result, SkaldError, telemetry};

/// Longest accepted TTL or sweep interval (1000 years, moka's own ceiling).
pub const MAX_CACHE_DURATION: Duration = Duration::from_secs(1000 * 365 * 24 * 60 * 60);

/// Configuration for the response cache.
///
/// ```rust
/// # use skald::CacheConfig;
/// # use std::time::Duration;
/// let config = CacheConfig::new()
///     .max_entries(1_000)
///     .ttl(Duration::from_secs(300));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of cached entries. Default: 10,000.
    pub max_entries: u64,
    /// Time-to-live for cached entries. Default: 10 minutes.
    #[serde(with = "secs", rename = "ttl_secs")]
    pub ttl: Duration,
    /// Interval between expiry sweeps. Default: 30 minutes.
    #[serde(with = "secs", rename = "sweep_interval_secs")]
    pub sweep_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            ttl: Duration::from_secs(600),
            sweep_interval: Duration::from_secs(1800),
        }
    }
}

impl CacheConfig {
    /// Create a new config with sensible defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of cached entries.
    pub fn max_entries(mut self, n: u64) -> Self {
        self.max_entries = n;
        self
    }

    /// Set the time-to-live for cached entries.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set the interval between expiry sweeps.
    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Reject durations the cache or its timers cannot represent.
    pub fn validate(&self) -> Result<()> {
        if self.sweep_interval.is_zero() {
            return Err(SkaldError::Configuration(
                "cache sweep interval must be greater than zero".to_string(),
            ));
        }
        for (name, value) in [("ttl", self.ttl), ("sweep interval", self.sweep_interval)] {
            if value > MAX_CACHE_DURATION || Instant::now().checked_add(value).is_none() {
                return Err(SkaldError::Configuration(format!(
                    "cache {name} of {}s is out of range (max {}s)",
                    value.as_secs(),
                    MAX_CACHE_DURATION.as_secs()
                )));
            }
        }
        Ok(())
    }
}

/// One cached response.
#[derive(Debug)]
pub struct CacheEntry {
    pub key: String,
    pub response: GeneratedResponse,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    deadline: Instant,
    hits: AtomicU64,
}

impl CacheEntry {
    fn new(key: String, response: GeneratedResponse, ttl: Duration) -> Self {
        let created_at = Utc::now();
        let expires_at = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|d| created_at.checked_add_signed(d))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self {
            key,
            response,
            created_at,
            expires_at,
            deadline: Instant::now() + ttl,
            hits: AtomicU64::new(0),
        }
    }

    /// Times this entry has been served.
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.deadline
    }
}

/// Serializable view of one entry, for operators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntryInfo {
    pub key: String,
    pub request_type: RequestType,
    pub response_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub hits: u64,
    /// Past its TTL but not yet removed by a read or a sweep.
    pub expired: bool,
}

/// Cache contents and settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheInfo {
    pub size: usize,
    pub max_entries: u64,
    pub ttl_secs: u64,
    /// Stored entries, sorted by key.
    pub entries: Vec<CacheEntryInfo>,
}

/// In-memory TTL cache of generated narration.
pub struct ResponseCache {
    entries: moka::sync::Cache<String, Arc<CacheEntry>>,
    config: CacheConfig,
}

impl ResponseCache {
    /// Create a new response cache with the given configuration.
    ///
    /// Fails with [`SkaldError::Configuration`] when the config does not
    /// pass [`CacheConfig::validate`].
    pub fn new(config: &CacheConfig) -> Result<Self> {
        config.validate()?;
        let entries = moka::sync::Cache::builder()
            .max_capacity(config.max_entries)
            .time_to_live(config.ttl)
            .build();
        Ok(Self {
            entries,
            config: config.clone(),
        })
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Look up a live entry and count the hit.
    ///
    /// An expired entry found here is removed and reported as a miss.
    pub fn get(&self, key: &str) -> Option<Arc<CacheEntry>> {
        let entry = self.entries.get(key)?;
        if entry.is_expired() {
            self.entries.invalidate(key);
            debug!(key, "expired cache entry dropped on read");
            return None;
        }
        entry.hits.fetch_add(1, Ordering::Relaxed);
        Some(entry)
    }

    /// Store a response under `key`, replacing any previous entry.
    pub fn insert(&self, key: &str, response: GeneratedResponse) -> Arc<CacheEntry> {
        let entry = Arc::new(CacheEntry::new(key.to_string(), response, self.config.ttl));
        self.entries.insert(key.to_string(), Arc::clone(&entry));
        entry
    }

    /// Evict every expired entry. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        let expired = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired())
            .map(|(key, _)| key)
            .collect::<Vec<_>>();
        for key in &expired {
            self.entries.invalidate(key.as_str());
        }
        self.entries.run_pending_tasks();
        if !expired.is_empty() {
            metrics::counter!(telemetry::CACHE_EVICTIONS_TOTAL).increment(expired.len() as u64);
        }
        expired.len()
    }

    /// Snapshot of stored entries, including expired ones awaiting a sweep.
    pub fn info(&self) -> CacheInfo {
        let mut entries = self
            .entries
            .iter()
            .map(|(_, entry)| CacheEntryInfo {
                key: entry.key.clone(),
                request_type: entry.response.request_type,
                response_id: entry.response.id.clone(),
                created_at: entry.created_at,
                expires_at: entry.expires_at,
                hits: entry.hits(),
                expired: entry.is_expired(),
            })
            .collect::<Vec<_>>();
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        CacheInfo {
            size: entries.len(),
            max_entries: self.config.max_entries,
            ttl_secs: self.config.ttl.as_secs(),
            entries,
        }
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Evict all entries.
    pub fn clear(&self) {
        self.entries.invalidate_all();
        self.entries.run_pending_tasks();
    }
}

/// Compute the cache key for a request.
///
/// The request type prefix is followed by the JSON encoding of session,
/// player action and constraints, so distinct requests never share a key.
/// Missing constraints encode like default constraints.
pub fn cache_key(request: &NarrationRequest) -> Result<String> {
    let defaults = Constraints::default();
    let constraints = request.constraints.as_ref().unwrap_or(&defaults);
    let fields = serde_json::to_string(&(
        &request.session_id,
        &request.player_action,
        constraints,
    ))?;
    Ok(format!("{}:{fields}", request.request_type))
}

/// Serde adapter storing durations as whole seconds.
pub(crate) mod secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Tone;

    fn key(request: &NarrationRequest) -> String {
        cache_key(request).unwrap()
    }

    fn request() -> NarrationRequest {
        NarrationRequest::new(RequestType::NarrativeResponse, "s1").player_action("open the door")
    }

    #[test]
    fn cache_key_deterministic() {
        assert_eq!(key(&request()), key(&request()));
    }

    #[test]
    fn cache_key_differs_on_request_type() {
        let mut other = request();
        other.request_type = RequestType::SceneDescription;
        assert_ne!(key(&request()), key(&other));
    }

    #[test]
    fn cache_key_differs_on_action_and_session() {
        assert_ne!(
            key(&request()),
            key(&request().player_action("close the door"))
        );
        let mut other = request();
        other.session_id = "s2".into();
        assert_ne!(key(&request()), key(&other));
    }

    #[test]
    fn cache_key_differs_on_constraints() {
        let toned = request().constraints(Constraints::new().tone(Tone::Dramatic));
        assert_ne!(key(&request()), key(&toned));
    }

    #[test]
    fn missing_constraints_equal_default_constraints() {
        let explicit = request().constraints(Constraints::default());
        assert_eq!(key(&request()), key(&explicit));
    }

    #[test]
    fn cache_key_ignores_character_and_context() {
        let other = request()
            .character("c-42")
            .context("locationName", "Tavern");
        assert_eq!(key(&request()), key(&other));
    }

    #[test]
    fn cache_key_is_prefixed_with_request_type() {
        assert!(key(&request()).starts_with("narrative_response:"));
    }

    #[test]
    fn cache_key_keeps_field_boundaries() {
        // same concatenated text, different split between session and action
        let a = NarrationRequest::new(RequestType::NarrativeResponse, "s1:x").player_action("y");
        let b = NarrationRequest::new(RequestType::NarrativeResponse, "s1").player_action("x:y");
        assert_ne!(key(&a), key(&b));

        let none = NarrationRequest::new(RequestType::NarrativeResponse, "s1");
        let empty = none.clone().player_action("");
        assert_ne!(key(&none), key(&empty));
    }

    #[test]
    fn cache_key_embeds_fields_verbatim() {
        assert_eq!(
            key(&request()),
            r#"narrative_response:["s1","open the door",{"require_dice":false}]"#
        );
    }

    #[test]
    fn default_config_validates() {
        assert!(CacheConfig::default().validate().is_ok());
    }

    #[test]
    fn oversized_durations_are_rejected() {
        let too_long = MAX_CACHE_DURATION + Duration::from_secs(1);
        for config in [
            CacheConfig::new().ttl(too_long),
            CacheConfig::new().sweep_interval(too_long),
            CacheConfig::new().sweep_interval(Duration::ZERO),
            CacheConfig::new().ttl(Duration::from_secs(u64::MAX)),
        ] {
            assert!(matches!(
                ResponseCache::new(&config),
                Err(SkaldError::Configuration(_))
            ));
        }
    }
}
