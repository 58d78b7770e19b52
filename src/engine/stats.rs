//! Engine-local usage counters.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Counters kept alongside the `metrics` facade so callers can read usage
/// without installing a recorder.
#[derive(Debug, Default)]
pub struct UsageStats {
    pub(crate) requests: AtomicU64,
    pub(crate) cache_hits: AtomicU64,
    pub(crate) cache_misses: AtomicU64,
    pub(crate) coalesced: AtomicU64,
    pub(crate) inference_calls: AtomicU64,
    pub(crate) inference_failures: AtomicU64,
    pub(crate) enrichment_failures: AtomicU64,
    pub(crate) action_log_failures: AtomicU64,
}

impl UsageStats {
    pub(crate) fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> UsageSnapshot {
        let read = |c: &AtomicU64| c.load(Ordering::Relaxed);
        UsageSnapshot {
            requests: read(&self.requests),
            cache_hits: read(&self.cache_hits),
            cache_misses: read(&self.cache_misses),
            coalesced: read(&self.coalesced),
            inference_calls: read(&self.inference_calls),
            inference_failures: read(&self.inference_failures),
            enrichment_failures: read(&self.enrichment_failures),
            action_log_failures: read(&self.action_log_failures),
        }
    }
}

/// Point-in-time copy of [`UsageStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageSnapshot {
    /// Every `process` call.
    pub requests: u64,
    pub cache_hits: u64,
    /// Calls not answered from the cache (leaders and followers).
    pub cache_misses: u64,
    /// Calls that joined another caller's in-flight computation.
    pub coalesced: u64,
    /// Logical inference calls; retries are not counted separately.
    pub inference_calls: u64,
    pub inference_failures: u64,
    pub enrichment_failures: u64,
    pub action_log_failures: u64,
}
