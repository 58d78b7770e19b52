//! Telemetry metric name constants.
//!
//! Centralised metric names for skald operations. Consumers install
//! their own `metrics` recorder (e.g. prometheus, statsd); without a
//! recorder installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `skald_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).
//!
//! # Common labels
//!
//! - `request_type`: narration category (e.g. "scene_description")
//! - `model`: backend model id
//! - `status`: outcome: "ok" or "error"

/// Total `process` calls.
///
/// Labels: `request_type`.
pub const REQUESTS_TOTAL: &str = "skald_requests_total";

/// Total cache hits.
///
/// Labels: `request_type`.
pub const CACHE_HITS_TOTAL: &str = "skald_cache_hits_total";

/// Total cache misses.
///
/// Labels: `request_type`.
pub const CACHE_MISSES_TOTAL: &str = "skald_cache_misses_total";

/// Calls that joined an in-flight computation instead of starting one.
///
/// Labels: `request_type`.
pub const COALESCED_TOTAL: &str = "skald_coalesced_total";

/// Logical inference calls (one per leader, regardless of retries).
///
/// Labels: `model`, `status` ("ok" | "error").
pub const INFERENCE_TOTAL: &str = "skald_inference_total";

/// Inference duration in seconds, retries and backoff included.
///
/// Labels: `model`.
pub const INFERENCE_DURATION_SECONDS: &str = "skald_inference_duration_seconds";

/// Total retry attempts (not counting the initial attempt).
///
/// Labels: `model`, `class` ("rate_limited" | "connection_refused" | "other").
pub const RETRIES_TOTAL: &str = "skald_retries_total";

/// Enrichment passes that failed and were skipped.
pub const ENRICHMENT_FAILURES_TOTAL: &str = "skald_enrichment_failures_total";

/// Cache entries removed by the periodic sweep.
pub const CACHE_EVICTIONS_TOTAL: &str = "skald_cache_evictions_total";
