//! Tests for metrics integration.
//!
//! Uses `metrics_util::debugging::DebuggingRecorder` to capture and assert
//! on emitted metrics without needing a real exporter.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use metrics_util::MetricKind;
use metrics_util::debugging::{DebugValue, DebuggingRecorder};

use skald::providers::{BackendReply, BackendRequest};
use skald::telemetry;
use skald::{
    InferenceBackend, InferenceFailure, MemorySessionStore, ModelAssignments, ModelRouter,
    NarrationRequest, RequestType, RetryConfig, SessionContext, Skald,
};

// ============================================================================
// Mock backends
// ============================================================================

struct Flaky {
    failures: AtomicU32,
}

#[async_trait]
impl InferenceBackend for Flaky {
    fn name(&self) -> &str {
        "flaky"
    }

    async fn generate(&self, _request: &BackendRequest) -> Result<BackendReply, InferenceFailure> {
        if self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(InferenceFailure::ConnectionRefused("refused".into()));
        }
        Ok(BackendReply {
            text: "Torchlight flickers along the wall.".into(),
            done: true,
        })
    }

    async fn list_models(&self) -> Result<Vec<String>, InferenceFailure> {
        Ok(vec![])
    }
}

struct Down;

#[async_trait]
impl InferenceBackend for Down {
    fn name(&self) -> &str {
        "down"
    }

    async fn generate(&self, _request: &BackendRequest) -> Result<BackendReply, InferenceFailure> {
        Err(InferenceFailure::Api {
            status: 500,
            message: "boom".into(),
        })
    }

    async fn list_models(&self) -> Result<Vec<String>, InferenceFailure> {
        Err(InferenceFailure::Http("down".into()))
    }
}

fn fast_retry() -> RetryConfig {
    RetryConfig::new()
        .base_delay(Duration::from_millis(1))
        .connection_refused_delay(Duration::from_millis(1))
        .rate_limited_delay(Duration::from_millis(1))
}

// ============================================================================
// Snapshot type alias for readability
// ============================================================================

type SnapshotVec = Vec<(
    metrics_util::CompositeKey,
    Option<metrics::Unit>,
    Option<metrics::SharedString>,
    DebugValue,
)>;

// ============================================================================
// Helpers
// ============================================================================

/// Sum all counter values matching a given metric name.
fn counter_total(snapshot: &SnapshotVec, name: &str) -> u64 {
    snapshot
        .iter()
        .filter(|(key, _, _, _)| key.kind() == MetricKind::Counter && key.key().name() == name)
        .map(|(_, _, _, value)| match value {
            DebugValue::Counter(v) => *v,
            _ => 0,
        })
        .sum()
}

/// Sum counter values for a metric carrying the given label pair.
fn counter_with_label(snapshot: &SnapshotVec, name: &str, label: (&str, &str)) -> u64 {
    snapshot
        .iter()
        .filter(|(key, _, _, _)| {
            key.kind() == MetricKind::Counter
                && key.key().name() == name
                && key
                    .key()
                    .labels()
                    .any(|l| l.key() == label.0 && l.value() == label.1)
        })
        .map(|(_, _, _, value)| match value {
            DebugValue::Counter(v) => *v,
            _ => 0,
        })
        .sum()
}

/// Check if any histogram entries exist for a given metric name.
fn has_histogram(snapshot: &SnapshotVec, name: &str) -> bool {
    snapshot
        .iter()
        .any(|(key, _, _, _)| key.kind() == MetricKind::Histogram && key.key().name() == name)
}

// ============================================================================
// Tests
// ============================================================================

/// Runs async code within a local recorder scope on the multi-thread runtime.
///
/// `block_in_place` ensures the sync `with_local_recorder` closure stays
/// on the current thread while `block_on` drives the inner async work.
#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn successful_generation_records_inference_metrics() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();

    let result = metrics::with_local_recorder(&recorder, || {
        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async {
                let router = ModelRouter::new(
                    Arc::new(Flaky {
                        failures: AtomicU32::new(0),
                    }),
                    &ModelAssignments::default(),
                );
                router
                    .generate("prompt", RequestType::SceneDescription, None)
                    .await
            })
        })
    });
    assert!(result.is_ok());

    let snapshot = snapshotter.snapshot().into_vec();

    assert_eq!(
        counter_with_label(&snapshot, telemetry::INFERENCE_TOTAL, ("status", "ok")),
        1
    );
    assert_eq!(counter_total(&snapshot, telemetry::RETRIES_TOTAL), 0);
    assert!(
        has_histogram(&snapshot, telemetry::INFERENCE_DURATION_SECONDS),
        "expected a duration histogram entry"
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn retries_are_counted_by_class() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();

    let result = metrics::with_local_recorder(&recorder, || {
        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async {
                let router = ModelRouter::new(
                    Arc::new(Flaky {
                        failures: AtomicU32::new(2),
                    }),
                    &ModelAssignments::default(),
                )
                .with_retry(fast_retry());
                router
                    .generate("prompt", RequestType::CombatNarration, None)
                    .await
            })
        })
    });
    assert_eq!(result.unwrap().metadata.attempts, 3);

    let snapshot = snapshotter.snapshot().into_vec();

    assert_eq!(
        counter_with_label(
            &snapshot,
            telemetry::RETRIES_TOTAL,
            ("class", "connection_refused")
        ),
        2
    );
    // one logical call regardless of attempts
    assert_eq!(counter_total(&snapshot, telemetry::INFERENCE_TOTAL), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn exhausted_retries_record_error_status() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();

    let result = metrics::with_local_recorder(&recorder, || {
        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async {
                let router = ModelRouter::new(Arc::new(Down), &ModelAssignments::default())
                    .with_retry(fast_retry());
                router
                    .generate("prompt", RequestType::NpcDialogue, None)
                    .await
            })
        })
    });
    assert!(result.is_err());

    let snapshot = snapshotter.snapshot().into_vec();

    assert_eq!(
        counter_with_label(&snapshot, telemetry::INFERENCE_TOTAL, ("status", "error")),
        1
    );
    assert_eq!(
        counter_with_label(&snapshot, telemetry::RETRIES_TOTAL, ("class", "other")),
        2
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn engine_records_request_and_cache_counters() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();

    let result = metrics::with_local_recorder(&recorder, || {
        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async {
                let sessions = Arc::new(MemorySessionStore::new());
                sessions
                    .insert_session(SessionContext {
                        session_id: "s1".into(),
                        ..Default::default()
                    })
                    .await;
                let engine = Skald::builder()
                    .backend(Arc::new(Flaky {
                        failures: AtomicU32::new(0),
                    }))
                    .sessions(sessions)
                    .build()?;

                let request = NarrationRequest::new(RequestType::SceneDescription, "s1");
                engine.process(request.clone()).await?;
                engine.process(request).await
            })
        })
    });
    assert!(result.is_ok());

    let snapshot = snapshotter.snapshot().into_vec();

    assert_eq!(
        counter_with_label(
            &snapshot,
            telemetry::REQUESTS_TOTAL,
            ("request_type", "scene_description")
        ),
        2
    );
    assert_eq!(counter_total(&snapshot, telemetry::CACHE_MISSES_TOTAL), 1);
    assert_eq!(counter_total(&snapshot, telemetry::CACHE_HITS_TOTAL), 1);
    assert_eq!(counter_total(&snapshot, telemetry::COALESCED_TOTAL), 0);
}

#[tokio::test]
async fn no_recorder_is_noop() {
    // Without a recorder installed, metric calls must not panic.
    let router = ModelRouter::new(
        Arc::new(Flaky {
            failures: AtomicU32::new(0),
        }),
        &ModelAssignments::default(),
    );
    let result = router
        .generate("prompt", RequestType::WorldBuilding, None)
        .await;
    assert!(result.is_ok());
}
