use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use skald::{Config, MemorySessionStore, SkaldError};

fn write_config(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn load_reads_explicit_file() {
    let file = write_config(
        r#"
[backend]
base_url = "http://gpu-box:11434"
timeout_secs = 30

[models]
default_model = "mistral"
dialogue = "llama3.1"

[retry]
max_attempts = 5
base_delay_ms = 250

[cache]
ttl_secs = 120
max_entries = 64

[context]
history_window = 2
"#,
    );

    let config = Config::load(Some(file.path())).unwrap();

    assert_eq!(config.backend.base_url, "http://gpu-box:11434");
    assert_eq!(config.backend.timeout(), Duration::from_secs(30));
    assert_eq!(config.models.default_model, "mistral");
    assert_eq!(config.models.dialogue.as_deref(), Some("llama3.1"));
    assert_eq!(config.retry.max_attempts, 5);
    assert_eq!(config.retry.base_delay, Duration::from_millis(250));
    assert_eq!(config.cache.ttl, Duration::from_secs(120));
    assert_eq!(config.cache.max_entries, 64);
    assert_eq!(config.context.history_window, 2);
    assert_eq!(config.context.default_language, "en");
}

#[test]
fn missing_explicit_path_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.toml");

    let err = Config::load(Some(&path)).unwrap_err();
    assert!(matches!(err, SkaldError::Configuration(ref m) if m.contains("not found")));

    // an explicit path is never silently replaced by defaults
    assert!(Config::load_or_default(Some(&path)).is_err());
}

#[test]
fn malformed_file_is_a_configuration_error() {
    let file = write_config("[cache]\nttl_secs = \"ten\"\n");

    let err = Config::load(Some(file.path())).unwrap_err();
    assert!(matches!(err, SkaldError::Configuration(ref m) if m.contains("parse")));
}

#[test]
fn saved_config_loads_back() {
    let mut config = Config::default();
    config.backend.base_url = "http://127.0.0.1:9999".into();
    config.cache.ttl = Duration::from_secs(30);
    config.models.combat = Some("phi3".into());

    let file = write_config(&config.to_toml_string().unwrap());
    assert_eq!(Config::load_or_default(Some(file.path())).unwrap(), config);
}

#[tokio::test]
async fn builder_applies_loaded_config() {
    let file = write_config(
        r#"
[cache]
ttl_secs = 42

[context]
history_window = 9
default_language = "de"
"#,
    );
    let config = Config::load(Some(file.path())).unwrap();

    let engine = skald::Skald::builder()
        .config(config)
        .sessions(Arc::new(MemorySessionStore::new()))
        .build()
        .unwrap();

    assert_eq!(engine.config().cache.ttl, Duration::from_secs(42));
    assert_eq!(engine.config().context.history_window, 9);
    assert_eq!(engine.config().context.default_language, "de");
    assert_eq!(engine.cache_info().ttl_secs, 42);
}

#[tokio::test]
async fn zero_timeout_is_rejected_at_build() {
    let file = write_config("[backend]\ntimeout_secs = 0\n");
    let config = Config::load(Some(file.path())).unwrap();

    let err = skald::Skald::builder()
        .config(config)
        .sessions(Arc::new(MemorySessionStore::new()))
        .build()
        .unwrap_err();

    assert!(matches!(err, SkaldError::Configuration(_)));
}

#[tokio::test]
async fn oversized_cache_ttl_is_rejected_at_build() {
    // far beyond what the cache can hold; must be an error, not a panic
    let file = write_config("[cache]\nttl_secs = 40000000000\n");
    let config = Config::load(Some(file.path())).unwrap();

    let err = skald::Skald::builder()
        .config(config)
        .sessions(Arc::new(MemorySessionStore::new()))
        .build()
        .unwrap_err();

    assert!(matches!(err, SkaldError::Configuration(ref m) if m.contains("ttl")));
}

#[tokio::test]
async fn oversized_sweep_interval_is_rejected_at_build() {
    let file = write_config(&format!("[cache]\nsweep_interval_secs = {}\n", i64::MAX));
    let config = Config::load(Some(file.path())).unwrap();

    let err = skald::Skald::builder()
        .config(config)
        .sessions(Arc::new(MemorySessionStore::new()))
        .build()
        .unwrap_err();

    assert!(matches!(err, SkaldError::Configuration(ref m) if m.contains("sweep interval")));
}

#[tokio::test]
async fn longest_accepted_durations_build_and_start_maintenance() {
    let config = Config {
        cache: skald::CacheConfig::new()
            .ttl(skald::cache::MAX_CACHE_DURATION)
            .sweep_interval(skald::cache::MAX_CACHE_DURATION),
        ..Config::default()
    };

    let engine = skald::Skald::builder()
        .config(config)
        .sessions(Arc::new(MemorySessionStore::new()))
        .build()
        .unwrap();

    let handle = engine.start_maintenance();
    tokio::task::yield_now().await;
    assert!(!handle.is_finished());
}
