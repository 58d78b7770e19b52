use std::time::Duration;

use skald::{FailureClass, InferenceFailure, RequestType, SkaldError};

#[test]
fn error_display() {
    let err = SkaldError::TemplateNotFound {
        request_type: RequestType::QuestGeneration,
        language: "fr".into(),
    };
    assert_eq!(err.to_string(), "no template for quest_generation (fr)");

    let err = SkaldError::Context("unknown session 's9'".into());
    assert_eq!(err.to_string(), "context unavailable: unknown session 's9'");

    let err = SkaldError::Inference {
        model: "llama3.1".into(),
        attempts: 3,
        failure: InferenceFailure::Api {
            status: 503,
            message: "overloaded".into(),
        },
    };
    assert_eq!(
        err.to_string(),
        "inference failed on model 'llama3.1' after 3 attempt(s): API error (503): overloaded"
    );
}

#[test]
fn failures_map_to_backoff_classes() {
    assert_eq!(
        InferenceFailure::RateLimited { retry_after: None }.class(),
        FailureClass::RateLimited
    );
    assert_eq!(
        InferenceFailure::ConnectionRefused("refused".into()).class(),
        FailureClass::ConnectionRefused
    );
    for failure in [
        InferenceFailure::Timeout(Duration::from_secs(60)),
        InferenceFailure::Http("reset".into()),
        InferenceFailure::Decode("eof".into()),
        InferenceFailure::EmptyResponse,
    ] {
        assert_eq!(failure.class(), FailureClass::Other, "{failure}");
    }
}

#[test]
fn only_rate_limits_carry_a_retry_hint() {
    let hinted = InferenceFailure::RateLimited {
        retry_after: Some(Duration::from_secs(9)),
    };
    assert_eq!(hinted.retry_after(), Some(Duration::from_secs(9)));
    assert_eq!(
        InferenceFailure::Timeout(Duration::from_secs(9)).retry_after(),
        None
    );
}

#[test]
fn inference_failure_accessor() {
    let err = SkaldError::Inference {
        model: "m".into(),
        attempts: 1,
        failure: InferenceFailure::EmptyResponse,
    };
    assert_eq!(err.inference_failure(), Some(&InferenceFailure::EmptyResponse));
    assert_eq!(SkaldError::Task("cancelled".into()).inference_failure(), None);
}

#[test]
fn json_errors_convert() {
    let parse = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
    let err: SkaldError = parse.into();
    assert!(matches!(err, SkaldError::Json(_)));
}

#[test]
fn errors_are_cloneable_for_shared_outcomes() {
    let err = SkaldError::Inference {
        model: "m".into(),
        attempts: 2,
        failure: InferenceFailure::ConnectionRefused("refused".into()),
    };
    let copy = err.clone();
    assert_eq!(copy.to_string(), err.to_string());
}
