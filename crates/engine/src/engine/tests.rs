use std::sync::{Arc, RwLock};
use std::time::Duration;

use index::{BackendConfig, InMemoryBackend};

use super::*;
use crate::metrics::set_engine_metrics;
use crate::EngineMetrics;

fn argv(line: &str) -> Vec<String> {
    line.split_whitespace().map(String::from).collect()
}

fn engine() -> Engine {
    Engine::new(BackendConfig::in_memory()).expect("engine init")
}

fn classify_hits(response: Response) -> Vec<ClassifyHit> {
    match response {
        Response::Classify(hits) => hits,
        other => panic!("expected classify response, got {other:?}"),
    }
}

#[test]
fn record_acknowledges_request_count() {
    let engine = engine();
    let response = engine
        .execute(&argv("s 2 60 1 120 RECORD a m 1 10 1 1 20 1 b m 1 10 1 0"))
        .expect("record");
    assert_eq!(response, Response::Record { requests: 2 });
}

#[test]
fn record_then_classify_recalls_item() {
    let engine = engine();
    engine
        .execute(&argv("s 2 60 1 120 RECORD a m 1 10 1 1 20 1"))
        .expect("record");

    let hits = classify_hits(
        engine
            .execute(&argv("s 2 60 1 120 CLASSIFY m 1 1 10 1 1 20 1"))
            .expect("classify"),
    );
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].item, "a");
    assert_eq!(hits[0].scores.len(), 1);
    assert!((hits[0].scores[0].unwrap() - 1.0).abs() < 1e-12);
}

#[test]
fn classify_threshold_filters_single_band_collisions() {
    let engine = engine();
    engine
        .execute(&argv("s 2 60 1 120 RECORD a m 1 10 1 1 20 1"))
        .expect("record");

    // The query only touches band 1, so no candidate can reach two
    // colliding bands.
    let hits = classify_hits(
        engine
            .execute(&argv("s 2 60 1 120 CLASSIFY m 2 1 10 1 0"))
            .expect("classify"),
    );
    assert!(hits.is_empty());
}

#[test]
fn lenient_classify_keeps_candidates_matched_by_any_query() {
    let engine = engine();
    engine
        .execute(&argv("s 1 60 1 120 RECORD c m 1 10 1 c n 1 30 1"))
        .expect("record");

    // Query m matches, query n is disjoint; lenient keeps the item and
    // scores both queries.
    let hits = classify_hits(
        engine
            .execute(&argv("s 1 60 1 120 CLASSIFY m 1 1 10 1 n 1 1 99 1"))
            .expect("classify"),
    );
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].item, "c");
    assert!((hits[0].scores[0].unwrap() - 1.0).abs() < 1e-12);
    assert_eq!(hits[0].scores[1], Some(0.0));
}

#[test]
fn strict_classify_requires_every_threshold() {
    let engine = engine();
    engine
        .execute(&argv("s 1 60 1 120 RECORD c m 1 10 1 c n 1 30 1"))
        .expect("record");

    let hits = classify_hits(
        engine
            .execute(&argv("s 1 60 1 120 CLASSIFY STRICT m 1 1 10 1 n 1 1 99 1"))
            .expect("classify"),
    );
    assert!(hits.is_empty());
}

#[test]
fn strict_emptiness_mismatch_rejects_candidate() {
    let engine = engine();
    // "a" is recorded under m only.
    engine
        .execute(&argv("s 1 60 1 120 RECORD a m 1 10 1"))
        .expect("record");

    // Query n is non-empty while "a" has nothing stored under n; the
    // zero threshold lets "a" through the filter, so the rejection must
    // come from the emptiness check.
    let hits = classify_hits(
        engine
            .execute(&argv("s 1 60 1 120 CLASSIFY STRICT m 1 1 10 1 n 0 1 99 1"))
            .expect("classify"),
    );
    assert!(hits.is_empty());
}

#[test]
fn strict_both_empty_emits_sentinel_score() {
    let engine = engine();
    // "x" is recorded under n only; nothing stored under m.
    engine
        .execute(&argv("s 1 60 1 120 RECORD x n 1 30 1"))
        .expect("record");

    let hits = classify_hits(
        engine
            .execute(&argv("s 1 60 1 120 CLASSIFY STRICT n 1 1 30 1 m 0 0"))
            .expect("classify"),
    );
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].item, "x");
    assert!((hits[0].scores[0].unwrap() - 1.0).abs() < 1e-12);
    assert_eq!(hits[0].scores[1], None);
    assert_eq!(hits[0].wire_scores()[1], -1.0);
}

#[test]
fn reserved_commands_are_not_implemented() {
    let engine = engine();
    for command in ["MERGE", "DELETE", "COMPARE"] {
        let err = engine
            .execute(&argv(&format!("s 2 60 1 120 {command}")))
            .unwrap_err();
        assert!(matches!(err, EngineError::NotImplemented(name) if name == command));
    }
}

#[test]
fn unknown_command_is_an_argument_error() {
    let engine = engine();
    let err = engine.execute(&argv("s 2 60 1 120 EXPORT")).unwrap_err();
    assert!(matches!(
        err,
        EngineError::Argument(ArgumentError::UnknownCommand { position: 5, ref command })
            if command == "EXPORT"
    ));
}

#[test]
fn invalid_configuration_is_rejected() {
    let engine = engine();
    for (line, message) in [
        ("s 0 60 1 120 RECORD", "bands must be at least 1"),
        ("s 2 0 1 120 RECORD", "window must be positive"),
        ("s 2 60 -1 120 RECORD", "retention must be non-negative"),
    ] {
        let err = engine.execute(&argv(line)).unwrap_err();
        assert!(
            matches!(err, EngineError::Argument(ArgumentError::Constraint { message: m, .. }) if m == message),
            "unexpected error for {line:?}"
        );
    }
}

#[test]
fn truncated_record_mutates_nothing() {
    let backend = Arc::new(InMemoryBackend::new());
    let engine = Engine::with_backend(Box::new(Arc::clone(&backend)));

    // The second request is cut off mid-signature.
    let err = engine
        .execute(&argv("s 2 60 1 120 RECORD a m 1 10 1 1 20 1 b m 1 10"))
        .unwrap_err();
    assert!(matches!(err, EngineError::Argument(_)));

    // Nothing was written, including the complete first request.
    let hits = classify_hits(
        engine
            .execute(&argv("s 2 60 1 120 CLASSIFY m 1 1 10 1 0"))
            .expect("classify"),
    );
    assert!(hits.is_empty());
}

#[test]
fn metrics_recorder_observes_commands() {
    #[derive(Default)]
    struct Recording {
        commands: RwLock<Vec<(CommandKind, usize)>>,
    }

    impl EngineMetrics for Recording {
        fn record_command(&self, command: CommandKind, _latency: Duration, items: usize) {
            self.commands.write().unwrap().push((command, items));
        }
    }

    let recorder = Arc::new(Recording::default());
    set_engine_metrics(Some(recorder.clone()));

    let engine = engine();
    engine
        .execute(&argv("s 2 60 1 120 RECORD a m 1 10 1 1 20 1"))
        .expect("record");
    engine
        .execute(&argv("s 2 60 1 120 CLASSIFY m 1 1 10 1 0"))
        .expect("classify");

    set_engine_metrics(None);

    let commands = recorder.commands.read().unwrap();
    assert!(commands.contains(&(CommandKind::Record, 1)));
    assert!(commands.contains(&(CommandKind::Classify, 1)));
}
