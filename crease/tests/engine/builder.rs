use std::sync::Arc;
use std::time::Duration;

use crease::{Crease, CreaseError, Field};
use crease_mock::RecordingBackend;

use crate::helpers::{CRICBUZZ, ESPN, builder, fixture_source, id};

#[test]
fn build_requires_sources_and_backend() {
    let err = Crease::builder()
        .backend(Arc::new(RecordingBackend::new()))
        .build()
        .err()
        .unwrap();
    assert!(matches!(err, CreaseError::InvalidConfig(ref m) if m.contains("no sources")));

    let err = Crease::builder()
        .with_source(fixture_source(CRICBUZZ, 0.9))
        .build()
        .err()
        .unwrap();
    assert!(matches!(err, CreaseError::InvalidConfig(ref m) if m.contains("backend")));
}

#[test]
fn duplicate_source_ids_are_rejected() {
    let (b, _backend) = builder(vec![fixture_source(CRICBUZZ, 0.9), fixture_source(CRICBUZZ, 0.5)]);
    let err = b.build().err().unwrap();
    assert!(matches!(err, CreaseError::InvalidConfig(ref m) if m.contains("registered twice")));
}

#[test]
fn sources_are_registered_with_their_priors() {
    let (b, _backend) = builder(vec![fixture_source(ESPN, 0.85), fixture_source(CRICBUZZ, 0.9)]);
    let crease = b
        .scrape_timeout(Duration::from_secs(3))
        .max_concurrent_matches(4)
        .build()
        .unwrap();

    assert_eq!(crease.sources(), vec![id(ESPN), id(CRICBUZZ)]);
    let health = crease.failover().health();
    assert_eq!(health.len(), 2);
    assert!((health[1].reliability - 0.9).abs() < f64::EPSILON);
    assert_eq!(crease.config().scrape_timeout, Duration::from_secs(3));
    assert_eq!(crease.config().max_concurrent_matches, 4);
    // highest prior starts as current
    assert_eq!(crease.failover().current_source(), Some(id(CRICBUZZ)));
}

#[test]
fn rules_file_is_loaded_at_build_time() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rules.json");
    let doc = crease_sources::default_rules().unwrap();
    std::fs::write(&path, doc.to_json().unwrap()).unwrap();

    let (b, _backend) = builder(vec![fixture_source(CRICBUZZ, 0.9)]);
    let crease = b.rules_file(&path, false).build().unwrap();

    assert!(crease.rule(&id(CRICBUZZ), Field::Team1Name).is_some());
    crease
        .update_rule(&id(CRICBUZZ), Field::Team1Name, "#t1")
        .unwrap();
    // the loaded file is the implicit target
    crease.persist_rules(None).unwrap();
    let reloaded = crease.reload_rules().unwrap();
    assert!(reloaded > 0);
    assert_eq!(crease.rule(&id(CRICBUZZ), Field::Team1Name).as_deref(), Some("#t1"));
}

#[test]
fn missing_rules_file_fails_the_build() {
    let (b, _backend) = builder(vec![fixture_source(CRICBUZZ, 0.9)]);
    let err = b.rules_file("/nonexistent/rules.json", false).build().err().unwrap();
    assert_eq!(err.reason(), "io");
}

#[tokio::test]
async fn watched_rules_file_keeps_the_watch_alive() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rules.json");
    let doc = crease_sources::default_rules().unwrap();
    std::fs::write(&path, doc.to_json().unwrap()).unwrap();

    let (b, _backend) = builder(vec![fixture_source(CRICBUZZ, 0.9)]);
    let crease = b.rules_file(&path, true).build().unwrap();

    let v0 = crease.rules().version();
    let mut doc = crease.rules().snapshot().document().clone();
    doc.sources
        .get_mut(&id(CRICBUZZ))
        .unwrap()
        .selectors
        .insert(Field::Team2Name, "#t2".to_string());
    doc.version = v0 + 5;
    std::fs::write(&path, doc.to_json().unwrap()).unwrap();

    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    while crease.rules().version() == v0 && std::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(crease.rule(&id(CRICBUZZ), Field::Team2Name).as_deref(), Some("#t2"));
}
