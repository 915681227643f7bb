use std::sync::Arc;

use crease::{CreaseError, Field, ProxyPool, ProxyPoolConfig, ProxyRecord, RuleStore};
use crease_core::FailureReport;

use crate::helpers::{CRICBUZZ, ESPN, IND_AUS, builder, engine, fixture_source, id};

fn with_default_rules() -> crease::Crease {
    let rules = Arc::new(RuleStore::new(crease_sources::default_rules().unwrap()));
    let (b, _backend) = builder(vec![fixture_source(CRICBUZZ, 0.9), fixture_source(ESPN, 0.85)]);
    b.rules(rules).build().unwrap()
}

#[test]
fn update_rule_bumps_version_and_is_readable() {
    let crease = with_default_rules();
    let before = crease.rules().version();

    let v = crease
        .update_rule(&id(CRICBUZZ), Field::Team1Name, ".score-hdr .team-a")
        .unwrap();

    assert_eq!(v, before + 1);
    assert_eq!(
        crease.rule(&id(CRICBUZZ), Field::Team1Name).as_deref(),
        Some(".score-hdr .team-a")
    );
}

#[test]
fn malformed_or_unknown_rules_are_rejected() {
    let crease = with_default_rules();

    let err = crease
        .update_rule(&id(CRICBUZZ), Field::Team1Name, "div[class=")
        .unwrap_err();
    assert!(matches!(err, CreaseError::InvalidRule { .. }));

    let err = crease
        .update_rule(&id("nosuchsite"), Field::Team1Name, ".team")
        .unwrap_err();
    assert!(matches!(err, CreaseError::UnknownSource(_)));
}

#[test]
fn persisted_rules_load_back() {
    let crease = with_default_rules();
    crease
        .update_rule(&id(ESPN), Field::Commentary, ".comment-item")
        .unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rules.json");

    crease.persist_rules(Some(&path)).unwrap();

    let loaded = RuleStore::load_file(&path).unwrap();
    assert_eq!(
        loaded.rule(&id(ESPN), Field::Commentary).as_deref(),
        Some(".comment-item")
    );
    // nothing was loaded from disk, so there is no implicit target
    assert!(matches!(
        with_default_rules().persist_rules(None),
        Err(CreaseError::InvalidConfig(_))
    ));
}

#[test]
fn failure_records_are_listed_and_cleared() {
    let crease = with_default_rules();
    let cricbuzz = id(CRICBUZZ);
    let attempted = vec![".cb-team-1".to_string()];
    crease.selector_health().record_failure(
        FailureReport {
            source: &cricbuzz,
            field: Field::Team1Score,
            url: "https://www.cricbuzz.com/live-cricket-scores/1",
            rule: ".cb-team-1",
            attempted: &attempted,
        },
        None,
    );

    let failures = crease.failures(Some(&cricbuzz), None, 10);
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].field, Field::Team1Score);
    assert!(crease.failures(Some(&id(ESPN)), None, 10).is_empty());

    assert_eq!(crease.clear_failures(None), 1);
    assert!(crease.failures(None, None, 10).is_empty());
}

#[tokio::test]
async fn forced_source_rotation_is_audited() {
    let (crease, _backend) = engine(vec![fixture_source(CRICBUZZ, 0.9), fixture_source(ESPN, 0.85)]);
    crease.acquire(IND_AUS).await.unwrap();

    let event = crease.force_source_rotation("operator request").unwrap();

    assert_eq!((event.from, event.to.clone()), (id(CRICBUZZ), id(ESPN)));
    assert_eq!(crease.failover().current_source(), Some(event.to));
    assert_eq!(crease.metrics().failovers, 1);
}

#[test]
fn forced_proxy_rotation_moves_to_the_next_proxy() {
    let proxies = Arc::new(ProxyPool::new(
        vec![
            ProxyRecord::new("10.0.0.1", 8080, "IN", 0.9),
            ProxyRecord::new("10.0.0.2", 8080, "IN", 0.8),
        ],
        ProxyPoolConfig::default(),
    ));
    let (b, _backend) = builder(vec![fixture_source(CRICBUZZ, 0.9)]);
    let crease = b.proxies(proxies.clone()).build().unwrap();

    let first = proxies.next().unwrap();
    crease.force_proxy_rotation();
    let second = proxies.next().unwrap();

    assert_ne!(first.endpoint(), second.endpoint());
}

#[test]
fn enabling_unknown_source_fails() {
    let (crease, _backend) = engine(vec![fixture_source(CRICBUZZ, 0.9)]);
    assert!(matches!(
        crease.enable_source(&id("nosuchsite")),
        Err(CreaseError::UnknownSource(_))
    ));
}

#[tokio::test]
async fn health_report_serializes_every_component() {
    let crease = with_default_rules();
    crease.acquire(IND_AUS).await.unwrap();

    let report = crease.health_report();
    assert_eq!(report.current_source, Some(id(CRICBUZZ)));
    assert_eq!(report.sources.len(), 2);
    assert_eq!(report.selectors.len(), 2);
    assert_eq!(report.metrics.successful, 1);

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["currentSource"], "cricbuzz");
    assert_eq!(json["rulesVersion"], report.rules_version);
    assert!(json["recentFailovers"].as_array().unwrap().is_empty());
}
