use crease::{CreaseError, MatchFormat};
use crease_mock::MockBehavior;
use crease_mock::fixtures::snapshots;

use crate::helpers::{CRICBUZZ, ESPN, IND_AUS, engine, fixture_source, id, live, live_at, scripted};

#[tokio::test]
async fn impossible_snapshot_counts_as_a_failed_scrape() {
    let (primary, p_ctl) = scripted(CRICBUZZ, 0.9);
    let (secondary, s_ctl) = scripted(ESPN, 0.85);
    // 25 overs cannot happen in a T20 innings
    let mut broken = live_at(CRICBUZZ, 0.9, 2);
    broken.teams.team1.overs = 25.0;
    p_ctl.set_default_behavior(MockBehavior::Return(broken)).await;
    s_ctl
        .set_default_behavior(MockBehavior::Return(live(ESPN, 0.85)))
        .await;
    let (crease, backend) = engine(vec![primary, secondary]);
    backend.set_format(IND_AUS, MatchFormat::T20);

    let snap = crease.acquire(IND_AUS).await.unwrap();

    assert_eq!(snap.source, id(ESPN));
    assert_eq!(backend.applied()[0].source, id(ESPN));
    let history = crease.failover().history(10);
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].reason, "cricbuzz: invalid_data");
    let health = crease.failover().source_health(&id(CRICBUZZ)).unwrap();
    assert_eq!(health.consecutive_error_count, 1);
}

#[tokio::test]
async fn fast_start_is_accepted_when_sources_agree() {
    let (primary, p_ctl) = scripted(CRICBUZZ, 0.9);
    let (secondary, s_ctl) = scripted(ESPN, 0.85);
    // 10 off the first two balls: run rate 30
    let opening = |source: &str, reliability: f64| {
        snapshots::scored(IND_AUS, &id(source), reliability, 10, 0, 2.0 / 6.0)
    };
    p_ctl
        .set_default_behavior(MockBehavior::Return(opening(CRICBUZZ, 0.9)))
        .await;
    s_ctl
        .set_default_behavior(MockBehavior::Return(opening(ESPN, 0.85)))
        .await;
    let (crease, backend) = engine(vec![primary, secondary]);

    let snap = crease.acquire(IND_AUS).await.unwrap();

    assert_eq!(snap.source, id(CRICBUZZ));
    assert_eq!(backend.applied().len(), 1);
}

#[tokio::test]
async fn disagreeing_sources_apply_nothing() {
    let (primary, p_ctl) = scripted(CRICBUZZ, 0.9);
    let (secondary, s_ctl) = scripted(ESPN, 0.85);
    p_ctl
        .set_default_behavior(MockBehavior::Return(live(CRICBUZZ, 0.9)))
        .await;
    let other = snapshots::scored(IND_AUS, &id(ESPN), 0.85, 201, 8, 19.2);
    s_ctl.set_default_behavior(MockBehavior::Return(other)).await;
    let (crease, backend) = engine(vec![primary, secondary]);

    let err = crease.acquire(IND_AUS).await.unwrap_err();

    match err {
        CreaseError::ReconciliationFailed {
            confidence,
            discrepancies,
        } => {
            assert!(confidence < 0.8);
            assert!(discrepancies.iter().any(|d| d.contains("team1 runs")));
            assert!(discrepancies.iter().any(|d| d.contains("team1 wickets")));
        }
        other => panic!("unexpected: {other:?}"),
    }
    assert!(backend.applied().is_empty());
    assert_eq!(crease.metrics().failed, 1);
}

#[tokio::test]
async fn lone_low_reliability_source_is_not_trusted() {
    let (crease, backend) = engine(vec![fixture_source("crex", 0.75)]);

    let err = crease.acquire(IND_AUS).await.unwrap_err();

    assert_eq!(err.reason(), "reconciliation");
    assert!(backend.applied().is_empty());
}

#[tokio::test]
async fn backend_format_bounds_overs() {
    // a T10 match cannot be in its 17th over
    let (crease, backend) = engine(vec![fixture_source(CRICBUZZ, 0.9)]);
    backend.set_format(IND_AUS, MatchFormat::T10);

    let err = crease.acquire(IND_AUS).await.unwrap_err();
    let reasons: Vec<&str> = err.flatten().iter().map(CreaseError::reason).collect();
    assert_eq!(reasons, ["invalid_data"]);

    backend.set_format(IND_AUS, MatchFormat::T20);
    let snap = crease.acquire(IND_AUS).await.unwrap();
    assert_eq!(snap.format, MatchFormat::T20);
}
