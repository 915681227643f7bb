use crease::CreaseError;
use crease_mock::MockBehavior;

use crate::helpers::{CRICBUZZ, ESPN, IND_AUS, engine, fixture_source, id, live, scripted};

#[tokio::test]
async fn primary_network_error_fails_over_to_secondary_once() {
    let (primary, p_ctl) = scripted(CRICBUZZ, 0.9);
    let (secondary, s_ctl) = scripted(ESPN, 0.85);
    p_ctl
        .set_default_behavior(MockBehavior::Fail(CreaseError::network(CRICBUZZ, "connection reset")))
        .await;
    s_ctl
        .set_default_behavior(MockBehavior::Return(live(ESPN, 0.85)))
        .await;
    let (crease, backend) = engine(vec![primary, secondary]);

    let snap = crease.acquire(IND_AUS).await.unwrap();

    assert_eq!(snap.source, id(ESPN));
    let history = crease.failover().history(10);
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].from, id(CRICBUZZ));
    assert_eq!(history[0].to, id(ESPN));
    assert_eq!(history[0].reason, "cricbuzz: network");
    assert_eq!(crease.failover().current_source(), Some(id(ESPN)));
    assert_eq!(backend.applied().len(), 1);

    let m = crease.metrics();
    assert_eq!((m.total_attempts, m.successful, m.failed, m.failovers), (1, 1, 0, 1));
    assert_eq!(m.per_source[&id(CRICBUZZ)].failures, 1);
    assert_eq!(m.per_source[&id(ESPN)].successes, 1);
}

#[tokio::test]
async fn next_acquisition_starts_at_the_promoted_source() {
    let (primary, p_ctl) = scripted(CRICBUZZ, 0.9);
    let (secondary, s_ctl) = scripted(ESPN, 0.85);
    p_ctl
        .set_default_behavior(MockBehavior::Fail(CreaseError::network(CRICBUZZ, "reset")))
        .await;
    s_ctl
        .set_default_behavior(MockBehavior::Return(live(ESPN, 0.85)))
        .await;
    let (crease, _backend) = engine(vec![primary, secondary]);

    crease.acquire(IND_AUS).await.unwrap();
    crease.acquire(IND_AUS).await.unwrap();

    // second round: espn first, then cricbuzz only as the cross-check
    assert_eq!(s_ctl.calls(IND_AUS).await, 2);
    assert_eq!(p_ctl.calls(IND_AUS).await, 2);
    assert_eq!(crease.failover().history(10).len(), 1);
}

#[tokio::test]
async fn healthy_primary_is_cross_checked_and_kept() {
    let (crease, backend) = engine(vec![
        fixture_source(CRICBUZZ, 0.9),
        fixture_source(ESPN, 0.85),
    ]);

    let snap = crease.acquire(IND_AUS).await.unwrap();

    assert_eq!(snap.source, id(CRICBUZZ));
    assert!(crease.failover().history(10).is_empty());
    let m = crease.metrics();
    assert_eq!(m.per_source[&id(CRICBUZZ)].attempts, 1);
    assert_eq!(m.per_source[&id(ESPN)].attempts, 1);
    assert_eq!(backend.applied()[0].source, id(CRICBUZZ));
}

#[tokio::test]
async fn cross_check_can_be_disabled() {
    let (primary, p_ctl) = scripted(CRICBUZZ, 0.9);
    let (secondary, s_ctl) = scripted(ESPN, 0.85);
    p_ctl
        .set_default_behavior(MockBehavior::Return(live(CRICBUZZ, 0.9)))
        .await;
    s_ctl
        .set_default_behavior(MockBehavior::Return(live(ESPN, 0.85)))
        .await;
    let (b, _backend) = crate::helpers::builder(vec![primary, secondary]);
    let crease = b.cross_check(false).build().unwrap();

    crease.acquire(IND_AUS).await.unwrap();

    assert_eq!(p_ctl.calls(IND_AUS).await, 1);
    assert_eq!(s_ctl.calls(IND_AUS).await, 0);
}

#[tokio::test]
async fn failing_cross_check_is_not_fatal() {
    let (primary, p_ctl) = scripted(CRICBUZZ, 0.9);
    let (secondary, s_ctl) = scripted(ESPN, 0.85);
    p_ctl
        .set_default_behavior(MockBehavior::Return(live(CRICBUZZ, 0.9)))
        .await;
    s_ctl
        .set_default_behavior(MockBehavior::Fail(CreaseError::network(ESPN, "503")))
        .await;
    let (crease, backend) = engine(vec![primary, secondary]);

    let snap = crease.acquire(IND_AUS).await.unwrap();

    assert_eq!(snap.source, id(CRICBUZZ));
    assert_eq!(backend.applied().len(), 1);
    let espn = crease.failover().source_health(&id(ESPN)).unwrap();
    assert_eq!(espn.consecutive_error_count, 1);
}

#[tokio::test]
async fn disabled_source_is_skipped() {
    let (primary, p_ctl) = scripted(CRICBUZZ, 0.9);
    let (secondary, s_ctl) = scripted(ESPN, 0.85);
    p_ctl
        .set_default_behavior(MockBehavior::Return(live(CRICBUZZ, 0.9)))
        .await;
    s_ctl
        .set_default_behavior(MockBehavior::Return(live(ESPN, 0.85)))
        .await;
    let (crease, _backend) = engine(vec![primary, secondary]);

    crease.disable_source(&id(CRICBUZZ)).unwrap();
    let snap = crease.acquire(IND_AUS).await.unwrap();

    assert_eq!(snap.source, id(ESPN));
    assert_eq!(p_ctl.calls(IND_AUS).await, 0);
}
