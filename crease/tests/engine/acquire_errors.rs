use std::time::Duration;

use crease::CreaseError;
use crease_mock::MockBehavior;

use crate::helpers::{CRICBUZZ, ESPN, IND_AUS, engine, fixture_source, id, live, scripted};

#[tokio::test]
async fn finished_match_is_not_scraped() {
    let (src, ctl) = scripted(CRICBUZZ, 0.9);
    ctl.set_default_behavior(MockBehavior::Return(live(CRICBUZZ, 0.9)))
        .await;
    let (crease, backend) = engine(vec![src]);
    backend.set_live(IND_AUS, false);

    let err = crease.acquire(IND_AUS).await.unwrap_err();

    assert!(matches!(err, CreaseError::MatchNotLive { ref match_id } if match_id == IND_AUS));
    assert_eq!(ctl.total_calls().await, 0);
    assert_eq!(crease.metrics().total_attempts, 0);
}

#[tokio::test(start_paused = true)]
async fn every_source_timing_out_collapses_to_timeout() {
    let (a, a_ctl) = scripted(CRICBUZZ, 0.9);
    let (b, b_ctl) = scripted(ESPN, 0.85);
    a_ctl.set_default_behavior(MockBehavior::Hang).await;
    b_ctl.set_default_behavior(MockBehavior::Hang).await;
    let (builder, backend) = crate::helpers::builder(vec![a, b]);
    let crease = builder.scrape_timeout(Duration::from_millis(50)).build().unwrap();

    let err = crease.acquire(IND_AUS).await.unwrap_err();

    assert!(matches!(err, CreaseError::AllSourcesTimedOut { .. }));
    assert!(backend.applied().is_empty());
    let m = crease.metrics();
    assert_eq!(m.failed, 1);
    assert_eq!(m.per_source[&id(CRICBUZZ)].failures, 1);
    assert_eq!(m.per_source[&id(ESPN)].failures, 1);
    let health = crease.failover().source_health(&id(CRICBUZZ)).unwrap();
    assert_eq!(health.consecutive_error_count, 1);
}

#[tokio::test]
async fn total_failure_lists_every_attempted_source() {
    let (crease, backend) = engine(vec![
        fixture_source(CRICBUZZ, 0.9),
        fixture_source(ESPN, 0.85),
    ]);

    let err = crease.acquire("FAIL").await.unwrap_err();

    match err {
        CreaseError::AllSourcesFailed(errors) => {
            let sources: Vec<_> = errors.iter().filter_map(CreaseError::source_id).cloned().collect();
            assert_eq!(sources, vec![id(CRICBUZZ), id(ESPN)]);
            assert!(errors.iter().all(CreaseError::is_network));
        }
        other => panic!("unexpected: {other:?}"),
    }
    assert!(backend.applied().is_empty());
    assert!(crease.failover().history(10).is_empty());
}

#[tokio::test]
async fn no_active_source_is_reported() {
    let (crease, _backend) = engine(vec![fixture_source(CRICBUZZ, 0.9)]);
    crease.disable_source(&id(CRICBUZZ)).unwrap();

    let err = crease.acquire(IND_AUS).await.unwrap_err();

    assert_eq!(err, CreaseError::NoActiveSources);
}

#[tokio::test]
async fn backend_rejection_surfaces_and_counts_as_failure() {
    let (crease, backend) = engine(vec![fixture_source(CRICBUZZ, 0.9)]);
    backend.fail_applies(Some(CreaseError::Backend("db down".into())));

    let err = crease.acquire(IND_AUS).await.unwrap_err();

    assert_eq!(err, CreaseError::Backend("db down".into()));
    assert_eq!(crease.metrics().failed, 1);
}

#[tokio::test]
async fn backend_liveness_error_is_propagated() {
    struct Broken;

    #[async_trait::async_trait]
    impl crease::MatchBackend for Broken {
        async fn is_live(&self, _match_id: &str) -> Result<bool, CreaseError> {
            Err(CreaseError::Backend("unreachable".into()))
        }

        async fn apply_update(&self, _snapshot: &crease::Snapshot) -> Result<(), CreaseError> {
            Ok(())
        }
    }

    let crease = crease::Crease::builder()
        .with_source(fixture_source(CRICBUZZ, 0.9))
        .backend(std::sync::Arc::new(Broken))
        .build()
        .unwrap();

    let err = crease.acquire(IND_AUS).await.unwrap_err();
    assert_eq!(err.reason(), "backend");
}
