use std::sync::Arc;
use std::time::Duration;

use crease::CreaseError;
use crease_mock::MockBehavior;

use crate::helpers::{CRICBUZZ, IND_AUS, builder, engine, fixture_source, id, scripted};

#[tokio::test(start_paused = true)]
async fn poller_delivers_until_the_match_finishes() {
    let (crease, backend) = engine(vec![fixture_source(CRICBUZZ, 0.9)]);
    let crease = Arc::new(crease);

    let (handle, mut rx) = crease.poll_match(IND_AUS, Duration::from_secs(15));

    let first = rx.recv().await.unwrap().unwrap();
    assert_eq!(first.source, id(CRICBUZZ));
    let second = rx.recv().await.unwrap();
    assert!(second.is_ok());

    backend.set_live(IND_AUS, false);
    let mut last = rx.recv().await.unwrap();
    // an acquisition may already have been in flight when the match ended
    if last.is_ok() {
        last = rx.recv().await.unwrap();
    }
    assert!(matches!(last, Err(CreaseError::MatchNotLive { .. })));
    assert!(rx.recv().await.is_none());

    handle.stop().await;
    assert!(backend.applied().len() >= 2);
}

#[tokio::test(start_paused = true)]
async fn waits_about_one_interval_between_acquisitions() {
    let (crease, _backend) = engine(vec![fixture_source(CRICBUZZ, 0.9)]);
    let crease = Arc::new(crease);
    let (handle, mut rx) = crease.poll_match(IND_AUS, Duration::from_secs(10));

    rx.recv().await.unwrap().unwrap();
    let started = tokio::time::Instant::now();
    rx.recv().await.unwrap().unwrap();
    let gap = started.elapsed();

    assert!(gap >= Duration::from_secs(10), "gap {gap:?}");
    assert!(gap < Duration::from_secs(12), "gap {gap:?}");
    handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn stopping_mid_scrape_records_a_cancelled_attempt() {
    let (src, ctl) = scripted(CRICBUZZ, 0.9);
    ctl.set_default_behavior(MockBehavior::Hang).await;
    let (b, _backend) = builder(vec![src]);
    let crease = Arc::new(b.scrape_timeout(Duration::from_secs(60)).build().unwrap());

    let (handle, _rx) = crease.poll_match(IND_AUS, Duration::from_secs(15));
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(ctl.calls(IND_AUS).await, 1);

    handle.stop().await;

    let health = crease.failover().source_health(&id(CRICBUZZ)).unwrap();
    assert_eq!(health.consecutive_error_count, 1);
    let counters = crease.metrics().per_source[&id(CRICBUZZ)];
    assert_eq!((counters.attempts, counters.failures), (1, 1));
}

#[tokio::test(start_paused = true)]
async fn dropping_the_receiver_ends_the_poller() {
    let (crease, _backend) = engine(vec![fixture_source(CRICBUZZ, 0.9)]);
    let crease = Arc::new(crease);
    let (handle, rx) = crease.poll_match(IND_AUS, Duration::from_secs(1));
    drop(rx);

    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(handle.is_finished());
    assert_eq!(crease.metrics().total_attempts, 1);
}

#[tokio::test(start_paused = true)]
async fn stop_returns_while_the_channel_is_full() {
    let (crease, _backend) = engine(vec![fixture_source(CRICBUZZ, 0.9)]);
    let crease = Arc::new(crease);
    // kept alive but never read
    let (handle, _rx) = crease.poll_match(IND_AUS, Duration::from_millis(1));

    tokio::time::sleep(Duration::from_millis(500)).await;
    let stopped = tokio::time::timeout(Duration::from_secs(3), handle.stop()).await;

    assert!(stopped.is_ok());
    assert!(crease.metrics().total_attempts > 16);
}
