use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use crease::{CreaseError, MatchFormat, Snapshot, SourceAdapter, SourceId};
use crease_mock::fixtures::snapshots;

use crate::helpers::{CRICBUZZ, ESPN, builder, fixture_source};

#[tokio::test]
async fn results_come_back_in_input_order() {
    let (b, backend) = builder(vec![fixture_source(CRICBUZZ, 0.9), fixture_source(ESPN, 0.85)]);
    let crease = b.max_concurrent_matches(2).build().unwrap();
    backend.set_format("ENG-NZ", MatchFormat::Odi);
    backend.set_format("SA-PAK", MatchFormat::T10);

    let ids: Vec<String> = ["ENG-NZ", "FAIL", "IND-AUS", "SA-PAK"]
        .into_iter()
        .map(String::from)
        .collect();
    let results = crease.acquire_many(&ids).await;

    let order: Vec<&str> = results.iter().map(|(id, _)| id.as_str()).collect();
    assert_eq!(order, ["ENG-NZ", "FAIL", "IND-AUS", "SA-PAK"]);
    assert!(matches!(results[1].1, Err(CreaseError::AllSourcesFailed(_))));
    for i in [0, 2, 3] {
        let snap = results[i].1.as_ref().unwrap();
        assert_eq!(snap.match_id, ids[i]);
    }
    assert_eq!(backend.applied().len(), 3);
    assert_eq!(crease.metrics().total_attempts, 4);
}

/// Source that records how many scrapes run at once.
struct Gauge {
    current: AtomicUsize,
    peak: AtomicUsize,
}

#[async_trait]
impl SourceAdapter for Gauge {
    fn id(&self) -> SourceId {
        SourceId::new(CRICBUZZ)
    }

    fn reliability(&self) -> f64 {
        0.9
    }

    async fn scrape(&self, match_id: &str) -> Result<Snapshot, CreaseError> {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(10)).await;
        self.current.fetch_sub(1, Ordering::SeqCst);
        Ok(snapshots::live(match_id, &self.id(), 0.9))
    }
}

#[tokio::test(start_paused = true)]
async fn concurrency_is_bounded() {
    let gauge = Arc::new(Gauge {
        current: AtomicUsize::new(0),
        peak: AtomicUsize::new(0),
    });
    let source: Arc<dyn SourceAdapter> = gauge.clone();
    let (b, _backend) = builder(vec![source]);
    let crease = b.max_concurrent_matches(3).build().unwrap();

    let ids: Vec<String> = (0..10).map(|i| format!("M{i}")).collect();
    let results = crease.acquire_many(&ids).await;

    assert!(results.iter().all(|(_, r)| r.is_ok()));
    assert_eq!(gauge.peak.load(Ordering::SeqCst), 3);
}
