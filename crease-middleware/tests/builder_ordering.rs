use std::sync::Arc;
use std::time::Duration;

use crease_core::{CacheConfig, CreaseError, QuotaConfig, SourceAdapter, SourceId};
use crease_middleware::SourceBuilder;
use crease_mock::{DynamicMockSource, MockBehavior, MockSource, fixtures};

fn quota(limit: u64) -> QuotaConfig {
    QuotaConfig {
        limit,
        window: Duration::from_secs(60),
    }
}

fn names(b: &SourceBuilder) -> Vec<String> {
    b.describe()
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l["name"].as_str().unwrap().to_string())
        .collect()
}

#[test]
fn last_added_layer_is_outermost() {
    let raw: Arc<dyn SourceAdapter> = Arc::new(MockSource::new("mock", 0.8));
    let b = SourceBuilder::new(raw)
        .with_quota(&quota(10))
        .with_cache(&CacheConfig::default());
    assert_eq!(names(&b), ["CachingSource", "QuotaAwareSource", "RawSource"]);
}

#[test]
fn replacing_a_layer_moves_it_outermost_without_duplicates() {
    let raw: Arc<dyn SourceAdapter> = Arc::new(MockSource::new("mock", 0.8));
    let b = SourceBuilder::new(raw)
        .with_quota(&quota(10))
        .with_cache(&CacheConfig::default())
        .with_quota(&quota(5));
    assert_eq!(names(&b), ["QuotaAwareSource", "CachingSource", "RawSource"]);
    assert_eq!(b.describe()[0]["config"]["limit"], 5);

    let b = b.without_quota().without_cache();
    assert_eq!(names(&b), ["RawSource"]);
}

#[test]
fn quota_shortcuts_preserve_the_other_setting() {
    let raw: Arc<dyn SourceAdapter> = Arc::new(MockSource::new("mock", 0.8));
    let b = SourceBuilder::new(raw)
        .quota_window(Duration::from_millis(1500))
        .quota_limit(7);
    let cfg = &b.describe()[0]["config"];
    assert_eq!(cfg["limit"], 7);
    assert_eq!(cfg["window_ms"], 1500);
}

#[tokio::test]
async fn cache_outside_quota_serves_hits_without_spending_budget() {
    let (raw, ctrl) = DynamicMockSource::new_with_controller("dyn", 0.8);
    let snap = fixtures::snapshots::live("IND-AUS", &SourceId::new("dyn"), 0.8);
    ctrl.set_default_behavior(MockBehavior::Return(snap)).await;

    let src = SourceBuilder::new(raw)
        .with_quota(&quota(1))
        .with_cache(&CacheConfig {
            ttl: Duration::from_secs(10),
            max_entries: 8,
        })
        .build();

    for _ in 0..5 {
        src.scrape("IND-AUS").await.unwrap();
    }
    assert_eq!(ctrl.calls("IND-AUS").await, 1);

    // A different match misses the cache and the budget is already spent.
    let err = src.scrape("ENG-NZ").await.unwrap_err();
    assert!(matches!(err, CreaseError::QuotaExceeded { .. }));
}

#[tokio::test]
async fn wrapped_source_keeps_identity() {
    let raw: Arc<dyn SourceAdapter> = Arc::new(MockSource::new("cricbuzz", 0.9));
    let src = SourceBuilder::new(raw)
        .with_quota(&quota(3))
        .with_cache(&CacheConfig::default())
        .build();
    assert_eq!(src.id().as_str(), "cricbuzz");
    assert!((src.reliability() - 0.9).abs() < f64::EPSILON);
}
