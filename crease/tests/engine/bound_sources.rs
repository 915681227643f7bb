use std::sync::Arc;
use std::time::Duration;

use crease::{CreaseError, Field, ProxyPool, ProxyPoolConfig, RuleStore, SourceAdapter};
use crease_core::{SelectorHealthConfig, SelectorHealthTracker};
use crease_mock::{FakeFetcher, FakePage, MockBehavior};
use crease_sources::{CricbuzzSource, ScrapeContext, SiteProfile, default_rules};

use crate::helpers::{CRICBUZZ, IND_AUS, builder, id};

const URL: &str = "https://www.cricbuzz.com/live-cricket-scores/IND-AUS";

struct Rig {
    source: Arc<dyn SourceAdapter>,
    ctx: ScrapeContext,
    fetcher: Arc<FakeFetcher>,
}

fn cricbuzz(rate_limit: Duration) -> Rig {
    let rules = Arc::new(RuleStore::new(default_rules().unwrap()));
    let proxies = Arc::new(ProxyPool::new(
        vec![],
        ProxyPoolConfig {
            allow_direct: true,
            ..ProxyPoolConfig::default()
        },
    ));
    let health = Arc::new(SelectorHealthTracker::new(
        Arc::clone(&rules),
        SelectorHealthConfig::default(),
    ));
    let fetcher = Arc::new(FakeFetcher::new());
    let ctx = ScrapeContext::new(rules, proxies, health, fetcher.clone());
    let profile = SiteProfile {
        rate_limit,
        ..CricbuzzSource::profile()
    };
    Rig {
        source: Arc::new(CricbuzzSource::with_profile(profile, ctx.clone())),
        ctx,
        fetcher,
    }
}

fn page() -> FakePage {
    FakePage::new(URL)
        .with_text(".cb-min-bat-rw .cb-team-1 .cb-team-name", "India (IND)")
        .with_text("#renamed-team-1", "New Zealand (NZ)")
        .with_text(".cb-min-bat-rw .cb-team-1 .cb-score", "168/4")
        .with_text(".cb-min-bat-rw .cb-team-1 .cb-wkts", "4")
        .with_text(".cb-min-bat-rw .cb-team-1 .cb-overs", "17.5")
        .with_text(".cb-min-bat-rw .cb-team-2 .cb-team-name", "Australia")
        .with_text(".cb-min-bat-rw .cb-team-2 .cb-score", "0")
        .with_text(".cb-min-bat-rw .cb-team-2 .cb-wkts", "0")
        .with_text(".cb-min-bat-rw .cb-team-2 .cb-overs", "0")
        .with_all(".cb-col-com .cb-com-ln", ["17.5 Starc to Kohli, FOUR"])
}

#[test]
fn engine_adopts_the_state_sources_are_bound_to() {
    let rig = cricbuzz(Duration::ZERO);
    let (b, _backend) = builder(vec![rig.source.clone()]);
    let crease = b.build().unwrap();

    assert!(Arc::ptr_eq(crease.rules(), &rig.ctx.rules));
    assert!(Arc::ptr_eq(crease.proxies(), &rig.ctx.proxies));
    assert!(Arc::ptr_eq(crease.selector_health(), &rig.ctx.selector_health));
}

#[test]
fn conflicting_shared_state_fails_the_build() {
    let rig = cricbuzz(Duration::ZERO);
    let (b, _backend) = builder(vec![rig.source.clone()]);
    let err = b
        .rules(Arc::new(RuleStore::new(default_rules().unwrap())))
        .build()
        .err()
        .unwrap();
    assert!(matches!(err, CreaseError::InvalidConfig(ref m) if m.contains("rule store")));

    let other = cricbuzz(Duration::ZERO);
    let espn: Arc<dyn SourceAdapter> = Arc::new(crease_sources::EspnCricinfoSource::new(other.ctx));
    let (b, _backend) = builder(vec![rig.source, espn]);
    let err = b.build().err().unwrap();
    assert!(matches!(err, CreaseError::InvalidConfig(ref m) if m.contains("different shared state")));
}

#[tokio::test]
async fn rule_updates_reach_the_scraper() {
    let rig = cricbuzz(Duration::ZERO);
    rig.fetcher.set_page(page());
    let (b, _backend) = builder(vec![rig.source.clone()]);
    let crease = b.build().unwrap();

    let before = crease.acquire(IND_AUS).await.unwrap();
    assert_eq!(before.teams.team1.short_name, "IND");

    crease
        .update_rule(&id(CRICBUZZ), Field::Team1Name, "#renamed-team-1")
        .unwrap();
    let after = crease.acquire(IND_AUS).await.unwrap();
    assert_eq!(after.teams.team1.short_name, "NZ");
}

#[tokio::test]
async fn watched_rules_file_changes_extraction() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rules.json");
    let doc = default_rules().unwrap();
    std::fs::write(&path, doc.to_json().unwrap()).unwrap();

    let rig = cricbuzz(Duration::ZERO);
    rig.fetcher.set_page(page());
    let (b, _backend) = builder(vec![rig.source.clone()]);
    let crease = b.rules_file(&path, true).build().unwrap();
    assert_eq!(crease.acquire(IND_AUS).await.unwrap().teams.team1.name, "India");

    let v0 = rig.ctx.rules.version();
    let mut doc = doc;
    doc.sources
        .get_mut(&id(CRICBUZZ))
        .unwrap()
        .selectors
        .insert(Field::Team1Name, "#renamed-team-1".to_string());
    doc.version = v0 + 5;
    std::fs::write(&path, doc.to_json().unwrap()).unwrap();

    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    while rig.ctx.rules.version() == v0 && std::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    let snap = crease.acquire(IND_AUS).await.unwrap();
    assert_eq!(snap.teams.team1.name, "New Zealand");
}

#[tokio::test(start_paused = true)]
async fn cancelling_before_the_request_leaves_health_untouched() {
    let rig = cricbuzz(Duration::from_secs(5));
    rig.fetcher.set_page(page());
    let (b, _backend) = builder(vec![rig.source.clone()]);
    let crease = Arc::new(b.scrape_timeout(Duration::from_secs(60)).build().unwrap());

    let (handle, _rx) = crease.poll_match(IND_AUS, Duration::from_secs(15));
    // still inside the jittered rate-limit delay
    tokio::time::sleep(Duration::from_millis(100)).await;
    handle.stop().await;

    assert!(rig.fetcher.requests().is_empty());
    let health = crease.failover().source_health(&id(CRICBUZZ)).unwrap();
    assert_eq!(health.consecutive_error_count, 0);
    assert_eq!(crease.metrics().per_source[&id(CRICBUZZ)].failures, 0);
}

#[tokio::test(start_paused = true)]
async fn cancelling_an_issued_request_counts_as_a_failure() {
    let rig = cricbuzz(Duration::ZERO);
    rig.fetcher.set_behavior(URL, MockBehavior::Hang);
    let (b, _backend) = builder(vec![rig.source.clone()]);
    let crease = Arc::new(b.scrape_timeout(Duration::from_secs(60)).build().unwrap());

    let (handle, _rx) = crease.poll_match(IND_AUS, Duration::from_secs(15));
    tokio::time::sleep(Duration::from_millis(100)).await;
    handle.stop().await;

    assert_eq!(rig.fetcher.requests().len(), 1);
    let health = crease.failover().source_health(&id(CRICBUZZ)).unwrap();
    assert_eq!(health.consecutive_error_count, 1);
}
