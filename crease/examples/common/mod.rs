use std::sync::Arc;

use crease::{
    Crease, CreaseError, MatchBackend, ProxyPool, RuleStore, SelectorHealthTracker,
};
use crease_sources::{
    CrexSource, CricbuzzSource, EspnCricinfoSource, HttpFetcher, ScrapeContext,
};

/// Engine over the live sites, or over fixture sources when
/// `CREASE_EXAMPLES_USE_MOCK` is set.
pub fn build_engine(backend: Arc<dyn MatchBackend>) -> Result<Crease, CreaseError> {
    if std::env::var("CREASE_EXAMPLES_USE_MOCK").is_ok() {
        println!("--- (Using mock sources for CI) ---");
        return Crease::builder()
            .with_source(Arc::new(crease_mock::MockSource::new("cricbuzz", 0.9)))
            .with_source(Arc::new(crease_mock::MockSource::new("espncricinfo", 0.85)))
            .backend(backend)
            .build();
    }

    let rules = Arc::new(RuleStore::new(crease_sources::default_rules()?));
    let proxies = Arc::new(ProxyPool::new(vec![], crease::ProxyPoolConfig {
        allow_direct: true,
        ..Default::default()
    }));
    let health = Arc::new(SelectorHealthTracker::new(rules.clone(), Default::default()));
    let ctx = ScrapeContext::new(rules, proxies, health, Arc::new(HttpFetcher::new()));

    // the engine adopts the rules, proxies and selector health the sources share

    Crease::builder()
        .with_source(CricbuzzSource::rate_limited(ctx.clone()).build())
        .with_source(EspnCricinfoSource::rate_limited(ctx.clone()).build())
        .with_source(CrexSource::rate_limited(ctx).build())
        .backend(backend)
        .build()
}
