//! Crease acquires live cricket scores from several scraped sources.
//!
//! Overview
//! - Scrapes the current source first and fails over to the remaining active
//!   sources by rolling reliability, with a per-scrape timeout.
//! - Cross-checks the result against a second source and reconciles the two
//!   before anything reaches the backend.
//! - Shares one `RuleStore`, `ProxyPool`, and `SelectorHealthTracker` with the
//!   source adapters so rule repairs, proxy rotation, and admin operations act
//!   on what the adapters actually use.
//!
//! Key behaviors and trade-offs
//! - Failover is pull based: the current source is re-evaluated on every
//!   acquisition rather than by a background task.
//! - Cross-checking doubles the scrape load per acquisition in exchange for
//!   catching a source that serves stale or corrupted scores. Disable it with
//!   `CreaseBuilder::cross_check(false)` when a single source is trusted.
//! - A snapshot that fails reconciliation is never applied, even when it was
//!   the only one available.
//!
//! Examples
//! Building an orchestrator over the real sources:
//! ```rust,ignore
//! use std::sync::Arc;
//! use crease::{Crease, ProxyPool, RuleStore, SelectorHealthTracker};
//! use crease_sources::{CricbuzzSource, EspnCricinfoSource, HttpFetcher, ScrapeContext};
//!
//! let rules = Arc::new(RuleStore::new(crease_sources::default_rules()?));
//! let proxies = Arc::new(ProxyPool::new(vec![], Default::default()));
//! let health = Arc::new(SelectorHealthTracker::new(rules.clone(), Default::default()));
//! let ctx = ScrapeContext::new(rules, proxies, health, Arc::new(HttpFetcher::new()));
//!
//! // rules, proxies and selector health are adopted from the sources
//! let crease = Crease::builder()
//!     .with_source(CricbuzzSource::rate_limited(ctx.clone()).build())
//!     .with_source(EspnCricinfoSource::rate_limited(ctx).build())
//!     .rules_file("rules.json", true)
//!     .backend(Arc::new(MyBackend::default()))
//!     .build()?;
//! ```
//!
//! Acquiring once and polling:
//! ```rust,ignore
//! let snapshot = crease.acquire("IND-AUS").await?;
//! let crease = Arc::new(crease);
//! let (handle, mut rx) = crease.poll_match("IND-AUS", std::time::Duration::from_secs(15));
//! while let Some(update) = rx.recv().await {
//!     // ... push to clients ...
//! }
//! handle.stop().await;
//! ```
//!
//! See `crease/examples/` for runnable end-to-end demonstrations.
#![warn(missing_docs)]

pub(crate) mod core;
mod metrics;
mod router;

pub use core::{Crease, CreaseBuilder};
pub use router::admin::HealthReport;
pub use router::poll::PollHandle;
pub use router::util::collapse_errors;

pub use crease_middleware::{CacheMiddleware, CachingSource, QuotaAwareSource, QuotaMiddleware, SourceBuilder};

// Re-export core types for convenience
pub use crease_core::{
    AcquisitionMetrics,
    CacheConfig,
    CreaseError,
    EngineConfig,
    FailoverConfig,
    FailoverController,
    FailoverEvent,
    Field,
    MatchBackend,
    MatchFormat,
    ProxyPool,
    ProxyPoolConfig,
    ProxyRecord,
    ProxyStat,
    QuotaConfig,
    ReconcileConfig,
    ReconciliationEngine,
    ReconciliationResult,
    RuleDocument,
    RuleStore,
    SelectorFailureRecord,
    SelectorHealth,
    SelectorHealthConfig,
    SelectorHealthTracker,
    Snapshot,
    SourceAdapter,
    SourceCounters,
    SourceHealth,
    SourceId,
    TeamScore,
    Teams,
};
