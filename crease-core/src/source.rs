use std::sync::Arc;

use async_trait::async_trait;

use crate::{CreaseError, ProxyPool, RuleStore, SelectorHealthTracker, Snapshot, SourceId};

/// Shared components a source reads and writes while scraping.
///
/// An engine built over bound sources administers these same instances, so
/// rule updates, proxy rotation and failure queries reach the scrapers.
#[derive(Clone)]
pub struct SourceBindings {
    /// Extraction rules.
    pub rules: Arc<RuleStore>,
    /// Egress proxies.
    pub proxies: Arc<ProxyPool>,
    /// Failure log and auto-repair.
    pub selector_health: Arc<SelectorHealthTracker>,
}

impl SourceBindings {
    /// Whether both bindings point at the same three instances.
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.rules, &other.rules)
            && Arc::ptr_eq(&self.proxies, &other.proxies)
            && Arc::ptr_eq(&self.selector_health, &other.selector_health)
    }
}

/// One external website that can produce match snapshots.
///
/// Implementations own their site-specific behavior (URL layout, user-agent
/// pool, rate limit, text cleanup) and are composed with the shared
/// `ProxyPool`, `RuleStore`, and `SelectorHealthTracker` rather than
/// inheriting from a common base.
///
/// Contract for `scrape`:
/// - Field-level extraction failures are absorbed: the field degrades to an
///   empty string or zero and the failure is reported for auto-repair.
/// - Structurally impossible data is rejected with `CreaseError::InvalidData`.
/// - Transport failures surface as `CreaseError::Network` and are attributed to
///   the proxy that carried the request.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Stable identifier of the source.
    fn id(&self) -> SourceId;

    /// Human-friendly name; defaults to the identifier.
    fn name(&self) -> String {
        self.id().to_string()
    }

    /// Static reliability prior in `[0, 1]`.
    fn reliability(&self) -> f64;

    /// Shared components this source is bound to, if any.
    ///
    /// Sources that carry no rules or proxies of their own return `None`.
    fn bindings(&self) -> Option<SourceBindings> {
        None
    }

    /// Produce a candidate snapshot for `match_id`.
    ///
    /// Implementations that talk to the network call
    /// [`mark_network_issued`](crate::mark_network_issued) right before
    /// sending the request.
    async fn scrape(&self, match_id: &str) -> Result<Snapshot, CreaseError>;
}
