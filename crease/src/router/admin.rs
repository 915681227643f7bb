use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crease_core::{
    AcquisitionMetrics, CreaseError, FailoverEvent, Field, ProxyStat, RepairSuggestion,
    SelectorFailureRecord, SelectorHealth, SourceHealth, SourceId,
};

use crate::Crease;

/// Failover events included in a [`HealthReport`].
const REPORT_FAILOVERS: usize = 10;

/// Point-in-time view of every shared component, for dashboards and probes.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    /// When the report was built.
    pub generated_at: DateTime<Utc>,
    /// Source acquisitions start with.
    pub current_source: Option<SourceId>,
    /// Runtime health per source, in registration order.
    pub sources: Vec<SourceHealth>,
    /// Proxy ranking.
    pub proxies: Vec<ProxyStat>,
    /// Selector health per source.
    pub selectors: BTreeMap<SourceId, SelectorHealth>,
    /// Version of the rule document in use.
    pub rules_version: u64,
    /// Most recent failovers, oldest first.
    pub recent_failovers: Vec<FailoverEvent>,
    /// Staged repair suggestions.
    pub suggestions: Vec<RepairSuggestion>,
    /// Acquisition counters.
    pub metrics: AcquisitionMetrics,
}

impl Crease {
    /// Primary rule currently configured for a field.
    #[must_use]
    pub fn rule(&self, source: &SourceId, field: Field) -> Option<String> {
        self.rules.rule(source, field)
    }

    /// Replace the primary rule of a field and re-arm its auto-repair.
    ///
    /// # Errors
    /// `UnknownSource` or `InvalidRule` from the rule store.
    pub fn update_rule(&self, source: &SourceId, field: Field, rule: &str) -> Result<u64, CreaseError> {
        let version = self.rules.update_rule(source, field, rule, None)?;
        self.selector_health.reset_pair(source, field);
        Ok(version)
    }

    /// Write the current rule document to `path`, or to the file it was loaded from.
    ///
    /// # Errors
    /// `InvalidConfig` when there is no target path and `Io` when writing fails.
    pub fn persist_rules(&self, path: Option<&Path>) -> Result<(), CreaseError> {
        self.rules.save_file(path)
    }

    /// Re-read the rule file the store was loaded from.
    ///
    /// # Errors
    /// Propagates load and validation errors; the previous rules stay in use.
    pub fn reload_rules(&self) -> Result<u64, CreaseError> {
        self.rules.reload()
    }

    /// Newest selector failures, optionally filtered.
    #[must_use]
    pub fn failures(
        &self,
        source: Option<&SourceId>,
        field: Option<Field>,
        limit: usize,
    ) -> Vec<SelectorFailureRecord> {
        self.selector_health.get_failures(source, field, limit)
    }

    /// Drop selector failure records; returns how many were removed.
    pub fn clear_failures(&self, source: Option<&SourceId>) -> usize {
        self.selector_health.clear_failures(source)
    }

    /// Re-arm auto-repair for a pair parked for manual intervention.
    pub fn reset_selector(&self, source: &SourceId, field: Field) {
        self.selector_health.reset_pair(source, field);
    }

    /// Take a source out of rotation.
    ///
    /// # Errors
    /// `UnknownSource` when the source is not registered.
    pub fn disable_source(&self, source: &SourceId) -> Result<(), CreaseError> {
        self.failover.disable(source)
    }

    /// Put a source back into rotation with a clean error count.
    ///
    /// # Errors
    /// `UnknownSource` when the source is not registered.
    pub fn enable_source(&self, source: &SourceId) -> Result<(), CreaseError> {
        self.failover.enable(source)
    }

    /// Advance the proxy rotation by one.
    pub fn force_proxy_rotation(&self) {
        self.proxies.rotate();
    }

    /// Move off the current source regardless of its health.
    ///
    /// Returns `None` when no other source is active.
    pub fn force_source_rotation(&self, reason: &str) -> Option<FailoverEvent> {
        self.failover.force_failover(reason)
    }

    /// Acquisition counters.
    #[must_use]
    pub fn metrics(&self) -> AcquisitionMetrics {
        self.metrics.snapshot(self.failover.failover_count())
    }

    /// Aggregate health of sources, proxies, selectors, and rules.
    ///
    /// Resolving the current source may itself fail over an unhealthy one.
    #[must_use]
    pub fn health_report(&self) -> HealthReport {
        let selectors = self
            .sources
            .iter()
            .map(|s| {
                let id = s.id();
                let health = self.selector_health.get_health(&id);
                (id, health)
            })
            .collect();
        HealthReport {
            generated_at: Utc::now(),
            current_source: self.failover.current_source(),
            sources: self.failover.health(),
            proxies: self.proxies.stats(),
            selectors,
            rules_version: self.rules.version(),
            recent_failovers: self.failover.history(REPORT_FAILOVERS),
            suggestions: self.selector_health.suggestions(),
            metrics: self.metrics(),
        }
    }
}
