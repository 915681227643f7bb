use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crease_core::{
    CreaseError, EngineConfig, FailoverConfig, FailoverController, MatchBackend, ProxyPool,
    ReconcileConfig, ReconciliationEngine, RuleDocument, RuleStore, RuleWatcher,
    SelectorHealthTracker, SourceAdapter, SourceBindings, SourceId,
};

use crate::metrics::MetricsRecorder;

/// Orchestrator that acquires live match snapshots across registered sources.
pub struct Crease {
    pub(crate) sources: Vec<Arc<dyn SourceAdapter>>,
    pub(crate) backend: Arc<dyn MatchBackend>,
    pub(crate) rules: Arc<RuleStore>,
    pub(crate) proxies: Arc<ProxyPool>,
    pub(crate) selector_health: Arc<SelectorHealthTracker>,
    pub(crate) failover: Arc<FailoverController>,
    pub(crate) reconciler: ReconciliationEngine,
    pub(crate) cfg: EngineConfig,
    pub(crate) metrics: MetricsRecorder,
    pub(crate) _rule_watcher: Option<RuleWatcher>,
}

impl Crease {
    /// Start building an orchestrator.
    #[must_use]
    pub fn builder() -> CreaseBuilder {
        CreaseBuilder::new()
    }

    /// Engine configuration in effect.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.cfg
    }

    /// Shared rule store.
    #[must_use]
    pub const fn rules(&self) -> &Arc<RuleStore> {
        &self.rules
    }

    /// Shared proxy pool.
    #[must_use]
    pub const fn proxies(&self) -> &Arc<ProxyPool> {
        &self.proxies
    }

    /// Shared selector health tracker.
    #[must_use]
    pub const fn selector_health(&self) -> &Arc<SelectorHealthTracker> {
        &self.selector_health
    }

    /// Failover controller.
    #[must_use]
    pub const fn failover(&self) -> &Arc<FailoverController> {
        &self.failover
    }

    /// Registered sources, in registration order.
    #[must_use]
    pub fn sources(&self) -> Vec<SourceId> {
        self.sources.iter().map(|s| s.id()).collect()
    }

    pub(crate) fn source(&self, id: &SourceId) -> Option<&Arc<dyn SourceAdapter>> {
        self.sources.iter().find(|s| &s.id() == id)
    }
}

/// Builder for constructing a [`Crease`] orchestrator.
///
/// Sources built with `crease-sources` are bound to a rule store, proxy pool,
/// and selector health tracker. The orchestrator adopts those instances, so
/// admin operations and a `rules_file` act on what the sources read. Passing
/// a different instance explicitly fails the build.
pub struct CreaseBuilder {
    sources: Vec<Arc<dyn SourceAdapter>>,
    backend: Option<Arc<dyn MatchBackend>>,
    rules: Option<Arc<RuleStore>>,
    rules_file: Option<(PathBuf, bool)>,
    proxies: Option<Arc<ProxyPool>>,
    selector_health: Option<Arc<SelectorHealthTracker>>,
    cfg: EngineConfig,
}

impl Default for CreaseBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CreaseBuilder {
    /// Create a builder with default configuration and no sources.
    #[must_use]
    pub fn new() -> Self {
        Self {
            sources: vec![],
            backend: None,
            rules: None,
            rules_file: None,
            proxies: None,
            selector_health: None,
            cfg: EngineConfig::default(),
        }
    }

    /// Register a source.
    ///
    /// Its static reliability seeds the failover controller; registration
    /// order breaks reliability ties.
    #[must_use]
    pub fn with_source(mut self, source: Arc<dyn SourceAdapter>) -> Self {
        self.sources.push(source);
        self
    }

    /// Backend that reports liveness and receives accepted snapshots.
    #[must_use]
    pub fn backend(mut self, backend: Arc<dyn MatchBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Use an existing rule store.
    #[must_use]
    pub fn rules(mut self, rules: Arc<RuleStore>) -> Self {
        self.rules = Some(rules);
        self
    }

    /// Load rules from a JSON file at build time, optionally watching it for
    /// changes. With a store already known (set explicitly or bound to the
    /// sources), the file is loaded into that store and becomes its backing
    /// file; otherwise a new store is created from it.
    #[must_use]
    pub fn rules_file(mut self, path: impl Into<PathBuf>, watch: bool) -> Self {
        self.rules_file = Some((path.into(), watch));
        self
    }

    /// Use an existing proxy pool.
    #[must_use]
    pub fn proxies(mut self, proxies: Arc<ProxyPool>) -> Self {
        self.proxies = Some(proxies);
        self
    }

    /// Use an existing selector health tracker.
    #[must_use]
    pub fn selector_health(mut self, tracker: Arc<SelectorHealthTracker>) -> Self {
        self.selector_health = Some(tracker);
        self
    }

    /// Replace the whole engine configuration.
    #[must_use]
    pub fn config(mut self, cfg: EngineConfig) -> Self {
        self.cfg = cfg;
        self
    }

    /// Timeout applied to every individual scrape.
    #[must_use]
    pub const fn scrape_timeout(mut self, timeout: Duration) -> Self {
        self.cfg.scrape_timeout = timeout;
        self
    }

    /// Toggle the cross-check scrape from a second source.
    #[must_use]
    pub const fn cross_check(mut self, yes: bool) -> Self {
        self.cfg.cross_check = yes;
        self
    }

    /// Upper bound on matches acquired concurrently by `acquire_many`.
    #[must_use]
    pub const fn max_concurrent_matches(mut self, n: usize) -> Self {
        self.cfg.max_concurrent_matches = n;
        self
    }

    /// Tolerances, penalties, and thresholds used by reconciliation.
    #[must_use]
    pub fn reconcile_config(mut self, cfg: ReconcileConfig) -> Self {
        self.cfg.reconcile = cfg;
        self
    }

    /// Health thresholds used by the failover controller.
    #[must_use]
    pub fn failover_config(mut self, cfg: FailoverConfig) -> Self {
        self.cfg.failover = cfg;
        self
    }

    /// Build the orchestrator.
    ///
    /// # Errors
    /// Returns `InvalidConfig` when no source or no backend is registered, two
    /// sources share an id, or sources and builder disagree on shared state.
    /// Returns the rule store error when a rule file cannot be loaded or watched.
    pub fn build(self) -> Result<Crease, CreaseError> {
        if self.sources.is_empty() {
            return Err(CreaseError::InvalidConfig(
                "no sources registered; add at least one via with_source(...)".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for s in &self.sources {
            if !seen.insert(s.id()) {
                return Err(CreaseError::InvalidConfig(format!(
                    "source {} registered twice",
                    s.id()
                )));
            }
        }
        let backend = self.backend.ok_or_else(|| {
            CreaseError::InvalidConfig("no backend; set one via backend(...)".to_string())
        })?;

        let bound = bound_state(&self.sources)?;
        let rules = adopt("rule store", self.rules, bound.as_ref().map(|b| Arc::clone(&b.rules)))?;
        let proxies = adopt("proxy pool", self.proxies, bound.as_ref().map(|b| Arc::clone(&b.proxies)))?;
        let selector_health = adopt(
            "selector health tracker",
            self.selector_health,
            bound.as_ref().map(|b| Arc::clone(&b.selector_health)),
        )?;

        let mut watcher = None;
        let rules = match (rules, self.rules_file) {
            (Some(rules), Some((path, watch))) => {
                rules.attach_file(&path)?;
                if watch {
                    watcher = Some(rules.watch(path)?);
                }
                rules
            }
            (None, Some((path, watch))) => {
                let rules = Arc::new(RuleStore::load_file(&path)?);
                if watch {
                    watcher = Some(rules.watch(path)?);
                }
                rules
            }
            (Some(rules), None) => rules,
            (None, None) => Arc::new(RuleStore::new(RuleDocument::default())),
        };
        let proxies =
            proxies.unwrap_or_else(|| Arc::new(ProxyPool::new(vec![], self.cfg.proxy.clone())));
        let selector_health = selector_health.unwrap_or_else(|| {
            Arc::new(SelectorHealthTracker::new(
                Arc::clone(&rules),
                self.cfg.selector_health.clone(),
            ))
        });

        let failover = Arc::new(FailoverController::new(self.cfg.failover.clone()));
        for s in &self.sources {
            failover.register(s.id(), s.reliability());
        }

        Ok(Crease {
            sources: self.sources,
            backend,
            rules,
            proxies,
            selector_health,
            failover,
            reconciler: ReconciliationEngine::new(self.cfg.reconcile.clone()),
            cfg: self.cfg,
            metrics: MetricsRecorder::default(),
            _rule_watcher: watcher,
        })
    }
}

/// The shared state the bound sources read, if any source is bound. All bound
/// sources must share the same instances.
fn bound_state(sources: &[Arc<dyn SourceAdapter>]) -> Result<Option<SourceBindings>, CreaseError> {
    let mut bound: Option<(SourceId, SourceBindings)> = None;
    for s in sources {
        let Some(b) = s.bindings() else { continue };
        match &bound {
            Some((first, shared)) if !shared.same_as(&b) => {
                return Err(CreaseError::InvalidConfig(format!(
                    "sources {first} and {} are bound to different shared state",
                    s.id()
                )));
            }
            Some(_) => {}
            None => bound = Some((s.id(), b)),
        }
    }
    Ok(bound.map(|(_, b)| b))
}

fn adopt<T>(what: &str, explicit: Option<Arc<T>>, bound: Option<Arc<T>>) -> Result<Option<Arc<T>>, CreaseError> {
    match (explicit, bound) {
        (Some(e), Some(b)) if !Arc::ptr_eq(&e, &b) => Err(CreaseError::InvalidConfig(format!(
            "{what} differs from the one the sources are bound to"
        ))),
        (e, b) => Ok(e.or(b)),
    }
}
