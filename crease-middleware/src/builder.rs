//! Builder for composing sources with middleware layers.
//!
//! # Middleware Ordering Convention
//!
//! Middleware layers form an "onion" around the raw source:
//!
//! ```text
//! Acquisition
//!     ↓
//! Outermost Middleware (e.g., Cache - answers repeated requests first)
//!     ↓
//! Inner Middleware (e.g., Quota - only real scrapes spend budget)
//!     ↓
//! Raw Source (e.g., Cricbuzz - fetches and extracts the page)
//! ```
//!
//! The `layers` vector stores middleware in **outermost-first** order (last
//! added = outermost) and `build()` applies them in reverse to construct the
//! nesting. `with_quota(..).with_cache(..)` therefore yields
//! `Cache(Quota(Raw))`.

use std::sync::Arc;
use std::time::Duration;

use crease_core::{CacheConfig, Middleware, QuotaConfig, SourceAdapter};
use serde_json::json;

const QUOTA: &str = "QuotaAwareSource";
const CACHE: &str = "CachingSource";

/// Generic middleware builder for composing a source with layered wrappers.
///
/// See [module-level documentation](self) for details on middleware ordering.
pub struct SourceBuilder {
    raw: Arc<dyn SourceAdapter>,
    /// Middleware layers in outermost-first order.
    layers: Vec<Box<dyn Middleware>>,
}

impl SourceBuilder {
    /// Create a new builder from a raw, unwrapped source.
    #[must_use]
    pub fn new(raw: Arc<dyn SourceAdapter>) -> Self {
        Self {
            raw,
            layers: Vec::new(),
        }
    }

    fn existing_quota_config(&self) -> Option<QuotaConfig> {
        let layer = self.layers.iter().find(|l| l.name() == QUOTA)?;
        let cfg = layer.config_json();
        let defaults = QuotaConfig::default();
        let limit = cfg
            .get("limit")
            .and_then(serde_json::Value::as_u64)
            .unwrap_or(defaults.limit);
        let window = cfg
            .get("window_ms")
            .and_then(serde_json::Value::as_u64)
            .map_or(defaults.window, Duration::from_millis);
        Some(QuotaConfig { limit, window })
    }

    /// Add or replace the request budget at the outermost position.
    #[must_use]
    pub fn with_quota(mut self, cfg: &QuotaConfig) -> Self {
        self.layers.retain(|m| m.name() != QUOTA);
        self.layers
            .insert(0, Box::new(crate::quota::QuotaMiddleware::new(cfg.clone())));
        self
    }

    /// Remove the request budget if present.
    #[must_use]
    pub fn without_quota(mut self) -> Self {
        self.layers.retain(|m| m.name() != QUOTA);
        self
    }

    /// Shortcut: set the budget limit only (preserves an existing window).
    #[must_use]
    pub fn quota_limit(self, limit: u64) -> Self {
        let mut cfg = self.existing_quota_config().unwrap_or_default();
        cfg.limit = limit;
        self.with_quota(&cfg)
    }

    /// Shortcut: set the budget window only (preserves an existing limit).
    #[must_use]
    pub fn quota_window(self, window: Duration) -> Self {
        let mut cfg = self.existing_quota_config().unwrap_or_default();
        cfg.window = window;
        self.with_quota(&cfg)
    }

    /// Add or replace the snapshot cache at the outermost position.
    #[must_use]
    pub fn with_cache(mut self, cfg: &CacheConfig) -> Self {
        self.layers.retain(|m| m.name() != CACHE);
        self.layers
            .insert(0, Box::new(crate::cache::CacheMiddleware::new(cfg.clone())));
        self
    }

    /// Remove the snapshot cache if present.
    #[must_use]
    pub fn without_cache(mut self) -> Self {
        self.layers.retain(|m| m.name() != CACHE);
        self
    }

    /// Add an arbitrary middleware layer at the outermost position.
    #[must_use]
    pub fn layer(mut self, layer: Box<dyn Middleware>) -> Self {
        self.layers.insert(0, layer);
        self
    }

    /// Describe the stack, outermost first, with the raw source last.
    #[must_use]
    pub fn describe(&self) -> serde_json::Value {
        let mut out: Vec<serde_json::Value> = self
            .layers
            .iter()
            .map(|l| json!({ "name": l.name(), "config": l.config_json() }))
            .collect();
        out.push(json!({ "name": "RawSource", "config": { "id": self.raw.id().as_str() } }));
        serde_json::Value::Array(out)
    }

    /// Build the wrapped source, applying layers innermost first.
    #[must_use]
    pub fn build(self) -> Arc<dyn SourceAdapter> {
        let mut acc: Arc<dyn SourceAdapter> = Arc::clone(&self.raw);
        for m in self.layers.into_iter().rev() {
            acc = m.apply(acc);
        }
        acc
    }
}
