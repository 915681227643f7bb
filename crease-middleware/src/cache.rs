use std::sync::Arc;

use async_trait::async_trait;
use crease_core::{CacheConfig, CreaseError, Middleware, Snapshot, SourceAdapter, SourceBindings, SourceId};
use moka::future::Cache;

/// Source wrapper serving recent snapshots from a TTL cache.
///
/// Only successful scrapes are cached; failures always reach the inner
/// source so health accounting upstream stays accurate. A zero TTL turns the
/// wrapper into a pass-through.
pub struct CachingSource {
    inner: Arc<dyn SourceAdapter>,
    config: CacheConfig,
    cache: Cache<String, Snapshot>,
}

impl CachingSource {
    /// Wrap `inner` with a snapshot cache.
    #[must_use]
    pub fn new(inner: Arc<dyn SourceAdapter>, config: CacheConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.max_entries)
            .time_to_live(config.ttl.max(std::time::Duration::from_millis(1)))
            .build();
        Self {
            inner,
            config,
            cache,
        }
    }

    /// Access the inner source.
    pub fn inner(&self) -> &Arc<dyn SourceAdapter> {
        &self.inner
    }

    /// Drop every cached snapshot.
    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }
}

#[async_trait]
impl SourceAdapter for CachingSource {
    fn id(&self) -> SourceId {
        self.inner.id()
    }

    fn name(&self) -> String {
        self.inner.name()
    }

    fn reliability(&self) -> f64 {
        self.inner.reliability()
    }

    fn bindings(&self) -> Option<SourceBindings> {
        self.inner.bindings()
    }

    async fn scrape(&self, match_id: &str) -> Result<Snapshot, CreaseError> {
        if self.config.ttl.is_zero() {
            return self.inner.scrape(match_id).await;
        }
        if let Some(hit) = self.cache.get(match_id).await {
            #[cfg(feature = "tracing")]
            tracing::trace!(source = %self.inner.id(), match_id, "snapshot cache hit");
            return Ok(hit);
        }
        let snapshot = self.inner.scrape(match_id).await?;
        self.cache
            .insert(match_id.to_string(), snapshot.clone())
            .await;
        Ok(snapshot)
    }
}

/// Middleware config for constructing a [`CachingSource`].
pub struct CacheMiddleware {
    /// Cache settings applied by the wrapper.
    pub config: CacheConfig,
}

impl CacheMiddleware {
    /// Create the middleware from cache settings.
    #[must_use]
    pub const fn new(config: CacheConfig) -> Self {
        Self { config }
    }
}

impl Middleware for CacheMiddleware {
    fn apply(self: Box<Self>, inner: Arc<dyn SourceAdapter>) -> Arc<dyn SourceAdapter> {
        Arc::new(CachingSource::new(inner, self.config))
    }

    fn name(&self) -> &'static str {
        "CachingSource"
    }

    fn config_json(&self) -> serde_json::Value {
        serde_json::json!({
            "ttl_ms": self.config.ttl.as_millis(),
            "max_entries": self.config.max_entries,
        })
    }
}
