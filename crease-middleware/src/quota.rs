//! Request budget per source.
//!
//! Upstream sites throttle or ban aggressive clients; the budget keeps one
//! source under a fixed number of scrapes per window and surfaces
//! `QuotaExceeded` instead of hammering the site.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use crease_core::{CreaseError, Middleware, QuotaConfig, Snapshot, SourceAdapter, SourceBindings, SourceId};

/// Wrapper that enforces a request budget.
pub struct QuotaAwareSource {
    inner: Arc<dyn SourceAdapter>,
    config: QuotaConfig,
    runtime: Mutex<QuotaRuntime>,
}

struct QuotaRuntime {
    calls_made_in_window: u64,
    last_reset: Instant,
}

impl QuotaAwareSource {
    /// Create a new quota-aware wrapper around an existing source.
    pub fn new(inner: Arc<dyn SourceAdapter>, config: QuotaConfig) -> Self {
        Self {
            inner,
            config,
            runtime: Mutex::new(QuotaRuntime {
                calls_made_in_window: 0,
                last_reset: Instant::now(),
            }),
        }
    }

    /// Access the inner source.
    pub fn inner(&self) -> &Arc<dyn SourceAdapter> {
        &self.inner
    }

    /// Check whether a scrape fits in the current window and count it if so.
    ///
    /// # Errors
    /// Returns `CreaseError::QuotaExceeded` when the window budget is exhausted.
    ///
    /// # Panics
    /// Panics if the internal mutex is poisoned.
    pub fn should_allow_call(&self) -> Result<(), CreaseError> {
        let mut rt = self.runtime.lock().expect("mutex poisoned");
        let now = Instant::now();
        let window = self.config.window;

        let elapsed = now.duration_since(rt.last_reset);
        if !window.is_zero() && elapsed >= window {
            rt.calls_made_in_window = 0;
            // Keep windows aligned to regular boundaries even with gaps in usage.
            let windows_passed = elapsed.as_nanos() / window.as_nanos();
            let boundary_offset = Duration::from_nanos(
                (windows_passed * window.as_nanos())
                    .try_into()
                    .unwrap_or(u64::MAX),
            );
            rt.last_reset += boundary_offset;
        }

        if rt.calls_made_in_window < self.config.limit {
            rt.calls_made_in_window += 1;
            return Ok(());
        }

        let elapsed = now.duration_since(rt.last_reset);
        let reset_in_ms = window
            .saturating_sub(elapsed)
            .as_millis()
            .try_into()
            .unwrap_or(u64::MAX);
        let err = CreaseError::QuotaExceeded {
            remaining: self.config.limit.saturating_sub(rt.calls_made_in_window),
            reset_in_ms,
        };
        drop(rt);
        #[cfg(feature = "tracing")]
        tracing::warn!(source = %self.inner.id(), "source request budget exhausted");
        Err(err)
    }
}

#[async_trait]
impl SourceAdapter for QuotaAwareSource {
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
        self.should_allow_call()?;
        self.inner.scrape(match_id).await
    }
}

/// Middleware config for constructing a [`QuotaAwareSource`].
pub struct QuotaMiddleware {
    /// Budget applied by the wrapper.
    pub config: QuotaConfig,
}

impl QuotaMiddleware {
    /// Create the middleware from a budget.
    #[must_use]
    pub const fn new(config: QuotaConfig) -> Self {
        Self { config }
    }
}

impl Middleware for QuotaMiddleware {
    fn apply(self: Box<Self>, inner: Arc<dyn SourceAdapter>) -> Arc<dyn SourceAdapter> {
        Arc::new(QuotaAwareSource::new(inner, self.config))
    }

    fn name(&self) -> &'static str {
        "QuotaAwareSource"
    }

    fn config_json(&self) -> serde_json::Value {
        serde_json::json!({
            "limit": self.config.limit,
            "window_ms": self.config.window.as_millis(),
        })
    }
}
