//! Middleware trait for wrapping `SourceAdapter` implementations.

use std::sync::Arc;

use crate::source::SourceAdapter;

/// Trait implemented by source middleware layers.
///
/// A middleware consumes an inner `SourceAdapter` and returns a wrapped adapter
/// that augments or restricts behavior (e.g., request budgets, caching).
pub trait Middleware: Send + Sync {
    /// Apply this middleware to wrap an inner adapter and return the wrapped adapter.
    fn apply(self: Box<Self>, inner: Arc<dyn SourceAdapter>) -> Arc<dyn SourceAdapter>;

    /// Human-readable middleware name for introspection/logging.
    fn name(&self) -> &'static str;

    /// Opaque configuration snapshot for serialization/inspection.
    fn config_json(&self) -> serde_json::Value;
}
