//! crease-middleware
//!
//! Wrappers that compose around any `SourceAdapter`:
//!
//! - [`QuotaAwareSource`]: request budget per fixed window.
//! - [`CachingSource`]: short-lived snapshot cache so bursts of acquisitions
//!   for the same match hit the upstream site once.
//! - [`SourceBuilder`]: composes layers in a predictable order.
#![warn(missing_docs)]

mod builder;
mod cache;
mod quota;

pub use crate::builder::SourceBuilder;
pub use crate::cache::{CacheMiddleware, CachingSource};
pub use crate::quota::{QuotaAwareSource, QuotaMiddleware};
