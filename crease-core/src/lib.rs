//! crease-core
//!
//! Core traits and shared engine components of the crease acquisition engine.
//!
//! - `source`: the `SourceAdapter` trait implemented once per external site.
//! - `attempt`: marks whether a scrape reached the network, for cancellation bookkeeping.
//! - `page`: `PageExtractor`/`PageFetcher` capabilities that hide HTML mechanics.
//! - `backend`: the `MatchBackend` collaborator that receives accepted snapshots.
//! - `rules`: versioned, atomically swapped extraction rules with hot reload.
//! - `proxy`: ranked egress proxy pool with rotation.
//! - `selector_health`: per-field failure tracking and auto-repair.
//! - `failover`: per-source health and the pull-based "current source" decision.
//! - `reconcile`: structural validation and cross-source agreement scoring.
//! - `parse`: lenient numeric, overs, score, and team-name parsing.
//!
//! Shared components are internally synchronized and meant to be held in an
//! `Arc` and used from many concurrent acquisitions. Nothing here blocks on I/O
//! except `RuleStore` file loading.
#![warn(missing_docs)]

/// Scrape attempt tracking.
pub mod attempt;
/// External backend collaborator.
pub mod backend;
/// Failover controller and source health.
pub mod failover;
/// Middleware trait implemented by source wrappers.
pub mod middleware;
/// Page fetch and extraction capabilities.
pub mod page;
/// Lenient parsing helpers for scraped text.
pub mod parse;
/// Proxy pool.
pub mod proxy;
/// Reconciliation engine.
pub mod reconcile;
/// Rule store.
pub mod rules;
/// Selector health tracking and auto-repair.
pub mod selector_health;
/// The `SourceAdapter` trait.
pub mod source;

mod repair;

pub use attempt::{AttemptTracker, mark_network_issued};
pub use backend::MatchBackend;
pub use failover::FailoverController;
pub use middleware::Middleware;
pub use page::{FetchRequest, PageExtractor, PageFetcher};
pub use proxy::{ProxyPool, ProxyStat};
pub use reconcile::{ReconciliationEngine, Violation, check_structure};
pub use rules::{RuleSnapshot, RuleStore, RuleWatcher};
pub use selector_health::{FailureReport, RepairOutcome, SelectorHealthTracker};
pub use source::{SourceAdapter, SourceBindings};

pub use crease_types::*;
