//! Crease-specific data transfer objects and configuration primitives.
#![warn(missing_docs)]

mod config;
mod error;
mod field;
mod health;
mod metrics;
mod proxy;
mod reconcile;
mod rules;
mod snapshot;
mod source;

pub use config::{
    CacheConfig, EngineConfig, FailoverConfig, PenaltyFactors, ProxyPoolConfig, QuotaConfig,
    ReconcileConfig, SelectorHealthConfig,
};
pub use error::CreaseError;
pub use field::{Field, FieldType};
pub use health::{
    FailoverEvent, RepairSuggestion, ScrapeOutcome, SelectorFailureRecord, SelectorHealth,
    SourceHealth,
};
pub use metrics::{AcquisitionMetrics, SourceCounters};
pub use proxy::{ProxyCredentials, ProxyRecord};
pub use reconcile::{CrossCheckEntry, ReconciliationResult};
pub use rules::{AutoDetection, RuleDocument, SourceRules};
pub use snapshot::{MatchFormat, Snapshot, TeamScore, Teams};
pub use source::SourceId;
