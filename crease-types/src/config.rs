//! Configuration types shared across the orchestrator and its collaborators.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::MatchFormat;

/// Proxy selection and rotation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyPoolConfig {
    /// Failures since reset at which a proxy is excluded from selection.
    pub max_failures: u32,
    /// Consecutive failures on one proxy that force an immediate rotation.
    pub rotate_after_consecutive_failures: u32,
    /// Interval of the implicit time-based rotation.
    pub rotation_interval: Duration,
    /// Weight of the runtime success rate in the ranking score.
    pub success_weight: f64,
    /// Weight of the static reliability prior in the ranking score.
    pub reliability_weight: f64,
    /// Allow scraping without a proxy when the pool is empty.
    pub allow_direct: bool,
}

impl Default for ProxyPoolConfig {
    fn default() -> Self {
        Self {
            max_failures: 5,
            rotate_after_consecutive_failures: 3,
            rotation_interval: Duration::from_secs(5 * 60),
            success_weight: 0.7,
            reliability_weight: 0.3,
            allow_direct: false,
        }
    }
}

/// Source health and failover settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailoverConfig {
    /// A source is unhealthy once its consecutive errors exceed this count.
    pub max_consecutive_errors: u32,
    /// A source is unhealthy once its last success is older than this.
    pub failover_timeout: Duration,
    /// Maximum failover events retained in the audit log.
    pub history_limit: usize,
    /// Smoothing factor of the rolling reliability average.
    pub reliability_smoothing: f64,
}

impl Default for FailoverConfig {
    fn default() -> Self {
        Self {
            max_consecutive_errors: 5,
            failover_timeout: Duration::from_secs(10),
            history_limit: 100,
            reliability_smoothing: 0.1,
        }
    }
}

/// Confidence multipliers applied per structural violation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PenaltyFactors {
    /// Missing team name.
    pub missing_names: f64,
    /// Negative runs.
    pub negative_runs: f64,
    /// Wickets outside `0..=10`.
    pub invalid_wickets: f64,
    /// Negative overs or overs above the format cap.
    pub invalid_overs: f64,
    /// Run rate above the realistic maximum.
    pub unrealistic_run_rate: f64,
    /// Snapshot older than the maximum age.
    pub stale_data: f64,
}

impl Default for PenaltyFactors {
    fn default() -> Self {
        Self {
            missing_names: 0.5,
            negative_runs: 0.3,
            invalid_wickets: 0.2,
            invalid_overs: 0.2,
            unrealistic_run_rate: 0.7,
            stale_data: 0.8,
        }
    }
}

/// Reconciliation tolerances and thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileConfig {
    /// Allowed runs difference between two sources.
    pub runs_tolerance: i64,
    /// Allowed wickets difference between two sources.
    pub wickets_tolerance: i64,
    /// Allowed overs difference between two sources.
    pub overs_tolerance: f64,
    /// Highest plausible run rate.
    pub max_run_rate: f64,
    /// Oldest acceptable snapshot.
    pub max_age: Duration,
    /// Minimum confidence for a result to be valid.
    pub validation_threshold: f64,
    /// Penalty multipliers.
    pub penalties: PenaltyFactors,
    /// Format assumed when the backend does not know the match format.
    pub default_format: MatchFormat,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            runs_tolerance: 5,
            wickets_tolerance: 1,
            overs_tolerance: 0.5,
            max_run_rate: 20.0,
            max_age: Duration::from_secs(30),
            validation_threshold: 0.8,
            penalties: PenaltyFactors::default(),
            default_format: MatchFormat::T20,
        }
    }
}

/// Selector failure tracking settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectorHealthConfig {
    /// Consecutive failures of one (source, field) that trigger auto-repair.
    pub failure_threshold: u32,
    /// Maximum failure records retained; oldest are dropped first.
    pub max_records: usize,
    /// Apply a found replacement to the in-memory rule set right away.
    pub apply_suggestions_in_memory: bool,
}

impl Default for SelectorHealthConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            max_records: 1000,
            apply_suggestions_in_memory: true,
        }
    }
}

/// Request budget over a fixed window, applied per source by middleware.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaConfig {
    /// Maximum number of scrapes within a single window.
    pub limit: u64,
    /// Duration of the accounting window.
    pub window: Duration,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            limit: 120,
            window: Duration::from_secs(60),
        }
    }
}

/// Snapshot cache settings for the caching middleware.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Time a cached snapshot stays fresh. Zero disables caching.
    pub ttl: Duration,
    /// Maximum cached matches per source.
    pub max_entries: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(2),
            max_entries: 1024,
        }
    }
}

/// Global configuration for the `Crease` orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Proxy pool settings.
    pub proxy: ProxyPoolConfig,
    /// Failover settings.
    pub failover: FailoverConfig,
    /// Reconciliation settings.
    pub reconcile: ReconcileConfig,
    /// Selector health settings.
    pub selector_health: SelectorHealthConfig,
    /// Timeout applied to each individual scrape.
    pub scrape_timeout: Duration,
    /// Upper bound on matches acquired concurrently by `acquire_many`.
    pub max_concurrent_matches: usize,
    /// Attempt a cross-check scrape from a second source.
    pub cross_check: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            proxy: ProxyPoolConfig::default(),
            failover: FailoverConfig::default(),
            reconcile: ReconcileConfig::default(),
            selector_health: SelectorHealthConfig::default(),
            scrape_timeout: Duration::from_secs(5),
            max_concurrent_matches: 8,
            cross_check: true,
        }
    }
}
