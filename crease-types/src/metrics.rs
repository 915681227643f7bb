//! Aggregate acquisition metrics.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::SourceId;

/// Per-source attempt counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SourceCounters {
    /// Scrapes issued.
    pub attempts: u64,
    /// Scrapes that produced a snapshot.
    pub successes: u64,
    /// Scrapes that failed.
    pub failures: u64,
}

/// Point-in-time copy of the orchestrator metrics.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcquisitionMetrics {
    /// `acquire` calls that reached the scraping stage.
    pub total_attempts: u64,
    /// Acquisitions that applied a snapshot.
    pub successful: u64,
    /// Acquisitions that returned an error.
    pub failed: u64,
    /// Failover events observed.
    pub failovers: u64,
    /// Mean latency of successful acquisitions in milliseconds.
    pub average_latency_ms: f64,
    /// Time of the last successful acquisition.
    pub last_success_at: Option<DateTime<Utc>>,
    /// Time of the last failed acquisition.
    pub last_failure_at: Option<DateTime<Utc>>,
    /// Attempt counters per source.
    pub per_source: BTreeMap<SourceId, SourceCounters>,
}

impl AcquisitionMetrics {
    /// Share of successful acquisitions, `0.0` when nothing ran yet.
    #[must_use]
    pub fn success_rate(&self) -> f64 {
        let done = self.successful + self.failed;
        if done == 0 {
            0.0
        } else {
            #[allow(clippy::cast_precision_loss)]
            {
                self.successful as f64 / done as f64
            }
        }
    }
}
