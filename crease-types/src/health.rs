//! Health, audit, and selector-failure records.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Field, SourceId};

/// Runtime health of one external source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceHealth {
    /// Source this record describes.
    pub source: SourceId,
    /// `false` removes the source from failover candidacy until re-enabled.
    pub is_active: bool,
    /// Time of the last successful scrape.
    pub last_success: Option<DateTime<Utc>>,
    /// Time of the last failed scrape.
    pub last_error: Option<DateTime<Utc>>,
    /// Failures since the last success.
    pub consecutive_error_count: u32,
    /// Lifetime successes.
    pub success_count: u64,
    /// Lifetime failures.
    pub error_count: u64,
    /// Mean response time over successful scrapes.
    pub average_response_time: Duration,
    /// Rolling reliability in `[0, 1]`, seeded with the static prior.
    pub reliability: f64,
}

impl SourceHealth {
    /// Fresh record for a source with a static reliability prior.
    #[must_use]
    pub fn new(source: SourceId, reliability: f64) -> Self {
        Self {
            source,
            is_active: true,
            last_success: None,
            last_error: None,
            consecutive_error_count: 0,
            success_count: 0,
            error_count: 0,
            average_response_time: Duration::ZERO,
            reliability: reliability.clamp(0.0, 1.0),
        }
    }
}

/// Outcome of one scrape attempt, reported to the failover controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScrapeOutcome {
    /// The scrape produced a snapshot.
    Success {
        /// Wall time of the attempt.
        response_time: Duration,
    },
    /// The scrape failed.
    Failure {
        /// Short machine-readable reason, e.g. `network` or `invalid_data`.
        reason: String,
    },
}

/// Audit log entry appended whenever the current source changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailoverEvent {
    /// Source that was current.
    pub from: SourceId,
    /// Source that became current.
    pub to: SourceId,
    /// Why the switch happened.
    pub reason: String,
    /// When the switch happened.
    pub timestamp: DateTime<Utc>,
}

/// One failed field extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectorFailureRecord {
    /// Source whose rules failed.
    pub source: SourceId,
    /// Field that could not be extracted.
    pub field: Field,
    /// Page URL the rules were applied to.
    pub url: String,
    /// Primary rule at the time of failure.
    pub original_rule: String,
    /// Every rule tried, in order.
    pub attempted_rules: Vec<String>,
    /// Failure time.
    pub timestamp: DateTime<Utc>,
    /// Replacement found by auto-repair, if any.
    pub suggested_replacement: Option<String>,
}

/// Aggregate selector health for one source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectorHealth {
    /// Fields with any recorded outcome.
    pub total_fields: usize,
    /// Fields currently failing (non-zero consecutive failures).
    pub failing_fields: usize,
    /// Share of fields not failing, in `[0, 1]`.
    pub success_rate: f64,
    /// Time of the most recent outcome.
    pub last_update: Option<DateTime<Utc>>,
}

/// Replacement rule staged by auto-repair and flagged for human verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepairSuggestion {
    /// Source the rule belongs to.
    pub source: SourceId,
    /// Field the rule extracts.
    pub field: Field,
    /// Rule that stopped working.
    pub original_rule: String,
    /// Variant that produced text on the live page.
    pub suggested_rule: String,
    /// When the suggestion was staged.
    pub flagged_at: DateTime<Utc>,
    /// Whether the suggestion was applied to the in-memory rule set.
    pub applied: bool,
}
