use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Field, SourceId};

/// Unified error type for the crease workspace.
///
/// Covers network and extraction failures of a single source, data validation,
/// reconciliation disagreement, configuration problems, and an aggregate for
/// acquisitions where every source was exhausted.
#[derive(Debug, Error, Serialize, Deserialize, Clone, PartialEq)]
#[non_exhaustive]
pub enum CreaseError {
    /// Connection failure or non-success HTTP status while fetching a page.
    #[error("{source_id} network error: {msg}")]
    Network {
        /// Source that failed.
        source_id: SourceId,
        /// Human-readable error message.
        msg: String,
    },

    /// A scrape exceeded its own timeout.
    #[error("{source_id} timed out after {timeout_ms}ms")]
    SourceTimeout {
        /// Source that timed out.
        source_id: SourceId,
        /// Timeout that elapsed.
        timeout_ms: u64,
    },

    /// The proxy pool had no eligible proxy for the attempt.
    #[error("{source_id}: no proxy available")]
    NoProxyAvailable {
        /// Source that needed a proxy.
        source_id: SourceId,
    },

    /// No rule (primary, fallback, or global) produced text for a field.
    #[error("{source_id}: extraction failed for {field}")]
    Extraction {
        /// Source whose rules failed.
        source_id: SourceId,
        /// Field that came back empty.
        field: Field,
    },

    /// Scraped data is structurally impossible.
    #[error("{source_id}: invalid data: {reasons:?}")]
    InvalidData {
        /// Source that produced the data.
        source_id: SourceId,
        /// One entry per violated rule.
        reasons: Vec<String>,
    },

    /// Cross-source reconciliation did not reach the validation threshold.
    #[error("reconciliation failed: confidence={confidence:.3} discrepancies={discrepancies:?}")]
    ReconciliationFailed {
        /// Final confidence.
        confidence: f64,
        /// Disagreements and violations found.
        discrepancies: Vec<String>,
    },

    /// Every attempted source failed; contains the individual failures.
    #[error("all sources failed: {0:?}")]
    AllSourcesFailed(Vec<CreaseError>),

    /// Every attempted source timed out.
    #[error("all sources timed out for match {match_id}")]
    AllSourcesTimedOut {
        /// Match being acquired.
        match_id: String,
    },

    /// No source is active.
    #[error("no active sources")]
    NoActiveSources,

    /// The backend reports the match as no longer live.
    #[error("match {match_id} is not live")]
    MatchNotLive {
        /// Match identifier.
        match_id: String,
    },

    /// The request exceeds the configured request budget for the current window.
    #[error("quota exceeded: remaining={remaining} reset_in_ms={reset_in_ms}")]
    QuotaExceeded {
        /// Remaining units at the time of rejection.
        remaining: u64,
        /// Milliseconds until the quota window resets.
        reset_in_ms: u64,
    },

    /// A rule update was rejected.
    #[error("invalid rule for {source_id}/{field}: {msg}")]
    InvalidRule {
        /// Source the rule belongs to.
        source_id: SourceId,
        /// Field the rule extracts.
        field: Field,
        /// Reason for rejection.
        msg: String,
    },

    /// Invalid configuration or rule document.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A source id is not registered.
    #[error("unknown source: {0}")]
    UnknownSource(String),

    /// The external backend collaborator failed.
    #[error("backend error: {0}")]
    Backend(String),

    /// Reading or writing a rule file failed.
    #[error("io error: {0}")]
    Io(String),

    /// Unknown/opaque error.
    #[error("unknown error: {0}")]
    Other(String),
}

impl CreaseError {
    /// Helper: build a `Network` error.
    pub fn network(source: impl Into<SourceId>, msg: impl Into<String>) -> Self {
        Self::Network {
            source_id: source.into(),
            msg: msg.into(),
        }
    }

    /// Helper: build a `SourceTimeout` error.
    pub fn source_timeout(source: impl Into<SourceId>, timeout: std::time::Duration) -> Self {
        Self::SourceTimeout {
            source_id: source.into(),
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Helper: build a `NoProxyAvailable` error.
    pub fn no_proxy(source: impl Into<SourceId>) -> Self {
        Self::NoProxyAvailable {
            source_id: source.into(),
        }
    }

    /// Helper: build an `Extraction` error.
    pub fn extraction(source: impl Into<SourceId>, field: Field) -> Self {
        Self::Extraction {
            source_id: source.into(),
            field,
        }
    }

    /// Helper: build an `InvalidData` error.
    pub fn invalid_data(source: impl Into<SourceId>, reasons: Vec<String>) -> Self {
        Self::InvalidData {
            source_id: source.into(),
            reasons,
        }
    }

    /// Helper: build an `InvalidRule` error.
    pub fn invalid_rule(source: impl Into<SourceId>, field: Field, msg: impl Into<String>) -> Self {
        Self::InvalidRule {
            source_id: source.into(),
            field,
            msg: msg.into(),
        }
    }

    /// Short machine-readable reason code, e.g. `network` or `invalid_data`.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::Network { .. } => "network",
            Self::SourceTimeout { .. } | Self::AllSourcesTimedOut { .. } => "timeout",
            Self::NoProxyAvailable { .. } => "no_proxy",
            Self::Extraction { .. } => "extraction",
            Self::InvalidData { .. } => "invalid_data",
            Self::ReconciliationFailed { .. } => "reconciliation",
            Self::AllSourcesFailed(_) | Self::NoActiveSources => "exhausted",
            Self::MatchNotLive { .. } => "not_live",
            Self::QuotaExceeded { .. } => "quota",
            Self::InvalidRule { .. } | Self::InvalidConfig(_) => "config",
            Self::UnknownSource(_) => "unknown_source",
            Self::Backend(_) => "backend",
            Self::Io(_) => "io",
            Self::Other(_) => "other",
        }
    }

    /// Source this error is attributed to, if any.
    #[must_use]
    pub const fn source_id(&self) -> Option<&SourceId> {
        match self {
            Self::Network { source_id, .. }
            | Self::SourceTimeout { source_id, .. }
            | Self::NoProxyAvailable { source_id }
            | Self::Extraction { source_id, .. }
            | Self::InvalidData { source_id, .. }
            | Self::InvalidRule { source_id, .. } => Some(source_id),
            _ => None,
        }
    }

    /// True for transport-level failures that a different proxy or source may not hit.
    #[must_use]
    pub const fn is_network(&self) -> bool {
        matches!(self, Self::Network { .. } | Self::SourceTimeout { .. })
    }

    /// Flatten nested `AllSourcesFailed` structures into a plain vector.
    #[must_use]
    pub fn flatten(self) -> Vec<Self> {
        match self {
            Self::AllSourcesFailed(list) => list.into_iter().flat_map(Self::flatten).collect(),
            other => vec![other],
        }
    }
}
