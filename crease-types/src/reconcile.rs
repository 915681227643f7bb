//! Reconciliation results.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{Snapshot, SourceId};

/// Snapshot considered during reconciliation together with its source reliability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossCheckEntry {
    /// Snapshot as scraped.
    pub snapshot: Snapshot,
    /// Static reliability of the source.
    pub reliability: f64,
}

/// Outcome of validating one acquisition cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationResult {
    /// `confidence >= validation threshold`.
    pub is_valid: bool,
    /// Trust score in `[0, 1]`.
    pub confidence: f64,
    /// Human-readable description of every violation and disagreement.
    pub discrepancies: Vec<String>,
    /// Source whose snapshot should be trusted.
    pub recommended_source: SourceId,
    /// Every snapshot that took part, keyed by source.
    pub cross_check: BTreeMap<SourceId, CrossCheckEntry>,
}

impl ReconciliationResult {
    /// Snapshot of the recommended source.
    #[must_use]
    pub fn recommended_snapshot(&self) -> Option<&Snapshot> {
        self.cross_check
            .get(&self.recommended_source)
            .map(|e| &e.snapshot)
    }
}
