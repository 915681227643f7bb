//! Per-field extraction health and auto-repair.
//!
//! Every field extraction reports its outcome here. After
//! `failure_threshold` consecutive failures of one (source, field) pair the
//! tracker tries to repair the rule against the live page. A working variant
//! is staged as a [`RepairSuggestion`] flagged for human verification and,
//! when configured, committed to the in-memory [`RuleStore`]; persisting it
//! stays a separate, explicit rule update. A pair whose repair finds nothing
//! is parked until [`SelectorHealthTracker::reset_pair`] re-arms it.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

use crate::repair;
use crate::{
    Field, PageExtractor, RepairSuggestion, RuleStore, SelectorFailureRecord, SelectorHealth,
    SelectorHealthConfig, SourceId,
};

/// One failed extraction as reported by a source adapter.
#[derive(Debug, Clone, Copy)]
pub struct FailureReport<'a> {
    /// Source whose rules failed.
    pub source: &'a SourceId,
    /// Field that came back empty.
    pub field: Field,
    /// Page URL.
    pub url: &'a str,
    /// Primary rule at the time of failure (empty when none is configured).
    pub rule: &'a str,
    /// Every rule tried, in order.
    pub attempted: &'a [String],
}

/// Result of an auto-repair attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepairOutcome {
    /// A variant matched the live page and was staged.
    Suggested(RepairSuggestion),
    /// No variant matched; the pair is parked until reset.
    ManualInterventionRequired,
    /// Repair was due but not attempted (disabled, parked, or no page to test against).
    Skipped,
}

#[derive(Debug, Clone, Default)]
struct PairState {
    consecutive_failures: u32,
    repair_attempts: u32,
    manual: bool,
    last_update: Option<DateTime<Utc>>,
}

#[derive(Default)]
struct TrackerState {
    pairs: HashMap<(SourceId, Field), PairState>,
    records: VecDeque<SelectorFailureRecord>,
    suggestions: Vec<RepairSuggestion>,
}

/// Thread-safe selector health tracker.
pub struct SelectorHealthTracker {
    config: SelectorHealthConfig,
    rules: Arc<RuleStore>,
    state: Mutex<TrackerState>,
}

impl SelectorHealthTracker {
    /// Create a tracker that repairs rules held by `rules`.
    #[must_use]
    pub fn new(rules: Arc<RuleStore>, config: SelectorHealthConfig) -> Self {
        Self {
            config,
            rules,
            state: Mutex::new(TrackerState::default()),
        }
    }

    /// Record a successful extraction; clears the pair's consecutive failure count.
    ///
    /// # Panics
    /// Panics if the internal mutex is poisoned.
    pub fn record_success(&self, source: &SourceId, field: Field) {
        let mut st = self.state.lock().expect("mutex poisoned");
        let pair = st.pairs.entry((source.clone(), field)).or_default();
        pair.consecutive_failures = 0;
        pair.last_update = Some(Utc::now());
    }

    /// Record a failed extraction.
    ///
    /// Returns `None` while the pair is below the failure threshold. Once the
    /// threshold is reached the counter resets and a repair is attempted
    /// against `page`; the outcome of that attempt is returned.
    ///
    /// # Panics
    /// Panics if the internal mutex is poisoned.
    pub fn record_failure(
        &self,
        report: FailureReport<'_>,
        page: Option<&dyn PageExtractor>,
    ) -> Option<RepairOutcome> {
        let now = Utc::now();
        let due_and_parked = {
            let mut st = self.state.lock().expect("mutex poisoned");
            st.records.push_back(SelectorFailureRecord {
                source: report.source.clone(),
                field: report.field,
                url: report.url.to_string(),
                original_rule: report.rule.to_string(),
                attempted_rules: report.attempted.to_vec(),
                timestamp: now,
                suggested_replacement: None,
            });
            while st.records.len() > self.config.max_records {
                st.records.pop_front();
            }
            let threshold = self.config.failure_threshold.max(1);
            let pair = st.pairs.entry((report.source.clone(), report.field)).or_default();
            pair.consecutive_failures += 1;
            pair.last_update = Some(now);
            if pair.consecutive_failures < threshold {
                return None;
            }
            pair.consecutive_failures = 0;
            if !pair.manual {
                pair.repair_attempts += 1;
            }
            pair.manual
        };

        if due_and_parked || !self.rules.snapshot().auto_detection().enabled {
            return Some(RepairOutcome::Skipped);
        }
        let Some(page) = page else {
            return Some(RepairOutcome::Skipped);
        };
        Some(self.attempt_repair(report, page))
    }

    fn attempt_repair(&self, report: FailureReport<'_>, page: &dyn PageExtractor) -> RepairOutcome {
        let snapshot = self.rules.snapshot();
        let original = if report.rule.is_empty() {
            report.attempted.first().map_or("", String::as_str)
        } else {
            report.rule
        };
        let settings = snapshot.auto_detection();
        let candidates = repair::rank(
            original,
            repair::generate(original, snapshot.search_patterns(report.field.field_type())),
            settings.fuzzy_match_threshold,
            settings.max_attempts,
        );
        let found = candidates
            .into_iter()
            .find(|c| !report.attempted.contains(c) && !page.query_text(c).is_empty());

        let mut st = self.state.lock().expect("mutex poisoned");
        let Some(replacement) = found else {
            if let Some(pair) = st.pairs.get_mut(&(report.source.clone(), report.field)) {
                pair.manual = true;
            }
            #[cfg(feature = "tracing")]
            tracing::warn!(
                source = %report.source,
                field = %report.field,
                rule = original,
                "auto-repair found no working variant; manual intervention required"
            );
            return RepairOutcome::ManualInterventionRequired;
        };
        drop(st);

        let applied = self.config.apply_suggestions_in_memory
            && self
                .rules
                .update_rule(report.source, report.field, &replacement, Some(page))
                .is_ok();
        let suggestion = RepairSuggestion {
            source: report.source.clone(),
            field: report.field,
            original_rule: original.to_string(),
            suggested_rule: replacement.clone(),
            flagged_at: Utc::now(),
            applied,
        };

        st = self.state.lock().expect("mutex poisoned");
        if let Some(record) = st
            .records
            .iter_mut()
            .rev()
            .find(|r| &r.source == report.source && r.field == report.field)
        {
            record.suggested_replacement = Some(replacement.clone());
        }
        st.suggestions.push(suggestion.clone());
        drop(st);

        #[cfg(feature = "tracing")]
        tracing::warn!(
            source = %report.source,
            field = %report.field,
            original = original,
            suggested = %replacement,
            applied,
            "selector auto-repaired; flagged for verification"
        );
        RepairOutcome::Suggested(suggestion)
    }

    /// Failure records, newest first, filtered by source and field.
    ///
    /// # Panics
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn get_failures(
        &self,
        source: Option<&SourceId>,
        field: Option<Field>,
        limit: usize,
    ) -> Vec<SelectorFailureRecord> {
        let st = self.state.lock().expect("mutex poisoned");
        st.records
            .iter()
            .rev()
            .filter(|r| source.is_none_or(|s| &r.source == s))
            .filter(|r| field.is_none_or(|f| r.field == f))
            .take(limit)
            .cloned()
            .collect()
    }

    /// Aggregate health of one source's fields.
    ///
    /// # Panics
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn get_health(&self, source: &SourceId) -> SelectorHealth {
        let st = self.state.lock().expect("mutex poisoned");
        let pairs: Vec<&PairState> = st
            .pairs
            .iter()
            .filter(|((s, _), _)| s == source)
            .map(|(_, p)| p)
            .collect();
        let total = pairs.len();
        let failing = pairs
            .iter()
            .filter(|p| p.consecutive_failures > 0 || p.manual)
            .count();
        #[allow(clippy::cast_precision_loss)]
        let success_rate = if total == 0 {
            1.0
        } else {
            (total - failing) as f64 / total as f64
        };
        SelectorHealth {
            total_fields: total,
            failing_fields: failing,
            success_rate,
            last_update: pairs.iter().filter_map(|p| p.last_update).max(),
        }
    }

    /// Re-arm auto-repair for a pair parked for manual intervention.
    ///
    /// # Panics
    /// Panics if the internal mutex is poisoned.
    pub fn reset_pair(&self, source: &SourceId, field: Field) {
        let mut st = self.state.lock().expect("mutex poisoned");
        if let Some(pair) = st.pairs.get_mut(&(source.clone(), field)) {
            pair.manual = false;
            pair.consecutive_failures = 0;
        }
    }

    /// Whether a pair is parked for manual intervention.
    ///
    /// # Panics
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn needs_manual_intervention(&self, source: &SourceId, field: Field) -> bool {
        let st = self.state.lock().expect("mutex poisoned");
        st.pairs
            .get(&(source.clone(), field))
            .is_some_and(|p| p.manual)
    }

    /// Auto-repair attempts made for a pair so far.
    ///
    /// # Panics
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn repair_attempts(&self, source: &SourceId, field: Field) -> u32 {
        let st = self.state.lock().expect("mutex poisoned");
        st.pairs
            .get(&(source.clone(), field))
            .map_or(0, |p| p.repair_attempts)
    }

    /// Staged repair suggestions, oldest first.
    ///
    /// # Panics
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn suggestions(&self) -> Vec<RepairSuggestion> {
        self.state.lock().expect("mutex poisoned").suggestions.clone()
    }

    /// Drop failure records of one source, or all of them. Returns the number removed.
    ///
    /// # Panics
    /// Panics if the internal mutex is poisoned.
    pub fn clear_failures(&self, source: Option<&SourceId>) -> usize {
        let mut st = self.state.lock().expect("mutex poisoned");
        let before = st.records.len();
        match source {
            Some(s) => st.records.retain(|r| &r.source != s),
            None => st.records.clear(),
        }
        before - st.records.len()
    }
}
