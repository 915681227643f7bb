//! Structural validation and cross-source agreement scoring.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::{CrossCheckEntry, PenaltyFactors, ReconcileConfig, ReconciliationResult, Snapshot, TeamScore};

/// Category of a structural problem found in a single snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Violation {
    /// A team name is empty.
    MissingNames,
    /// Runs are negative.
    NegativeRuns,
    /// Wickets are outside `0..=10`.
    InvalidWickets,
    /// Overs are negative or above the format cap.
    InvalidOvers,
    /// Run rate above the realistic maximum.
    UnrealisticRunRate,
    /// Snapshot older than the maximum age.
    StaleData,
}

impl Violation {
    /// Whether the state is impossible rather than merely suspicious.
    #[must_use]
    pub const fn is_hard(self) -> bool {
        matches!(
            self,
            Self::MissingNames | Self::NegativeRuns | Self::InvalidWickets | Self::InvalidOvers
        )
    }

    /// Confidence multiplier for this category.
    #[must_use]
    pub const fn penalty(self, factors: &PenaltyFactors) -> f64 {
        match self {
            Self::MissingNames => factors.missing_names,
            Self::NegativeRuns => factors.negative_runs,
            Self::InvalidWickets => factors.invalid_wickets,
            Self::InvalidOvers => factors.invalid_overs,
            Self::UnrealisticRunRate => factors.unrealistic_run_rate,
            Self::StaleData => factors.stale_data,
        }
    }
}

/// Hard impossibilities of one snapshot: missing names, negative runs,
/// wickets outside `0..=10`, negative overs, and overs above `max_overs`.
#[must_use]
pub fn check_structure(snapshot: &Snapshot, max_overs: Option<f64>) -> Vec<(Violation, String)> {
    let mut out = Vec::new();
    for (label, team) in [("team1", &snapshot.teams.team1), ("team2", &snapshot.teams.team2)] {
        if team.name.trim().is_empty() {
            out.push((Violation::MissingNames, format!("{label} name is missing")));
        }
        if team.runs < 0 {
            out.push((Violation::NegativeRuns, format!("{label} runs {} < 0", team.runs)));
        }
        if !(0..=10).contains(&team.wickets) {
            out.push((
                Violation::InvalidWickets,
                format!("{label} wickets {} outside 0..=10", team.wickets),
            ));
        }
        if team.overs < 0.0 || team.overs.is_nan() {
            out.push((Violation::InvalidOvers, format!("{label} overs {} < 0", team.overs)));
        } else if let Some(cap) = max_overs
            && team.overs > cap
        {
            out.push((
                Violation::InvalidOvers,
                format!("{label} overs {:.2} above format maximum {cap}", team.overs),
            ));
        }
    }
    out
}

/// Scores snapshots for structural sanity and cross-source agreement.
#[derive(Debug, Clone, Default)]
pub struct ReconciliationEngine {
    config: ReconcileConfig,
}

impl ReconciliationEngine {
    /// Create an engine with the given tolerances and penalties.
    #[must_use]
    pub const fn new(config: ReconcileConfig) -> Self {
        Self { config }
    }

    /// Engine configuration.
    #[must_use]
    pub const fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    /// Every structural violation of `snapshot` at `now`: the hard checks
    /// plus run rate and staleness.
    #[must_use]
    pub fn validate_structure(&self, snapshot: &Snapshot, now: DateTime<Utc>) -> Vec<(Violation, String)> {
        let mut out = check_structure(snapshot, snapshot.format.max_overs());
        for (label, team) in [("team1", &snapshot.teams.team1), ("team2", &snapshot.teams.team2)] {
            if team.overs > 0.0 {
                #[allow(clippy::cast_precision_loss)]
                let rate = team.runs as f64 / team.overs;
                if rate > self.config.max_run_rate {
                    out.push((
                        Violation::UnrealisticRunRate,
                        format!("{label} run rate {rate:.2} above {}", self.config.max_run_rate),
                    ));
                }
            }
        }
        let age = snapshot.age_at(now);
        let max_age = chrono::Duration::from_std(self.config.max_age).unwrap_or(chrono::Duration::MAX);
        if age > max_age {
            out.push((
                Violation::StaleData,
                format!("snapshot is {}s old", age.num_seconds()),
            ));
        }
        out
    }

    /// Product of penalties, applied once per violated category.
    fn structural_factor(&self, violations: &[(Violation, String)]) -> f64 {
        let mut kinds: Vec<Violation> = violations.iter().map(|(v, _)| *v).collect();
        kinds.sort_unstable();
        kinds.dedup();
        kinds
            .into_iter()
            .map(|v| v.penalty(&self.config.penalties))
            .product()
    }

    /// Reconcile a primary snapshot with an optional second opinion, now.
    #[must_use]
    pub fn reconcile(&self, primary: &Snapshot, secondary: Option<&Snapshot>) -> ReconciliationResult {
        self.reconcile_at(primary, secondary, Utc::now())
    }

    /// Reconcile at an explicit instant.
    ///
    /// Single source: confidence is the source reliability times the
    /// structural factor. Two sources: confidence is the mean of the numeric
    /// agreement fraction and the average reliability; structural problems of
    /// either snapshot are still listed as discrepancies. Hard impossibilities
    /// are rejected before reconciliation, see [`check_structure`].
    #[must_use]
    pub fn reconcile_at(
        &self,
        primary: &Snapshot,
        secondary: Option<&Snapshot>,
        now: DateTime<Utc>,
    ) -> ReconciliationResult {
        let primary_violations = self.validate_structure(primary, now);
        let mut discrepancies: Vec<String> = primary_violations
            .iter()
            .map(|(_, d)| format!("{}: {d}", primary.source))
            .collect();

        let mut cross_check = BTreeMap::new();
        cross_check.insert(
            primary.source.clone(),
            CrossCheckEntry {
                snapshot: primary.clone(),
                reliability: primary.reliability,
            },
        );

        let (confidence, recommended_source) = match secondary {
            None => (
                primary.reliability * self.structural_factor(&primary_violations),
                primary.source.clone(),
            ),
            Some(other) => {
                let other_violations = self.validate_structure(other, now);
                discrepancies.extend(
                    other_violations
                        .iter()
                        .map(|(_, d)| format!("{}: {d}", other.source)),
                );
                let agreed = self.compare(primary, other, &mut discrepancies);
                let average_reliability = (primary.reliability + other.reliability) / 2.0;
                let confidence = f64::midpoint(agreed, average_reliability);

                let prefer_other = other.captured_at > primary.captured_at
                    || (other.captured_at == primary.captured_at
                        && other.reliability > primary.reliability);
                cross_check.insert(
                    other.source.clone(),
                    CrossCheckEntry {
                        snapshot: other.clone(),
                        reliability: other.reliability,
                    },
                );
                let recommended = if prefer_other {
                    other.source.clone()
                } else {
                    primary.source.clone()
                };
                (confidence, recommended)
            }
        };

        let confidence = confidence.clamp(0.0, 1.0);
        ReconciliationResult {
            is_valid: confidence >= self.config.validation_threshold,
            confidence,
            discrepancies,
            recommended_source,
            cross_check,
        }
    }

    /// Compare the six numeric quantities and team names; returns the agreement fraction.
    fn compare(&self, a: &Snapshot, b: &Snapshot, discrepancies: &mut Vec<String>) -> f64 {
        let mut agreed = 0u32;
        let pairs = [
            ("team1", &a.teams.team1, &b.teams.team1),
            ("team2", &a.teams.team2, &b.teams.team2),
        ];
        for (label, x, y) in pairs {
            if !same_team(x, y) {
                discrepancies.push(format!(
                    "{label} name: {}={:?} {}={:?}",
                    a.source, x.name, b.source, y.name
                ));
            }
            let runs = (x.runs - y.runs).abs();
            if runs <= self.config.runs_tolerance {
                agreed += 1;
            } else {
                discrepancies.push(format!(
                    "{label} runs: {}={} {}={} (diff {runs} > {})",
                    a.source, x.runs, b.source, y.runs, self.config.runs_tolerance
                ));
            }
            let wickets = (x.wickets - y.wickets).abs();
            if wickets <= self.config.wickets_tolerance {
                agreed += 1;
            } else {
                discrepancies.push(format!(
                    "{label} wickets: {}={} {}={} (diff {wickets} > {})",
                    a.source, x.wickets, b.source, y.wickets, self.config.wickets_tolerance
                ));
            }
            let overs = (x.overs - y.overs).abs();
            if overs <= self.config.overs_tolerance {
                agreed += 1;
            } else {
                discrepancies.push(format!(
                    "{label} overs: {}={:.2} {}={:.2} (diff {overs:.2} > {})",
                    a.source, x.overs, b.source, y.overs, self.config.overs_tolerance
                ));
            }
        }
        f64::from(agreed) / 6.0
    }
}

fn same_team(a: &TeamScore, b: &TeamScore) -> bool {
    let names = a.name.trim().eq_ignore_ascii_case(b.name.trim());
    let codes = !a.short_name.is_empty() && a.short_name.eq_ignore_ascii_case(&b.short_name);
    names || codes
}
