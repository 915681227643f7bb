//! Match snapshots produced by a single successful scrape.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::SourceId;

/// Limited-overs format of a match, used to bound the overs value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum MatchFormat {
    /// Ten overs per side.
    T10,
    /// Twenty overs per side.
    #[default]
    T20,
    /// Fifty overs per side.
    Odi,
    /// Multi-day match without an innings overs cap.
    Test,
}

impl MatchFormat {
    /// Maximum overs one side may face, or `None` when uncapped.
    #[must_use]
    pub const fn max_overs(self) -> Option<f64> {
        match self {
            Self::T10 => Some(10.0),
            Self::T20 => Some(20.0),
            Self::Odi => Some(50.0),
            Self::Test => None,
        }
    }
}

/// Score line of one team.
///
/// Values are signed so that impossible upstream data can be represented and
/// rejected by validation rather than silently clamped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct TeamScore {
    /// Display name, e.g. `India`.
    pub name: String,
    /// Short code, e.g. `IND`.
    pub short_name: String,
    /// Runs scored.
    pub runs: i64,
    /// Wickets fallen.
    pub wickets: i64,
    /// Overs faced as a decimal (`15.3` overs is `15.5`).
    pub overs: f64,
}

/// Both teams of a match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Teams {
    /// Team batting first.
    pub team1: TeamScore,
    /// Team batting second.
    pub team2: TeamScore,
}

impl Teams {
    /// Iterate both teams in order.
    pub fn iter(&self) -> impl Iterator<Item = &TeamScore> {
        [&self.team1, &self.team2].into_iter()
    }
}

/// One complete scrape result for a match at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Match identifier the snapshot belongs to.
    pub match_id: String,
    /// Source that produced it.
    pub source: SourceId,
    /// Score lines.
    pub teams: Teams,
    /// Most recent commentary lines, newest first.
    pub commentary_lines: Vec<String>,
    /// Capture time.
    pub captured_at: DateTime<Utc>,
    /// Static reliability of the producing source in `[0, 1]`.
    pub reliability: f64,
    /// Format used to bound overs during validation.
    #[serde(default)]
    pub format: MatchFormat,
}

impl Snapshot {
    /// Return a copy of this snapshot stamped with a match format.
    #[must_use]
    pub fn with_format(mut self, format: MatchFormat) -> Self {
        self.format = format;
        self
    }

    /// Age of the snapshot relative to `now`; negative ages are reported as zero.
    #[must_use]
    pub fn age_at(&self, now: DateTime<Utc>) -> chrono::Duration {
        let age = now - self.captured_at;
        if age < chrono::Duration::zero() {
            chrono::Duration::zero()
        } else {
            age
        }
    }
}
