//! Extractable fields and their coarse types.

use core::fmt;
use serde::{Deserialize, Serialize};

/// A single extractable field of a match page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    /// Name of the first (batting-first) team.
    Team1Name,
    /// Runs scored by the first team.
    Team1Score,
    /// Wickets lost by the first team.
    Team1Wickets,
    /// Overs faced by the first team.
    Team1Overs,
    /// Name of the second team.
    Team2Name,
    /// Runs scored by the second team.
    Team2Score,
    /// Wickets lost by the second team.
    Team2Wickets,
    /// Overs faced by the second team.
    Team2Overs,
    /// Ball-by-ball commentary lines.
    Commentary,
}

/// Field type used to select store-wide fallback rules and search patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    /// Team display name (with optional short code).
    TeamName,
    /// Runs total.
    Score,
    /// Wickets fallen.
    Wickets,
    /// Overs bowled in `N.B` notation.
    Overs,
    /// Commentary feed.
    Commentary,
}

impl Field {
    /// Every field a full scrape extracts, in extraction order.
    pub const ALL: [Self; 9] = [
        Self::Team1Name,
        Self::Team1Score,
        Self::Team1Wickets,
        Self::Team1Overs,
        Self::Team2Name,
        Self::Team2Score,
        Self::Team2Wickets,
        Self::Team2Overs,
        Self::Commentary,
    ];

    /// Coarse type of this field.
    #[must_use]
    pub const fn field_type(self) -> FieldType {
        match self {
            Self::Team1Name | Self::Team2Name => FieldType::TeamName,
            Self::Team1Score | Self::Team2Score => FieldType::Score,
            Self::Team1Wickets | Self::Team2Wickets => FieldType::Wickets,
            Self::Team1Overs | Self::Team2Overs => FieldType::Overs,
            Self::Commentary => FieldType::Commentary,
        }
    }

    /// Stable snake-case label, matching the serialized form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Team1Name => "team1_name",
            Self::Team1Score => "team1_score",
            Self::Team1Wickets => "team1_wickets",
            Self::Team1Overs => "team1_overs",
            Self::Team2Name => "team2_name",
            Self::Team2Score => "team2_score",
            Self::Team2Wickets => "team2_wickets",
            Self::Team2Overs => "team2_overs",
            Self::Commentary => "commentary",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FieldType {
    /// Stable snake-case label, matching the serialized form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TeamName => "team_name",
            Self::Score => "score",
            Self::Wickets => "wickets",
            Self::Overs => "overs",
            Self::Commentary => "commentary",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
