use chrono::Utc;
use crease_core::{MatchFormat, Snapshot, SourceId, TeamScore, Teams};

fn team(name: &str, code: &str, runs: i64, wickets: i64, overs: f64) -> TeamScore {
    TeamScore {
        name: name.to_string(),
        short_name: code.to_string(),
        runs,
        wickets,
        overs,
    }
}

fn india_australia() -> (Teams, MatchFormat) {
    (
        Teams {
            team1: team("India", "IND", 168, 4, 17.5),
            team2: team("Australia", "AUS", 0, 0, 0.0),
        },
        MatchFormat::T20,
    )
}

fn build(
    match_id: &str,
    source: &SourceId,
    reliability: f64,
    (teams, format): (Teams, MatchFormat),
) -> Snapshot {
    Snapshot {
        match_id: match_id.to_string(),
        source: source.clone(),
        teams,
        commentary_lines: vec![
            "17.5 Cummins to Pant, FOUR, driven through cover".to_string(),
            "17.4 Cummins to Pant, no run".to_string(),
        ],
        captured_at: Utc::now(),
        reliability,
        format,
    }
}

/// Fixture snapshot for a known match id, captured now.
#[must_use]
pub fn by_match(match_id: &str, source: &SourceId, reliability: f64) -> Option<Snapshot> {
    let fixture = match match_id {
        "IND-AUS" => india_australia(),
        "ENG-NZ" => (
            Teams {
                team1: team("England", "ENG", 287, 9, 50.0),
                team2: team("New Zealand", "NZ", 121, 3, 24.5),
            },
            MatchFormat::Odi,
        ),
        "SA-PAK" => (
            Teams {
                team1: team("South Africa", "SA", 74, 1, 6.0),
                team2: team("Pakistan", "PAK", 0, 0, 0.0),
            },
            MatchFormat::T10,
        ),
        _ => return None,
    };
    Some(build(match_id, source, reliability, fixture))
}

/// India vs Australia scoreboard under an arbitrary match id, captured now.
#[must_use]
pub fn live(match_id: &str, source: &SourceId, reliability: f64) -> Snapshot {
    build(match_id, source, reliability, india_australia())
}

/// [`live`] with the first team's score replaced.
#[must_use]
pub fn scored(
    match_id: &str,
    source: &SourceId,
    reliability: f64,
    runs: i64,
    wickets: i64,
    overs: f64,
) -> Snapshot {
    let mut snap = live(match_id, source, reliability);
    snap.teams.team1.runs = runs;
    snap.teams.team1.wickets = wickets;
    snap.teams.team1.overs = overs;
    snap
}
