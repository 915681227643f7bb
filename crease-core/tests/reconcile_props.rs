use chrono::{DateTime, Utc};
use crease_core::{
    MatchFormat, ReconcileConfig, ReconciliationEngine, Snapshot, SourceId, TeamScore, Teams,
};
use proptest::prelude::*;

fn arb_team() -> impl Strategy<Value = TeamScore> {
    (-20i64..400, -2i64..13, -1.0f64..60.0).prop_map(|(runs, wickets, overs)| TeamScore {
        name: "Team".into(),
        short_name: "TM".into(),
        runs,
        wickets,
        overs,
    })
}

fn snapshot(source: &str, reliability: f64, team1: TeamScore, team2: TeamScore, at: DateTime<Utc>) -> Snapshot {
    Snapshot {
        match_id: "m".into(),
        source: SourceId::new(source),
        teams: Teams { team1, team2 },
        commentary_lines: vec![],
        captured_at: at,
        reliability,
        format: MatchFormat::Odi,
    }
}

proptest! {
    #[test]
    fn confidence_stays_in_unit_interval(
        a1 in arb_team(), a2 in arb_team(), b1 in arb_team(), b2 in arb_team(),
        ra in 0.0f64..=1.0, rb in 0.0f64..=1.0, age in 0i64..120,
    ) {
        let engine = ReconciliationEngine::default();
        let now = Utc::now();
        let a = snapshot("a", ra, a1, a2, now - chrono::Duration::seconds(age));
        let b = snapshot("b", rb, b1, b2, now);
        let single = engine.reconcile_at(&a, None, now);
        let pair = engine.reconcile_at(&a, Some(&b), now);
        for r in [&single, &pair] {
            prop_assert!((0.0..=1.0).contains(&r.confidence));
            prop_assert_eq!(r.is_valid, r.confidence >= ReconcileConfig::default().validation_threshold);
        }
        prop_assert!(pair.cross_check.contains_key(&pair.recommended_source));
    }

    #[test]
    fn impossible_wickets_are_always_flagged(wickets in prop_oneof![-50i64..0, 11i64..50]) {
        let engine = ReconciliationEngine::default();
        let now = Utc::now();
        let team1 = TeamScore { name: "India".into(), short_name: "IND".into(), runs: 100, wickets, overs: 20.0 };
        let team2 = TeamScore { name: "Nepal".into(), short_name: "NEP".into(), runs: 0, wickets: 0, overs: 0.0 };
        let r = engine.reconcile_at(&snapshot("a", 1.0, team1, team2, now), None, now);
        prop_assert!(r.discrepancies.iter().any(|d| d.contains("wickets")));
        prop_assert!(r.confidence <= 0.2 + 1e-9);
    }

    #[test]
    fn identical_snapshots_fully_agree(t1 in arb_team(), t2 in arb_team()) {
        let engine = ReconciliationEngine::default();
        let now = Utc::now();
        let a = snapshot("a", 0.9, t1.clone(), t2.clone(), now);
        let b = snapshot("b", 0.9, t1, t2, now);
        let r = engine.reconcile_at(&a, Some(&b), now);
        prop_assert!(!r.discrepancies.iter().any(|d| d.contains(" runs:") || d.contains(" overs:")));
        // full agreement: (1.0 + 0.9) / 2, whatever the structural state
        prop_assert!((r.confidence - 0.95).abs() < 1e-9);
    }
}
