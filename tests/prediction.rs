use chrono::{DateTime, Duration, TimeZone, Utc};

use scoreline::predict::{DistributionSource, Winner};
use scoreline::profile_cache::load_profile_cache;
use scoreline::result_parse::{ParsedResult, parse_results};
use scoreline::{
    CsvStore, Engine, MatchStore, MemoryStore, Prediction, PredictionStatus, Scoreline, StoreError,
    ValidationError,
};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap()
}

fn engine_with(results: &[(&str, &str, i64, i64, i64)]) -> Engine<MemoryStore> {
    let mut engine = Engine::new(MemoryStore::new());
    for (a, b, ga, gb, days_ago) in results {
        engine
            .record_match(a, b, *ga, *gb, Some(now() - Duration::days(*days_ago)))
            .unwrap();
    }
    engine
}

#[test]
fn empty_store_is_insufficient() {
    let engine = Engine::new(MemoryStore::new());
    let p = engine.predict_at("X", "Y", now()).unwrap();
    assert_eq!(p.status(), PredictionStatus::InsufficientData);
    assert!(p.as_match().is_none());
}

#[test]
fn uniform_history_predicts_its_score() {
    let engine = engine_with(&[
        ("Porto", "Milano", 2, 1, 0),
        ("Porto", "Milano", 2, 1, 12),
        ("Porto", "Milano", 2, 1, 24),
        ("Porto", "Milano", 2, 1, 36),
        ("Porto", "Milano", 2, 1, 48),
        ("Porto", "Milano", 2, 1, 60),
    ]);
    let p = engine.predict_at("Porto", "Milano", now()).unwrap();
    let m = p.as_match().expect("status ok");
    assert_eq!(p.status(), PredictionStatus::Ok);
    assert_eq!(m.expected_score, Scoreline::new(2, 1));
    assert_eq!(m.winner, Winner::TeamA);
    assert_eq!(m.source, DistributionSource::HeadToHead);
    assert_eq!(m.top_scores.len(), 1);
    assert_eq!(m.top_scores[0].score.to_string(), "2-1");
    assert!((m.top_scores[0].probability - 1.0).abs() < 1e-9);
    assert_eq!(m.samples, 6);
    assert!(m.repetitive_matchup);
}

#[test]
fn half_goal_expectations_round_to_even() {
    let engine = engine_with(&[
        ("Porto", "Lyon", 1, 0, 0),
        ("Porto", "Lyon", 1, 0, 0),
        ("Porto", "Lyon", 1, 0, 0),
        ("Milano", "Nice", 0, 0, 0),
        ("Milano", "Nice", 0, 0, 0),
        ("Milano", "Nice", 0, 0, 0),
    ]);
    let p = engine.predict_at("Porto", "Milano", now()).unwrap();
    let m = p.as_match().expect("six matches are enough");
    assert!((m.profile_a.avg_scored - 1.0).abs() < 1e-9);
    assert_eq!(m.expected_score, Scoreline::new(0, 0));
    assert_eq!(m.winner, Winner::Draw);
    assert_eq!(m.samples, 3);
}

#[test]
fn four_matches_are_not_enough() {
    let engine = engine_with(&[
        ("Porto", "Milano", 2, 1, 0),
        ("Porto", "Milano", 1, 1, 1),
        ("Lyon", "Porto", 0, 3, 2),
        ("Milano", "Nice", 2, 2, 3),
    ]);
    match engine.predict_at("Porto", "Milano", now()).unwrap() {
        Prediction::InsufficientData {
            available,
            required,
            ..
        } => {
            assert_eq!(available, 4);
            assert_eq!(required, 5);
        }
        other => panic!("expected insufficient data, got {other:?}"),
    }
}

#[test]
fn label_swap_mirrors_the_prediction() {
    let engine = engine_with(&[
        ("Porto", "Milano", 3, 1, 0),
        ("Milano", "Lyon", 0, 2, 3),
        ("Lyon", "Porto", 1, 1, 5),
        ("Porto", "Nice", 4, 0, 9),
        ("Nice", "Milano", 1, 2, 15),
        ("Milano", "Porto", 2, 2, 40),
    ]);
    let ab = engine.predict_at("Porto", "Milano", now()).unwrap();
    let ba = engine.predict_at("Milano", "Porto", now()).unwrap();
    let (ab, ba) = (ab.as_match().unwrap(), ba.as_match().unwrap());

    assert_eq!(ab.expected_score, ba.expected_score.swapped());
    assert_eq!(ab.confidence, ba.confidence);
    assert_eq!(ab.repetitive_matchup, ba.repetitive_matchup);
    let mirrored: Vec<_> = ba.top_scores.iter().map(|s| s.score.swapped()).collect();
    let direct: Vec<_> = ab.top_scores.iter().map(|s| s.score).collect();
    assert_eq!(direct, mirrored);
}

#[test]
fn top_scores_are_a_distribution() {
    let engine = engine_with(&[
        ("A", "B", 1, 0, 0),
        ("B", "A", 2, 2, 1),
        ("A", "B", 0, 1, 2),
        ("A", "B", 3, 1, 3),
        ("B", "A", 0, 0, 4),
        ("A", "B", 2, 0, 5),
        ("A", "B", 1, 0, 6),
    ]);
    let p = engine.predict_at("A", "B", now()).unwrap();
    let m = p.as_match().unwrap();
    assert!(m.top_scores.len() <= 5);
    assert!(m.top_scores.iter().all(|s| s.probability >= 0.0));
    assert!(
        m.top_scores
            .windows(2)
            .all(|w| w[0].probability >= w[1].probability)
    );
    let sum: f64 = m.top_scores.iter().map(|s| s.probability).sum();
    assert!((sum - 1.0).abs() < 1e-9);
    assert_eq!(m.top_scores[0].score, Scoreline::new(1, 0));
    assert!(m.confidence >= 0.3 && m.confidence <= 0.9);
}

#[test]
fn strangers_get_synthetic_neighbourhood() {
    let engine = engine_with(&[
        ("Porto", "Lyon", 3, 0, 0),
        ("Porto", "Nice", 2, 1, 1),
        ("Milano", "Lyon", 0, 1, 2),
        ("Milano", "Nice", 1, 2, 3),
        ("Lyon", "Nice", 1, 1, 4),
        ("Porto", "Lyon", 1, 1, 5),
    ]);
    let p = engine.predict_at("Porto", "Milano", now()).unwrap();
    let m = p.as_match().unwrap();
    assert_eq!(m.source, DistributionSource::Synthetic);
    assert_eq!(m.top_scores[0].score, m.expected_score);
    assert!(
        m.top_scores[1..]
            .iter()
            .all(|s| s.probability < m.top_scores[0].probability)
    );
}

#[test]
fn unknown_opponent_still_predicts() {
    let engine = engine_with(&[
        ("Porto", "Lyon", 3, 0, 0),
        ("Porto", "Nice", 2, 1, 1),
        ("Porto", "Lyon", 1, 0, 2),
        ("Porto", "Nice", 2, 2, 3),
        ("Porto", "Lyon", 4, 1, 4),
    ]);
    let p = engine.predict_at("Porto", "Nowhere FC", now()).unwrap();
    let m = p.as_match().expect("unknown team falls back to zero profile");
    assert!(m.profile_b.is_unknown());
    assert_eq!(m.samples, 0);
    assert_eq!(m.confidence, 0.3);
}

#[test]
fn recent_rematches_are_flagged() {
    let mut engine = Engine::new(MemoryStore::new());
    let start = now() - Duration::days(60);
    for i in 0..25 {
        engine
            .record_match("A", "C", i % 3, 1, Some(start + Duration::days(i)))
            .unwrap();
    }
    for i in 0..20 {
        let t = Some(now() - Duration::hours(20 - i));
        if i % 5 == 0 {
            engine.record_match("A", "B", 2, 0, t).unwrap();
        } else {
            engine.record_match("D", "E", 1, 1, t).unwrap();
        }
    }

    let ab = engine.predict_at("A", "B", now()).unwrap();
    let ac = engine.predict_at("A", "C", now()).unwrap();
    assert_eq!(ab.status(), PredictionStatus::Ok);
    assert!(ab.repetitive_matchup());
    assert!(!ac.repetitive_matchup());
}

#[test]
fn predict_is_idempotent() {
    let engine = engine_with(&[
        ("A", "B", 1, 0, 0),
        ("B", "A", 2, 2, 10),
        ("A", "C", 0, 1, 20),
        ("C", "B", 3, 1, 30),
        ("A", "B", 2, 0, 40),
    ]);
    let first = engine.predict_at("A", "B", now()).unwrap();
    let second = engine.predict_at("A", "B", now()).unwrap();
    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn parsed_results_feed_the_engine_and_cache() {
    let dir = tempfile::tempdir().unwrap();
    let cache_path = dir.path().join("memory.json");
    let mut engine = Engine::new(MemoryStore::new()).with_profile_cache(&cache_path);

    let batch = parse_results(
        "Porto 2-1 Milano\nPorto 1-0 Milano\nbad line\nMilano 0-0 Porto\nLyon 2-2 Porto\nPorto 3-1 Lyon\n",
    );
    assert_eq!(batch.skipped.len(), 1);
    let recorded = engine.record_results(&batch.results).unwrap();
    assert_eq!(recorded.len(), 5);

    let p = engine.predict("Porto", "Milano").unwrap();
    assert_eq!(p.status(), PredictionStatus::Ok);

    let cache = load_profile_cache(&cache_path).expect("cache written after record");
    assert_eq!(cache.total_matches, 5);
    assert_eq!(cache.teams["Porto"].sample_size, 5);
    assert_eq!(engine.summary().unwrap().total_matches, 5);
}

#[test]
fn batch_with_blank_team_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let cache_path = dir.path().join("memory.json");
    let mut engine = Engine::new(MemoryStore::new()).with_profile_cache(&cache_path);

    let result = |a: &str, b: &str, ga, gb| ParsedResult {
        team_a: a.to_string(),
        team_b: b.to_string(),
        goals_a: ga,
        goals_b: gb,
    };
    let batch = [
        result("Porto", "Milano", 1, 0),
        result("", "Lyon", 2, 1),
        result("Nice", "Lyon", 0, 0),
    ];
    let err = engine.record_results(&batch).unwrap_err();
    assert!(matches!(
        err,
        StoreError::Validation(ValidationError::EmptyTeamName)
    ));
    assert!(engine.store().is_empty().unwrap());
    assert!(!cache_path.exists());
}

#[test]
fn undated_log_rows_weigh_half_in_profiles() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("matches.csv");
    std::fs::write(
        &path,
        "team_a,team_b,ga,gb,date\n\
         Porto,Milano,4,0,\n\
         Lyon,Porto,2,1,2026-06-01T12:00:00+00:00\n",
    )
    .unwrap();

    let engine = Engine::new(CsvStore::open(&path).unwrap());
    let profiles = engine.profiles_at(now()).unwrap();
    let porto = &profiles["Porto"];
    assert_eq!(porto.sample_size, 2);
    assert!((porto.avg_scored - 2.0).abs() < 1e-9, "got {}", porto.avg_scored);
    assert!((profiles["Milano"].avg_scored - 0.0).abs() < 1e-9);
}
