use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::match_store::MatchRecord;
use crate::recency::{RecencyParams, recency_weight};
use crate::team_profile::{TeamProfile, team_profile};

const CONFIDENCE_BASE: f64 = 0.40;
const CONFIDENCE_PER_SAMPLE: f64 = 0.05;
const CONFIDENCE_SAMPLE_CAP: usize = 10;
const CONFIDENCE_MISMATCH_SCALE: f64 = 0.10;
const CONFIDENCE_MIN: f64 = 0.30;
const CONFIDENCE_MAX: f64 = 0.90;

// Weights for the synthetic neighbourhood: expected, +1 A, +1 B, -1 A, -1 B.
const FALLBACK_CURVE: [f64; 5] = [1.0, 0.6, 0.6, 0.4, 0.4];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngineParams {
    pub recency: RecencyParams,
    /// Matches touching either team required before a prediction is made.
    pub min_samples: usize,
    /// Tail of the log inspected by the repetition detector.
    pub recent_window: usize,
    /// Pairing count in the window above which the matchup is flagged.
    pub repeat_threshold: usize,
    pub top_n: usize,
}

impl Default for EngineParams {
    fn default() -> Self {
        Self {
            recency: RecencyParams::default(),
            min_samples: 5,
            recent_window: 20,
            repeat_threshold: 2,
            top_n: 5,
        }
    }
}

/// Final score oriented as (requested team A, requested team B).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Scoreline {
    pub goals_a: u32,
    pub goals_b: u32,
}

impl Scoreline {
    pub fn new(goals_a: u32, goals_b: u32) -> Self {
        Self { goals_a, goals_b }
    }

    pub fn swapped(self) -> Self {
        Self::new(self.goals_b, self.goals_a)
    }

    /// Scoreline of `m` seen from `team_a`'s side.
    fn of_record(m: &MatchRecord, team_a: &str) -> Self {
        let score = Self::new(m.goals_a, m.goals_b);
        if m.team_a == team_a { score } else { score.swapped() }
    }
}

impl fmt::Display for Scoreline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.goals_a, self.goals_b)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreProbability {
    pub score: Scoreline,
    pub probability: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Winner {
    TeamA,
    TeamB,
    Draw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistributionSource {
    /// Built from previous meetings of the two teams.
    HeadToHead,
    /// Neighbourhood around the expected score; the teams never met.
    Synthetic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchPrediction {
    pub team_a: String,
    pub team_b: String,
    pub expected_score: Scoreline,
    pub winner: Winner,
    pub top_scores: Vec<ScoreProbability>,
    pub source: DistributionSource,
    pub confidence: f64,
    /// Smaller of the two teams' sample sizes.
    pub samples: usize,
    pub repetitive_matchup: bool,
    pub profile_a: TeamProfile,
    pub profile_b: TeamProfile,
}

impl MatchPrediction {
    pub fn winner_name(&self) -> Option<&str> {
        match self.winner {
            Winner::TeamA => Some(&self.team_a),
            Winner::TeamB => Some(&self.team_b),
            Winner::Draw => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionStatus {
    Ok,
    InsufficientData,
}

/// Outcome of a prediction request. Score fields only exist on `Ok`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Prediction {
    Ok(MatchPrediction),
    InsufficientData {
        /// Log entries touching either team.
        available: usize,
        required: usize,
        repetitive_matchup: bool,
    },
}

impl Prediction {
    pub fn status(&self) -> PredictionStatus {
        match self {
            Prediction::Ok(_) => PredictionStatus::Ok,
            Prediction::InsufficientData { .. } => PredictionStatus::InsufficientData,
        }
    }

    pub fn as_match(&self) -> Option<&MatchPrediction> {
        match self {
            Prediction::Ok(p) => Some(p),
            Prediction::InsufficientData { .. } => None,
        }
    }

    pub fn repetitive_matchup(&self) -> bool {
        match self {
            Prediction::Ok(p) => p.repetitive_matchup,
            Prediction::InsufficientData {
                repetitive_matchup, ..
            } => *repetitive_matchup,
        }
    }
}

/// Pure prediction over a history snapshot. Nothing is cached between calls.
pub fn predict_from_history(
    history: &[MatchRecord],
    team_a: &str,
    team_b: &str,
    now: DateTime<Utc>,
    params: &EngineParams,
) -> Prediction {
    let repetitive_matchup = is_repetitive_matchup(history, team_a, team_b, params);

    let available = history
        .iter()
        .filter(|m| m.involves(team_a) || m.involves(team_b))
        .count();
    if available < params.min_samples {
        debug!(team_a, team_b, available, "not enough history to predict");
        return Prediction::InsufficientData {
            available,
            required: params.min_samples,
            repetitive_matchup,
        };
    }

    let profile_a = team_profile(history, team_a, now, &params.recency);
    let profile_b = team_profile(history, team_b, now, &params.recency);
    let expected_score = expected_score(&profile_a, &profile_b);

    let head_to_head = head_to_head_buckets(history, team_a, team_b, now, &params.recency);
    let (buckets, source) = if head_to_head.is_empty() {
        (synthetic_buckets(expected_score), DistributionSource::Synthetic)
    } else {
        (head_to_head, DistributionSource::HeadToHead)
    };
    let top_scores = rank_scores(buckets, params.top_n);
    let confidence = confidence(&profile_a, &profile_b);

    debug!(
        team_a,
        team_b,
        expected = %expected_score,
        confidence,
        ?source,
        "prediction computed"
    );

    Prediction::Ok(MatchPrediction {
        team_a: team_a.to_string(),
        team_b: team_b.to_string(),
        expected_score,
        winner: winner(expected_score),
        top_scores,
        source,
        confidence,
        samples: profile_a.sample_size.min(profile_b.sample_size),
        repetitive_matchup,
        profile_a,
        profile_b,
    })
}

/// Averages "A usually scores" with "B usually concedes", floored at 0.
/// Exact halves round to the even goal count, so 0.5 becomes 0 and 2.5 becomes 2.
pub fn expected_score(a: &TeamProfile, b: &TeamProfile) -> Scoreline {
    Scoreline::new(
        expected_goals(a.avg_scored, b.avg_conceded),
        expected_goals(b.avg_scored, a.avg_conceded),
    )
}

fn expected_goals(scored: f64, conceded: f64) -> u32 {
    ((scored + conceded) / 2.0).max(0.0).round_ties_even() as u32
}

pub fn winner(score: Scoreline) -> Winner {
    match score.goals_a.cmp(&score.goals_b) {
        std::cmp::Ordering::Greater => Winner::TeamA,
        std::cmp::Ordering::Less => Winner::TeamB,
        std::cmp::Ordering::Equal => Winner::Draw,
    }
}

/// Heuristic reliability in [0.30, 0.90], rounded to two decimals. Symmetric in `a`/`b`.
pub fn confidence(a: &TeamProfile, b: &TeamProfile) -> f64 {
    let n = a.sample_size.min(b.sample_size).min(CONFIDENCE_SAMPLE_CAP);
    let mismatch =
        (a.avg_scored - b.avg_scored).abs() + (a.avg_conceded - b.avg_conceded).abs();
    let raw = CONFIDENCE_BASE + CONFIDENCE_PER_SAMPLE * n as f64
        - CONFIDENCE_MISMATCH_SCALE * mismatch;
    let c = clamp(raw, CONFIDENCE_MIN, CONFIDENCE_MAX);
    (c * 100.0).round() / 100.0
}

/// Number of `{team_a, team_b}` meetings among the last `recent_window` records.
pub fn recent_pairing_count(
    history: &[MatchRecord],
    team_a: &str,
    team_b: &str,
    recent_window: usize,
) -> usize {
    let start = history.len().saturating_sub(recent_window);
    history[start..]
        .iter()
        .filter(|m| m.is_pairing(team_a, team_b))
        .count()
}

/// Advisory only; never feeds back into the numbers.
pub fn is_repetitive_matchup(
    history: &[MatchRecord],
    team_a: &str,
    team_b: &str,
    params: &EngineParams,
) -> bool {
    recent_pairing_count(history, team_a, team_b, params.recent_window) > params.repeat_threshold
}

// Accumulated recency weight per scoreline, in first-seen order.
fn head_to_head_buckets(
    history: &[MatchRecord],
    team_a: &str,
    team_b: &str,
    now: DateTime<Utc>,
    recency: &RecencyParams,
) -> Vec<(Scoreline, f64)> {
    let mut buckets: Vec<(Scoreline, f64)> = Vec::new();
    let mut index: HashMap<Scoreline, usize> = HashMap::new();

    for m in history.iter().filter(|m| m.is_pairing(team_a, team_b)) {
        let score = Scoreline::of_record(m, team_a);
        let w = recency_weight(m.timestamp, now, recency);
        match index.get(&score) {
            Some(&i) => buckets[i].1 += w,
            None => {
                index.insert(score, buckets.len());
                buckets.push((score, w));
            }
        }
    }
    buckets
}

fn synthetic_buckets(expected: Scoreline) -> Vec<(Scoreline, f64)> {
    let Scoreline { goals_a: a, goals_b: b } = expected;
    let candidates = [
        expected,
        Scoreline::new(a + 1, b),
        Scoreline::new(a, b + 1),
        Scoreline::new(a.saturating_sub(1), b),
        Scoreline::new(a, b.saturating_sub(1)),
    ];

    let mut out: Vec<(Scoreline, f64)> = Vec::with_capacity(candidates.len());
    for (score, weight) in candidates.into_iter().zip(FALLBACK_CURVE) {
        // Decrements floored at zero can collapse onto an earlier candidate.
        if out.iter().any(|(s, _)| *s == score) {
            continue;
        }
        out.push((score, weight));
    }
    out
}

// Stable sort keeps discovery order for equal weights; kept entries sum to 1.
fn rank_scores(mut buckets: Vec<(Scoreline, f64)>, top_n: usize) -> Vec<ScoreProbability> {
    buckets.sort_by(|x, y| y.1.total_cmp(&x.1));
    buckets.truncate(top_n);

    let total: f64 = buckets.iter().map(|(_, w)| w).sum();
    buckets
        .into_iter()
        .map(|(score, w)| ScoreProbability {
            score,
            probability: if total > 0.0 { w / total } else { 0.0 },
        })
        .collect()
}

fn clamp(v: f64, lo: f64, hi: f64) -> f64 {
    v.max(lo).min(hi)
}
