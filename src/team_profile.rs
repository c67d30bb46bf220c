use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::match_store::MatchRecord;
use crate::recency::{RecencyParams, recency_weight};

/// Recency-weighted scoring and conceding rates for one team.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TeamProfile {
    pub avg_scored: f64,
    pub avg_conceded: f64,
    /// Unweighted count of matches touching the team.
    pub sample_size: usize,
}

impl TeamProfile {
    /// No history: both averages are zero.
    pub fn is_unknown(&self) -> bool {
        self.sample_size == 0
    }
}

pub fn team_profile(
    history: &[MatchRecord],
    team: &str,
    now: DateTime<Utc>,
    recency: &RecencyParams,
) -> TeamProfile {
    let mut scored = 0.0;
    let mut conceded = 0.0;
    let mut weight_sum = 0.0;
    let mut sample_size = 0usize;

    for m in history {
        let Some((goals_for, goals_against)) = m.goals_for(team) else {
            continue;
        };
        let w = recency_weight(m.timestamp, now, recency);
        scored += goals_for as f64 * w;
        conceded += goals_against as f64 * w;
        weight_sum += w;
        sample_size += 1;
    }

    if weight_sum <= 0.0 {
        return TeamProfile {
            sample_size,
            ..TeamProfile::default()
        };
    }

    TeamProfile {
        avg_scored: scored / weight_sum,
        avg_conceded: conceded / weight_sum,
        sample_size,
    }
}

/// Profiles for every team name appearing in `history`.
pub fn all_team_profiles(
    history: &[MatchRecord],
    now: DateTime<Utc>,
    recency: &RecencyParams,
) -> BTreeMap<String, TeamProfile> {
    let mut out = BTreeMap::new();
    for m in history {
        for team in [&m.team_a, &m.team_b] {
            if !out.contains_key(team) {
                out.insert(team.clone(), team_profile(history, team, now, recency));
            }
        }
    }
    out
}
