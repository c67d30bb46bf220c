use serde::{Deserialize, Serialize};

use crate::match_store::MatchRecord;

/// Unweighted reductions over the whole log, for dashboards and exporters.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct HistorySummary {
    pub total_matches: usize,
    /// Mean total goals per match.
    pub mean_goals: f64,
    /// Population variance of total goals per match.
    pub goals_variance: f64,
    pub mean_goals_a: f64,
    pub mean_goals_b: f64,
    pub draw_rate: f64,
}

pub fn summarize(history: &[MatchRecord]) -> HistorySummary {
    if history.is_empty() {
        return HistorySummary::default();
    }

    let n = history.len() as f64;
    let mut total = 0.0;
    let mut side_a = 0.0;
    let mut side_b = 0.0;
    let mut draws = 0usize;
    for m in history {
        total += (m.goals_a + m.goals_b) as f64;
        side_a += m.goals_a as f64;
        side_b += m.goals_b as f64;
        if m.goals_a == m.goals_b {
            draws += 1;
        }
    }
    let mean_goals = total / n;
    let goals_variance = history
        .iter()
        .map(|m| ((m.goals_a + m.goals_b) as f64 - mean_goals).powi(2))
        .sum::<f64>()
        / n;

    HistorySummary {
        total_matches: history.len(),
        mean_goals,
        goals_variance,
        mean_goals_a: side_a / n,
        mean_goals_b: side_b / n,
        draw_rate: draws as f64 / n,
    }
}
