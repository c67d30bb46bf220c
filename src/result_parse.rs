//! Free-text result lines such as `Porto 2-1 Milano`.
//!
//! This sits in front of the store: only lines that parse cleanly are turned
//! into [`ParsedResult`]s, everything else is reported back as skipped.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

static RESULT_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(.+?)\s+(\d+)\s*-\s*(\d+)\s+(.+?)\s*$").expect("result line regex")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedResult {
    pub team_a: String,
    pub team_b: String,
    pub goals_a: u32,
    pub goals_b: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("expected `Team A 3-2 Team B`, got {0:?}")]
    Format(String),
    #[error("goal count out of range in {0:?}")]
    GoalsOutOfRange(String),
    #[error("blank team name in {0:?}")]
    EmptyTeam(String),
}

#[derive(Debug, Clone, Default)]
pub struct ParsedBatch {
    pub results: Vec<ParsedResult>,
    pub skipped: Vec<(String, ParseError)>,
}

pub fn parse_result_line(line: &str) -> Result<ParsedResult, ParseError> {
    let caps = RESULT_LINE
        .captures(line)
        .ok_or_else(|| ParseError::Format(line.to_string()))?;
    let goals = |idx: usize| {
        caps[idx]
            .parse::<u32>()
            .map_err(|_| ParseError::GoalsOutOfRange(line.to_string()))
    };
    let (team_a, team_b) = (caps[1].trim(), caps[4].trim());
    if team_a.is_empty() || team_b.is_empty() {
        return Err(ParseError::EmptyTeam(line.to_string()));
    }
    Ok(ParsedResult {
        team_a: team_a.to_string(),
        team_b: team_b.to_string(),
        goals_a: goals(2)?,
        goals_b: goals(3)?,
    })
}

/// Parses one result per line; blank lines are ignored.
pub fn parse_results(text: &str) -> ParsedBatch {
    let mut batch = ParsedBatch::default();
    for line in text.lines() {
        if line.trim().is_empty() {
            continue;
        }
        match parse_result_line(line) {
            Ok(result) => batch.results.push(result),
            Err(err) => batch.skipped.push((line.to_string(), err)),
        }
    }
    batch
}
