use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::error::Result;
use crate::match_store::{MatchRecord, MatchStore, append_validated};
use crate::predict::{EngineParams, Prediction, predict_from_history};
use crate::profile_cache::{ProfileCacheFile, save_profile_cache};
use crate::result_parse::ParsedResult;
use crate::summary::{HistorySummary, summarize};
use crate::team_profile::{TeamProfile, all_team_profiles};

/// Entry point for collaborators: records results and answers predictions.
///
/// Every prediction re-reads the full store; the only state carried between
/// calls is the store itself.
pub struct Engine<S> {
    store: S,
    params: EngineParams,
    profile_cache: Option<PathBuf>,
}

impl<S: MatchStore> Engine<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            params: EngineParams::default(),
            profile_cache: None,
        }
    }

    pub fn with_params(mut self, params: EngineParams) -> Self {
        self.params = params;
        self
    }

    /// Refresh a per-team JSON snapshot at `path` after each write.
    pub fn with_profile_cache(mut self, path: impl Into<PathBuf>) -> Self {
        self.profile_cache = Some(path.into());
        self
    }

    pub fn params(&self) -> &EngineParams {
        &self.params
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn record_match(
        &mut self,
        team_a: &str,
        team_b: &str,
        goals_a: i64,
        goals_b: i64,
        timestamp: Option<DateTime<Utc>>,
    ) -> Result<MatchRecord> {
        let record = self
            .store
            .append(team_a, team_b, goals_a, goals_b, timestamp)?;
        self.refresh_profile_cache();
        Ok(record)
    }

    /// Records already-parsed results, stamped now.
    ///
    /// The whole batch is validated before anything is written, so a bad row
    /// leaves the store untouched. A store error partway through keeps the rows
    /// written so far and still refreshes the profile cache.
    pub fn record_results(&mut self, results: &[ParsedResult]) -> Result<Vec<MatchRecord>> {
        let records = results
            .iter()
            .map(|r| {
                MatchRecord::new(
                    &r.team_a,
                    &r.team_b,
                    i64::from(r.goals_a),
                    i64::from(r.goals_b),
                    None,
                )
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut written = 0;
        let mut failure = None;
        for record in &records {
            if let Err(err) = append_validated(&mut self.store, record) {
                failure = Some(err);
                break;
            }
            written += 1;
        }
        if written > 0 {
            self.refresh_profile_cache();
        }
        if let Some(err) = failure {
            warn!(written, total = records.len(), "batch stopped by store error");
            return Err(err);
        }
        Ok(records)
    }

    pub fn predict(&self, team_a: &str, team_b: &str) -> Result<Prediction> {
        self.predict_at(team_a, team_b, Utc::now())
    }

    /// Same as [`Engine::predict`] with an explicit clock.
    pub fn predict_at(&self, team_a: &str, team_b: &str, now: DateTime<Utc>) -> Result<Prediction> {
        let history = self.store.all()?;
        Ok(predict_from_history(&history, team_a, team_b, now, &self.params))
    }

    pub fn summary(&self) -> Result<HistorySummary> {
        Ok(summarize(&self.store.all()?))
    }

    pub fn profiles_at(&self, now: DateTime<Utc>) -> Result<BTreeMap<String, TeamProfile>> {
        Ok(all_team_profiles(&self.store.all()?, now, &self.params.recency))
    }

    // Cache failures never fail the write that triggered them.
    fn refresh_profile_cache(&self) {
        let Some(path) = &self.profile_cache else {
            return;
        };
        let history = match self.store.all() {
            Ok(history) => history,
            Err(err) => {
                warn!(%err, "profile cache not refreshed");
                return;
            }
        };
        let cache = ProfileCacheFile::build(&history, Utc::now(), &self.params.recency);
        if let Err(err) = save_profile_cache(path, &cache) {
            warn!(path = %path.display(), "profile cache write failed: {err:#}");
        }
    }
}
