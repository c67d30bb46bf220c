use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::match_store::MatchRecord;
use crate::recency::RecencyParams;
use crate::team_profile::{TeamProfile, all_team_profiles};

const CACHE_VERSION: u32 = 1;

/// Derived per-team snapshot for inspection. The match log stays authoritative;
/// predictions never read this file.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProfileCacheFile {
    pub version: u32,
    pub generated_at: Option<DateTime<Utc>>,
    pub total_matches: usize,
    pub teams: BTreeMap<String, TeamProfile>,
}

impl ProfileCacheFile {
    pub fn build(history: &[MatchRecord], now: DateTime<Utc>, recency: &RecencyParams) -> Self {
        Self {
            version: CACHE_VERSION,
            generated_at: Some(now),
            total_matches: history.len(),
            teams: all_team_profiles(history, now, recency),
        }
    }
}

pub fn save_profile_cache(path: &Path, cache: &ProfileCacheFile) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("create profile cache dir {}", parent.display()))?;
    }
    let tmp = path.with_extension("json.tmp");
    let json = serde_json::to_string_pretty(cache).context("serialize profile cache")?;
    fs::write(&tmp, json).context("write profile cache")?;
    fs::rename(&tmp, path).context("swap profile cache")?;
    Ok(())
}

/// `None` when the file is missing, unreadable or from another cache version.
pub fn load_profile_cache(path: &Path) -> Option<ProfileCacheFile> {
    let raw = fs::read_to_string(path).ok()?;
    let cache = serde_json::from_str::<ProfileCacheFile>(&raw).ok()?;
    if cache.version != CACHE_VERSION {
        return None;
    }
    Some(cache)
}
