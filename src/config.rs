use std::path::{Path, PathBuf};

use crate::predict::EngineParams;

const DEFAULT_DATA_PATH: &str = "data/matches.csv";
const DEFAULT_PROFILE_CACHE: &str = "data/memory.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Csv,
    Sqlite,
}

impl Backend {
    /// `.sqlite`, `.sqlite3` and `.db` files use SQLite, anything else CSV.
    pub fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if matches!(ext.to_ascii_lowercase().as_str(), "sqlite" | "sqlite3" | "db") => {
                Backend::Sqlite
            }
            _ => Backend::Csv,
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "csv" => Some(Backend::Csv),
            "sqlite" | "sqlite3" | "db" => Some(Backend::Sqlite),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub data_path: PathBuf,
    pub backend: Backend,
    /// `None` disables the per-team cache file.
    pub profile_cache: Option<PathBuf>,
    pub params: EngineParams,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from(DEFAULT_DATA_PATH),
            backend: Backend::Csv,
            profile_cache: Some(PathBuf::from(DEFAULT_PROFILE_CACHE)),
            params: EngineParams::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Unset or unparsable values fall back to the defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Config::default();

        if let Some(path) = lookup("SCORELINE_DATA").filter(|v| !v.trim().is_empty()) {
            cfg.data_path = PathBuf::from(path.trim());
        }
        cfg.backend = lookup("SCORELINE_BACKEND")
            .and_then(|v| Backend::parse(&v))
            .unwrap_or_else(|| Backend::for_path(&cfg.data_path));

        if let Some(raw) = lookup("SCORELINE_PROFILE_CACHE") {
            let trimmed = raw.trim();
            cfg.profile_cache = (!trimmed.is_empty()).then(|| PathBuf::from(trimmed));
        }

        let params = &mut cfg.params;
        if let Some(k) = parse_var::<f64>(&lookup, "SCORELINE_DECAY_DAYS").filter(|k| *k > 0.0) {
            params.recency.decay_days = k;
        }
        if let Some(w) =
            parse_var::<f64>(&lookup, "SCORELINE_FALLBACK_WEIGHT").filter(|w| *w > 0.0 && *w <= 1.0)
        {
            params.recency.fallback_weight = w;
        }
        if let Some(n) = parse_var(&lookup, "SCORELINE_MIN_SAMPLES") {
            params.min_samples = n;
        }
        if let Some(n) = parse_var(&lookup, "SCORELINE_RECENT_WINDOW") {
            params.recent_window = n;
        }
        if let Some(n) = parse_var(&lookup, "SCORELINE_REPEAT_THRESHOLD") {
            params.repeat_threshold = n;
        }
        cfg
    }

    /// Points the config at another log, re-deriving the backend from its extension.
    pub fn with_data_path(mut self, path: PathBuf) -> Self {
        self.backend = Backend::for_path(&path);
        self.data_path = path;
        self
    }
}

fn parse_var<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|v| v.trim().parse::<T>().ok())
}
