pub mod config;
pub mod engine;
pub mod error;
pub mod match_store;
pub mod predict;
pub mod profile_cache;
pub mod recency;
pub mod result_parse;
pub mod summary;
pub mod team_profile;

pub use engine::Engine;
pub use error::{StoreError, ValidationError};
pub use match_store::{CsvStore, MatchRecord, MatchStore, MemoryStore, SqliteStore};
pub use predict::{EngineParams, MatchPrediction, Prediction, PredictionStatus, Scoreline};
