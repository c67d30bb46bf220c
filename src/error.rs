use std::path::PathBuf;

use thiserror::Error;

/// Rejected match input. Nothing that fails here is ever written to a store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("team name must not be empty")]
    EmptyTeamName,
    #[error("invalid goal count {goals} for {team}")]
    InvalidGoals { team: String, goals: i64 },
    #[error("malformed {field}: {value:?}")]
    Malformed { field: &'static str, value: String },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("io error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
