use std::path::PathBuf;

use habit_core::{CoreError, DateKey};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DataError {
    #[error("i/o error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed json in {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("record in `{table}` has no `{key}` field")]
    MissingPrimaryKey { table: String, key: String },

    #[error("invalid backup: {}", .0.join("; "))]
    InvalidBackup(Vec<String>),

    #[error("{0} can no longer be edited")]
    ReadOnlyDate(DateKey),

    #[error("unknown habit `{0}`")]
    UnknownHabit(String),

    #[error("table `{table}` rejected the operation: {message}")]
    Backend { table: String, message: String },

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl DataError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T, E = DataError> = std::result::Result<T, E>;
