use thiserror::Error;

use crate::date::DateKey;

/// Caller contract violations detected at the engine boundary.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("invalid date key `{0}`, expected YYYY-MM-DD")]
    InvalidDateKey(String),

    #[error("habit `{id}` ends on {end} before it starts on {start}")]
    InvertedValidity {
        id: String,
        start: DateKey,
        end: DateKey,
    },

    #[error("year {0} is outside the supported range 1..=9999")]
    YearOutOfRange(i32),

    #[error("range {from}..={to} is empty")]
    InvalidRange { from: DateKey, to: DateKey },

    #[error("unknown granularity `{0}`, expected day, week, month or year")]
    UnknownGranularity(String),

    #[error("invalid life span: {0}")]
    InvalidLifeSpan(String),
}

pub type Result<T, E = CoreError> = std::result::Result<T, E>;
