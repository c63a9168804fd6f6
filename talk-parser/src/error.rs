//! Fatal parser errors
//!
//! Anything in here aborts the parse of the whole document. Per-item anomalies (skipped
//! indentation, unconnected replies, odd timestamps) are not errors: they are recorded as
//! [`ItemWarning`](crate::item::ItemWarning)s on the affected item and scanning continues.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParserError {
    #[error("unknown date format code `{code}` in `{format}`")]
    UnknownFormatCode { code: String, format: String },

    #[error("unknown timezone `{0}`")]
    UnknownTimezone(String),

    #[error("locale data is incomplete: {0}")]
    InvalidLocale(String),

    #[error("invalid timestamp pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("container element not found: {0}")]
    MissingContainer(String),

    #[error("range boundary cannot be resolved: {0}")]
    UnresolvableBoundary(String),

    #[error("HTML serialization failed: {0}")]
    Serialization(String),

    #[error("invalid thread item record: {0}")]
    InvalidRecord(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type ParserResult<T> = Result<T, ParserError>;
