use chrono::NaiveDate;
use reqwest::StatusCode;
use thiserror::Error;

/// A query that cannot be sent: some field is missing or internally
/// inconsistent. Raised before any network call, never retried.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    #[error("latitude {0} is outside [-90, 90]")]
    LatitudeOutOfRange(f64),

    #[error("longitude {0} is outside [-180, 180]")]
    LongitudeOutOfRange(f64),

    #[error("start date {start} is after end date {end}")]
    StartAfterEnd { start: NaiveDate, end: NaiveDate },

    #[error("no daily metrics requested")]
    NoMetrics,

    #[error("unknown daily metric '{0}'")]
    UnknownMetric(String),

    #[error("unknown temperature unit '{0}' (expected 'celsius' or 'fahrenheit')")]
    UnknownUnit(String),

    #[error("'{0}' is not a usable IANA timezone identifier")]
    InvalidTimezone(String),

    #[error("missing query parameter '{0}'")]
    MissingParam(&'static str),

    #[error("invalid value '{value}' for query parameter '{param}'")]
    InvalidParam { param: &'static str, value: String },
}

/// The provider answered with a success status but the body does not
/// have the promised shape. Always a defect signal.
#[derive(Debug, Error)]
pub enum ShapeError {
    #[error("response body is not valid JSON")]
    Json(#[from] serde_json::Error),

    #[error("response has no 'daily' block")]
    MissingDailyBlock,

    #[error("daily block is missing the '{0}' array")]
    MissingArray(&'static str),

    #[error("daily block reports zero days")]
    Empty,

    #[error("array '{name}' has {actual} entries, expected {expected}")]
    LengthMismatch {
        name: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("date at index {index} is '{actual}', expected '{expected}'")]
    DateOutOfSequence {
        index: usize,
        expected: NaiveDate,
        actual: String,
    },

    #[error("unparseable time '{value}' in '{name}' at index {index}")]
    BadTimeValue {
        name: &'static str,
        index: usize,
        value: String,
    },
}

/// Everything that can go wrong in one `fetch` call, by kind.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("invalid archive query: {0}")]
    InvalidQuery(#[from] QueryError),

    #[error("request to the archive API could not complete")]
    Transport(#[from] reqwest::Error),

    #[error("archive API returned {status}: {message}")]
    Provider {
        status: StatusCode,
        message: String,
        retryable: bool,
    },

    #[error("archive response failed validation: {0}")]
    MalformedResponse(#[from] ShapeError),
}

impl ArchiveError {
    /// Whether the caller may reasonably retry the same query.
    /// Transport problems and transient provider statuses are
    /// retryable; bad queries and malformed bodies never are.
    pub fn is_retryable(&self) -> bool {
        match self {
            ArchiveError::Transport(_) => true,
            ArchiveError::Provider { retryable, .. } => *retryable,
            ArchiveError::InvalidQuery(_) | ArchiveError::MalformedResponse(_) => false,
        }
    }
}
