use crate::config::ProviderKind;
use crate::models::DataCategory;
use thiserror::Error;

/// A candidate source could not deliver a raw document.
#[derive(Debug, Clone, Error)]
pub enum RetrievalError {
    #[error("{source_id} returned HTTP {status}")]
    Status { source_id: String, status: u16 },

    #[error("{source_id} request failed: {message}")]
    Transport { source_id: String, message: String },

    #[error("{source_id} timed out after {timeout_ms}ms")]
    Timeout { source_id: String, timeout_ms: u64 },

    #[error("{source_id} returned an empty body")]
    EmptyBody { source_id: String },

    #[error("{source_id} returned an unusable body: {reason}")]
    UnexpectedBody { source_id: String, reason: String },

    #[error("{source_id} skipped: circuit breaker open")]
    CircuitOpen { source_id: String },

    #[error("all {attempts} candidates failed for {category}: {last_error}")]
    Exhausted {
        category: DataCategory,
        attempts: usize,
        last_error: String,
    },
}

impl RetrievalError {
    pub fn transport(source_id: &str, err: impl std::fmt::Display) -> Self {
        RetrievalError::Transport {
            source_id: source_id.to_string(),
            message: err.to_string(),
        }
    }
}

/// A standings row that contradicts itself
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error("league position must be at least 1")]
    PositionOutOfRange,

    #[error("played {played} != won {won} + drawn {drawn} + lost {lost}")]
    RecordMismatch {
        played: u32,
        won: u32,
        drawn: u32,
        lost: u32,
    },

    #[error("goal difference {goal_difference} != {goals_for} - {goals_against}")]
    GoalDifferenceMismatch {
        goals_for: u32,
        goals_against: u32,
        goal_difference: i32,
    },
}

/// A raw document could not be turned into normalized records.
#[derive(Debug, Clone, Error)]
pub enum ExtractionError {
    #[error("{provider} document is missing {what}")]
    MissingStructure { provider: ProviderKind, what: String },

    #[error("no extractor registered for {0}")]
    NoExtractor(ProviderKind),

    #[error("{provider} extractor expected a {expected} body")]
    WrongBody {
        provider: ProviderKind,
        expected: &'static str,
    },

    #[error("invalid extraction pattern: {0}")]
    Pattern(String),

    #[error("no usable {0} records")]
    Empty(DataCategory),

    #[error("suspect standings: {0}")]
    Suspect(#[from] InvariantViolation),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("cache TTLs must satisfy squad >= standings >= fixtures (got {squad}s, {standings}s, {fixtures}s)")]
    TtlOrder {
        squad: u64,
        standings: u64,
        fixtures: u64,
    },

    #[error("no retrieval candidates configured")]
    NoCandidates,

    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

/// Anything that sends a category to the fallback path
#[derive(Debug, Clone, Error)]
pub enum DataError {
    #[error(transparent)]
    Retrieval(#[from] RetrievalError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),
}
