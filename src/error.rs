use thiserror::Error;

/// Errors surfaced at the engine boundary.
///
/// Interior numeric paths never fail: malformed or boundary numeric input is
/// absorbed with guards and clamps, and empty histories or first-time players
/// are ordinary zero-valued cases.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The event referenced a content category outside the fixed enumeration.
    #[error("unknown content category: {0}")]
    UnknownContentCategory(String),
    /// A required event field is missing or out of its admissible range.
    #[error("invalid event shape: {0}")]
    InvalidEventShape(String),
    /// The external store reported a failure; never swallowed.
    #[error("repository unavailable: {0}")]
    RepositoryUnavailable(String),
}

pub type EngineResult<T> = Result<T, EngineError>;

/// Failure reported by an external store implementation.
#[derive(Debug, Error)]
#[error("store unavailable: {reason}")]
pub struct StoreError {
    reason: String,
}

impl StoreError {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        EngineError::RepositoryUnavailable(err.reason)
    }
}
