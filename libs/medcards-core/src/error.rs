//! Error types for medcards-core.

use thiserror::Error;

/// Result type alias using EngineError.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors raised by the selection and scoring engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("answer {selected} is not an option of case {case_id}")]
    InvalidAnswer { case_id: String, selected: String },

    #[error("hint level {level} does not exist for case {case_id}")]
    InvalidHint { case_id: String, level: u8 },

    #[error("invalid case {case_id}: {reason}")]
    InvalidCase { case_id: String, reason: String },

    #[error("invalid chat message: {0}")]
    InvalidMessage(String),

    #[error("progress for user {user_id} changed concurrently after {attempts} attempts")]
    ConcurrentUpdateConflict { user_id: String, attempts: u32 },

    #[error("feedback adapter timed out after {millis}ms")]
    AdapterTimeout { millis: u64 },

    #[error("feedback adapter error: {0}")]
    AdapterError(String),
}

impl EngineError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }
}
