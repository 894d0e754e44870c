use std::path::PathBuf;

use thiserror::Error;

use crate::game::SessionId;
use crate::model::KnowledgeError;

/// Failures of the storage collaborators.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{context} {path:?}: {source}")]
    Io {
        context: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode or decode knowledge JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("knowledge base is malformed: {0}")]
    Invalid(#[from] KnowledgeError),
    #[error("{0}")]
    Unavailable(String),
}

/// Errors reported to the caller of a session operation.
///
/// Apart from `DataUnavailable`, these are validation failures: the session
/// is left exactly as it was before the call.
#[derive(Debug, Error)]
pub enum GameError {
    #[error("knowledge base unavailable: {0}")]
    DataUnavailable(#[source] StoreError),
    #[error("answer index {index} is outside the scale (0..{scale_size})")]
    InvalidAnswerIndex { index: usize, scale_size: usize },
    #[error("unknown session {0}")]
    UnknownSession(SessionId),
    #[error("no guess is pending confirmation")]
    NoGuessPending,
    #[error("a guess is pending confirmation")]
    AwaitingConfirmation,
    #[error("the session is waiting for a suggestion")]
    AwaitingSuggestion,
    #[error("no suggestion was requested")]
    SuggestionNotRequested,
    #[error("the session has already finished")]
    SessionFinished,
}
