//! Collaborators that load, persist and archive knowledge outside the engine.

mod file;
mod memory;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::model::KnowledgeBase;

pub use file::{JsonFileStore, JsonlSuggestionLog};
pub use memory::{MemoryStore, MemorySuggestions};

/// Durable home of the knowledge base.
pub trait KnowledgeStore: Send + Sync {
    fn load(&self) -> Result<KnowledgeBase, StoreError>;

    /// Synchronous, no retry. Failures are reported, never rolled back.
    fn persist(&self, knowledge: &KnowledgeBase) -> Result<(), StoreError>;
}

/// Best-effort archive of player-contributed candidates.
pub trait SuggestionSink: Send + Sync {
    fn record(&self, suggestion: &Suggestion) -> Result<(), StoreError>;
}

/// A new candidate and a question that tells it apart, supplied by the player
/// after the engine gave up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub session: String,
    pub candidate: String,
    pub question: String,
}
