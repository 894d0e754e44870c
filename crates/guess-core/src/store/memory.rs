use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::Mutex;

use super::{KnowledgeStore, Suggestion, SuggestionSink};
use crate::error::StoreError;
use crate::model::KnowledgeBase;

/// In-process store, used by the self-play harness and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    knowledge: Mutex<Option<KnowledgeBase>>,
    persisted: AtomicUsize,
    fail_persist: AtomicBool,
}

impl MemoryStore {
    pub fn new(knowledge: KnowledgeBase) -> Self {
        Self {
            knowledge: Mutex::new(Some(knowledge)),
            ..Self::default()
        }
    }

    /// Store with nothing to load.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Makes every subsequent `persist` fail.
    pub fn fail_persist(&self, fail: bool) {
        self.fail_persist.store(fail, Ordering::SeqCst);
    }

    pub fn persist_count(&self) -> usize {
        self.persisted.load(Ordering::SeqCst)
    }

    pub fn current(&self) -> Option<KnowledgeBase> {
        self.knowledge.lock().clone()
    }
}

impl KnowledgeStore for MemoryStore {
    fn load(&self) -> Result<KnowledgeBase, StoreError> {
        self.knowledge
            .lock()
            .clone()
            .ok_or_else(|| StoreError::Unavailable("no knowledge base stored".into()))
    }

    fn persist(&self, knowledge: &KnowledgeBase) -> Result<(), StoreError> {
        if self.fail_persist.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("persistence disabled".into()));
        }
        *self.knowledge.lock() = Some(knowledge.clone());
        self.persisted.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemorySuggestions {
    records: Mutex<Vec<Suggestion>>,
    fail: AtomicBool,
}

impl MemorySuggestions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_record(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> Vec<Suggestion> {
        self.records.lock().clone()
    }
}

impl SuggestionSink for MemorySuggestions {
    fn record(&self, suggestion: &Suggestion) -> Result<(), StoreError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("suggestion archive offline".into()));
        }
        self.records.lock().push(suggestion.clone());
        Ok(())
    }
}
