//! Knowledge shared by every session of an engine.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::model::KnowledgeBase;

/// Copy-on-write holder of the committed knowledge base.
///
/// Readers clone an `Arc` of the latest committed value and never wait on a
/// writer's persistence call. Writers are serialised: each `update` works on
/// a private copy of the latest commit and publishes it when done, so two
/// concurrent learning passes cannot lose each other's changes.
#[derive(Debug)]
pub struct SharedKnowledge {
    committed: RwLock<Arc<KnowledgeBase>>,
    writer: Mutex<()>,
}

impl SharedKnowledge {
    pub fn new(knowledge: KnowledgeBase) -> Self {
        Self {
            committed: RwLock::new(Arc::new(knowledge)),
            writer: Mutex::new(()),
        }
    }

    pub fn snapshot(&self) -> Arc<KnowledgeBase> {
        Arc::clone(&self.committed.read())
    }

    /// Runs `mutate` on a copy of the latest commit, then publishes the copy.
    ///
    /// The whole read-modify-publish sequence, including anything `mutate`
    /// does with the copy (persistence), happens under the writer lock. The
    /// copy is published regardless of what `mutate` returns.
    pub fn update<R>(&self, mutate: impl FnOnce(&mut KnowledgeBase) -> R) -> R {
        let _writer = self.writer.lock();
        let mut next = KnowledgeBase::clone(&self.committed.read());
        let result = mutate(&mut next);
        *self.committed.write() = Arc::new(next);
        result
    }
}
