use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use super::engine::{Engine, Opening, SuggestionAck, Turn};
use super::session::{Session, SessionId};
use crate::error::GameError;

/// Live sessions of one engine, addressed by id.
///
/// Each session sits behind its own lock so concurrent games never contend
/// with each other; the map lock is only held to look a session up. Sessions
/// are dropped once they reach a terminal state.
pub struct SessionRegistry {
    engine: Arc<Engine>,
    sessions: Mutex<HashMap<SessionId, Arc<Mutex<Session>>>>,
}

impl SessionRegistry {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self {
            engine,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn begin(&self) -> (SessionId, Opening) {
        let (session, opening) = self.engine.begin();
        let id = session.id();
        self.sessions.lock().insert(id, Arc::new(Mutex::new(session)));
        (id, opening)
    }

    pub fn submit_answer(&self, id: SessionId, index: usize) -> Result<Turn, GameError> {
        self.with_session(id, |engine, session| engine.submit_answer(session, index))
    }

    pub fn confirm(&self, id: SessionId, correct: bool) -> Result<Turn, GameError> {
        self.with_session(id, |engine, session| engine.confirm(session, correct))
    }

    pub fn contribute_suggestion(
        &self,
        id: SessionId,
        candidate: &str,
        question: &str,
    ) -> Result<SuggestionAck, GameError> {
        self.with_session(id, |engine, session| {
            engine.contribute_suggestion(session, candidate, question)
        })
    }

    /// Drops a session without touching shared knowledge.
    pub fn abandon(&self, id: SessionId) -> bool {
        self.sessions.lock().remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn with_session<R>(
        &self,
        id: SessionId,
        op: impl FnOnce(&Engine, &mut Session) -> Result<R, GameError>,
    ) -> Result<R, GameError> {
        let entry = self
            .sessions
            .lock()
            .get(&id)
            .cloned()
            .ok_or(GameError::UnknownSession(id))?;

        let mut session = entry.lock();
        let result = op(&self.engine, &mut session);
        if session.phase().is_terminal() {
            self.sessions.lock().remove(&id);
        }
        result
    }
}
