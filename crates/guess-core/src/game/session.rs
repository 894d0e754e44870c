use core::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::belief::BeliefState;
use crate::model::{Answer, KnowledgeBase};
use crate::policy::Phase;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn random() -> Self {
        SessionId(Uuid::new_v4())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(SessionId)
    }
}

/// Everything one game owns: its view of the knowledge base, its belief, the
/// questions asked so far and where it stands in the decision state machine.
///
/// A session is never shared; all mutation goes through the engine with a
/// `&mut Session`.
#[derive(Debug, Clone)]
pub struct Session {
    pub(crate) id: SessionId,
    pub(crate) knowledge: Arc<KnowledgeBase>,
    pub(crate) belief: BeliefState,
    pub(crate) asked: Vec<bool>,
    pub(crate) history: Vec<(usize, Answer)>,
    pub(crate) failures: u32,
    pub(crate) phase: Phase,
    pub(crate) ordinal: u32,
}

impl Session {
    pub(crate) fn new(knowledge: Arc<KnowledgeBase>) -> Self {
        let belief = BeliefState::from_prior(&knowledge.prior());
        let asked = vec![false; knowledge.question_count()];
        Self {
            id: SessionId::random(),
            knowledge,
            belief,
            asked,
            history: Vec::new(),
            failures: 0,
            phase: Phase::Closed,
            ordinal: 0,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn knowledge(&self) -> &KnowledgeBase {
        &self.knowledge
    }

    pub fn belief(&self) -> &BeliefState {
        &self.belief
    }

    /// Questions already put to the player; never shrinks.
    pub fn asked(&self) -> &[bool] {
        &self.asked
    }

    /// `(question, answer)` pairs in the order they were given.
    pub fn history(&self) -> &[(usize, Answer)] {
        &self.history
    }

    /// Guesses rejected so far in this session.
    pub fn failures(&self) -> u32 {
        self.failures
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Number of questions asked so far, including the one pending.
    pub fn ordinal(&self) -> u32 {
        self.ordinal
    }

    pub fn pending_guess(&self) -> Option<usize> {
        match self.phase {
            Phase::Guessing { candidate } => Some(candidate),
            _ => None,
        }
    }

    pub(crate) fn mark_asked(&mut self, question: usize) {
        self.asked[question] = true;
        self.ordinal += 1;
        self.phase = Phase::Asking { question };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_ids_parse_back() {
        let id = SessionId::random();
        let parsed: SessionId = id.to_string().parse().expect("uuid");
        assert_eq!(parsed, id);
        assert!("not-a-session".parse::<SessionId>().is_err());
    }
}
