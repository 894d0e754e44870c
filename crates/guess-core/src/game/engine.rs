use std::sync::Arc;

use tracing::{debug, warn};

use super::session::Session;
use crate::belief::BeliefMetrics;
use crate::config::EngineConfig;
use crate::error::GameError;
use crate::model::{Answer, AnswerScale, KnowledgeBase};
use crate::policy::{Phase, Verdict};
use crate::select::{QuestionSelector, Selection};
use crate::shared::SharedKnowledge;
use crate::store::{KnowledgeStore, Suggestion, SuggestionSink};

/// First prompt of a new session.
#[derive(Debug, Clone, PartialEq)]
pub struct Opening {
    pub question: String,
    pub question_index: usize,
    pub ordinal: u32,
    pub scale: Vec<&'static str>,
}

/// What the engine says after an answer or a confirmation.
#[derive(Debug, Clone, PartialEq)]
pub enum Turn {
    Question {
        text: String,
        index: usize,
        ordinal: u32,
    },
    Guess {
        candidate: String,
        index: usize,
        confidence: f64,
        forced: bool,
    },
    /// The guess was right; the session is over. `persisted` is false when
    /// the knowledge store rejected the write (the in-memory update stands).
    Confirmed { candidate: String, persisted: bool },
    /// Too many wrong guesses; the player is asked for a new candidate and a
    /// question that distinguishes it.
    SuggestionRequired,
}

/// Acknowledgement of a contributed suggestion. The session is over either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuggestionAck {
    pub recorded: bool,
}

/// The guessing engine: configuration, the shared knowledge base and the
/// collaborators that persist it.
///
/// Holds no per-session state; every session operation receives the session
/// it acts on.
pub struct Engine {
    config: EngineConfig,
    knowledge: SharedKnowledge,
    store: Arc<dyn KnowledgeStore>,
    suggestions: Arc<dyn SuggestionSink>,
}

impl Engine {
    /// Loads the knowledge base from `store`.
    pub fn load(
        config: EngineConfig,
        store: Arc<dyn KnowledgeStore>,
        suggestions: Arc<dyn SuggestionSink>,
    ) -> Result<Self, GameError> {
        let knowledge = store.load().map_err(GameError::DataUnavailable)?;
        debug!(
            candidates = knowledge.candidate_count() as u64,
            questions = knowledge.question_count() as u64,
            "knowledge base loaded"
        );
        Ok(Self {
            config,
            knowledge: SharedKnowledge::new(knowledge),
            store,
            suggestions,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Latest committed knowledge base.
    pub fn knowledge(&self) -> Arc<KnowledgeBase> {
        self.knowledge.snapshot()
    }

    /// Starts a session on the latest committed knowledge and asks the first question.
    pub fn begin(&self) -> (Session, Opening) {
        let mut session = Session::new(self.knowledge.snapshot());
        // Validated knowledge bases have at least one question.
        let question = match self.selector(&session).select(&session.belief, &session.asked) {
            Selection::Ask { question, .. } => question,
            Selection::Exhausted => 0,
        };
        session.mark_asked(question);
        let opening = Opening {
            question: question_text(&session, question),
            question_index: question,
            ordinal: session.ordinal,
            scale: AnswerScale.labels(),
        };
        (session, opening)
    }

    /// Records the answer to the pending question and decides what comes next.
    pub fn submit_answer(&self, session: &mut Session, index: usize) -> Result<Turn, GameError> {
        let question = match session.phase {
            Phase::Asking { question } => question,
            Phase::Guessing { .. } => return Err(GameError::AwaitingConfirmation),
            Phase::SuggestionRequired => return Err(GameError::AwaitingSuggestion),
            Phase::Confirmed { .. } | Phase::Closed => return Err(GameError::SessionFinished),
        };
        let answer = Answer::from_index(index).ok_or(GameError::InvalidAnswerIndex {
            index,
            scale_size: AnswerScale::SIZE,
        })?;

        session.history.push((question, answer));
        session.belief = session.belief.updated(
            &self.config.likelihood,
            session.knowledge.row(question),
            answer.value(),
        );

        let metrics = BeliefMetrics::from_belief(&session.belief);
        debug!(
            session = %session.id,
            question = question as u64,
            answer = answer.index() as u64,
            entropy = metrics.entropy_bits,
            margin = metrics.margin,
            best = metrics.best.map(|c| c as u64),
            "belief updated"
        );

        let verdict = self.config.policy.after_answer(
            &session.belief,
            &self.selector(session),
            &session.asked,
        );
        Ok(self.apply_verdict(session, verdict))
    }

    /// Settles the pending guess.
    ///
    /// A correct guess teaches the shared knowledge base and ends the session.
    /// A wrong one excludes the candidate and continues, or escalates.
    pub fn confirm(&self, session: &mut Session, correct: bool) -> Result<Turn, GameError> {
        let candidate = match session.phase {
            Phase::Guessing { candidate } => candidate,
            Phase::Confirmed { .. } | Phase::Closed => return Err(GameError::SessionFinished),
            _ => return Err(GameError::NoGuessPending),
        };

        if correct {
            let persisted = self.learn(session, candidate);
            session.phase = Phase::Confirmed { candidate };
            return Ok(Turn::Confirmed {
                candidate: candidate_name(session, candidate),
                persisted,
            });
        }

        session.belief = session.belief.excluding(candidate);
        session.failures += 1;
        let verdict = self.config.policy.after_rejection(
            &session.belief,
            session.failures,
            &self.selector(session),
            &session.asked,
        );
        Ok(self.apply_verdict(session, verdict))
    }

    /// Records the player's new candidate and distinguishing question, then
    /// closes the session. Recording is best effort.
    pub fn contribute_suggestion(
        &self,
        session: &mut Session,
        candidate: &str,
        question: &str,
    ) -> Result<SuggestionAck, GameError> {
        match session.phase {
            Phase::SuggestionRequired => {}
            Phase::Confirmed { .. } | Phase::Closed => return Err(GameError::SessionFinished),
            _ => return Err(GameError::SuggestionNotRequested),
        }

        let suggestion = Suggestion {
            session: session.id.to_string(),
            candidate: candidate.trim().to_string(),
            question: question.trim().to_string(),
        };
        let recorded = match self.suggestions.record(&suggestion) {
            Ok(()) => true,
            Err(err) => {
                warn!(session = %session.id, error = %err, "failed to record suggestion");
                false
            }
        };
        session.phase = Phase::Closed;
        Ok(SuggestionAck { recorded })
    }

    fn learn(&self, session: &Session, candidate: usize) -> bool {
        self.knowledge.update(|knowledge| {
            self.config
                .learning
                .apply(knowledge, candidate, &session.history);
            match self.store.persist(knowledge) {
                Ok(()) => true,
                Err(err) => {
                    warn!(
                        session = %session.id,
                        candidate = candidate as u64,
                        error = %err,
                        "failed to persist knowledge base; keeping in-memory update"
                    );
                    false
                }
            }
        })
    }

    fn apply_verdict(&self, session: &mut Session, verdict: Verdict) -> Turn {
        match verdict {
            Verdict::Ask { question } => {
                session.mark_asked(question);
                Turn::Question {
                    text: question_text(session, question),
                    index: question,
                    ordinal: session.ordinal,
                }
            }
            Verdict::Guess {
                candidate,
                confidence,
                forced,
            } => {
                session.phase = Phase::Guessing { candidate };
                Turn::Guess {
                    candidate: candidate_name(session, candidate),
                    index: candidate,
                    confidence,
                    forced,
                }
            }
            Verdict::Escalate => {
                session.phase = Phase::SuggestionRequired;
                Turn::SuggestionRequired
            }
        }
    }

    fn selector<'a>(&self, session: &'a Session) -> QuestionSelector<'a> {
        QuestionSelector::new(&session.knowledge, self.config.likelihood)
    }
}

fn question_text(session: &Session, question: usize) -> String {
    session
        .knowledge
        .question(question)
        .map(|q| q.text.to_string())
        .unwrap_or_default()
}

fn candidate_name(session: &Session, candidate: usize) -> String {
    session
        .knowledge
        .candidate(candidate)
        .map(|c| c.name.to_string())
        .unwrap_or_default()
}
