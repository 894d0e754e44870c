//! Online refinement of the knowledge base after a confirmed guess.

use tracing::{Level, event};

use crate::belief::parse_env_f64;
use crate::model::{Answer, KnowledgeBase};

const DEFAULT_LEARNING_RATE: f64 = 0.1;

/// Exponential moving average pulling each answered cell of the winning
/// candidate toward the answer the player gave.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LearningUpdater {
    pub rate: f64,
}

impl Default for LearningUpdater {
    fn default() -> Self {
        Self {
            rate: DEFAULT_LEARNING_RATE,
        }
    }
}

/// Cells changed by one learning pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LearningReport {
    pub candidate: usize,
    pub cells: Vec<CellUpdate>,
    pub appearances: u64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellUpdate {
    pub question: usize,
    pub before: f64,
    pub after: f64,
}

impl LearningUpdater {
    pub fn new(rate: f64) -> Self {
        Self {
            rate: rate.clamp(0.0, 1.0),
        }
    }

    pub fn from_env() -> Self {
        Self::new(parse_env_f64("GUESS_LEARNING_RATE", DEFAULT_LEARNING_RATE))
    }

    /// Applies `D[q][winner] += rate * (answer - D[q][winner])` for every
    /// answered question and bumps the winner's appearance counter.
    ///
    /// Questions missing from `history` are left untouched.
    pub fn apply(
        &self,
        knowledge: &mut KnowledgeBase,
        winner: usize,
        history: &[(usize, Answer)],
    ) -> LearningReport {
        let mut cells = Vec::with_capacity(history.len());
        for &(question, answer) in history {
            if question >= knowledge.question_count() {
                continue;
            }
            let before = knowledge.expected(question, winner);
            knowledge.set_expected(
                question,
                winner,
                before + self.rate * (answer.value() - before),
            );
            cells.push(CellUpdate {
                question,
                before,
                after: knowledge.expected(question, winner),
            });
        }
        knowledge.record_appearance(winner);
        let appearances = knowledge.appearances()[winner];

        event!(
            target: "guess_core::learning",
            Level::INFO,
            candidate = winner as u64,
            cells = cells.len() as u64,
            appearances
        );

        LearningReport {
            candidate: winner,
            cells,
            appearances,
        }
    }
}
