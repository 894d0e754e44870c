//! Greedy one-step-lookahead question selection.
//!
//! For every unasked question the selector simulates each answer on the scale,
//! weighs the entropy of the resulting posterior by the probability of that
//! answer, and picks the question with the lowest expected entropy.

use tracing::debug;

use crate::belief::{BeliefState, LikelihoodModel, entropy_bits};
use crate::model::{Answer, KnowledgeBase};

/// Outcome of a selection round.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Selection {
    Ask {
        question: usize,
        expected_entropy: f64,
    },
    /// Every question has been asked.
    Exhausted,
}

#[derive(Debug, Clone, Copy)]
pub struct QuestionSelector<'a> {
    knowledge: &'a KnowledgeBase,
    model: LikelihoodModel,
}

impl<'a> QuestionSelector<'a> {
    pub fn new(knowledge: &'a KnowledgeBase, model: LikelihoodModel) -> Self {
        Self { knowledge, model }
    }

    /// Expected posterior entropy (bits) after asking `question`.
    pub fn expected_entropy(&self, belief: &BeliefState, question: usize) -> f64 {
        let row = self.knowledge.row(question);
        Answer::ALL
            .iter()
            .map(|answer| {
                let weighted = belief.weighted(&self.model, row, answer.value());
                let mass: f64 = weighted.iter().sum();
                if mass == 0.0 {
                    return 0.0;
                }
                let posterior = belief.posterior_from_weighted(&self.model, weighted, mass);
                mass * entropy_bits(posterior.probabilities())
            })
            .sum()
    }

    /// Picks the unasked question with the lowest expected entropy.
    ///
    /// `asked[q]` marks questions already put to the player. Ties go to the
    /// lowest question index.
    pub fn select(&self, belief: &BeliefState, asked: &[bool]) -> Selection {
        let mut best: Option<(usize, f64)> = None;
        for question in 0..self.knowledge.question_count() {
            if asked.get(question).copied().unwrap_or(false) {
                continue;
            }
            let score = self.expected_entropy(belief, question);
            match best {
                Some((_, current)) if score >= current => {}
                _ => best = Some((question, score)),
            }
        }

        match best {
            Some((question, expected_entropy)) => {
                debug!(question, expected_entropy, "selected question");
                Selection::Ask {
                    question,
                    expected_entropy,
                }
            }
            None => Selection::Exhausted,
        }
    }
}
