use guess_core::model::{Answer, AnswerScale, KnowledgeBase};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Plays the human side of a game while thinking of `hidden`.
///
/// Answers follow the ground-truth knowledge base, snapped to the nearest
/// scale entry; with probability `noise` the answer slips one step.
pub struct SimulatedPlayer<'a> {
    truth: &'a KnowledgeBase,
    hidden: usize,
    noise: f64,
    rng: StdRng,
}

impl<'a> SimulatedPlayer<'a> {
    pub fn new(truth: &'a KnowledgeBase, hidden: usize, noise: f64, seed: u64) -> Self {
        Self {
            truth,
            hidden,
            noise: noise.clamp(0.0, 1.0),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn hidden(&self) -> usize {
        self.hidden
    }

    pub fn hidden_name(&self) -> &'a str {
        self.truth
            .candidate(self.hidden)
            .map(|c| c.name)
            .unwrap_or_default()
    }

    /// Scale index of the answer to `question`.
    pub fn answer(&mut self, question: usize) -> usize {
        let honest = Answer::nearest(self.truth.expected(question, self.hidden)).index();
        if self.noise <= 0.0 || !self.rng.gen_bool(self.noise) {
            return honest;
        }
        let last = AnswerScale::SIZE - 1;
        let towards_no = match honest {
            0 => true,
            i if i == last => false,
            _ => self.rng.gen_bool(0.5),
        };
        if towards_no { honest + 1 } else { honest - 1 }
    }

    pub fn confirms(&self, candidate: usize) -> bool {
        candidate == self.hidden
    }

    /// Distinguishing question offered when the engine gives up.
    pub fn suggested_question(&self) -> String {
        format!("Est-ce que c'est {} ?", self.hidden_name())
    }
}
