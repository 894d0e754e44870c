use super::BeliefState;

/// Coarse summary of a belief, attached to log events.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeliefMetrics {
    pub entropy_bits: f64,
    pub best: Option<usize>,
    pub best_probability: f64,
    pub margin: f64,
    pub admissible: usize,
}

impl BeliefMetrics {
    pub fn from_belief(belief: &BeliefState) -> Self {
        let (best, runner_up) = belief.top_two();
        let best_probability = best.map(|(_, p)| p).unwrap_or(0.0);
        let runner_up_probability = runner_up.map(|(_, p)| p).unwrap_or(0.0);
        Self {
            entropy_bits: belief.entropy(),
            best: best.map(|(candidate, _)| candidate),
            best_probability,
            margin: best_probability - runner_up_probability,
            admissible: belief.admissible_count(),
        }
    }
}
