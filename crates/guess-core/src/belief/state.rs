//! Per-session probability distribution over candidates.

use super::LikelihoodModel;

/// Probability of each candidate being the one the player has in mind.
///
/// Values are immutable: every update returns a fresh state, so a session is
/// the only owner of its belief. Candidates rejected during the session are
/// excluded; they keep probability zero and never receive smoothing mass.
#[derive(Debug, Clone, PartialEq)]
pub struct BeliefState {
    probs: Vec<f64>,
    excluded: Vec<bool>,
}

impl BeliefState {
    /// Builds a belief from a (not necessarily normalised) prior.
    pub fn from_prior(prior: &[f64]) -> Self {
        let mut state = Self {
            probs: prior.iter().map(|p| p.max(0.0)).collect(),
            excluded: vec![false; prior.len()],
        };
        let total: f64 = state.probs.iter().sum();
        if total > 0.0 && total.is_finite() {
            state.probs.iter_mut().for_each(|p| *p /= total);
        } else if !state.probs.is_empty() {
            let uniform = 1.0 / state.probs.len() as f64;
            state.probs.iter_mut().for_each(|p| *p = uniform);
        }
        state
    }

    pub fn len(&self) -> usize {
        self.probs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.probs.is_empty()
    }

    pub fn probabilities(&self) -> &[f64] {
        &self.probs
    }

    pub fn probability(&self, candidate: usize) -> f64 {
        self.probs[candidate]
    }

    pub fn is_excluded(&self, candidate: usize) -> bool {
        self.excluded[candidate]
    }

    pub fn admissible_count(&self) -> usize {
        self.excluded.iter().filter(|excluded| !**excluded).count()
    }

    /// Likelihood-weighted probabilities for answer `value` against `row`
    /// (the expected answers of each candidate for one question).
    pub fn weighted(&self, model: &LikelihoodModel, row: &[f64], value: f64) -> Vec<f64> {
        self.probs
            .iter()
            .zip(row)
            .map(|(&p, &expected)| model.likelihood(value, expected) * p)
            .collect()
    }

    /// Posterior after observing `value` for a question whose expectations are `row`.
    pub fn updated(&self, model: &LikelihoodModel, row: &[f64], value: f64) -> Self {
        let weighted = self.weighted(model, row, value);
        let mass: f64 = weighted.iter().sum();
        self.posterior_from_weighted(model, weighted, mass)
    }

    /// Normalises `weighted` by `mass` and applies uniform smoothing over
    /// admissible candidates. A zero mass divides by one; the smoothing step
    /// then restores a valid distribution.
    pub(crate) fn posterior_from_weighted(
        &self,
        model: &LikelihoodModel,
        mut weighted: Vec<f64>,
        mass: f64,
    ) -> Self {
        let divisor = if mass == 0.0 { 1.0 } else { mass };
        for (p, excluded) in weighted.iter_mut().zip(&self.excluded) {
            *p = if *excluded {
                0.0
            } else {
                *p / divisor + model.smoothing
            };
        }
        let mut next = Self {
            probs: weighted,
            excluded: self.excluded.clone(),
        };
        next.renormalize();
        next
    }

    /// Removes `candidate` from consideration for the rest of the session.
    pub fn excluding(&self, candidate: usize) -> Self {
        let mut next = self.clone();
        if candidate < next.probs.len() {
            next.probs[candidate] = 0.0;
            next.excluded[candidate] = true;
            next.renormalize();
        }
        next
    }

    /// Most probable admissible candidate, lowest index on ties.
    pub fn best(&self) -> Option<(usize, f64)> {
        self.ranked().next()
    }

    /// Best and runner-up admissible candidates.
    pub fn top_two(&self) -> (Option<(usize, f64)>, Option<(usize, f64)>) {
        let mut ranked = self.ranked();
        (ranked.next(), ranked.next())
    }

    /// Shannon entropy of the distribution in bits.
    pub fn entropy(&self) -> f64 {
        entropy_bits(&self.probs)
    }

    fn ranked(&self) -> impl Iterator<Item = (usize, f64)> {
        let mut order: Vec<(usize, f64)> = self
            .probs
            .iter()
            .copied()
            .enumerate()
            .filter(|(index, _)| !self.excluded[*index])
            .collect();
        order.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        order.into_iter()
    }

    fn renormalize(&mut self) {
        let total: f64 = self.probs.iter().sum();
        if total == 0.0 {
            return;
        }
        self.probs.iter_mut().for_each(|p| *p /= total);
    }
}

/// `-Σ p log2 p`, skipping zero terms.
pub fn entropy_bits(probs: &[f64]) -> f64 {
    probs
        .iter()
        .filter(|p| **p > 0.0)
        .map(|p| -p * p.log2())
        .sum()
}
