//! Likelihood of a fuzzy answer given a candidate's learned expectation.

use std::env;

const DEFAULT_FLOOR: f64 = 0.05;
const DEFAULT_SMOOTHING: f64 = 1e-6;

/// Tunable parameters of the answer likelihood.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LikelihoodModel {
    /// Lower bound on any likelihood so one contradictory answer cannot
    /// eliminate a candidate. `0.0` reproduces the unfloored `1 - |r - d|` model.
    pub floor: f64,
    /// Mass added to every admissible candidate after each update.
    pub smoothing: f64,
}

impl Default for LikelihoodModel {
    fn default() -> Self {
        Self {
            floor: DEFAULT_FLOOR,
            smoothing: DEFAULT_SMOOTHING,
        }
    }
}

impl LikelihoodModel {
    pub fn from_env() -> Self {
        let base = Self::default();
        let floor = parse_env_f64("GUESS_LIKELIHOOD_FLOOR", base.floor).clamp(0.0, 0.5);
        let smoothing = parse_env_f64("GUESS_SMOOTHING", base.smoothing).clamp(1e-12, 1e-3);
        Self { floor, smoothing }
    }

    /// `max(1 - |answer - expected|, floor)`.
    #[inline]
    pub fn likelihood(&self, answer: f64, expected: f64) -> f64 {
        (1.0 - (answer - expected).abs()).max(self.floor)
    }
}

pub(crate) fn parse_env_f64(key: &str, fallback: f64) -> f64 {
    env::var(key)
        .ok()
        .and_then(|value| value.parse::<f64>().ok())
        .filter(|value| value.is_finite())
        .unwrap_or(fallback)
}

#[cfg(test)]
mod tests {
    use super::LikelihoodModel;

    #[test]
    fn floor_bounds_extreme_mismatch() {
        let model = LikelihoodModel::default();
        assert_eq!(model.likelihood(1.0, 0.0), 0.05);
        assert!((model.likelihood(1.0, 0.9) - 0.9).abs() < 1e-12);
    }

    #[test]
    fn zero_floor_allows_hard_zero() {
        let model = LikelihoodModel {
            floor: 0.0,
            ..LikelihoodModel::default()
        };
        assert_eq!(model.likelihood(0.0, 1.0), 0.0);
    }
}
