use crate::belief::LikelihoodModel;
use crate::learning::LearningUpdater;
use crate::policy::DecisionPolicy;

/// Tunables of the inference and learning engine.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EngineConfig {
    pub likelihood: LikelihoodModel,
    pub policy: DecisionPolicy,
    pub learning: LearningUpdater,
}

impl EngineConfig {
    /// Defaults overridden by `GUESS_*` environment variables.
    pub fn from_env() -> Self {
        Self {
            likelihood: LikelihoodModel::from_env(),
            policy: DecisionPolicy::from_env(),
            learning: LearningUpdater::from_env(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::ConfidenceRule;

    #[test]
    fn defaults_match_documented_constants() {
        let config = EngineConfig::default();
        assert_eq!(config.likelihood.floor, 0.05);
        assert_eq!(config.likelihood.smoothing, 1e-6);
        assert_eq!(config.policy.rule, ConfidenceRule::Margin { margin: 0.3 });
        assert_eq!(config.policy.max_failures, 3);
        assert_eq!(config.learning.rate, 0.1);
    }
}
