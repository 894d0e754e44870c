use guess_core::EngineConfig;
use guess_core::belief::LikelihoodModel;
use guess_core::learning::LearningUpdater;
use guess_core::policy::{ConfidenceRule, DecisionPolicy};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::Level;

const DEFAULT_ANSWER_NOISE: f64 = 0.0;
const RUN_ID_ALLOWED: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789._-";

/// Root benchmark configuration loaded from YAML.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct BenchmarkConfig {
    pub run_id: String,
    /// JSON knowledge file the simulated games are played against.
    pub knowledge: PathBuf,
    pub games: GamesConfig,
    pub profiles: Vec<ProfileConfig>,
    pub outputs: OutputsConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl BenchmarkConfig {
    /// Load configuration from a YAML file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let path_buf = path.to_path_buf();
        let file = File::open(path).map_err(|source| ConfigError::Read {
            source,
            path: path_buf.clone(),
        })?;
        let reader = BufReader::new(file);
        let mut cfg: BenchmarkConfig =
            serde_yaml::from_reader(reader).map_err(|source| ConfigError::Parse {
                source,
                path: path_buf.clone(),
            })?;
        cfg.validate().map_err(|source| ConfigError::Invalid {
            path: path_buf.clone(),
            source,
        })?;
        if cfg.knowledge.is_relative() {
            if let Some(dir) = path.parent() {
                cfg.knowledge = dir.join(&cfg.knowledge);
            }
        }
        Ok(cfg)
    }

    /// Validate the configuration without performing I/O.
    pub fn validate(&mut self) -> Result<(), ValidationError> {
        validate_run_id(&self.run_id)?;
        if self.knowledge.as_os_str().is_empty() {
            return Err(ValidationError::InvalidField {
                field: "knowledge".to_string(),
                message: "knowledge path must not be empty".to_string(),
            });
        }
        self.games.validate()?;
        self.outputs.validate(&self.run_id)?;
        self.logging.normalize();
        validate_profiles(&self.profiles)?;
        self.metrics.validate(&self.profiles)?;
        Ok(())
    }

    /// Resolve output templates (e.g., `{run_id}` placeholders) into concrete paths.
    pub fn resolved_outputs(&self) -> ResolvedOutputs {
        ResolvedOutputs {
            jsonl: resolve_template(&self.run_id, &self.outputs.jsonl),
            summary_md: resolve_template(&self.run_id, &self.outputs.summary_md),
            plots_dir: resolve_template(&self.run_id, &self.outputs.plots_dir),
        }
    }
}

/// How many games to simulate and how the simulated player behaves.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct GamesConfig {
    pub seed: Option<u64>,
    pub count: usize,
    /// Probability that the simulated player shifts an answer one step along the scale.
    #[serde(default = "default_answer_noise")]
    pub answer_noise: f64,
    /// Whether confirmed wins update each profile's private knowledge copy.
    #[serde(default)]
    pub learning: bool,
}

impl GamesConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.count == 0 {
            return Err(ValidationError::InvalidField {
                field: "games.count".to_string(),
                message: "number of games must be greater than zero".to_string(),
            });
        }

        if !(0.0..=1.0).contains(&self.answer_noise) {
            return Err(ValidationError::InvalidField {
                field: "games.answer_noise".to_string(),
                message: "answer noise must lie in [0, 1]".to_string(),
            });
        }

        Ok(())
    }
}

fn default_answer_noise() -> f64 {
    DEFAULT_ANSWER_NOISE
}

/// One engine configuration under test.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ProfileConfig {
    pub name: String,
    #[serde(default)]
    pub params: ProfileParams,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceKind {
    #[default]
    Margin,
    Absolute,
}

/// Engine overrides; anything unset keeps the engine default.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct ProfileParams {
    #[serde(default)]
    pub confidence: ConfidenceKind,
    pub margin: Option<f64>,
    pub threshold: Option<f64>,
    pub floor: Option<f64>,
    pub learning_rate: Option<f64>,
    pub max_failures: Option<u32>,
}

impl ProfileParams {
    fn validate(&self, profile: &str) -> Result<(), ValidationError> {
        let unit_fields = [
            ("margin", self.margin),
            ("threshold", self.threshold),
            ("learning_rate", self.learning_rate),
        ];
        for (label, value) in unit_fields {
            if let Some(value) = value {
                if !(0.0..=1.0).contains(&value) {
                    return Err(ValidationError::InvalidField {
                        field: format!("profiles[{profile}].params.{label}"),
                        message: "value must lie in [0, 1]".to_string(),
                    });
                }
            }
        }

        if let Some(floor) = self.floor {
            if !(0.0..=0.5).contains(&floor) {
                return Err(ValidationError::InvalidField {
                    field: format!("profiles[{profile}].params.floor"),
                    message: "likelihood floor must lie in [0, 0.5]".to_string(),
                });
            }
        }

        if self.max_failures == Some(0) {
            return Err(ValidationError::InvalidField {
                field: format!("profiles[{profile}].params.max_failures"),
                message: "at least one guess must be allowed".to_string(),
            });
        }

        if self.confidence == ConfidenceKind::Absolute && self.threshold.is_none() {
            return Err(ValidationError::InvalidField {
                field: format!("profiles[{profile}].params.threshold"),
                message: "absolute confidence requires a threshold".to_string(),
            });
        }

        Ok(())
    }

    pub fn engine_config(&self) -> EngineConfig {
        let base = EngineConfig::default();
        let rule = match self.confidence {
            ConfidenceKind::Margin => match self.margin {
                Some(margin) => ConfidenceRule::Margin { margin },
                None => base.policy.rule,
            },
            ConfidenceKind::Absolute => ConfidenceRule::Absolute {
                threshold: self.threshold.unwrap_or(1.0),
            },
        };
        EngineConfig {
            likelihood: LikelihoodModel {
                floor: self.floor.unwrap_or(base.likelihood.floor),
                ..base.likelihood
            },
            policy: DecisionPolicy {
                rule,
                max_failures: self.max_failures.unwrap_or(base.policy.max_failures),
            },
            learning: self
                .learning_rate
                .map(LearningUpdater::new)
                .unwrap_or(base.learning),
        }
    }
}

/// Output artifact configuration.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct OutputsConfig {
    pub jsonl: String,
    pub summary_md: String,
    pub plots_dir: String,
}

impl OutputsConfig {
    fn validate(&self, run_id: &str) -> Result<(), ValidationError> {
        for (label, value) in [
            ("outputs.jsonl", &self.jsonl),
            ("outputs.summary_md", &self.summary_md),
            ("outputs.plots_dir", &self.plots_dir),
        ] {
            if value.trim().is_empty() {
                return Err(ValidationError::InvalidField {
                    field: label.to_string(),
                    message: "path must not be empty".to_string(),
                });
            }

            let resolved = resolve_template(run_id, value);
            if resolved.components().count() == 0 {
                return Err(ValidationError::InvalidField {
                    field: label.to_string(),
                    message: "resolved path is invalid".to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Metrics configuration block.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct MetricsConfig {
    #[serde(default)]
    pub baseline: Option<String>,
}

impl MetricsConfig {
    fn validate(&mut self, profiles: &[ProfileConfig]) -> Result<(), ValidationError> {
        let Some(baseline) = self.baseline.as_ref() else {
            // A single profile is its own baseline.
            if let [only] = profiles {
                self.baseline = Some(only.name.clone());
                return Ok(());
            }
            return Err(ValidationError::InvalidField {
                field: "metrics.baseline".to_string(),
                message: "baseline profile must be specified".to_string(),
            });
        };

        if !profiles.iter().any(|p| &p.name == baseline) {
            return Err(ValidationError::InvalidField {
                field: "metrics.baseline".to_string(),
                message: format!("baseline profile '{baseline}' is not defined in profiles list"),
            });
        }

        Ok(())
    }
}

/// Logging configuration defaults to disabled structured logs.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LoggingConfig {
    #[serde(default)]
    pub enable_structured: bool,
    #[serde(default = "default_tracing_level")]
    pub tracing_level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enable_structured: false,
            tracing_level: default_tracing_level(),
        }
    }
}

impl LoggingConfig {
    fn normalize(&mut self) {
        if self.tracing_level.trim().is_empty() {
            self.tracing_level = default_tracing_level();
        }
    }

    pub fn level(&self) -> Option<Level> {
        match self.tracing_level.to_ascii_lowercase().as_str() {
            "trace" => Some(Level::TRACE),
            "debug" => Some(Level::DEBUG),
            "info" => Some(Level::INFO),
            "warn" | "warning" => Some(Level::WARN),
            "error" => Some(Level::ERROR),
            _ => None,
        }
    }
}

fn default_tracing_level() -> String {
    "info".to_string()
}

fn validate_run_id(run_id: &str) -> Result<(), ValidationError> {
    if run_id.trim().is_empty() {
        return Err(ValidationError::InvalidField {
            field: "run_id".to_string(),
            message: "run_id must not be empty".to_string(),
        });
    }

    if !run_id.chars().all(|c| RUN_ID_ALLOWED.contains(c)) {
        return Err(ValidationError::InvalidField {
            field: "run_id".to_string(),
            message: "run_id may only contain alphanumeric characters, '.', '_' or '-'".to_string(),
        });
    }

    Ok(())
}

fn validate_profiles(profiles: &[ProfileConfig]) -> Result<(), ValidationError> {
    if profiles.is_empty() {
        return Err(ValidationError::InvalidField {
            field: "profiles".to_string(),
            message: "at least one profile must be specified".to_string(),
        });
    }

    let mut seen = HashSet::new();
    for profile in profiles {
        if profile.name.trim().is_empty() {
            return Err(ValidationError::InvalidField {
                field: "profiles.name".to_string(),
                message: "profile name must not be empty".to_string(),
            });
        }

        if !profile.name.chars().all(|c| RUN_ID_ALLOWED.contains(c)) {
            return Err(ValidationError::InvalidField {
                field: format!("profiles[{}].name", profile.name),
                message: "profile name contains invalid characters".to_string(),
            });
        }

        if !seen.insert(profile.name.clone()) {
            return Err(ValidationError::InvalidField {
                field: "profiles".to_string(),
                message: format!("profile name '{}' defined more than once", profile.name),
            });
        }

        profile.params.validate(&profile.name)?;
    }

    Ok(())
}

fn resolve_template(run_id: &str, template: &str) -> PathBuf {
    let replaced = template.replace("{run_id}", run_id);
    PathBuf::from(replaced)
}

/// Fully resolved output paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOutputs {
    pub jsonl: PathBuf,
    pub summary_md: PathBuf,
    pub plots_dir: PathBuf,
}

/// Errors surfaced when loading configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
    #[error("failed to parse config {path:?}: {source}")]
    Parse {
        #[source]
        source: serde_yaml::Error,
        path: PathBuf,
    },
    #[error("invalid configuration in {path:?}: {source}")]
    Invalid {
        path: PathBuf,
        source: ValidationError,
    },
}

impl ConfigError {
    pub fn path(&self) -> &Path {
        match self {
            ConfigError::Read { path, .. }
            | ConfigError::Parse { path, .. }
            | ConfigError::Invalid { path, .. } => path.as_path(),
        }
    }
}

/// Validation failures captured with contextual metadata.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field}: {message}")]
    InvalidField { field: String, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASIC_YAML: &str = r#"
run_id: "stage0_smoke"
knowledge: "bench/animals.json"
games:
  seed: 123
  count: 16
profiles:
  - name: "margin"
  - name: "absolute"
    params:
      confidence: "absolute"
      threshold: 0.7
      floor: 0.0
outputs:
  jsonl: "bench/out/{run_id}/games.jsonl"
  summary_md: "bench/out/{run_id}/summary.md"
  plots_dir: "bench/out/{run_id}/plots"
metrics:
  baseline: "margin"
logging:
  enable_structured: true
  tracing_level: "debug"
"#;

    #[test]
    fn loads_and_validates_basic_config() {
        let mut cfg: BenchmarkConfig = serde_yaml::from_str(BASIC_YAML).expect("parse yaml");
        cfg.validate().expect("validate");

        assert_eq!(cfg.games.answer_noise, DEFAULT_ANSWER_NOISE);
        assert!(!cfg.games.learning);
        assert!(cfg.logging.enable_structured);
        assert_eq!(cfg.logging.level(), Some(Level::DEBUG));

        let outputs = cfg.resolved_outputs();
        assert_eq!(
            outputs.jsonl,
            PathBuf::from("bench/out/stage0_smoke/games.jsonl")
        );
    }

    #[test]
    fn profile_params_map_onto_engine_config() {
        let mut cfg: BenchmarkConfig = serde_yaml::from_str(BASIC_YAML).expect("parse");
        cfg.validate().expect("valid");

        let margin = cfg.profiles[0].params.engine_config();
        assert_eq!(margin, EngineConfig::default());

        let absolute = cfg.profiles[1].params.engine_config();
        assert_eq!(
            absolute.policy.rule,
            ConfidenceRule::Absolute { threshold: 0.7 }
        );
        assert_eq!(absolute.likelihood.floor, 0.0);
        assert_eq!(absolute.policy.max_failures, 3);
    }

    #[test]
    fn rejects_missing_baseline_with_several_profiles() {
        let yaml = BASIC_YAML.replace("baseline: \"margin\"\n", "");
        let mut cfg: BenchmarkConfig = serde_yaml::from_str(&yaml).expect("parse");
        let err = cfg.validate().expect_err("should fail");
        assert!(matches!(
            err,
            ValidationError::InvalidField { field, .. } if field == "metrics.baseline"
        ));
    }

    #[test]
    fn absolute_profile_requires_threshold() {
        let yaml = BASIC_YAML.replace("      threshold: 0.7\n", "");
        let mut cfg: BenchmarkConfig = serde_yaml::from_str(&yaml).expect("parse");
        let err = cfg.validate().expect_err("missing threshold");
        assert!(matches!(
            err,
            ValidationError::InvalidField { field, .. } if field == "profiles[absolute].params.threshold"
        ));
    }

    #[test]
    fn rejects_duplicate_profiles() {
        let yaml = BASIC_YAML.replace("- name: \"absolute\"", "- name: \"margin\"");
        let mut cfg: BenchmarkConfig = serde_yaml::from_str(&yaml).expect("parse");
        let err = cfg.validate().expect_err("duplicate profiles should fail");
        assert!(matches!(
            err,
            ValidationError::InvalidField { field, .. } if field == "profiles"
        ));
    }

    #[test]
    fn rejects_invalid_run_id_and_noise() {
        let yaml = BASIC_YAML.replace("stage0_smoke", "stage 0 smoke");
        let mut cfg: BenchmarkConfig = serde_yaml::from_str(&yaml).expect("parse");
        assert!(matches!(
            cfg.validate(),
            Err(ValidationError::InvalidField { field, .. }) if field == "run_id"
        ));

        let yaml = BASIC_YAML.replace("count: 16", "count: 16\n  answer_noise: 1.5");
        let mut cfg: BenchmarkConfig = serde_yaml::from_str(&yaml).expect("parse");
        assert!(matches!(
            cfg.validate(),
            Err(ValidationError::InvalidField { field, .. }) if field == "games.answer_noise"
        ));
    }
}
