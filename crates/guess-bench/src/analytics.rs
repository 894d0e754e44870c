use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use plotters::prelude::*;
use serde::Serialize;
use statrs::distribution::{ContinuousCDF, Normal};
use thiserror::Error;

use crate::config::{BenchmarkConfig, ProfileParams};
use crate::simulation::GameOutcome;

const CONFIDENCE_Z: f64 = 1.96; // 95% CI

#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("baseline profile '{0}' not present in simulation results")]
    MissingBaseline(String),
    #[error("profile '{0}' defined in results but missing from configuration")]
    UnknownProfile(String),
    #[error("baseline '{0}' missing for game {1}")]
    MissingBaselineGame(String, String),
    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to render plot: {0}")]
    Plot(String),
}

pub struct AnalyticsCollector {
    baseline: String,
    profiles: HashMap<String, ProfileAccumulator>,
    comparisons: HashMap<String, ComparisonAccumulator>,
    profile_order: Vec<String>,
}

impl AnalyticsCollector {
    pub fn new(config: &BenchmarkConfig) -> Result<Self, AnalyticsError> {
        let baseline = config
            .metrics
            .baseline
            .clone()
            .ok_or_else(|| AnalyticsError::MissingBaseline("<unset>".into()))?;

        let mut profiles = HashMap::new();
        let mut order = Vec::new();
        for profile in &config.profiles {
            profiles.insert(
                profile.name.clone(),
                ProfileAccumulator::new(profile.name.clone(), profile.params.clone()),
            );
            order.push(profile.name.clone());
        }

        if !profiles.contains_key(&baseline) {
            return Err(AnalyticsError::MissingBaseline(baseline));
        }

        Ok(Self {
            baseline,
            profiles,
            comparisons: HashMap::new(),
            profile_order: order,
        })
    }

    /// Records one hidden candidate as played by every profile.
    pub fn record_game(
        &mut self,
        game_index: usize,
        outcomes: &[GameOutcome],
    ) -> Result<(), AnalyticsError> {
        let game_id = format!("G{game_index:05}");

        let baseline_questions = outcomes
            .iter()
            .find(|outcome| outcome.profile == self.baseline)
            .map(|outcome| f64::from(outcome.questions))
            .ok_or_else(|| {
                AnalyticsError::MissingBaselineGame(self.baseline.clone(), game_id.clone())
            })?;

        for outcome in outcomes {
            let acc = self
                .profiles
                .get_mut(&outcome.profile)
                .ok_or_else(|| AnalyticsError::UnknownProfile(outcome.profile.clone()))?;
            acc.record_game(outcome);
        }

        for outcome in outcomes {
            if outcome.profile == self.baseline {
                continue;
            }
            let diff = f64::from(outcome.questions) - baseline_questions;
            self.comparisons
                .entry(outcome.profile.clone())
                .or_insert_with(ComparisonAccumulator::new)
                .record(diff);
        }

        Ok(())
    }

    pub fn finalize(mut self) -> Result<AnalyticsSummary, AnalyticsError> {
        let mut reports = Vec::new();
        for name in &self.profile_order {
            if let Some(acc) = self.profiles.remove(name) {
                reports.push(acc.into_report());
            }
        }

        let mut comparisons = Vec::new();
        for report in &reports {
            if report.name == self.baseline {
                comparisons.push(ComparisonReport {
                    profile: report.name.clone(),
                    p_value: 1.0,
                    sample_size: report.games,
                });
                continue;
            }
            let (p_value, sample_size) = match self.comparisons.remove(&report.name) {
                Some(comp) => comp.wilcoxon_signed_rank(),
                None => (1.0, 0),
            };
            comparisons.push(ComparisonReport {
                profile: report.name.clone(),
                p_value,
                sample_size,
            });
        }

        Ok(AnalyticsSummary {
            baseline: self.baseline,
            profiles: reports,
            comparisons,
        }
        .enrich())
    }
}

struct ProfileAccumulator {
    name: String,
    params: ProfileParams,
    games: u32,
    wins: u32,
    escalations: u32,
    forced_guesses: u32,
    guesses: u32,
    per_game_questions: Vec<f64>,
    total_ms: f64,
}

impl ProfileAccumulator {
    fn new(name: String, params: ProfileParams) -> Self {
        Self {
            name,
            params,
            games: 0,
            wins: 0,
            escalations: 0,
            forced_guesses: 0,
            guesses: 0,
            per_game_questions: Vec::new(),
            total_ms: 0.0,
        }
    }

    fn record_game(&mut self, outcome: &GameOutcome) {
        self.games += 1;
        if outcome.won {
            self.wins += 1;
        } else {
            self.escalations += 1;
        }
        self.guesses += outcome.guesses;
        self.forced_guesses += outcome.forced_guesses;
        self.per_game_questions.push(f64::from(outcome.questions));
        self.total_ms += outcome.elapsed_ms;
    }

    fn into_report(self) -> ProfileReport {
        let games = self.games as usize;
        let avg_questions = mean(&self.per_game_questions);
        let ci95 = confidence_interval(&self.per_game_questions);
        let per_game = |value: f64| if games == 0 { 0.0 } else { value / games as f64 };

        ProfileReport {
            name: self.name,
            params: self.params,
            games,
            wins: self.wins as usize,
            escalations: self.escalations as usize,
            avg_questions,
            ci95,
            avg_guesses: per_game(f64::from(self.guesses)),
            forced_guesses: self.forced_guesses as usize,
            average_ms_per_game: per_game(self.total_ms),
            delta_vs_baseline: 0.0, // Filled once the baseline report is known
        }
    }
}

#[derive(Clone)]
struct ComparisonAccumulator {
    diffs: Vec<f64>,
}

impl ComparisonAccumulator {
    fn new() -> Self {
        Self { diffs: Vec::new() }
    }

    fn record(&mut self, diff: f64) {
        self.diffs.push(diff);
    }

    /// Two-sided Wilcoxon signed-rank test (normal approximation, tie corrected).
    fn wilcoxon_signed_rank(self) -> (f64, usize) {
        let diffs: Vec<f64> = self
            .diffs
            .into_iter()
            .filter(|d| d.abs() > f64::EPSILON)
            .collect();
        let n = diffs.len();
        if n == 0 {
            return (1.0, 0);
        }

        let mut paired: Vec<(f64, f64)> =
            diffs.into_iter().map(|d| (d.abs(), d.signum())).collect();
        paired.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut ranks = Vec::with_capacity(n);
        let mut tie_sizes = Vec::new();
        let mut i = 0;
        while i < paired.len() {
            let mut j = i;
            while j + 1 < paired.len() && (paired[j + 1].0 - paired[i].0).abs() < 1e-12 {
                j += 1;
            }
            let rank = (i + j + 2) as f64 / 2.0;
            for entry in &paired[i..=j] {
                ranks.push((rank, entry.1));
            }
            if j > i {
                tie_sizes.push(j - i + 1);
            }
            i = j + 1;
        }

        let w_plus: f64 = ranks
            .iter()
            .filter(|(_, sign)| *sign > 0.0)
            .map(|(rank, _)| *rank)
            .sum();
        let w_minus: f64 = ranks
            .iter()
            .filter(|(_, sign)| *sign < 0.0)
            .map(|(rank, _)| *rank)
            .sum();

        let w = w_plus.min(w_minus);
        let n_f = n as f64;
        let mean_w = n_f * (n_f + 1.0) / 4.0;

        let tie_adjustment: f64 = tie_sizes
            .into_iter()
            .map(|count| {
                let c = count as f64;
                (c.powi(3) - c) / 48.0
            })
            .sum();
        let variance_w = n_f * (n_f + 1.0) * (2.0 * n_f + 1.0) / 24.0 - tie_adjustment;
        if variance_w <= 0.0 {
            return (1.0, n);
        }

        let z = (((w - mean_w).abs() - 0.5) / variance_w.sqrt()).max(0.0);
        let Ok(normal) = Normal::new(0.0, 1.0) else {
            return (1.0, n);
        };
        let p = 2.0 * (1.0 - normal.cdf(z));
        (p.clamp(0.0, 1.0), n)
    }
}

#[derive(Debug, Serialize)]
pub struct AnalyticsSummary {
    pub baseline: String,
    pub profiles: Vec<ProfileReport>,
    pub comparisons: Vec<ComparisonReport>,
}

impl AnalyticsSummary {
    pub fn enrich(mut self) -> Self {
        let baseline_avg = self
            .profiles
            .iter()
            .find(|profile| profile.name == self.baseline)
            .map(|profile| profile.avg_questions)
            .unwrap_or(0.0);

        for profile in &mut self.profiles {
            profile.delta_vs_baseline = profile.avg_questions - baseline_avg;
        }

        self
    }

    pub fn write_markdown(&self, path: impl AsRef<Path>) -> Result<(), AnalyticsError> {
        let mut rows = String::new();
        rows.push_str("# Simulation Summary\n\n");
        rows.push_str(&format!("Baseline profile: `{}`\n\n", self.baseline));
        rows.push_str("| Profile | Games | Win % | Escalations | Avg questions | Δ vs baseline | 95% CI | Avg guesses | Forced | Avg ms/game | p-value |\n");
        rows.push_str("|---------|-------|-------|-------------|---------------|----------------|--------|-------------|--------|-------------|---------|\n");

        for profile in &self.profiles {
            let p_value = self
                .comparisons
                .iter()
                .find(|c| c.profile == profile.name)
                .map(|c| c.p_value)
                .unwrap_or(1.0);

            rows.push_str(&format!(
                "| {name} | {games} | {win:.1}% | {escalations} | {avg:.3} | {delta:+.3} | [{ci_low:.3}, {ci_high:.3}] | {guesses:.2} | {forced} | {latency:.3} | {pval:.3} |\n",
                name = profile.name,
                games = profile.games,
                win = profile.win_rate() * 100.0,
                escalations = profile.escalations,
                avg = profile.avg_questions,
                delta = profile.delta_vs_baseline,
                ci_low = profile.ci95.0,
                ci_high = profile.ci95.1,
                guesses = profile.avg_guesses,
                forced = profile.forced_guesses,
                latency = profile.average_ms_per_game,
                pval = p_value,
            ));
        }

        fs::write(path.as_ref(), rows).map_err(|e| AnalyticsError::Io {
            context: "writing summary markdown",
            source: e,
        })?;
        Ok(())
    }

    pub fn render_plot(&self, dir: impl AsRef<Path>) -> Result<PathBuf, AnalyticsError> {
        let dir = dir.as_ref();
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir).map_err(|e| AnalyticsError::Io {
                context: "creating plots directory",
                source: e,
            })?;
        }

        let output_path = dir.join("delta_questions.png");
        let baseline = self.baseline.clone();
        let profiles_snapshot = self.profiles.clone();

        let prev_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(|_| {}));

        let plot_attempt = std::panic::catch_unwind(move || {
            let root = BitMapBackend::new(&output_path, (800, 480)).into_drawing_area();
            root.fill(&WHITE)
                .map_err(|e| AnalyticsError::Plot(e.to_string()))?;

            let mut profiles = profiles_snapshot;
            profiles.sort_by(|a, b| a.delta_vs_baseline.total_cmp(&b.delta_vs_baseline));

            let y_range_min = profiles
                .iter()
                .map(|p| p.delta_vs_baseline)
                .fold(0.0f64, |acc, v| acc.min(v));
            let y_range_max = profiles
                .iter()
                .map(|p| p.delta_vs_baseline)
                .fold(0.0f64, |acc, v| acc.max(v));
            let margin = ((y_range_max - y_range_min).abs() * 0.1).max(0.2);

            let mut chart = ChartBuilder::on(&root)
                .margin(20)
                .caption(
                    "Questions per game vs baseline (lower is better)",
                    ("sans-serif", 22),
                )
                .set_label_area_size(LabelAreaPosition::Left, 50)
                .set_label_area_size(LabelAreaPosition::Bottom, 60)
                .build_cartesian_2d(
                    0..profiles.len(),
                    (y_range_min - margin)..(y_range_max + margin),
                )
                .map_err(|e| AnalyticsError::Plot(e.to_string()))?;

            chart
                .configure_mesh()
                .disable_mesh()
                .y_desc("Δ questions vs baseline")
                .x_desc("Profile")
                .x_label_formatter(&|idx| {
                    profiles
                        .get(*idx)
                        .map(|profile| profile.name.clone())
                        .unwrap_or_default()
                })
                .draw()
                .map_err(|e| AnalyticsError::Plot(e.to_string()))?;

            chart
                .draw_series(profiles.iter().enumerate().map(|(idx, profile)| {
                    let color = if profile.name == baseline {
                        &BLUE
                    } else if profile.delta_vs_baseline <= 0.0 {
                        &GREEN
                    } else {
                        &RED
                    };
                    Rectangle::new(
                        [(idx, 0.0), (idx + 1, profile.delta_vs_baseline)],
                        color.filled(),
                    )
                }))
                .map_err(|e| AnalyticsError::Plot(e.to_string()))?;

            drop(chart);

            root.present()
                .map_err(|e| AnalyticsError::Plot(e.to_string()))?;

            drop(root);

            Ok(output_path)
        });

        std::panic::set_hook(prev_hook);

        match plot_attempt {
            Ok(result) => result,
            Err(_) => Err(AnalyticsError::Plot(
                "plotters panicked while rendering (missing font support?)".into(),
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileReport {
    pub name: String,
    pub params: ProfileParams,
    pub games: usize,
    pub wins: usize,
    pub escalations: usize,
    pub avg_questions: f64,
    pub ci95: (f64, f64),
    pub avg_guesses: f64,
    pub forced_guesses: usize,
    pub average_ms_per_game: f64,
    #[serde(skip)]
    pub delta_vs_baseline: f64,
}

impl ProfileReport {
    pub fn win_rate(&self) -> f64 {
        if self.games == 0 {
            0.0
        } else {
            self.wins as f64 / self.games as f64
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ComparisonReport {
    pub profile: String,
    pub p_value: f64,
    pub sample_size: usize,
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn confidence_interval(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let mean = mean(values);
    if values.len() == 1 {
        return (mean, mean);
    }
    let variance = values
        .iter()
        .map(|value| (value - mean).powi(2))
        .sum::<f64>()
        / (values.len() as f64 - 1.0);
    let std_error = (variance / values.len() as f64).sqrt();
    let margin = CONFIDENCE_Z * std_error;
    (mean - margin, mean + margin)
}
