mod player;

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use guess_core::model::KnowledgeBase;
use guess_core::store::{JsonFileStore, KnowledgeStore, MemoryStore, MemorySuggestions};
use guess_core::{Engine, EngineConfig, GameError, StoreError, Turn};
use rand::{Rng, RngCore, SeedableRng, rngs::StdRng};
use serde::Serialize;
use thiserror::Error;
use tracing::{Level, event};

use crate::analytics::{AnalyticsCollector, AnalyticsError};
use crate::config::{BenchmarkConfig, ResolvedOutputs};
use crate::telemetry::{
    TelemetryError, TelemetryOutputs, append_highlights_to_markdown, write_summary_outputs,
};

pub use player::SimulatedPlayer;

/// Plays every configured profile against the same sequence of hidden
/// candidates and records the results.
pub struct SimulationRunner {
    config: BenchmarkConfig,
    outputs: ResolvedOutputs,
    truth: KnowledgeBase,
    profiles: Vec<ProfileBlueprint>,
    logging_enabled: bool,
}

/// Summary details returned after a run.
pub struct RunSummary {
    pub games_played: usize,
    pub profiles: usize,
    pub rows_written: usize,
    pub jsonl_path: PathBuf,
    pub summary_path: PathBuf,
    pub plot_path: Option<PathBuf>,
    pub telemetry_path: Option<PathBuf>,
    pub telemetry_outputs: Option<TelemetryOutputs>,
}

impl RunSummary {
    /// Summarises `telemetry.jsonl` and appends highlights to the summary
    /// markdown. Call once the log writer has been flushed.
    pub fn summarise_telemetry(&mut self) -> Result<(), RunnerError> {
        let Some(path) = self.telemetry_path.as_ref() else {
            return Ok(());
        };
        let outputs = write_summary_outputs(path, &telemetry_dir(&self.summary_path))?;
        if let Some(outputs) = outputs.as_ref() {
            append_highlights_to_markdown(&self.summary_path, outputs)?;
        }
        self.telemetry_outputs = outputs;
        Ok(())
    }
}

fn telemetry_dir(summary_md: &Path) -> PathBuf {
    summary_md
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

struct ProfileBlueprint {
    name: String,
    engine: EngineConfig,
}

impl SimulationRunner {
    /// Build a runner from a validated configuration, loading the ground-truth
    /// knowledge file.
    pub fn new(config: BenchmarkConfig, outputs: ResolvedOutputs) -> Result<Self, RunnerError> {
        let truth = JsonFileStore::new(&config.knowledge).load()?;
        Ok(Self::with_knowledge(config, outputs, truth))
    }

    pub fn with_knowledge(
        config: BenchmarkConfig,
        outputs: ResolvedOutputs,
        truth: KnowledgeBase,
    ) -> Self {
        let profiles = config
            .profiles
            .iter()
            .map(|profile| ProfileBlueprint {
                name: profile.name.clone(),
                engine: profile.params.engine_config(),
            })
            .collect();

        Self {
            logging_enabled: config.logging.enable_structured,
            config,
            outputs,
            truth,
            profiles,
        }
    }

    /// Execute the simulation, streaming JSONL rows to disk.
    pub fn run(&self) -> Result<RunSummary, RunnerError> {
        ensure_parent(self.outputs.jsonl.parent())?;
        ensure_parent(self.outputs.summary_md.parent())?;
        if !self.outputs.plots_dir.as_os_str().is_empty() {
            fs::create_dir_all(&self.outputs.plots_dir)?;
        }

        let mut writer = BufWriter::new(File::create(&self.outputs.jsonl)?);
        let mut rng = StdRng::seed_from_u64(self.config.games.seed.unwrap_or(0));
        let mut rows_written = 0usize;
        let mut analytics = AnalyticsCollector::new(&self.config)?;

        // With learning on, each profile keeps one engine (and its own copy of
        // the knowledge) for the whole run.
        let persistent = if self.config.games.learning {
            Some(
                self.profiles
                    .iter()
                    .map(|profile| self.spawn_engine(profile.engine))
                    .collect::<Result<Vec<_>, _>>()?,
            )
        } else {
            None
        };

        for game_index in 0..self.config.games.count {
            let hidden = rng.gen_range(0..self.truth.candidate_count());
            let game_seed = rng.next_u64();

            let mut outcomes = Vec::with_capacity(self.profiles.len());
            for (slot, profile) in self.profiles.iter().enumerate() {
                let engine = match persistent.as_ref() {
                    Some(engines) => Arc::clone(&engines[slot]),
                    None => self.spawn_engine(profile.engine)?,
                };
                let outcome = self.play_game(&engine, profile, game_index, hidden, game_seed)?;
                outcomes.push(outcome);
            }

            analytics.record_game(game_index, &outcomes)?;
            rows_written += write_game_rows(
                &mut writer,
                &self.config.run_id,
                &self.truth,
                game_index,
                game_seed,
                &outcomes,
            )?;
        }

        writer.flush()?;

        let summary = analytics.finalize()?;
        summary.write_markdown(&self.outputs.summary_md)?;
        let plot_path = match summary.render_plot(&self.outputs.plots_dir) {
            Ok(path) => Some(path),
            Err(err) => {
                eprintln!("WARN: {}", err);
                None
            }
        };

        let telemetry_path = if self.logging_enabled {
            Some(telemetry_dir(&self.outputs.summary_md).join("telemetry.jsonl"))
        } else {
            None
        };

        Ok(RunSummary {
            games_played: self.config.games.count,
            profiles: self.profiles.len(),
            rows_written,
            jsonl_path: self.outputs.jsonl.clone(),
            summary_path: self.outputs.summary_md.clone(),
            plot_path,
            telemetry_path,
            telemetry_outputs: None,
        })
    }

    fn spawn_engine(&self, config: EngineConfig) -> Result<Arc<Engine>, RunnerError> {
        let engine = Engine::load(
            config,
            Arc::new(MemoryStore::new(self.truth.clone())),
            Arc::new(MemorySuggestions::new()),
        )?;
        Ok(Arc::new(engine))
    }

    fn play_game(
        &self,
        engine: &Engine,
        profile: &ProfileBlueprint,
        game_index: usize,
        hidden: usize,
        game_seed: u64,
    ) -> Result<GameOutcome, RunnerError> {
        let mut player =
            SimulatedPlayer::new(&self.truth, hidden, self.config.games.answer_noise, game_seed);
        // Every call either asks a fresh question or settles a guess.
        let max_turns = self.truth.question_count()
            + 2 * (profile.engine.policy.max_failures as usize + 2);

        let start = Instant::now();
        let (mut session, opening) = engine.begin();
        let mut turn = Turn::Question {
            text: opening.question,
            index: opening.question_index,
            ordinal: opening.ordinal,
        };
        let mut turns = 0u32;
        let mut guesses = 0u32;
        let mut forced_guesses = 0u32;
        let mut last_confidence = 0.0;

        let won = loop {
            turns += 1;
            if turns as usize > max_turns {
                return Err(RunnerError::game(format!(
                    "game {game_index} for profile '{}' did not finish within {max_turns} turns",
                    profile.name
                )));
            }

            turn = match turn {
                Turn::Question { index, .. } => {
                    engine.submit_answer(&mut session, player.answer(index))?
                }
                Turn::Guess {
                    index,
                    confidence,
                    forced,
                    ..
                } => {
                    guesses += 1;
                    if forced {
                        forced_guesses += 1;
                    }
                    last_confidence = confidence;
                    engine.confirm(&mut session, player.confirms(index))?
                }
                Turn::Confirmed { .. } => break true,
                Turn::SuggestionRequired => {
                    engine.contribute_suggestion(
                        &mut session,
                        player.hidden_name(),
                        &player.suggested_question(),
                    )?;
                    break false;
                }
            };
        };

        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
        let questions = session.ordinal();

        if self.logging_enabled && tracing::enabled!(Level::INFO) {
            event!(
                target: "guess_bench::game",
                Level::INFO,
                run_id = %self.config.run_id,
                game_index = game_index as u32,
                profile = %profile.name,
                hidden = player.hidden_name(),
                outcome = outcome_label(won),
                questions,
                guesses,
                elapsed_ms
            );
        }

        Ok(GameOutcome {
            profile: profile.name.clone(),
            hidden: player.hidden(),
            won,
            questions,
            guesses,
            forced_guesses,
            confidence: last_confidence,
            elapsed_ms,
            turns,
        })
    }
}

fn ensure_parent(path: Option<&Path>) -> Result<(), RunnerError> {
    if let Some(dir) = path.filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    Ok(())
}

fn outcome_label(won: bool) -> &'static str {
    if won { "won" } else { "escalated" }
}

fn write_game_rows(
    writer: &mut BufWriter<File>,
    run_id: &str,
    truth: &KnowledgeBase,
    game_index: usize,
    game_seed: u64,
    outcomes: &[GameOutcome],
) -> Result<usize, RunnerError> {
    let game_id = format!("G{game_index:05}");

    let mut rows_written = 0usize;
    for outcome in outcomes {
        let row = GameLogRow {
            run_id: run_id.to_string(),
            game_id: game_id.clone(),
            game_index,
            game_seed,
            profile: outcome.profile.clone(),
            hidden: truth
                .candidate(outcome.hidden)
                .map(|c| c.name.to_string())
                .unwrap_or_default(),
            outcome: outcome_label(outcome.won),
            questions: outcome.questions,
            guesses: outcome.guesses,
            forced_guesses: outcome.forced_guesses,
            confidence: outcome.confidence,
            speed_ms_turn: outcome.elapsed_ms / f64::from(outcome.turns.max(1)),
        };

        serde_json::to_writer(&mut *writer, &row)?;
        writer.write_all(b"\n")?;
        rows_written += 1;
    }

    Ok(rows_written)
}

/// Result of one profile playing one hidden candidate.
#[derive(Debug, Clone)]
pub struct GameOutcome {
    pub profile: String,
    pub hidden: usize,
    pub won: bool,
    /// Questions asked, including the opening one.
    pub questions: u32,
    pub guesses: u32,
    pub forced_guesses: u32,
    /// Confidence of the last guess made (0 when none was made).
    pub confidence: f64,
    pub elapsed_ms: f64,
    pub turns: u32,
}

#[derive(Serialize)]
struct GameLogRow {
    run_id: String,
    game_id: String,
    game_index: usize,
    game_seed: u64,
    profile: String,
    hidden: String,
    outcome: &'static str,
    questions: u32,
    guesses: u32,
    forced_guesses: u32,
    confidence: f64,
    speed_ms_turn: f64,
}

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("failed to load knowledge: {0}")]
    Knowledge(#[from] StoreError),
    #[error("engine rejected a move: {0}")]
    Engine(#[from] GameError),
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
    #[error("failed to serialize log row: {source}")]
    Serialize {
        #[from]
        source: serde_json::Error,
    },
    #[error("game execution failed: {message}")]
    Game { message: String },
    #[error("analytics error: {0}")]
    Analytics(#[from] AnalyticsError),
    #[error("telemetry summarisation failed: {0}")]
    Telemetry(#[from] TelemetryError),
}

impl RunnerError {
    fn game(message: String) -> Self {
        RunnerError::Game { message }
    }
}
