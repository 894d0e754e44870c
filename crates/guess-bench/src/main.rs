use std::io;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use guess_bench::config::{BenchmarkConfig, ResolvedOutputs};
use guess_bench::logging::{init_console_logging, init_logging};
use guess_bench::play::{ConsoleOptions, run_console};
use guess_bench::simulation::SimulationRunner;
use guess_core::EngineConfig;

/// Self-play benchmark and console front end for the guessing engine.
#[derive(Debug, Parser)]
#[command(
    name = "guess-bench",
    author,
    version,
    about = "Deterministic self-play harness for the guessing engine"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Play simulated games for every configured profile.
    Simulate(SimulateArgs),
    /// Play one game interactively on stdin/stdout.
    Play(PlayArgs),
}

#[derive(Debug, Args)]
struct SimulateArgs {
    /// Path to the YAML configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "bench/bench.yaml")]
    config: PathBuf,

    /// Override the run identifier (substitutes {run_id} templates).
    #[arg(long, value_name = "RUN_ID")]
    run_id: Option<String>,

    /// Override the number of games to play.
    #[arg(long, value_name = "GAMES")]
    games: Option<usize>,

    /// Override the RNG seed for hidden candidates and answer noise.
    #[arg(long, value_name = "SEED")]
    seed: Option<u64>,

    /// Override the probability that a simulated answer slips one step.
    #[arg(long, value_name = "P")]
    noise: Option<f64>,

    /// Let confirmed games update each profile's knowledge during the run.
    #[arg(long)]
    learning: bool,

    /// Exit after validating the configuration (no game is played).
    #[arg(long)]
    validate_only: bool,
}

#[derive(Debug, Args)]
struct PlayArgs {
    /// JSON knowledge file; updated in place when a guess is confirmed.
    #[arg(short, long, value_name = "FILE", default_value = "bench/animals.json")]
    knowledge: PathBuf,

    /// JSON-lines file receiving suggested candidates.
    #[arg(long, value_name = "FILE", default_value = "bench/suggestions.jsonl")]
    suggestions: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Simulate(args) => simulate(args),
        Command::Play(args) => play(args),
    }
}

fn simulate(args: SimulateArgs) -> anyhow::Result<()> {
    let mut config = BenchmarkConfig::from_path(&args.config)?;

    if let Some(run_id) = args.run_id {
        config.run_id = run_id;
    }

    if let Some(games) = args.games {
        config.games.count = games;
    }

    if let Some(seed) = args.seed {
        config.games.seed = Some(seed);
    }

    if let Some(noise) = args.noise {
        config.games.answer_noise = noise;
    }

    if args.learning {
        config.games.learning = true;
    }

    config.validate()?;

    let outputs: ResolvedOutputs = config.resolved_outputs();
    let profile_count = config.profiles.len();
    let run_id = config.run_id.clone();
    let games = config.games.count;

    println!(
        "Loaded configuration '{run_id}' with {profile_count} profile{} ({games} games, noise {:.2})",
        if profile_count == 1 { "" } else { "s" },
        config.games.answer_noise
    );

    let logging_guard = init_logging(&config.logging, &outputs)?;
    let runner = SimulationRunner::new(config, outputs)?;

    if args.validate_only {
        println!("Validation-only mode: simulation skipped.");
        return Ok(());
    }

    let mut summary = runner.run()?;
    // Flush buffered events before reading the telemetry file back.
    drop(logging_guard);
    summary.summarise_telemetry()?;
    println!(
        "Simulation complete for '{run_id}': {} games × {} profiles → {} rows at {}",
        summary.games_played,
        summary.profiles,
        summary.rows_written,
        summary.jsonl_path.display()
    );
    println!("Summary table: {}", summary.summary_path.display());
    if let Some(plot_path) = summary.plot_path.as_ref() {
        println!("Question delta plot: {}", plot_path.display());
    }
    if let Some(telemetry_path) = summary.telemetry_path.as_ref() {
        println!("Telemetry log: {}", telemetry_path.display());
    }
    if let Some(outputs) = summary.telemetry_outputs.as_ref() {
        println!("Telemetry summary (JSON): {}", outputs.json_path.display());
        println!(
            "Telemetry summary (Markdown): {}",
            outputs.markdown_path.display()
        );
        let guesses = &outputs.summary.guesses;
        match guesses.avg_confidence {
            Some(confidence) => println!(
                "  Guesses: {} events ({} forced), avg confidence {:.2}",
                guesses.count, guesses.forced, confidence
            ),
            None => println!("  Guesses: {} events captured", guesses.count),
        }
        if !outputs.summary.escalations.reasons.is_empty() {
            println!("  Escalations: {:?}", outputs.summary.escalations.reasons);
        }
    }

    Ok(())
}

fn play(args: PlayArgs) -> anyhow::Result<()> {
    init_console_logging();
    let options = ConsoleOptions {
        knowledge: args.knowledge,
        suggestions: args.suggestions,
    };
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut output = io::stdout();
    run_console(&options, EngineConfig::from_env(), &mut input, &mut output)?;
    Ok(())
}
