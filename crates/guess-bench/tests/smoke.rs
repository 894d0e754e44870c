use std::fs;
use std::path::{Path, PathBuf};

use guess_bench::config::BenchmarkConfig;
use guess_bench::simulation::SimulationRunner;
use tempfile::tempdir;

fn animals() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../bench/animals.json")
}

fn load_config(output_dir: &Path) -> BenchmarkConfig {
    let yaml = format!(
        r#"
run_id: "test_smoke"
knowledge: "{knowledge}"
games:
  seed: 4242
  count: 24
  answer_noise: 0.15
profiles:
  - name: "margin"
  - name: "absolute"
    params:
      confidence: "absolute"
      threshold: 0.8
  - name: "impatient"
    params:
      margin: 0.05
      max_failures: 1
outputs:
  jsonl: "{jsonl}"
  summary_md: "{summary}"
  plots_dir: "{plots}"
metrics:
  baseline: "margin"
logging:
  enable_structured: false
"#,
        knowledge = animals().display(),
        jsonl = output_dir.join("games.jsonl").display(),
        summary = output_dir.join("summary.md").display(),
        plots = output_dir.join("plots").display()
    );

    let mut cfg: BenchmarkConfig = serde_yaml::from_str(&yaml).expect("valid yaml");
    cfg.validate().expect("config validates");
    cfg
}

fn normalized_rows(path: &Path) -> Vec<serde_json::Value> {
    let jsonl = fs::read_to_string(path).expect("jsonl readable");
    jsonl
        .lines()
        .map(|line| {
            let mut value: serde_json::Value =
                serde_json::from_str(line).expect("row decodes to JSON");
            if let Some(obj) = value.as_object_mut() {
                obj.insert("speed_ms_turn".into(), serde_json::json!(0.0));
            }
            value
        })
        .collect()
}

#[test]
fn simulation_smoke_test_is_deterministic() {
    let first_dir = tempdir().expect("temp dir");
    let second_dir = tempdir().expect("temp dir");

    let mut runs = Vec::new();
    for dir in [first_dir.path(), second_dir.path()] {
        let config = load_config(dir);
        let outputs = config.resolved_outputs();
        let runner = SimulationRunner::new(config, outputs).expect("runner created");
        let summary = runner.run().expect("simulation completes");

        assert_eq!(summary.games_played, 24);
        assert_eq!(summary.profiles, 3);
        assert_eq!(summary.rows_written, 72);
        assert!(summary.summary_path.exists(), "summary markdown missing");
        // Plot rendering is optional; a reported path must exist.
        if let Some(plot_path) = summary.plot_path.as_ref() {
            assert!(plot_path.exists(), "plot path reported but missing on disk");
        }
        runs.push(normalized_rows(&summary.jsonl_path));
    }

    assert_eq!(runs[0], runs[1], "same seed must replay the same games");

    for row in &runs[0] {
        let outcome = row["outcome"].as_str().expect("outcome");
        assert!(outcome == "won" || outcome == "escalated");
        let questions = row["questions"].as_u64().expect("questions");
        assert!((1..=10).contains(&questions));
    }

    // Every profile sees the same hidden candidate for a given game.
    for game in runs[0].chunks(3) {
        assert!(game.iter().all(|row| row["hidden"] == game[0]["hidden"]));
        assert!(game.iter().all(|row| row["game_id"] == game[0]["game_id"]));
    }
}

#[test]
fn validate_rejects_unknown_baseline() {
    let dir = tempdir().expect("temp dir");
    let mut config = load_config(dir.path());
    config.metrics.baseline = Some("missing".into());
    assert!(config.validate().is_err());
}
