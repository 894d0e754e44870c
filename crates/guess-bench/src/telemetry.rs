use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse telemetry JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Default, Serialize)]
pub struct TelemetrySummary {
    pub guesses: GuessTelemetrySummary,
    pub learning: LearningTelemetrySummary,
    pub escalations: EscalationTelemetrySummary,
}

#[derive(Debug, Default, Serialize)]
pub struct GuessTelemetrySummary {
    pub count: usize,
    pub forced: usize,
    pub avg_confidence: Option<f64>,
}

#[derive(Debug, Default, Serialize)]
pub struct LearningTelemetrySummary {
    pub count: usize,
    pub avg_cells: Option<f64>,
}

#[derive(Debug, Default, Serialize)]
pub struct EscalationTelemetrySummary {
    pub count: usize,
    pub reasons: BTreeMap<String, usize>,
}

#[derive(Debug)]
struct Average {
    sum: f64,
    count: usize,
}

impl Average {
    fn new() -> Self {
        Self { sum: 0.0, count: 0 }
    }

    fn add(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    fn mean(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.sum / self.count as f64)
        }
    }
}

/// Aggregate guess, learning and escalation events from a structured log.
pub fn summarise_telemetry(path: &Path) -> Result<TelemetrySummary, TelemetryError> {
    if !path.exists() {
        return Ok(TelemetrySummary::default());
    }

    let file = File::open(path).map_err(|source| TelemetryError::Io {
        context: "opening telemetry log",
        source,
    })?;
    let reader = BufReader::new(file);

    let mut summary = TelemetrySummary::default();
    let mut confidence_avg = Average::new();
    let mut cells_avg = Average::new();

    for line in reader.lines() {
        let line = line.map_err(|source| TelemetryError::Io {
            context: "reading telemetry line",
            source,
        })?;
        if line.trim().is_empty() {
            continue;
        }

        let payload: Value = serde_json::from_str(&line)?;
        let target = payload
            .get("target")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let fields = payload
            .get("fields")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        match target {
            "guess_core::guess" => {
                summary.guesses.count += 1;
                if fields.get("forced").and_then(Value::as_bool) == Some(true) {
                    summary.guesses.forced += 1;
                }
                if let Some(confidence) = fields.get("confidence").and_then(Value::as_f64) {
                    confidence_avg.add(confidence);
                }
            }
            "guess_core::learning" => {
                summary.learning.count += 1;
                if let Some(cells) = fields.get("cells").and_then(Value::as_u64) {
                    cells_avg.add(cells as f64);
                }
            }
            "guess_core::escalation" => {
                summary.escalations.count += 1;
                let reason = fields
                    .get("reason")
                    .and_then(Value::as_str)
                    .map(|s| s.trim())
                    .filter(|s| !s.is_empty())
                    .unwrap_or("<unset>");
                *summary
                    .escalations
                    .reasons
                    .entry(reason.to_string())
                    .or_insert(0) += 1;
            }
            _ => {}
        }
    }

    summary.guesses.avg_confidence = confidence_avg.mean();
    summary.learning.avg_cells = cells_avg.mean();

    Ok(summary)
}

pub fn write_summary_outputs(
    telemetry_path: &Path,
    output_dir: &Path,
) -> Result<Option<TelemetryOutputs>, TelemetryError> {
    if !telemetry_path.exists() {
        return Ok(None);
    }

    let summary = summarise_telemetry(telemetry_path)?;
    let json_path = output_dir.join("telemetry_summary.json");
    let md_path = output_dir.join("telemetry_summary.md");

    std::fs::write(
        &json_path,
        serde_json::to_vec_pretty(&summary).map_err(TelemetryError::from)?,
    )
    .map_err(|source| TelemetryError::Io {
        context: "writing telemetry summary json",
        source,
    })?;

    let markdown = render_markdown(&summary, telemetry_path);
    std::fs::write(&md_path, markdown).map_err(|source| TelemetryError::Io {
        context: "writing telemetry summary markdown",
        source,
    })?;

    Ok(Some(TelemetryOutputs {
        summary,
        json_path,
        markdown_path: md_path,
    }))
}

pub fn append_highlights_to_markdown(
    summary_path: &Path,
    outputs: &TelemetryOutputs,
) -> Result<(), TelemetryError> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(summary_path)
        .map_err(|source| TelemetryError::Io {
            context: "opening summary markdown for telemetry append",
            source,
        })?;

    let mut section = String::new();
    section.push_str("\n## Telemetry Highlights\n");
    section.push_str(&guess_lines(&outputs.summary.guesses));
    let learning = &outputs.summary.learning;
    section.push_str(&format!("- Learning passes: {}\n", learning.count));
    if let Some(value) = learning.avg_cells {
        section.push_str(&format!("- Avg cells updated: {:.2}\n", value));
    }

    section.push_str("\n### Escalations\n");
    section.push_str(&escalation_lines(&outputs.summary.escalations));

    write!(file, "{section}").map_err(|source| TelemetryError::Io {
        context: "writing telemetry highlights",
        source,
    })?;

    Ok(())
}

fn guess_lines(guesses: &GuessTelemetrySummary) -> String {
    let mut out = format!(
        "- Guess events captured: {} ({} forced)\n",
        guesses.count, guesses.forced
    );
    if let Some(value) = guesses.avg_confidence {
        out.push_str(&format!("- Avg guess confidence: {:.3}\n", value));
    }
    out
}

fn escalation_lines(escalations: &EscalationTelemetrySummary) -> String {
    if escalations.reasons.is_empty() {
        return "- <none>\n".to_string();
    }
    escalations
        .reasons
        .iter()
        .map(|(label, count)| format!("- {}: {}\n", label, count))
        .collect()
}

fn render_markdown(summary: &TelemetrySummary, telemetry_path: &Path) -> String {
    let mut output = String::new();
    output.push_str("# Telemetry Summary\n\n");
    output.push_str(&format!("- Source: `{}`\n", telemetry_path.display()));
    output.push('\n');

    output.push_str("## Guesses\n");
    output.push_str(&guess_lines(&summary.guesses));
    output.push('\n');

    output.push_str("## Learning\n");
    output.push_str(&format!("- Passes: {}\n", summary.learning.count));
    if let Some(value) = summary.learning.avg_cells {
        output.push_str(&format!("- Avg cells updated: {:.2}\n", value));
    }
    output.push('\n');

    output.push_str(&format!(
        "## Escalations ({})\n",
        summary.escalations.count
    ));
    output.push_str(&escalation_lines(&summary.escalations));
    output
}

#[derive(Debug)]
pub struct TelemetryOutputs {
    pub summary: TelemetrySummary,
    pub json_path: PathBuf,
    pub markdown_path: PathBuf,
}
