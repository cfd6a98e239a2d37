//! Markdown and JSON reports for an evaluation run.
use anyhow::{Context, Result};
use chrono::Utc;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use crate::runner::{EndToEndStatus, EvaluationRun};
use crate::scorer::{MetricsReport, METRIC_NAMES};

pub const RETRIEVAL_REPORT: &str = "retrieval_report.md";
pub const METRICS_REPORT: &str = "metrics_report.md";
pub const SAMPLES_FILE: &str = "e2e_samples.json";

fn cell(v: Option<f64>) -> String { v.map_or_else(|| "-".to_string(), |v| format!("{v:.4}")) }

pub fn render_retrieval_report(run: &EvaluationRun) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Retrieval Evaluation Report\n");
    let _ = writeln!(out, "Generated: {}\n", Utc::now().to_rfc3339());
    let _ = writeln!(out, "This report shows Recall@{} scores for each evaluation question.", run.k);
    let _ = writeln!(out, "Score of 1 means the expected answer was found in the top {} retrieved chunks.\n", run.k);
    for s in &run.retrieval {
        let _ = writeln!(out, "### Q: {}\nRecall@{}: {}\n", s.question, run.k, s.score);
    }
    let _ = writeln!(out, "**Overall Recall@{}: {:.3}** ({} questions)", run.k, run.recall, run.retrieval.len());
    if let EndToEndStatus::Failed(msg) = &run.end_to_end {
        let _ = writeln!(out, "\nEnd-to-end evaluation failed: {msg}");
    }
    out
}

pub fn render_metrics_report(report: &MetricsReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# End-to-End Metrics Report\n");
    let _ = writeln!(out, "- **Context Precision**: how relevant the retrieved contexts are (higher is better)");
    let _ = writeln!(out, "- **Context Recall**: how well the contexts cover the ground truth (higher is better)");
    let _ = writeln!(out, "- **Faithfulness**: how grounded the answer is in the contexts (higher is better)");
    let _ = writeln!(out, "- **Answer Relevancy**: how relevant the answer is to the question (higher is better)\n");
    let _ = writeln!(out, "| question | {} |", METRIC_NAMES.join(" | "));
    let _ = writeln!(out, "|---|{}", "---|".repeat(METRIC_NAMES.len()));
    for row in &report.rows {
        let cells: Vec<String> = row.values().into_iter().map(cell).collect();
        let _ = writeln!(out, "| {} | {} |", row.question.replace('|', "\\|"), cells.join(" | "));
    }
    let means: Vec<String> = report.summary().values().into_iter().map(cell).collect();
    let _ = writeln!(out, "| **mean** | {} |", means.join(" | "));
    out
}

/// Write the reports for `run` into `dir` (created if missing); returns the written paths.
pub fn write_reports(run: &EvaluationRun, dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir).with_context(|| format!("creating reports dir {}", dir.display()))?;
    let mut written = Vec::new();

    let retrieval_path = dir.join(RETRIEVAL_REPORT);
    fs::write(&retrieval_path, render_retrieval_report(run)).with_context(|| format!("writing {}", retrieval_path.display()))?;
    written.push(retrieval_path);

    match &run.end_to_end {
        EndToEndStatus::Scored { report, .. } => {
            let path = dir.join(METRICS_REPORT);
            fs::write(&path, render_metrics_report(report)).with_context(|| format!("writing {}", path.display()))?;
            written.push(path);
        }
        EndToEndStatus::Collected(samples) => {
            let path = dir.join(SAMPLES_FILE);
            fs::write(&path, serde_json::to_string_pretty(samples)?).with_context(|| format!("writing {}", path.display()))?;
            written.push(path);
        }
        EndToEndStatus::Skipped | EndToEndStatus::Failed(_) => {}
    }
    tracing::info!(dir = %dir.display(), files = written.len(), "reports written");
    Ok(written)
}
