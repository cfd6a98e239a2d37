use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::process::{Command, Stdio};

use pagerag_core::{Error, EvalSample};

pub const METRIC_NAMES: [&str; 4] = ["context_precision", "context_recall", "faithfulness", "answer_relevancy"];

/// Metric row for one sample. Scorers may leave a metric out.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SampleMetrics {
    pub question: String,
    pub context_precision: Option<f64>,
    pub context_recall: Option<f64>,
    pub faithfulness: Option<f64>,
    pub answer_relevancy: Option<f64>,
}

impl SampleMetrics {
    pub fn values(&self) -> [Option<f64>; 4] {
        [self.context_precision, self.context_recall, self.faithfulness, self.answer_relevancy]
    }
}

/// Means over the rows that report each metric.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricSummary {
    pub context_precision: Option<f64>,
    pub context_recall: Option<f64>,
    pub faithfulness: Option<f64>,
    pub answer_relevancy: Option<f64>,
}

impl MetricSummary {
    pub fn values(&self) -> [Option<f64>; 4] {
        [self.context_precision, self.context_recall, self.faithfulness, self.answer_relevancy]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsReport {
    pub rows: Vec<SampleMetrics>,
}

impl MetricsReport {
    pub fn summary(&self) -> MetricSummary {
        let mean = |pick: fn(&SampleMetrics) -> Option<f64>| {
            let vals: Vec<f64> = self.rows.iter().filter_map(pick).filter(|v| v.is_finite()).collect();
            if vals.is_empty() { None } else { Some(vals.iter().sum::<f64>() / vals.len() as f64) }
        };
        MetricSummary {
            context_precision: mean(|r| r.context_precision),
            context_recall: mean(|r| r.context_recall),
            faithfulness: mean(|r| r.faithfulness),
            answer_relevancy: mean(|r| r.answer_relevancy),
        }
    }
}

/// Port to an answer-quality metrics library.
pub trait MetricsScorer {
    fn score(&self, samples: &[EvalSample]) -> Result<MetricsReport>;
}

/// Runs an external scorer process: samples go to stdin as a JSON array,
/// a JSON array of `SampleMetrics` rows is expected on stdout.
#[derive(Debug, Clone)]
pub struct CommandScorer {
    program: String,
    args: Vec<String>,
}

impl CommandScorer {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self { Self { program: program.into(), args } }

    /// `["python", "score.py"]` style command line; empty -> `InvalidConfig`.
    pub fn from_command(command: &[String]) -> pagerag_core::Result<Self> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| Error::InvalidConfig("metrics.command must not be empty".to_string()))?;
        Ok(Self::new(program.clone(), args.to_vec()))
    }
}

impl MetricsScorer for CommandScorer {
    fn score(&self, samples: &[EvalSample]) -> Result<MetricsReport> {
        let input = serde_json::to_vec(samples)?;
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("starting metrics scorer '{}'", self.program))?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(&input).context("writing samples to metrics scorer")?;
        }
        let output = child.wait_with_output().context("waiting for metrics scorer")?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Operation(format!("metrics scorer exited with {}: {}", output.status, stderr.trim())).into());
        }
        let rows: Vec<SampleMetrics> =
            serde_json::from_slice(&output.stdout).context("metrics scorer printed malformed JSON")?;
        if rows.len() != samples.len() {
            return Err(Error::Operation(format!("metrics scorer returned {} rows for {} samples", rows.len(), samples.len())).into());
        }
        Ok(MetricsReport { rows })
    }
}
