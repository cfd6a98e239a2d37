use anyhow::Result;

use pagerag_core::{EvalItem, EvalSample, EvalScore, Generator, VectorIndex};

use crate::end_to_end::EndToEndEvaluator;
use crate::retrieval::{recall_at_k, RetrievalEvaluator};
use crate::scorer::{MetricsReport, MetricsScorer};

#[derive(Debug, Clone, PartialEq)]
pub enum EndToEndStatus {
    /// Samples were collected and scored.
    Scored { samples: Vec<EvalSample>, report: MetricsReport },
    /// Samples were collected but no scorer is configured.
    Collected(Vec<EvalSample>),
    Skipped,
    /// Collection or scoring failed; retrieval results are still valid.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationRun {
    pub k: usize,
    pub retrieval: Vec<EvalScore>,
    pub recall: f64,
    pub end_to_end: EndToEndStatus,
}

/// Retrieval evaluation first (failures are fatal), then the end-to-end pass,
/// whose failures are recorded in the run instead of aborting it.
pub fn run_all<V, G>(
    retrieval: &RetrievalEvaluator<'_>,
    end_to_end: Option<&EndToEndEvaluator<'_, V, G>>,
    scorer: Option<&dyn MetricsScorer>,
    items: &[EvalItem],
) -> Result<EvaluationRun>
where
    V: VectorIndex,
    G: Generator,
{
    tracing::info!(questions = items.len(), "running retrieval evaluation");
    let scores = retrieval.run(items)?;
    let recall = recall_at_k(&scores);

    let status = match end_to_end {
        None => EndToEndStatus::Skipped,
        Some(evaluator) => {
            tracing::info!("running end-to-end evaluation");
            match end_to_end_pass(evaluator, scorer, items) {
                Ok(status) => status,
                Err(e) => {
                    tracing::warn!(error = %e, "end-to-end evaluation failed; keeping retrieval results");
                    EndToEndStatus::Failed(format!("{e:#}"))
                }
            }
        }
    };
    Ok(EvaluationRun { k: retrieval.k(), retrieval: scores, recall, end_to_end: status })
}

fn end_to_end_pass<V: VectorIndex, G: Generator>(
    evaluator: &EndToEndEvaluator<'_, V, G>,
    scorer: Option<&dyn MetricsScorer>,
    items: &[EvalItem],
) -> Result<EndToEndStatus> {
    let samples = evaluator.collect(items)?;
    match scorer {
        Some(scorer) => {
            let report = scorer.score(&samples)?;
            Ok(EndToEndStatus::Scored { samples, report })
        }
        None => Ok(EndToEndStatus::Collected(samples)),
    }
}
