use anyhow::Result;

use pagerag_core::{EvalItem, EvalSample, Generator, VectorIndex};
use pagerag_rag::{RagPipeline, DEFAULT_TOP_K};

use crate::scorer::{MetricsReport, MetricsScorer};

/// Runs every question through the query pipeline and hands the resulting
/// `(question, answer, contexts, ground_truth)` tuples to a metrics scorer.
pub struct EndToEndEvaluator<'a, V: VectorIndex, G: Generator> {
    pipeline: &'a RagPipeline<V, G>,
    k: usize,
}

impl<'a, V: VectorIndex, G: Generator> EndToEndEvaluator<'a, V, G> {
    pub fn new(pipeline: &'a RagPipeline<V, G>) -> Self { Self { pipeline, k: DEFAULT_TOP_K } }

    pub fn with_k(mut self, k: usize) -> Self { self.k = k; self }

    pub fn collect(&self, items: &[EvalItem]) -> Result<Vec<EvalSample>> {
        let mut samples = Vec::with_capacity(items.len());
        for item in items {
            let outcome = self.pipeline.query(&item.question, self.k)?;
            samples.push(EvalSample {
                question: outcome.question,
                answer: outcome.answer,
                contexts: outcome.contexts,
                ground_truth: item.expected.clone(),
            });
        }
        tracing::info!(samples = samples.len(), "collected end-to-end samples");
        Ok(samples)
    }

    pub fn evaluate(&self, items: &[EvalItem], scorer: &dyn MetricsScorer) -> Result<MetricsReport> {
        let samples = self.collect(items)?;
        scorer.score(&samples)
    }
}
