use anyhow::Result;

use pagerag_core::vector_math::{cosine_similarity, l2_normalize};
use pagerag_core::{Embedder, EvalItem, EvalScore, VectorIndex};
use pagerag_rag::{check_top_k, embed_query, DEFAULT_TOP_K};

pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.45;

/// 1 if any chunk is at least `threshold` cosine-similar to `expected`, else 0.
///
/// An empty chunk list scores 0 without touching the embedder.
pub fn semantic_match(embedder: &dyn Embedder, chunks: &[String], expected: &str, threshold: f32) -> Result<u8> {
    if chunks.is_empty() {
        return Ok(0);
    }
    let chunk_vecs = embedder.embed_batch(chunks)?;
    let expected_vec = embed_query(embedder, expected)?;
    let mut best = f32::NEG_INFINITY;
    for v in &chunk_vecs {
        best = best.max(cosine_similarity(&l2_normalize(v), &expected_vec)?);
    }
    Ok(u8::from(best >= threshold))
}

/// Mean of the binary scores; 0.0 for an empty set.
pub fn recall_at_k(scores: &[EvalScore]) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }
    scores.iter().map(|s| f64::from(s.score)).sum::<f64>() / scores.len() as f64
}

/// Recall@k: does any of the top `k` retrieved chunks carry the expected answer?
pub struct RetrievalEvaluator<'a> {
    embedder: &'a dyn Embedder,
    index: &'a dyn VectorIndex,
    k: usize,
    threshold: f32,
}

impl<'a> RetrievalEvaluator<'a> {
    pub fn new(embedder: &'a dyn Embedder, index: &'a dyn VectorIndex) -> Self {
        Self { embedder, index, k: DEFAULT_TOP_K, threshold: DEFAULT_SIMILARITY_THRESHOLD }
    }

    pub fn with_k(mut self, k: usize) -> Self { self.k = k; self }

    pub fn with_threshold(mut self, threshold: f32) -> Self { self.threshold = threshold; self }

    pub fn k(&self) -> usize { self.k }

    pub fn run(&self, items: &[EvalItem]) -> Result<Vec<EvalScore>> {
        check_top_k(self.k)?;
        let mut scores = Vec::with_capacity(items.len());
        for item in items {
            let q_vec = embed_query(self.embedder, &item.question)?;
            let retrieved = self.index.query(&q_vec, self.k)?;
            let score = semantic_match(self.embedder, &retrieved.documents(), &item.expected, self.threshold)?;
            tracing::debug!(question = %item.question, score, "retrieval scored");
            scores.push(EvalScore { question: item.question.clone(), score });
        }
        tracing::info!(k = self.k, questions = scores.len(), recall = recall_at_k(&scores), "retrieval evaluation done");
        Ok(scores)
    }
}
