use anyhow::Result;
use std::sync::Arc;

use pagerag_core::vector_math::l2_normalize;
use pagerag_core::{Embedder, Error, Generator, QueryOutcome, RetrievalResult, VectorIndex};

pub const DEFAULT_TOP_K: usize = 5;

/// Literal answer the model is told to give when the context is insufficient.
pub const FALLBACK_ANSWER: &str = "I don't know based on the provided context.";

pub fn check_top_k(k: usize) -> pagerag_core::Result<()> {
    if k == 0 {
        return Err(Error::InvalidConfig("top k must be at least 1".to_string()));
    }
    Ok(())
}

/// Prompt sent to the generator. Contexts are joined by a blank line, in rank order.
pub fn build_prompt(question: &str, contexts: &[String]) -> String {
    let context_block = contexts.join("\n\n");
    format!(
        "You are an expert assistant.\n\
         Use only the context below to answer the user's question.\n\
         If the context does not contain the answer, reply exactly: \"{FALLBACK_ANSWER}\"\n\
         \n\
         Context:\n\
         {context_block}\n\
         \n\
         Question: {question}\n\
         \n\
         Answer clearly and factually:\n"
    )
}

/// Embed one text and L2-normalize it for cosine search.
pub fn embed_query(embedder: &dyn Embedder, text: &str) -> Result<Vec<f32>> {
    let vector = embedder
        .embed_batch(&[text.to_string()])?
        .into_iter()
        .next()
        .ok_or_else(|| Error::Operation("embedder returned no vector for the query".to_string()))?;
    Ok(l2_normalize(&vector))
}

/// Stateless query orchestrator; safe to share across callers.
pub struct RagPipeline<V, G>
where
    V: VectorIndex,
    G: Generator,
{
    embedder: Arc<dyn Embedder>,
    index: V,
    generator: G,
}

impl<V, G> RagPipeline<V, G>
where
    V: VectorIndex,
    G: Generator,
{
    pub fn new(embedder: Arc<dyn Embedder>, index: V, generator: G) -> Self { Self { embedder, index, generator } }

    pub fn embedder(&self) -> &dyn Embedder { self.embedder.as_ref() }

    pub fn index(&self) -> &V { &self.index }

    pub fn retrieve(&self, question: &str, k: usize) -> Result<RetrievalResult> {
        check_top_k(k)?;
        let q_vec = embed_query(self.embedder.as_ref(), question)?;
        self.index.query(&q_vec, k)
    }

    /// Answer `question` from the top `k` chunks. An empty index still
    /// produces a prompt (with an empty context block) and an answer.
    pub fn query(&self, question: &str, k: usize) -> Result<QueryOutcome> {
        let retrieved = self.retrieve(question, k)?;
        let contexts = retrieved.documents();
        let metadatas = retrieved.metadatas();
        tracing::debug!(k, hits = contexts.len(), "retrieved contexts");

        let prompt = build_prompt(question, &contexts);
        let answer = self.generator.generate(&prompt)?.trim().to_string();
        Ok(QueryOutcome { question: question.to_string(), answer, contexts, metadatas })
    }
}
