//! Domain types shared by the chunker, the index adapters, the query
//! pipeline and the evaluators.

use serde::{Deserialize, Serialize};

pub type ChunkId = String;

/// Text of one non-empty page of a source document.
///
/// - `page`: 1-based physical page number
/// - `text`: page text with line breaks flattened
/// - `source`: file name of the originating document (e.g. `report.pdf`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageText {
    pub page: u32,
    pub text: String,
    pub source: String,
}

impl PageText {
    pub fn new(page: u32, text: impl Into<String>, source: impl Into<String>) -> Self {
        Self { page, text: text.into(), source: source.into() }
    }
}

/// A bounded span of one page's text; the unit of retrieval.
///
/// `id` is `"{source_stem}_{seq:03}"`. A chunk never spans pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: ChunkId,
    pub page: u32,
    pub text: String,
}

/// Metadata stored next to every indexed chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub page: u32,
    pub source: String,
}

/// A chunk together with its embedding, ready for upsert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedChunk {
    pub chunk: Chunk,
    pub metadata: ChunkMetadata,
    pub vector: Vec<f32>,
}

/// One ranked hit. `distance` is cosine distance, lower is more similar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub text: String,
    pub distance: f32,
    pub metadata: ChunkMetadata,
}

/// Hits for a single query vector, ascending by distance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub hits: Vec<RetrievedChunk>,
}

impl RetrievalResult {
    pub fn new(hits: Vec<RetrievedChunk>) -> Self { Self { hits } }

    pub fn len(&self) -> usize { self.hits.len() }

    pub fn is_empty(&self) -> bool { self.hits.is_empty() }

    /// Chunk texts in rank order.
    pub fn documents(&self) -> Vec<String> { self.hits.iter().map(|h| h.text.clone()).collect() }

    /// Metadata in rank order.
    pub fn metadatas(&self) -> Vec<ChunkMetadata> { self.hits.iter().map(|h| h.metadata.clone()).collect() }

    pub fn distances(&self) -> Vec<f32> { self.hits.iter().map(|h| h.distance).collect() }
}

/// Answer plus the exact contexts that were placed in the prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryOutcome {
    pub question: String,
    pub answer: String,
    pub contexts: Vec<String>,
    pub metadatas: Vec<ChunkMetadata>,
}

/// A labeled evaluation question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvalItem {
    pub question: String,
    pub expected: String,
}

/// Binary retrieval hit/miss for one question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvalScore {
    pub question: String,
    pub score: u8,
}

/// One end-to-end evaluation tuple handed to the metrics scorer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalSample {
    pub question: String,
    pub answer: String,
    pub contexts: Vec<String>,
    pub ground_truth: String,
}
