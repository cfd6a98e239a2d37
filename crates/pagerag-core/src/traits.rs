use crate::types::{IndexedChunk, RetrievalResult};

/// Text -> fixed-length vector. One vector per input, same order.
pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    fn max_len(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;
}

/// Persistent k-nearest-neighbour store keyed by chunk id.
pub trait VectorIndex: Send + Sync {
    /// Insert or overwrite by `chunk.id`.
    fn upsert(&self, items: &[IndexedChunk]) -> anyhow::Result<()>;
    /// Up to `k` hits ascending by cosine distance.
    fn query(&self, vector: &[f32], k: usize) -> anyhow::Result<RetrievalResult>;
    /// Remove every chunk whose metadata `source` equals `source`; returns the number removed.
    fn delete_source(&self, source: &str) -> anyhow::Result<usize>;
    /// Remove chunks of `source` whose id is not in `keep`; returns the number removed.
    fn delete_stale(&self, source: &str, keep: &[String]) -> anyhow::Result<usize>;
    /// Distinct `source` values currently stored, sorted.
    fn sources(&self) -> anyhow::Result<Vec<String>>;
    fn count(&self) -> anyhow::Result<usize>;
}

/// Prompt -> completion, blocking.
pub trait Generator: Send + Sync {
    fn generate(&self, prompt: &str) -> anyhow::Result<String>;
}

impl<T: VectorIndex + ?Sized> VectorIndex for Box<T> {
    fn upsert(&self, items: &[IndexedChunk]) -> anyhow::Result<()> { (**self).upsert(items) }
    fn query(&self, vector: &[f32], k: usize) -> anyhow::Result<RetrievalResult> { (**self).query(vector, k) }
    fn delete_source(&self, source: &str) -> anyhow::Result<usize> { (**self).delete_source(source) }
    fn delete_stale(&self, source: &str, keep: &[String]) -> anyhow::Result<usize> { (**self).delete_stale(source, keep) }
    fn sources(&self) -> anyhow::Result<Vec<String>> { (**self).sources() }
    fn count(&self) -> anyhow::Result<usize> { (**self).count() }
}

impl<T: Generator + ?Sized> Generator for Box<T> {
    fn generate(&self, prompt: &str) -> anyhow::Result<String> { (**self).generate(prompt) }
}

impl<T: VectorIndex + ?Sized> VectorIndex for &T {
    fn upsert(&self, items: &[IndexedChunk]) -> anyhow::Result<()> { (**self).upsert(items) }
    fn query(&self, vector: &[f32], k: usize) -> anyhow::Result<RetrievalResult> { (**self).query(vector, k) }
    fn delete_source(&self, source: &str) -> anyhow::Result<usize> { (**self).delete_source(source) }
    fn delete_stale(&self, source: &str, keep: &[String]) -> anyhow::Result<usize> { (**self).delete_stale(source, keep) }
    fn sources(&self) -> anyhow::Result<Vec<String>> { (**self).sources() }
    fn count(&self) -> anyhow::Result<usize> { (**self).count() }
}

impl<T: Generator + ?Sized> Generator for &T {
    fn generate(&self, prompt: &str) -> anyhow::Result<String> { (**self).generate(prompt) }
}
