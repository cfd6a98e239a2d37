use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use pagerag_core::chunker::source_stem;
use pagerag_core::{Chunk, ChunkMetadata, Chunker, Embedder, Error, IndexedChunk, PageText, VectorIndex};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub sources: usize,
    pub pages: usize,
    pub chunks: usize,
    /// Rows from earlier ingests of the same sources that the new chunks no longer cover.
    pub replaced: usize,
}

/// Chunks pages, embeds the chunks and writes them to the index.
///
/// Re-ingesting a source replaces everything previously stored for it. New
/// rows are written before stale ones are removed, so a failed write leaves
/// the previous version of the source searchable.
pub struct Ingestor<V: VectorIndex> {
    chunker: Box<dyn Chunker>,
    embedder: Arc<dyn Embedder>,
    index: V,
    batch_size: usize,
}

impl<V: VectorIndex> Ingestor<V> {
    pub fn new(chunker: Box<dyn Chunker>, embedder: Arc<dyn Embedder>, index: V, batch_size: usize) -> Self {
        Self { chunker, embedder, index, batch_size: batch_size.max(1) }
    }

    pub fn index(&self) -> &V { &self.index }

    pub fn ingest(&self, pages: &[PageText]) -> Result<IngestStats> {
        if pages.is_empty() {
            return Err(Error::EmptyDocument("no pages with extractable text".to_string()).into());
        }

        let sources: BTreeSet<&str> = pages.iter().map(|p| p.source.as_str()).collect();
        self.check_stems(&sources)?;

        let mut items: Vec<(Chunk, ChunkMetadata)> = Vec::new();
        for source in &sources {
            let source_pages: Vec<PageText> = pages.iter().filter(|p| p.source == *source).cloned().collect();
            for chunk in self.chunker.chunk(&source_pages) {
                let metadata = ChunkMetadata { page: chunk.page, source: (*source).to_string() };
                items.push((chunk, metadata));
            }
        }
        tracing::info!(sources = sources.len(), pages = pages.len(), chunks = items.len(), "chunked documents");

        let vectors = self.embed_all(&items)?;

        let mut kept: BTreeMap<&str, Vec<String>> = sources.iter().map(|s| (*s, Vec::new())).collect();
        for (chunk, metadata) in &items {
            if let Some(ids) = kept.get_mut(metadata.source.as_str()) {
                ids.push(chunk.id.clone());
            }
        }
        let indexed: Vec<IndexedChunk> = items
            .into_iter()
            .zip(vectors)
            .map(|((chunk, metadata), vector)| IndexedChunk { chunk, metadata, vector })
            .collect();
        for batch in indexed.chunks(self.batch_size) {
            self.index.upsert(batch)?;
        }

        let mut replaced = 0usize;
        for (source, ids) in &kept {
            replaced += self.index.delete_stale(source, ids)?;
        }

        let stats = IngestStats { sources: sources.len(), pages: pages.len(), chunks: indexed.len(), replaced };
        tracing::info!(?stats, "ingest complete");
        Ok(stats)
    }

    /// Ids are `"{stem}_{seq}"`, so two sources with one stem would overwrite
    /// each other's rows. Rejected here, against this batch and the index.
    fn check_stems(&self, sources: &BTreeSet<&str>) -> Result<()> {
        let stored = self.index.sources()?;
        let mut owners: BTreeMap<&str, &str> = BTreeMap::new();
        for source in sources.iter().copied().chain(stored.iter().map(String::as_str)) {
            let stem = source_stem(source);
            match owners.get(stem) {
                Some(owner) if *owner != source => {
                    return Err(Error::InvalidConfig(format!(
                        "'{owner}' and '{source}' share the id stem '{stem}'; rename one of them"
                    ))
                    .into());
                }
                Some(_) => {}
                None => {
                    owners.insert(stem, source);
                }
            }
        }
        Ok(())
    }

    fn embed_all(&self, items: &[(Chunk, ChunkMetadata)]) -> Result<Vec<Vec<f32>>> {
        let pb = ProgressBar::new(items.len() as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({percent}%) {msg}")
        {
            pb.set_style(style.progress_chars("#>-"));
        }
        let mut vectors = Vec::with_capacity(items.len());
        for batch in items.chunks(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(|(c, _)| c.text.clone()).collect();
            let embs = self.embedder.embed_batch(&texts)?;
            if embs.len() != texts.len() {
                return Err(Error::Operation(format!("embedder returned {} vectors for {} chunks", embs.len(), texts.len())).into());
            }
            for e in &embs {
                if e.len() != self.embedder.dim() {
                    return Err(Error::DimensionMismatch { expected: self.embedder.dim(), actual: e.len() }.into());
                }
            }
            vectors.extend(embs);
            pb.inc(batch.len() as u64);
        }
        pb.finish_with_message("embedded");
        Ok(vectors)
    }
}
