use anyhow::{anyhow, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::RwLock;

use pagerag_core::vector_math::cosine_distance;
use pagerag_core::{Error, IndexedChunk, RetrievalResult, RetrievedChunk, VectorIndex};

/// Brute-force cosine index kept in memory. Same contract as `LanceIndex`
/// for tests and one-off runs that do not need persistence.
#[derive(Default)]
pub struct MemoryIndex {
	rows: RwLock<BTreeMap<String, IndexedChunk>>,
}

impl MemoryIndex {
	pub fn new() -> Self { Self::default() }
}

fn poisoned<T>(_: T) -> anyhow::Error { anyhow!("memory index lock poisoned") }

impl VectorIndex for MemoryIndex {
	fn upsert(&self, items: &[IndexedChunk]) -> Result<()> {
		let mut rows = self.rows.write().map_err(poisoned)?;
		let expected = rows.values().next().map(|r| r.vector.len()).or_else(|| items.first().map(|i| i.vector.len()));
		for item in items {
			if let Some(dim) = expected {
				if item.vector.len() != dim {
					return Err(Error::DimensionMismatch { expected: dim, actual: item.vector.len() }.into());
				}
			}
			rows.insert(item.chunk.id.clone(), item.clone());
		}
		Ok(())
	}

	fn query(&self, vector: &[f32], k: usize) -> Result<RetrievalResult> {
		let rows = self.rows.read().map_err(poisoned)?;
		let mut hits = Vec::with_capacity(rows.len());
		for row in rows.values() {
			let distance = cosine_distance(&row.vector, vector)?;
			hits.push(RetrievedChunk { text: row.chunk.text.clone(), distance, metadata: row.metadata.clone() });
		}
		// Stable sort over id-ordered rows: ties stay in id order.
		hits.sort_by(|a, b| a.distance.partial_cmp(&b.distance).unwrap_or(std::cmp::Ordering::Equal));
		hits.truncate(k);
		Ok(RetrievalResult::new(hits))
	}

	fn delete_source(&self, source: &str) -> Result<usize> {
		let mut rows = self.rows.write().map_err(poisoned)?;
		let before = rows.len();
		rows.retain(|_, row| row.metadata.source != source);
		Ok(before - rows.len())
	}

	fn delete_stale(&self, source: &str, keep: &[String]) -> Result<usize> {
		let mut rows = self.rows.write().map_err(poisoned)?;
		let before = rows.len();
		rows.retain(|id, row| row.metadata.source != source || keep.contains(id));
		Ok(before - rows.len())
	}

	fn sources(&self) -> Result<Vec<String>> {
		let rows = self.rows.read().map_err(poisoned)?;
		let set: BTreeSet<String> = rows.values().map(|r| r.metadata.source.clone()).collect();
		Ok(set.into_iter().collect())
	}

	fn count(&self) -> Result<usize> {
		Ok(self.rows.read().map_err(poisoned)?.len())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use pagerag_core::{Chunk, ChunkMetadata};

	fn item(id: &str, source: &str, vector: Vec<f32>) -> IndexedChunk {
		IndexedChunk {
			chunk: Chunk { id: id.to_string(), page: 1, text: format!("text of {id}") },
			metadata: ChunkMetadata { page: 1, source: source.to_string() },
			vector,
		}
	}

	#[test]
	fn query_orders_by_cosine_distance() {
		let index = MemoryIndex::new();
		index
			.upsert(&[item("a_001", "a.pdf", vec![1.0, 0.0]), item("a_002", "a.pdf", vec![0.0, 1.0]), item("a_003", "a.pdf", vec![0.7, 0.7])])
			.unwrap();
		let result = index.query(&[1.0, 0.1], 2).unwrap();
		assert_eq!(result.documents(), vec!["text of a_001", "text of a_003"]);
		let d = result.distances();
		assert!(d[0] <= d[1]);
	}

	#[test]
	fn upsert_overwrites_by_id() {
		let index = MemoryIndex::new();
		index.upsert(&[item("a_001", "a.pdf", vec![1.0, 0.0])]).unwrap();
		index.upsert(&[item("a_001", "a.pdf", vec![0.0, 1.0])]).unwrap();
		assert_eq!(index.count().unwrap(), 1);
		let result = index.query(&[0.0, 1.0], 1).unwrap();
		assert!(result.distances()[0].abs() < 1e-6);
	}

	#[test]
	fn empty_index_returns_no_hits() {
		let index = MemoryIndex::new();
		assert!(index.query(&[1.0, 0.0], 5).unwrap().is_empty());
	}

	#[test]
	fn delete_source_removes_only_that_source() {
		let index = MemoryIndex::new();
		index.upsert(&[item("a_001", "a.pdf", vec![1.0, 0.0]), item("b_001", "b.pdf", vec![0.0, 1.0])]).unwrap();
		assert_eq!(index.delete_source("a.pdf").unwrap(), 1);
		assert_eq!(index.count().unwrap(), 1);
		assert_eq!(index.delete_source("missing.pdf").unwrap(), 0);
	}

	#[test]
	fn delete_stale_keeps_listed_ids_of_that_source() {
		let index = MemoryIndex::new();
		index
			.upsert(&[
				item("a_001", "a.pdf", vec![1.0, 0.0]),
				item("a_002", "a.pdf", vec![1.0, 0.0]),
				item("a_003", "a.pdf", vec![1.0, 0.0]),
				item("b_001", "b.pdf", vec![0.0, 1.0]),
			])
			.unwrap();
		assert_eq!(index.delete_stale("a.pdf", &["a_001".to_string()]).unwrap(), 2);
		assert_eq!(index.count().unwrap(), 2);
		assert_eq!(index.sources().unwrap(), vec!["a.pdf".to_string(), "b.pdf".to_string()]);
		assert_eq!(index.delete_stale("b.pdf", &[]).unwrap(), 1);
		assert_eq!(index.sources().unwrap(), vec!["a.pdf".to_string()]);
	}

	#[test]
	fn rejects_mixed_dimensions() {
		let index = MemoryIndex::new();
		index.upsert(&[item("a_001", "a.pdf", vec![1.0, 0.0])]).unwrap();
		assert!(index.upsert(&[item("a_002", "a.pdf", vec![1.0, 0.0, 0.0])]).is_err());
		assert!(index.query(&[1.0], 1).is_err());
	}
}
