use anyhow::{anyhow, Result};
use arrow_array::{Array, Float32Array, RecordBatch, StringArray, UInt32Array};
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase, Select};
use std::collections::BTreeSet;
use lancedb::{DistanceType, Table};

use pagerag_core::{ChunkMetadata, RetrievedChunk};

use crate::schema::{CONTENT_COLUMN, DISTANCE_COLUMN, PAGE_COLUMN, SOURCE_COLUMN};

fn typed_column<'a, T: Array + 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T> {
	batch
		.column_by_name(name)
		.and_then(|c| c.as_any().downcast_ref::<T>())
		.ok_or_else(|| anyhow!("missing or mistyped column '{}'", name))
}

pub fn batch_to_hits(batch: &RecordBatch) -> Result<Vec<RetrievedChunk>> {
	let content = typed_column::<StringArray>(batch, CONTENT_COLUMN)?;
	let source = typed_column::<StringArray>(batch, SOURCE_COLUMN)?;
	let page = typed_column::<UInt32Array>(batch, PAGE_COLUMN)?;
	let distance = typed_column::<Float32Array>(batch, DISTANCE_COLUMN)?;
	Ok((0..batch.num_rows())
		.map(|i| RetrievedChunk {
			text: content.value(i).to_string(),
			distance: distance.value(i),
			metadata: ChunkMetadata { page: page.value(i), source: source.value(i).to_string() },
		})
		.collect())
}

/// Cosine k-NN over the chunk table, ascending by distance.
pub async fn search_table(table: &Table, vector: &[f32], k: usize) -> Result<Vec<RetrievedChunk>> {
	let mut stream = table
		.vector_search(vector.to_vec())?
		.distance_type(DistanceType::Cosine)
		.limit(k)
		.execute()
		.await?;
	let mut hits = Vec::new();
	while let Some(batch) = stream.try_next().await? {
		hits.extend(batch_to_hits(&batch)?);
	}
	hits.sort_by(|a, b| a.distance.partial_cmp(&b.distance).unwrap_or(std::cmp::Ordering::Equal));
	hits.truncate(k);
	Ok(hits)
}

/// Distinct values of the `source` column, sorted.
pub async fn distinct_sources(table: &Table) -> Result<Vec<String>> {
	let mut stream = table.query().select(Select::columns(&[SOURCE_COLUMN])).execute().await?;
	let mut sources = BTreeSet::new();
	while let Some(batch) = stream.try_next().await? {
		let column = typed_column::<StringArray>(&batch, SOURCE_COLUMN)?;
		sources.extend((0..batch.num_rows()).map(|i| column.value(i).to_string()));
	}
	Ok(sources.into_iter().collect())
}
