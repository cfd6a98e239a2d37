use anyhow::Result;
use arrow_array::{FixedSizeListArray, RecordBatch, RecordBatchIterator, StringArray, TimestampMillisecondArray, UInt32Array};
use chrono::Utc;
use lancedb::Table;
use std::sync::Arc;

use pagerag_core::{Error, IndexedChunk};

use crate::schema::build_chunk_schema;

/// Build one record batch; every vector must have exactly `dim` entries.
pub fn chunks_to_record_batch(items: &[IndexedChunk], dim: usize) -> Result<RecordBatch> {
	let width = i32::try_from(dim)?;
	let schema = build_chunk_schema(width);
	let mut ids = Vec::with_capacity(items.len());
	let mut sources = Vec::with_capacity(items.len());
	let mut pages = Vec::with_capacity(items.len());
	let mut contents = Vec::with_capacity(items.len());
	let mut hashes = Vec::with_capacity(items.len());
	let mut vectors: Vec<Option<Vec<Option<f32>>>> = Vec::with_capacity(items.len());
	for item in items {
		if item.vector.len() != dim {
			return Err(Error::DimensionMismatch { expected: dim, actual: item.vector.len() }.into());
		}
		ids.push(item.chunk.id.clone());
		sources.push(item.metadata.source.clone());
		pages.push(item.metadata.page);
		contents.push(item.chunk.text.clone());
		hashes.push(blake3::hash(item.chunk.text.as_bytes()).to_hex().to_string());
		vectors.push(Some(item.vector.iter().map(|&x| Some(x)).collect()));
	}
	let indexed_at = vec![Utc::now().timestamp_millis(); items.len()];
	let record_batch = RecordBatch::try_new(schema, vec![
		Arc::new(StringArray::from(ids)),
		Arc::new(StringArray::from(sources)),
		Arc::new(UInt32Array::from(pages)),
		Arc::new(StringArray::from(contents)),
		Arc::new(StringArray::from(hashes)),
		Arc::new(TimestampMillisecondArray::from(indexed_at)),
		Arc::new(FixedSizeListArray::from_iter_primitive::<arrow_array::types::Float32Type, _, _>(vectors.into_iter(), width)),
	])?;
	Ok(record_batch)
}

/// Insert new ids and overwrite existing ones.
pub async fn merge_upsert(table: &Table, batch: RecordBatch) -> Result<()> {
	let schema = batch.schema();
	let reader = Box::new(RecordBatchIterator::new(vec![Ok(batch)].into_iter(), schema));
	let mut mi = table.merge_insert(&[crate::schema::ID_COLUMN]);
	mi.when_matched_update_all(None).when_not_matched_insert_all();
	mi.execute(reader).await?;
	Ok(())
}
