use anyhow::Result;
use lancedb::Table;
use std::path::Path;
use tokio::runtime::Runtime;

use pagerag_core::{Error, IndexedChunk, RetrievalResult, VectorIndex};

use crate::schema::build_chunk_schema;
use crate::search::{distinct_sources, search_table};
use crate::table::{ensure_table, open_db, source_predicate, stale_predicate};
use crate::writer::{chunks_to_record_batch, merge_upsert};

/// Persistent chunk index on a local LanceDB directory.
///
/// The `VectorIndex` port is synchronous, so the index owns a tokio runtime
/// and blocks on each LanceDB call. Do not use it from inside an async task.
pub struct LanceIndex {
	rt: Runtime,
	table: Table,
	table_name: String,
	dim: usize,
}

impl LanceIndex {
	/// Open (or create) `table_name` under `db_path` for vectors of width `dim`.
	pub fn open(db_path: &Path, table_name: &str, dim: usize) -> Result<Self> {
		if dim == 0 {
			return Err(Error::InvalidConfig("embedding dimension must be positive".to_string()).into());
		}
		let rt = Runtime::new()?;
		let uri = db_path.to_string_lossy().to_string();
		let schema = build_chunk_schema(i32::try_from(dim)?);
		let table = rt.block_on(async {
			let conn = open_db(&uri).await?;
			ensure_table(&conn, table_name, schema).await
		})?;
		tracing::debug!(uri = %uri, table = table_name, dim, "opened lance index");
		Ok(Self { rt, table, table_name: table_name.to_string(), dim })
	}

	pub fn dim(&self) -> usize { self.dim }

	pub fn table_name(&self) -> &str { &self.table_name }
}

impl VectorIndex for LanceIndex {
	fn upsert(&self, items: &[IndexedChunk]) -> Result<()> {
		if items.is_empty() { return Ok(()); }
		let batch = chunks_to_record_batch(items, self.dim)?;
		self.rt.block_on(merge_upsert(&self.table, batch))?;
		tracing::debug!(table = %self.table_name, rows = items.len(), "upserted chunks");
		Ok(())
	}

	fn query(&self, vector: &[f32], k: usize) -> Result<RetrievalResult> {
		if vector.len() != self.dim {
			return Err(Error::DimensionMismatch { expected: self.dim, actual: vector.len() }.into());
		}
		if k == 0 || self.count()? == 0 {
			return Ok(RetrievalResult::default());
		}
		let hits = self.rt.block_on(search_table(&self.table, vector, k))?;
		Ok(RetrievalResult::new(hits))
	}

	fn delete_source(&self, source: &str) -> Result<usize> {
		let predicate = source_predicate(source);
		self.rt.block_on(async {
			let n = self.table.count_rows(Some(predicate.clone())).await?;
			if n > 0 {
				self.table.delete(&predicate).await?;
				tracing::info!(source, removed = n, "removed previously indexed chunks");
			}
			Ok(n)
		})
	}

	fn delete_stale(&self, source: &str, keep: &[String]) -> Result<usize> {
		let predicate = stale_predicate(source, keep);
		self.rt.block_on(async {
			let n = self.table.count_rows(Some(predicate.clone())).await?;
			if n > 0 {
				self.table.delete(&predicate).await?;
				tracing::info!(source, removed = n, "removed stale chunks");
			}
			Ok(n)
		})
	}

	fn sources(&self) -> Result<Vec<String>> {
		self.rt.block_on(distinct_sources(&self.table))
	}

	fn count(&self) -> Result<usize> {
		Ok(self.rt.block_on(self.table.count_rows(None))?)
	}
}
