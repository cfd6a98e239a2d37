use arrow_schema::{DataType, Field, Schema, TimeUnit};
use std::sync::Arc;

pub const ID_COLUMN: &str = "id";
pub const SOURCE_COLUMN: &str = "source";
pub const PAGE_COLUMN: &str = "page";
pub const CONTENT_COLUMN: &str = "content";
pub const DISTANCE_COLUMN: &str = "_distance";

/// Chunk table layout for embeddings of width `dim`.
pub fn build_chunk_schema(dim: i32) -> Arc<Schema> {
	Arc::new(Schema::new(vec![
		Field::new(ID_COLUMN, DataType::Utf8, false),
		Field::new(SOURCE_COLUMN, DataType::Utf8, false),
		Field::new(PAGE_COLUMN, DataType::UInt32, false),
		Field::new(CONTENT_COLUMN, DataType::Utf8, false),
		Field::new("content_hash", DataType::Utf8, false),
		Field::new("indexed_at", DataType::Timestamp(TimeUnit::Millisecond, None), false),
		Field::new("vector", DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dim), true),
	]))
}
