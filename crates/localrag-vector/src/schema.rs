use arrow_schema::{DataType, Field, Schema};
use std::sync::Arc;

pub const CHUNKS_TABLE: &str = "chunks";
pub const META_TABLE: &str = "meta";

pub fn build_chunks_schema(dim: i32) -> Arc<Schema> {
	Arc::new(Schema::new(vec![
		Field::new("position", DataType::Int64, false),
		Field::new("source_index", DataType::Int64, false),
		Field::new("source_offset", DataType::Int64, false),
		Field::new("text", DataType::Utf8, false),
		Field::new("vector", DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dim), true),
	]))
}

pub fn build_meta_schema() -> Arc<Schema> {
	Arc::new(Schema::new(vec![
		Field::new("key", DataType::Utf8, false),
		Field::new("value", DataType::Utf8, false),
	]))
}
