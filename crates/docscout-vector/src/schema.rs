use arrow_schema::{DataType, Field, Schema};
use std::sync::Arc;

/// Row layout of a collection table. The vector width follows the embedder.
pub fn build_fragment_schema(dim: i32) -> Arc<Schema> {
	Arc::new(Schema::new(vec![
		Field::new("id", DataType::Utf8, false),
		Field::new("source_path", DataType::Utf8, false),
		Field::new("page_number", DataType::Int32, true),
		Field::new("start", DataType::Int64, false),
		Field::new("text", DataType::Utf8, false),
		Field::new("vector", DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dim), true),
	]))
}

pub fn build_meta_schema() -> Arc<Schema> {
	Arc::new(Schema::new(vec![
		Field::new("key", DataType::Utf8, false),
		Field::new("value", DataType::Utf8, false),
		Field::new("updated_at", DataType::Timestamp(arrow_schema::TimeUnit::Millisecond, None), false),
	]))
}
