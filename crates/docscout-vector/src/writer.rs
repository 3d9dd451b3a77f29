use anyhow::{anyhow, ensure, Result};
use arrow_array::{FixedSizeListArray, Int32Array, Int64Array, RecordBatch, RecordBatchIterator, StringArray};
use indicatif::{ProgressBar, ProgressStyle};
use lancedb::Connection;
use std::collections::HashSet;
use std::sync::Arc;

use docscout_core::types::DocumentFragment;
use crate::schema::build_fragment_schema;
use crate::table::table_exists;

const BATCH_SIZE: usize = 1000;

/// One row to be written: the fragment, its key and its embedding.
struct Row<'a> {
	id: String,
	fragment: &'a DocumentFragment,
	vector: &'a [f32],
}

/// Write `fragments` into `table`, replacing rows that share a content id.
/// Duplicates inside the input collapse to their first occurrence.
pub async fn upsert_fragments(conn: &Connection, table: &str, fragments: &[DocumentFragment], embeddings: &[Vec<f32>]) -> Result<usize> {
	ensure!(fragments.len() == embeddings.len(), "fragments ({}) and embeddings ({}) length must match", fragments.len(), embeddings.len());
	if fragments.is_empty() { return Ok(0); }
	let dim = embeddings[0].len();
	ensure!(dim > 0, "embedder returned empty vectors");

	let mut seen = HashSet::new();
	let mut rows = Vec::with_capacity(fragments.len());
	for (fragment, vector) in fragments.iter().zip(embeddings) {
		ensure!(vector.len() == dim, "embedding width mismatch: got {} expected {}", vector.len(), dim);
		let id = fragment.content_id();
		if seen.insert(id.clone()) {
			rows.push(Row { id, fragment, vector });
		}
	}
	if rows.len() < fragments.len() {
		tracing::debug!(duplicates = fragments.len() - rows.len(), "collapsed duplicate fragments");
	}

	tracing::info!(rows = rows.len(), table, "writing fragments");
	let pb = ProgressBar::new(rows.len() as u64);
	pb.set_style(ProgressStyle::default_bar().template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} fragments ({percent}%)")?.progress_chars("#>-"));
	let dim = i32::try_from(dim).map_err(|_| anyhow!("embedding width {} does not fit the schema", dim))?;
	for batch in rows.chunks(BATCH_SIZE) {
		let record_batch = rows_to_record_batch(batch, dim)?;
		write_batch(conn, table, record_batch).await?;
		pb.inc(batch.len() as u64);
	}
	pb.finish_and_clear();
	Ok(rows.len())
}

async fn write_batch(conn: &Connection, table: &str, record_batch: RecordBatch) -> Result<()> {
	let schema = record_batch.schema();
	let reader = Box::new(RecordBatchIterator::new(vec![Ok(record_batch)].into_iter(), schema));
	if table_exists(conn, table).await? {
		let t = conn.open_table(table).execute().await?;
		let mut mi = t.merge_insert(&["id"]);
		mi.when_matched_update_all(None).when_not_matched_insert_all();
		mi.execute(reader).await?;
	} else {
		conn.create_table(table, reader).execute().await?;
	}
	Ok(())
}

fn rows_to_record_batch(rows: &[Row<'_>], dim: i32) -> Result<RecordBatch> {
	let schema = build_fragment_schema(dim);
	let ids: Vec<&str> = rows.iter().map(|r| r.id.as_str()).collect();
	let paths: Vec<&str> = rows.iter().map(|r| r.fragment.source_path.as_str()).collect();
	let pages: Vec<Option<i32>> = rows.iter().map(|r| r.fragment.page_number.and_then(|p| i32::try_from(p).ok())).collect();
	let starts: Vec<i64> = rows.iter().map(|r| i64::try_from(r.fragment.start).unwrap_or(i64::MAX)).collect();
	let texts: Vec<&str> = rows.iter().map(|r| r.fragment.text.as_str()).collect();
	let vectors = rows.iter().map(|r| Some(r.vector.iter().copied().map(Some).collect::<Vec<_>>()));
	let record_batch = RecordBatch::try_new(schema, vec![
		Arc::new(StringArray::from(ids)),
		Arc::new(StringArray::from(paths)),
		Arc::new(Int32Array::from(pages)),
		Arc::new(Int64Array::from(starts)),
		Arc::new(StringArray::from(texts)),
		Arc::new(FixedSizeListArray::from_iter_primitive::<arrow_array::types::Float32Type, _, _>(vectors, dim)),
	])?;
	Ok(record_batch)
}
