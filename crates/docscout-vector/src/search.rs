use anyhow::{anyhow, Result};
use arrow_array::{Array, Float32Array, Int32Array, Int64Array, RecordBatch, StringArray};
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{Connection, DistanceType};

use docscout_core::config::DistanceMetric;
use docscout_core::types::{DocumentFragment, RetrievalHit};
use crate::table::table_exists;

pub fn distance_type(metric: DistanceMetric) -> DistanceType {
	match metric {
		DistanceMetric::L2 => DistanceType::L2,
		DistanceMetric::Cosine => DistanceType::Cosine,
		DistanceMetric::Dot => DistanceType::Dot,
	}
}

/// k-nearest-neighbour search, most similar first. A missing table is an
/// empty collection, not an error.
pub async fn search_fragments(conn: &Connection, table: &str, query: &[f32], k: usize, metric: DistanceMetric) -> Result<Vec<RetrievalHit>> {
	if !table_exists(conn, table).await? { return Ok(Vec::new()); }
	let t = conn.open_table(table).execute().await?;
	let mut results = t.vector_search(query.to_vec())?.distance_type(distance_type(metric)).limit(k).execute().await?;
	let mut hits = Vec::new();
	while let Some(batch) = TryStreamExt::try_next(&mut results).await? {
		hits.extend(batch_to_hits(&batch)?);
	}
	hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
	hits.truncate(k);
	Ok(hits)
}

fn column<'a, T: 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T> {
	batch
		.column_by_name(name)
		.and_then(|c| c.as_any().downcast_ref::<T>())
		.ok_or_else(|| anyhow!("column '{}' missing or of unexpected type", name))
}

fn batch_to_hits(batch: &RecordBatch) -> Result<Vec<RetrievalHit>> {
	let paths = column::<StringArray>(batch, "source_path")?;
	let pages = column::<Int32Array>(batch, "page_number")?;
	let starts = column::<Int64Array>(batch, "start")?;
	let texts = column::<StringArray>(batch, "text")?;
	let distances = column::<Float32Array>(batch, "_distance")?;
	let mut hits = Vec::with_capacity(batch.num_rows());
	for i in 0..batch.num_rows() {
		let page_number = if pages.is_null(i) { None } else { u32::try_from(pages.value(i)).ok() };
		hits.push(RetrievalHit {
			fragment: DocumentFragment {
				text: texts.value(i).to_string(),
				source_path: paths.value(i).to_string(),
				page_number,
				start: usize::try_from(starts.value(i)).unwrap_or(0),
			},
			distance: distances.value(i),
		});
	}
	Ok(hits)
}
