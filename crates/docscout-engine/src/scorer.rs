//! Relative trust scoring and response assembly.
//!
//! Trust is a min-max normalisation of the distances of one result set:
//! the closest hit scores 100, the farthest 0. Scores are only comparable
//! inside a single response.

use std::sync::Arc;

use docscout_core::traits::Generator;
use docscout_core::types::{RetrievalHit, RetrievalResponse, ScoredSource};

use crate::summary;

/// Map distances to trust percentages in `[0, 100]`, rounded to 2 decimals.
/// When every distance is equal (including a single hit) all score 100.
pub fn trust_scores(distances: &[f32]) -> Vec<f64> {
    let (min, max) = distances
        .iter()
        .map(|&d| f64::from(d))
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), d| (lo.min(d), hi.max(d)));
    let range = max - min;
    distances
        .iter()
        .map(|&d| {
            if range <= 0.0 {
                return 100.0;
            }
            let trust = (1.0 - (f64::from(d) - min) / range) * 100.0;
            round2(trust.clamp(0.0, 100.0))
        })
        .collect()
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Turns ranked hits into a [`RetrievalResponse`].
#[derive(Clone, Default)]
pub struct Assembler {
    generator: Option<Arc<dyn Generator>>,
}

impl Assembler {
    pub fn new(generator: Option<Arc<dyn Generator>>) -> Self {
        Self { generator }
    }

    pub fn assemble(&self, query: &str, mut hits: Vec<RetrievalHit>) -> RetrievalResponse {
        if hits.is_empty() {
            return RetrievalResponse {
                summary: format!("no matches found for {query}"),
                sources: Vec::new(),
                total_hits: 0,
                error: None,
            };
        }
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));

        let distances: Vec<f32> = hits.iter().map(|h| h.distance).collect();
        let sources = hits
            .iter()
            .zip(trust_scores(&distances))
            .map(|(hit, trust)| ScoredSource::new(&hit.fragment.source_path, trust))
            .collect();
        let summary = summary::summarize(self.generator.as_deref(), query, &hits);

        RetrievalResponse { summary, sources, total_hits: hits.len(), error: None }
    }
}
