use docscout_core::chunker::Chunker;
use docscout_core::config::DistanceMetric;
use docscout_core::traits::{Embedder, VectorStore};
use docscout_core::types::Page;
use docscout_embed::FakeEmbedder;
use docscout_vector::LanceStore;
use tempfile::TempDir;

fn corpus() -> Vec<(&'static str, &'static str)> {
    vec![
        ("/docs/invoice_2023.pdf", "Invoice 2023. The due date for payment is 15 March."),
        ("/docs/garden.txt", "Tomatoes need water every morning during the summer."),
        ("/docs/fire.txt", "Build a fire with dry kindling and keep the fire small."),
    ]
}

#[test]
fn lancedb_full_flow() {
    let tmp = TempDir::new().expect("tmp");
    let location = tmp.path().join("index");
    let embedder = FakeEmbedder::new(64);
    let chunker = Chunker::default();
    let fragments: Vec<_> = corpus()
        .into_iter()
        .flat_map(|(path, text)| chunker.chunk(path, &[Page::new(text, Some(1))]))
        .collect();
    let texts: Vec<String> = fragments.iter().map(|f| f.text.clone()).collect();
    let embeddings = embedder.embed_batch(&texts).expect("embed");

    let store = LanceStore::open(&location, "documents_test", DistanceMetric::L2).expect("store");
    assert_eq!(store.count().expect("count"), 0, "missing table counts as empty");
    assert_eq!(store.upsert(&fragments, &embeddings).expect("upsert"), 3);
    assert_eq!(store.count().expect("count"), 3);

    let query = embedder.embed_query("fire kindling").expect("query");
    let hits = store.search(&query, 2).expect("search");
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].fragment.source_path, "/docs/fire.txt");
    assert_eq!(hits[0].fragment.page_number, Some(1));
    assert!(hits[0].distance <= hits[1].distance);
    assert!(hits.iter().all(|h| h.distance >= 0.0));
}

#[test]
fn search_on_missing_collection_is_empty() {
    let tmp = TempDir::new().expect("tmp");
    let store = LanceStore::open(tmp.path(), "nothing_here", DistanceMetric::Cosine).expect("store");
    let hits = store.search(&[0.0, 1.0, 0.0], 3).expect("search");
    assert!(hits.is_empty());
}
