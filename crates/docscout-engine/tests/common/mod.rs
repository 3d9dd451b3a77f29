#![allow(dead_code)]

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use docscout_core::config::{EmbeddingProvider, Settings};
use docscout_core::loader::FileLoader;
use docscout_core::traits::{DocumentLoader, Embedder, Generator, StoreOpener, VectorStore};
use docscout_core::types::{DocumentFragment, Page, RetrievalHit};
use docscout_embed::FakeEmbedder;
use docscout_engine::Clients;

pub fn settings(source: &Path, persist: &Path) -> Settings {
    let mut s = Settings::default();
    s.source.dir = Some(source.to_string_lossy().into_owned());
    s.index.persist_dir = Some(persist.to_string_lossy().into_owned());
    s.embedding.provider = EmbeddingProvider::Fake;
    s.embedding.model = Some("fake".into());
    s
}

pub fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    fs::create_dir_all(dir).unwrap();
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

/// Write a one-font PDF with one text line per page.
pub fn write_pdf(dir: &Path, name: &str, pages: &[&str]) -> PathBuf {
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Document, Object, Stream};

    fs::create_dir_all(dir).unwrap();
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! { "Type" => "Font", "Subtype" => "Type1", "BaseFont" => "Courier" });
    let resources_id = doc.add_object(dictionary! { "Font" => dictionary! { "F1" => font_id } });
    let mut kids: Vec<Object> = Vec::new();
    for text in pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        });
        kids.push(page_id.into());
    }
    let count = i64::try_from(kids.len()).unwrap();
    doc.objects.insert(pages_id, Object::Dictionary(dictionary! { "Type" => "Pages", "Kids" => kids, "Count" => count }));
    let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
    doc.trailer.set("Root", catalog_id);
    let path = dir.join(name);
    doc.save(&path).unwrap();
    path
}

#[derive(Default)]
struct Collection {
    rows: Vec<(String, DocumentFragment, Vec<f32>)>,
    model: Option<String>,
}

/// In-memory store keyed by location. Opening a store on upsert creates the
/// location directory so the retriever sees a persisted index.
#[derive(Default)]
pub struct MemoryState {
    data: Mutex<HashMap<(PathBuf, String), Collection>>,
    pub opens: AtomicUsize,
    pub fixed_distances: Mutex<Option<Vec<f32>>>,
    pub fail_search: Mutex<bool>,
}

#[derive(Clone, Default)]
pub struct MemoryOpener {
    pub state: Arc<MemoryState>,
}

impl MemoryOpener {
    pub fn rows(&self) -> usize {
        self.state.data.lock().unwrap().values().map(|c| c.rows.len()).sum()
    }

    pub fn opens(&self) -> usize {
        self.state.opens.load(Ordering::SeqCst)
    }

    pub fn set_model(&self, location: &Path, collection: &str, model: &str) {
        let mut data = self.state.data.lock().unwrap();
        data.entry((location.to_path_buf(), collection.to_string())).or_default().model = Some(model.into());
    }

    pub fn set_distances(&self, distances: &[f32]) {
        *self.state.fixed_distances.lock().unwrap() = Some(distances.to_vec());
    }

    pub fn fail_searches(&self) {
        *self.state.fail_search.lock().unwrap() = true;
    }
}

struct MemoryStore {
    state: Arc<MemoryState>,
    key: (PathBuf, String),
}

impl StoreOpener for MemoryOpener {
    fn open(&self, location: &Path, collection: &str) -> Result<Box<dyn VectorStore>> {
        self.state.opens.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemoryStore { state: self.state.clone(), key: (location.to_path_buf(), collection.to_string()) }))
    }
}

fn l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

impl VectorStore for MemoryStore {
    fn upsert(&self, fragments: &[DocumentFragment], embeddings: &[Vec<f32>]) -> Result<usize> {
        fs::create_dir_all(&self.key.0)?;
        let mut data = self.state.data.lock().unwrap();
        let col = data.entry(self.key.clone()).or_default();
        for (f, e) in fragments.iter().zip(embeddings) {
            let id = f.content_id();
            col.rows.retain(|(existing, _, _)| existing != &id);
            col.rows.push((id, f.clone(), e.clone()));
        }
        Ok(fragments.len())
    }

    fn count(&self) -> Result<usize> {
        Ok(self.state.data.lock().unwrap().get(&self.key).map_or(0, |c| c.rows.len()))
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<RetrievalHit>> {
        if *self.state.fail_search.lock().unwrap() {
            return Err(anyhow!("storage unavailable"));
        }
        let data = self.state.data.lock().unwrap();
        let Some(col) = data.get(&self.key) else { return Ok(Vec::new()) };
        let fixed = self.state.fixed_distances.lock().unwrap().clone();
        let mut hits: Vec<RetrievalHit> = col
            .rows
            .iter()
            .enumerate()
            .map(|(i, (_, f, e))| RetrievalHit {
                fragment: f.clone(),
                distance: fixed.as_ref().and_then(|d| d.get(i).copied()).unwrap_or_else(|| l2(query, e)),
            })
            .collect();
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits.truncate(k);
        Ok(hits)
    }

    fn recorded_model(&self) -> Result<Option<String>> {
        Ok(self.state.data.lock().unwrap().get(&self.key).and_then(|c| c.model.clone()))
    }

    fn record_model(&self, model_id: &str) -> Result<()> {
        self.state.data.lock().unwrap().entry(self.key.clone()).or_default().model = Some(model_id.into());
        Ok(())
    }
}

/// Counts how many times it is asked to embed.
pub struct CountingEmbedder {
    inner: FakeEmbedder,
    pub batches: AtomicUsize,
}

impl CountingEmbedder {
    pub fn new() -> Self {
        Self { inner: FakeEmbedder::new(64), batches: AtomicUsize::new(0) }
    }
}

impl Embedder for CountingEmbedder {
    fn model_id(&self) -> &str {
        self.inner.model_id()
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.batches.fetch_add(1, Ordering::SeqCst);
        self.inner.embed_batch(texts)
    }
}

/// The shipped loader, except that it refuses files whose name contains "corrupt".
pub struct PickyLoader;

impl DocumentLoader for PickyLoader {
    fn load(&self, path: &Path) -> Result<Vec<Page>> {
        if path.to_string_lossy().contains("corrupt") {
            return Err(anyhow!("unsupported encoding"));
        }
        FileLoader::new().load(path)
    }
}

pub struct FailingGenerator;

impl Generator for FailingGenerator {
    fn generate(&self, _prompt: &str) -> Result<String> {
        Err(anyhow!("model not loaded"))
    }
}

pub struct Harness {
    pub opener: MemoryOpener,
    pub embedder: Arc<CountingEmbedder>,
}

impl Harness {
    pub fn new() -> Self {
        Self { opener: MemoryOpener::default(), embedder: Arc::new(CountingEmbedder::new()) }
    }

    pub fn clients(&self, generator: Option<Arc<dyn Generator>>) -> Clients {
        Clients {
            loader: Arc::new(PickyLoader),
            embedder: self.embedder.clone(),
            opener: Arc::new(self.opener.clone()),
            generator,
        }
    }
}
