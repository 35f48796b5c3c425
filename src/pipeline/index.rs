//! Index Builder (C5, spec §4.6): `StructuredRecord`s -> embedded
//! `IndexedDoc`s in a persistent vector store.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{IndexedDoc, IndexedDocMetadata, StructuredRecord};

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("I/O error accessing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("embedding collaborator call failed: {0}")]
    Embedding(String),
    #[error("no index has been built or loaded")]
    IndexAbsent,
}

/// The embedding collaborator, external to the core (spec §1, §6):
/// `Embed(texts) -> vectors`.
pub trait EmbeddingClient: Send + Sync {
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, IndexError>;
}

/// Render an `IndexedDoc`'s content deterministically from a
/// `StructuredRecord` (spec §4.6). Exact casing, fallbacks, and
/// spelling are the contract: future embeddings are keyed against this
/// substrate, so nothing here may be "tidied up".
pub fn render_content(record: &StructuredRecord) -> String {
    let patient = non_empty_or(&record.patient, "Not given");
    let diagnosis = non_empty_or(&record.diagnosis, "Not given");
    let treatment = non_empty_or(&record.treatment, "Not Given");
    let follow_up = non_empty_or(&record.follow_up, "Not Given");

    format!(
        "Name of the patient is {patient}. The Patient's diagnosed detail is {diagnosis} and the suggested treatment is {treatment} and the followup is {follow_up}"
    )
}

fn non_empty_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.trim().is_empty() {
        fallback
    } else {
        value
    }
}

pub fn build_indexed_doc(doc_id: &str, record: &StructuredRecord) -> IndexedDoc {
    IndexedDoc {
        content: render_content(record),
        metadata: IndexedDocMetadata {
            source_file: doc_id.to_string(),
            patient_name: record.patient.clone(),
        },
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct IndexEntry {
    doc: IndexedDoc,
    embedding: Vec<f32>,
}

/// A persistent similarity index of embedded `IndexedDoc`s (spec §4.6,
/// §3 invariant 5: at most one `IndexedDoc` per `DocumentId`).
///
/// Backed by a flat file of entries rather than an external vector
/// database, matching spec §1's framing of the embedding model (not a
/// vector store product) as the external collaborator.
pub struct VectorIndex {
    entries: RwLock<Vec<IndexEntry>>,
}

impl VectorIndex {
    fn empty() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Embed `docs` and persist the resulting index to `dir` (spec
    /// §4.6: `build_index(docs)`).
    pub fn build(
        embedder: &dyn EmbeddingClient,
        docs: Vec<IndexedDoc>,
        dir: &Path,
    ) -> Result<Self, IndexError> {
        let texts: Vec<String> = docs.iter().map(|d| d.content.clone()).collect();
        let vectors = embedder.embed(&texts)?;
        if vectors.len() != docs.len() {
            return Err(IndexError::Embedding(format!(
                "embedder returned {} vectors for {} documents",
                vectors.len(),
                docs.len()
            )));
        }

        let mut entries: Vec<IndexEntry> = docs
            .into_iter()
            .zip(vectors)
            .map(|(doc, embedding)| IndexEntry { doc, embedding })
            .collect();
        dedupe_by_source_file(&mut entries);

        let index = Self {
            entries: RwLock::new(entries),
        };
        index.persist(dir)?;
        Ok(index)
    }

    /// Rehydrate from `dir` (spec §4.6: `load_index()`).
    pub fn load(dir: &Path) -> Result<Self, IndexError> {
        let path = index_file(dir);
        if !path.exists() {
            return Err(IndexError::IndexAbsent);
        }
        let contents = fs::read_to_string(&path).map_err(|e| IndexError::Io {
            path: path.clone(),
            source: e,
        })?;
        let entries: Vec<IndexEntry> = serde_json::from_str(&contents)?;
        Ok(Self {
            entries: RwLock::new(entries),
        })
    }

    /// Load the index at `dir` if present, otherwise start an empty one
    /// that will persist on the first `build`/`upsert` call.
    pub fn load_or_empty(dir: &Path) -> Result<Self, IndexError> {
        match Self::load(dir) {
            Ok(index) => Ok(index),
            Err(IndexError::IndexAbsent) => Ok(Self::empty()),
            Err(e) => Err(e),
        }
    }

    fn persist(&self, dir: &Path) -> Result<(), IndexError> {
        fs::create_dir_all(dir).map_err(|e| IndexError::Io {
            path: dir.to_path_buf(),
            source: e,
        })?;
        let path = index_file(dir);
        let entries = self.entries.read().expect("index lock poisoned");
        let json = serde_json::to_string_pretty(&*entries)?;
        fs::write(&path, json).map_err(|e| IndexError::Io { path, source: e })?;
        Ok(())
    }

    pub fn upsert(&self, entry_doc: IndexedDoc, embedding: Vec<f32>, dir: &Path) -> Result<(), IndexError> {
        {
            let mut entries = self.entries.write().expect("index lock poisoned");
            entries.retain(|e| e.doc.metadata.source_file != entry_doc.metadata.source_file);
            entries.push(IndexEntry {
                doc: entry_doc,
                embedding,
            });
        }
        self.persist(dir)
    }

    pub fn len(&self) -> usize {
        self.entries.read().expect("index lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return the `k` nearest `IndexedDoc`s to `query_embedding` by
    /// cosine similarity, descending (spec §4.6: default `k = 1`).
    pub fn retrieve_by_embedding(&self, query_embedding: &[f32], k: usize) -> Vec<IndexedDoc> {
        let entries = self.entries.read().expect("index lock poisoned");
        let mut scored: Vec<(f32, &IndexEntry)> = entries
            .iter()
            .map(|e| (cosine_similarity(query_embedding, &e.embedding), e))
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored
            .into_iter()
            .take(k)
            .map(|(_, e)| e.doc.clone())
            .collect()
    }

    /// Embed `query` and retrieve the `k` nearest documents. Retrieval
    /// against an index that was never built or loaded fails with
    /// `IndexAbsent` (spec §4.6, §7).
    pub fn retrieve(
        &self,
        embedder: &dyn EmbeddingClient,
        query: &str,
        k: usize,
    ) -> Result<Vec<IndexedDoc>, IndexError> {
        if self.is_empty() {
            return Err(IndexError::IndexAbsent);
        }
        let vectors = embedder.embed(&[query.to_string()])?;
        let query_embedding = vectors.into_iter().next().ok_or_else(|| {
            IndexError::Embedding("embedder returned no vector for query".into())
        })?;
        Ok(self.retrieve_by_embedding(&query_embedding, k))
    }
}

fn dedupe_by_source_file(entries: &mut Vec<IndexEntry>) {
    let mut seen = std::collections::HashSet::new();
    entries.retain(|e| seen.insert(e.doc.metadata.source_file.clone()));
}

fn index_file(dir: &Path) -> PathBuf {
    dir.join("index.json")
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}
