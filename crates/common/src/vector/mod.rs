//! Vector index capability
//!
//! "upsert / nearest-neighbor query by vector" over unit-normalized
//! embeddings. The backing store is rebuilt wholesale on every upload
//! (no incremental update): `rebuild` swaps in a freshly built snapshot
//! tagged with a new generation, so readers holding the previous snapshot
//! finish against a consistent view.

use crate::embeddings::cosine_similarity;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Typed vector-index metadata for one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocMetadata {
    pub title: String,
    pub authors: String,
    pub journal: String,
    pub year: String,
    pub doi: String,
    /// Resolvable access link (explicit URL or DOI resolver).
    pub link: String,
    /// Abstract truncated for display.
    pub snippet: String,
    pub vhb_ranking: String,
    pub abdc_ranking: String,
    pub citations: Option<u32>,
}

/// The unit stored in the vector index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedDocument {
    /// Document id (= DOI)
    pub id: String,
    /// Unit-normalized embedding
    pub embedding: Vec<f32>,
    /// The text that was embedded (title/abstract/authors/journal/year)
    pub text_block: String,
    pub metadata: DocMetadata,
}

/// A query hit with its cosine similarity.
#[derive(Debug, Clone)]
pub struct ScoredDoc {
    pub document: IndexedDocument,
    pub similarity: f32,
}

/// Trait for the vector index capability
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Replace the entire index contents under a fresh generation.
    async fn rebuild(&self, documents: Vec<IndexedDocument>) -> Result<()>;

    /// Nearest neighbors by cosine similarity, descending.
    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<ScoredDoc>>;

    /// Fetch documents by id, preserving the requested order. Unknown ids
    /// are skipped.
    async fn fetch(&self, ids: &[String]) -> Result<Vec<IndexedDocument>>;

    /// Current dataset generation (bumped by every rebuild).
    fn generation(&self) -> u64;

    /// Number of indexed documents.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Default)]
struct Snapshot {
    documents: Vec<IndexedDocument>,
    by_id: HashMap<String, usize>,
    generation: u64,
}

/// In-process brute-force vector index
///
/// Exhaustive cosine scan over unit vectors. Corpora here are bibliographic
/// exports (thousands of rows, not millions); a remote ANN index can
/// replace this behind the same trait.
pub struct MemoryIndex {
    snapshot: RwLock<Arc<Snapshot>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self {
            snapshot: RwLock::new(Arc::new(Snapshot::default())),
        }
    }

    fn load(&self) -> Arc<Snapshot> {
        self.snapshot
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl Default for MemoryIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    async fn rebuild(&self, documents: Vec<IndexedDocument>) -> Result<()> {
        let by_id = documents
            .iter()
            .enumerate()
            .map(|(i, d)| (d.id.clone(), i))
            .collect();

        let mut guard = self.snapshot.write().unwrap_or_else(|e| e.into_inner());
        let generation = guard.generation + 1;
        tracing::info!(
            generation,
            documents = documents.len(),
            "Vector index rebuilt"
        );
        *guard = Arc::new(Snapshot {
            documents,
            by_id,
            generation,
        });
        Ok(())
    }

    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<ScoredDoc>> {
        let snapshot = self.load();
        if let Some(doc) = snapshot.documents.first() {
            if doc.embedding.len() != vector.len() {
                return Err(AppError::VectorIndex {
                    message: format!(
                        "Query dimension {} does not match index dimension {}",
                        vector.len(),
                        doc.embedding.len()
                    ),
                });
            }
        }

        let mut scored: Vec<ScoredDoc> = snapshot
            .documents
            .iter()
            .map(|doc| ScoredDoc {
                similarity: cosine_similarity(&doc.embedding, vector),
                document: doc.clone(),
            })
            .collect();

        scored.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(k);
        Ok(scored)
    }

    async fn fetch(&self, ids: &[String]) -> Result<Vec<IndexedDocument>> {
        let snapshot = self.load();
        Ok(ids
            .iter()
            .filter_map(|id| snapshot.by_id.get(id))
            .map(|&i| snapshot.documents[i].clone())
            .collect())
    }

    fn generation(&self) -> u64 {
        self.load().generation
    }

    fn len(&self) -> usize {
        self.load().documents.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::{Embedder, HashEmbedder};

    fn metadata(doi: &str) -> DocMetadata {
        DocMetadata {
            title: format!("Paper {doi}"),
            authors: "Smith, J.".into(),
            journal: "Journal".into(),
            year: "2020".into(),
            doi: doi.into(),
            link: format!("https://doi.org/{doi}"),
            snippet: "Snippet".into(),
            vhb_ranking: String::new(),
            abdc_ranking: String::new(),
            citations: None,
        }
    }

    async fn doc(embedder: &HashEmbedder, doi: &str, text: &str) -> IndexedDocument {
        IndexedDocument {
            id: doi.to_string(),
            embedding: embedder.embed(text).await.unwrap(),
            text_block: text.to_string(),
            metadata: metadata(doi),
        }
    }

    #[tokio::test]
    async fn test_exact_text_is_top_hit() {
        let embedder = HashEmbedder::new(384);
        let index = MemoryIndex::new();
        index
            .rebuild(vec![
                doc(&embedder, "10.1/a", "customer churn prediction with neural networks").await,
                doc(&embedder, "10.1/b", "soil erosion in alpine regions").await,
            ])
            .await
            .unwrap();

        let query = embedder
            .embed("customer churn prediction with neural networks")
            .await
            .unwrap();
        let hits = index.query(&query, 2).await.unwrap();
        assert_eq!(hits[0].document.id, "10.1/a");
        assert!(hits[0].similarity >= 0.99);
    }

    #[tokio::test]
    async fn test_rebuild_bumps_generation_and_replaces() {
        let embedder = HashEmbedder::new(64);
        let index = MemoryIndex::new();
        assert_eq!(index.generation(), 0);

        index
            .rebuild(vec![doc(&embedder, "10.1/a", "first dataset").await])
            .await
            .unwrap();
        assert_eq!(index.generation(), 1);
        assert_eq!(index.len(), 1);

        index
            .rebuild(vec![
                doc(&embedder, "10.1/b", "second dataset").await,
                doc(&embedder, "10.1/c", "second dataset other").await,
            ])
            .await
            .unwrap();
        assert_eq!(index.generation(), 2);
        assert_eq!(index.len(), 2);
        // Old ids are gone: replaced wholesale, not merged
        assert!(index.fetch(&["10.1/a".into()]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_preserves_requested_order() {
        let embedder = HashEmbedder::new(64);
        let index = MemoryIndex::new();
        index
            .rebuild(vec![
                doc(&embedder, "10.1/a", "alpha").await,
                doc(&embedder, "10.1/b", "beta").await,
            ])
            .await
            .unwrap();

        let fetched = index
            .fetch(&["10.1/b".into(), "10.1/missing".into(), "10.1/a".into()])
            .await
            .unwrap();
        let ids: Vec<&str> = fetched.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["10.1/b", "10.1/a"]);
    }

    #[tokio::test]
    async fn test_query_empty_index() {
        let index = MemoryIndex::new();
        let hits = index.query(&[0.0; 8], 5).await.unwrap();
        assert!(hits.is_empty());
    }
}
