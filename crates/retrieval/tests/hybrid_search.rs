//! End-to-end hybrid retrieval over a small ingested corpus: two documents
//! by the same author in the same year, served through the in-memory index,
//! the deterministic hash embedder, a graph store evaluated against the
//! projected relationship batch, and a scripted generator.

use async_trait::async_trait;
use scholargraph_common::config::AppConfig;
use scholargraph_common::embeddings::{Embedder, HashEmbedder};
use scholargraph_common::errors::AppError;
use scholargraph_common::generation::{GenerationOptions, Generator};
use scholargraph_common::graph::{GraphRow, GraphStore};
use scholargraph_common::record::{normalize_batch, RawRecord};
use scholargraph_common::vector::{MemoryIndex, VectorIndex};
use scholargraph_common::Result;
use scholargraph_ingestion::{build_text_block, ingest, project, GraphBatch};
use scholargraph_retrieval::templates::{COLLABORATORS_OF_AUTHOR, PAPERS_BY_AUTHOR};
use scholargraph_retrieval::{RegexEntityExtractor, SearchEngine, FALLBACK_ANSWER};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

/// Graph store that evaluates the author template against a projected batch.
struct ProjectedStore {
    batch: GraphBatch,
}

#[async_trait]
impl GraphStore for ProjectedStore {
    async fn run(&self, query: &str, params: serde_json::Value) -> Result<Vec<GraphRow>> {
        if query != PAPERS_BY_AUTHOR {
            return Ok(Vec::new());
        }
        let needle = params
            .get("name")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_lowercase();

        let mut rows = Vec::new();
        for edge in &self.batch.has_author {
            let author = self
                .batch
                .authors
                .iter()
                .find(|a| a.id == edge.to)
                .expect("edge references projected author");
            if !author.name.to_lowercase().contains(&needle) {
                continue;
            }
            let document = self
                .batch
                .documents
                .iter()
                .find(|d| d.id == edge.from)
                .expect("edge references projected document");
            let row = json!({
                "author": author.name,
                "title": document.title,
                "doi": document.id,
            });
            rows.push(row.as_object().unwrap().clone());
        }
        Ok(rows)
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

/// Generator that answers classification prompts with OTHER and either
/// completes or times out on answer prompts.
struct ScriptedGenerator {
    times_out: bool,
}

#[async_trait]
impl Generator for ScriptedGenerator {
    async fn invoke(&self, prompt: &str, _options: &GenerationOptions) -> Result<String> {
        if prompt.starts_with("Classify the question") {
            return Ok("OTHER".to_string());
        }
        if self.times_out {
            Err(AppError::GenerationTimeout { timeout_ms: 30_000 })
        } else {
            Ok("Both papers are by Smith [1] [2].".to_string())
        }
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

fn record(doi: &str, title: &str, abstract_text: &str) -> RawRecord {
    let mut row = BTreeMap::new();
    row.insert("doi".to_string(), doi.to_string());
    row.insert("title".to_string(), title.to_string());
    row.insert("abstract".to_string(), abstract_text.to_string());
    row.insert("authors".to_string(), "Smith, J.".to_string());
    row.insert("date".to_string(), "2020".to_string());
    row.insert("journal_name".to_string(), "Journal of Strategy".to_string());
    row
}

fn corpus() -> Vec<RawRecord> {
    vec![
        record("10.1/a", "Doc A", "Dynamic capabilities and firm performance."),
        record("10.1/b", "Doc B", "Absorptive capacity in manufacturing firms."),
    ]
}

async fn engine_with_store(store: Arc<dyn GraphStore>, times_out: bool) -> SearchEngine {
    let embedder: Arc<dyn Embedder> = Arc::new(HashEmbedder::new(128));
    let index: Arc<dyn VectorIndex> = Arc::new(MemoryIndex::new());

    ingest(&corpus(), embedder.as_ref(), &index, None)
        .await
        .unwrap();

    SearchEngine::new(
        &AppConfig::default(),
        embedder,
        index,
        Some(store),
        Arc::new(ScriptedGenerator { times_out }),
        Arc::new(RegexEntityExtractor::new()),
    )
}

async fn engine_over_corpus(times_out: bool) -> SearchEngine {
    let batch = normalize_batch(&corpus()).unwrap();
    let store: Arc<dyn GraphStore> = Arc::new(ProjectedStore {
        batch: project(&batch.records),
    });
    engine_with_store(store, times_out).await
}

#[tokio::test]
async fn test_papers_by_author_are_graph_exact() {
    let engine = engine_over_corpus(false).await;
    let response = engine.answer("Which papers were written by Smith?").await;

    assert!(response.graph_used);
    assert_eq!(response.sources.len(), 2);
    assert!(response.similarities.iter().all(|s| (s - 1.0).abs() < f32::EPSILON));
    assert!((response.best_score - 1.0).abs() < f32::EPSILON);

    let mut dois: Vec<&str> = response.sources.iter().map(|s| s.doi.as_str()).collect();
    dois.sort();
    assert_eq!(dois, vec!["10.1/a", "10.1/b"]);
    assert_eq!(response.graph_template.as_deref(), Some("papers_by_author"));
    assert_eq!(response.graph_query.as_deref(), Some(PAPERS_BY_AUTHOR));
}

#[tokio::test]
async fn test_topic_constraint_reorders_graph_matches() {
    let engine = engine_over_corpus(false).await;
    let response = engine
        .answer("Which papers were written about absorptive capacity in manufacturing by Smith?")
        .await;

    // Both Smith documents are graph-exact, but the "about ... by ..." topic
    // phrase re-orders them by topic similarity: Doc B first.
    assert!(response.graph_used);
    let dois: Vec<&str> = response.sources.iter().map(|s| s.doi.as_str()).collect();
    assert_eq!(dois, vec!["10.1/b", "10.1/a"]);
    assert!(response
        .similarities
        .iter()
        .all(|s| (s - 1.0).abs() < f32::EPSILON));
}

/// Store that answers the collaborator template with name-only rows.
struct CollaboratorStore;

#[async_trait]
impl GraphStore for CollaboratorStore {
    async fn run(&self, query: &str, _params: serde_json::Value) -> Result<Vec<GraphRow>> {
        if query != COLLABORATORS_OF_AUTHOR {
            return Ok(Vec::new());
        }
        let row = json!({ "collaborator": "Doe, A." });
        Ok(vec![row.as_object().unwrap().clone()])
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn test_collaborator_finding_is_the_answer() {
    let engine = engine_with_store(Arc::new(CollaboratorStore), false).await;
    let response = engine.answer("Who collaborated with Smith?").await;

    // Name rows carry no document ids: the graph summary is the answer and
    // there are no sources to cite or generate over.
    assert!(response.graph_used);
    assert!(response.sources.is_empty());
    assert!(response.similarities.is_empty());
    assert!(response.answer.contains("collaborated with Smith"));
    assert!(response.answer.contains("Doe, A."));
    assert_eq!(
        response.graph_template.as_deref(),
        Some("collaborators_of_author")
    );
}

/// Store that is unreachable and records every call.
struct UnreachableStore {
    calls: Mutex<usize>,
}

#[async_trait]
impl GraphStore for UnreachableStore {
    async fn run(&self, _query: &str, _params: serde_json::Value) -> Result<Vec<GraphRow>> {
        *self.calls.lock().unwrap() += 1;
        Err(AppError::GraphUnavailable {
            message: "connection refused".into(),
        })
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn test_graph_failure_degrades_session_without_retry() {
    let store = Arc::new(UnreachableStore {
        calls: Mutex::new(0),
    });
    let engine = engine_with_store(store.clone(), false).await;

    let first = engine.answer("Which papers were written by Smith?").await;
    assert!(!first.graph_used);
    assert!(engine.graph_degraded());
    assert_eq!(*store.calls.lock().unwrap(), 1);

    // Second query skips the graph store entirely.
    let second = engine.answer("Which papers were written by Smith?").await;
    assert!(!second.graph_used);
    assert_eq!(*store.calls.lock().unwrap(), 1);
}

#[tokio::test]
async fn test_same_year_documents_are_mutually_linked() {
    let batch = normalize_batch(&corpus()).unwrap();
    let projection = project(&batch.records);

    // One canonical undirected pair links both 2020 documents.
    assert_eq!(projection.same_year_as.len(), 1);
    let edge = &projection.same_year_as[0];
    assert_eq!((edge.from.as_str(), edge.to.as_str()), ("10.1/a", "10.1/b"));
}

#[tokio::test]
async fn test_generation_timeout_still_returns_sources() {
    let engine = engine_over_corpus(true).await;
    let response = engine.answer("Which papers were written by Smith?").await;

    assert_eq!(response.answer, FALLBACK_ANSWER);
    assert_eq!(response.sources.len(), 2);
    assert_eq!(response.similarities.len(), 2);
    assert!(response.graph_used);
}

#[tokio::test]
async fn test_unrelated_query_is_no_match_not_error() {
    let engine = engine_over_corpus(false).await;
    let response = engine
        .answer("quantum entanglement in photonic lattices")
        .await;

    assert!(response.sources.is_empty());
    assert!(!response.graph_used);
    assert!(response.best_score < 0.35);
    assert!(!response.answer.is_empty());
}

#[tokio::test]
async fn test_exact_text_block_is_top_vector_hit() {
    let engine = engine_over_corpus(false).await;

    let batch = normalize_batch(&corpus()).unwrap();
    let query = build_text_block(&batch.records[0]);
    let response = engine.answer(&query).await;

    assert!(response.best_score >= 0.99);
    assert_eq!(response.sources[0].doi, "10.1/a");
    assert!(!response.graph_used);
}
