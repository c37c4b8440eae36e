//! Hybrid retriever
//!
//! One query runs CLASSIFY, then vector and graph search concurrently, then
//! MERGE and RESPOND. Graph-exact matches are authoritative and reported at
//! similarity 1.0; otherwise the vector result set wins. Every step degrades
//! to a narrower but valid result, so `answer` always returns a response and
//! never an error.

use crate::assemble::{build_prompt, respond};
use crate::entities::EntityExtractor;
use crate::intent::{should_use_graph, IntentClassifier, IntentLabel};
use crate::templates::{GraphFinding, GraphSearcher};
use regex_lite::Regex;
use scholargraph_common::config::AppConfig;
use scholargraph_common::embeddings::{cosine_similarity, Embedder};
use scholargraph_common::errors::AppError;
use scholargraph_common::generation::{GenerationOptions, Generator};
use scholargraph_common::graph::GraphStore;
use scholargraph_common::vector::{IndexedDocument, ScoredDoc, VectorIndex};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

const NO_MATCH_ANSWER: &str =
    "No relevant papers found for this question in the current dataset.";

/// One ranked source in a search response.
#[derive(Debug, Clone, Serialize)]
pub struct SourceRef {
    pub title: String,
    pub authors: String,
    pub journal: String,
    pub year: String,
    pub doi: String,
    pub similarity: f32,
    pub link: String,
    pub snippet: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub vhb_ranking: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub abdc_ranking: String,
}

impl SourceRef {
    fn from_document(document: &IndexedDocument, similarity: f32) -> Self {
        let m = &document.metadata;
        Self {
            title: m.title.clone(),
            authors: m.authors.clone(),
            journal: m.journal.clone(),
            year: m.year.clone(),
            doi: m.doi.clone(),
            similarity,
            link: m.link.clone(),
            snippet: m.snippet.clone(),
            vhb_ranking: m.vhb_ranking.clone(),
            abdc_ranking: m.abdc_ranking.clone(),
        }
    }
}

/// Terminal response of the retriever state machine.
#[derive(Debug, Clone, Serialize)]
pub struct HybridAnswer {
    pub answer: String,
    pub sources: Vec<SourceRef>,
    pub similarities: Vec<f32>,
    pub best_score: f32,
    pub graph_used: bool,
    pub intent: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graph_template: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graph_query: Option<String>,
}

/// Read-only handles for one active dataset generation. Re-upload builds a
/// fresh engine and the gateway swaps the shared pointer; an engine is never
/// mutated in place.
pub struct SearchEngine {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    graph: Option<GraphSearcher>,
    generator: Arc<dyn Generator>,
    classifier: IntentClassifier,
    top_k: usize,
    similarity_threshold: f32,
    options: GenerationOptions,
    /// Set after the first graph connection failure; graph search is not
    /// retried per-query for the rest of this dataset generation.
    graph_degraded: AtomicBool,
    topic_by_author: Regex,
}

impl SearchEngine {
    pub fn new(
        config: &AppConfig,
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        graph: Option<Arc<dyn GraphStore>>,
        generator: Arc<dyn Generator>,
        extractor: Arc<dyn EntityExtractor>,
    ) -> Self {
        let options = GenerationOptions::from_config(&config.generation);
        Self {
            embedder,
            index,
            graph: graph
                .map(|store| GraphSearcher::new(store, extractor, config.retrieval.graph_limit)),
            generator: generator.clone(),
            classifier: IntentClassifier::new(generator, options.clone()),
            top_k: config.retrieval.top_k,
            similarity_threshold: config.retrieval.similarity_threshold,
            options,
            graph_degraded: AtomicBool::new(false),
            topic_by_author: Regex::new(r"(?i)\babout\s+(.+?)\s+by\b").unwrap(),
        }
    }

    /// Dataset generation this engine serves.
    pub fn generation(&self) -> u64 {
        self.index.generation()
    }

    pub fn document_count(&self) -> usize {
        self.index.len()
    }

    pub fn graph_degraded(&self) -> bool {
        self.graph_degraded.load(Ordering::Relaxed)
    }

    /// Answer one query. Terminal state always produces a response object.
    pub async fn answer(&self, query: &str) -> HybridAnswer {
        let started = Instant::now();

        let intent = self.classifier.classify(query).await;
        let graph_triggered = should_use_graph(query);
        tracing::debug!(intent = intent.as_str(), graph_triggered, "Query classified");

        let (vector_hits, graph_finding) = tokio::join!(
            self.vector_search(query),
            self.graph_search(query, intent, graph_triggered)
        );

        let response = self
            .merge_and_respond(query, intent, vector_hits, graph_finding)
            .await;

        scholargraph_common::metrics::record_query(
            started.elapsed().as_secs_f64(),
            response.graph_used,
            response.sources.len(),
        );
        response
    }

    /// Top-K neighbors above the similarity floor. Embedding or index
    /// failures degrade to an empty result set.
    async fn vector_search(&self, query: &str) -> Vec<ScoredDoc> {
        let vector = match self.embedder.embed(query).await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "Query embedding failed, skipping vector search");
                return Vec::new();
            }
        };

        match self.index.query(&vector, self.top_k).await {
            Ok(hits) => hits
                .into_iter()
                .filter(|hit| hit.similarity >= self.similarity_threshold)
                .collect(),
            Err(e) => {
                tracing::warn!(error = %e, "Vector search failed");
                Vec::new()
            }
        }
    }

    async fn graph_search(
        &self,
        query: &str,
        intent: IntentLabel,
        triggered: bool,
    ) -> Option<GraphFinding> {
        if !triggered || self.graph_degraded.load(Ordering::Relaxed) {
            return None;
        }
        let searcher = self.graph.as_ref()?;

        match searcher.search(query, intent).await {
            Ok(finding) => Some(finding),
            Err(AppError::GraphUnavailable { message }) => {
                tracing::warn!(
                    error = %message,
                    "Graph store unreachable, degrading to vector-only for this dataset"
                );
                self.graph_degraded.store(true, Ordering::Relaxed);
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "Graph search failed");
                None
            }
        }
    }

    async fn merge_and_respond(
        &self,
        query: &str,
        intent: IntentLabel,
        vector_hits: Vec<ScoredDoc>,
        graph_finding: Option<GraphFinding>,
    ) -> HybridAnswer {
        let graph_template = graph_finding.as_ref().map(|f| f.template.to_string());
        let graph_query = graph_finding
            .as_ref()
            .filter(|f| !f.query.is_empty())
            .map(|f| f.query.to_string());

        if let Some(finding) = graph_finding.as_ref().filter(|f| f.matched) {
            if finding.document_ids.is_empty() {
                // Narrative-only result (names, topics): the summary is the
                // answer, there are no document sources to ground or cite.
                return HybridAnswer {
                    answer: finding.summary.clone(),
                    sources: Vec::new(),
                    similarities: Vec::new(),
                    best_score: 0.0,
                    graph_used: true,
                    intent: intent.as_str(),
                    graph_template,
                    graph_query,
                };
            }

            let documents = self.graph_documents(query, &finding.document_ids).await;
            if !documents.is_empty() {
                let sources: Vec<SourceRef> = documents
                    .iter()
                    .map(|d| SourceRef::from_document(d, 1.0))
                    .collect();
                let similarities = vec![1.0; sources.len()];
                let answer = self
                    .generate(query, &documents, Some(&finding.summary))
                    .await;
                return HybridAnswer {
                    answer,
                    sources,
                    similarities,
                    best_score: 1.0,
                    graph_used: true,
                    intent: intent.as_str(),
                    graph_template,
                    graph_query,
                };
            }
            // Ids the index no longer knows (stale graph): fall back to the
            // vector result set.
        }

        if vector_hits.is_empty() {
            let answer = graph_finding
                .as_ref()
                .filter(|f| !f.matched)
                .map(|f| f.summary.clone())
                .unwrap_or_else(|| NO_MATCH_ANSWER.to_string());
            return HybridAnswer {
                answer,
                sources: Vec::new(),
                similarities: Vec::new(),
                best_score: 0.0,
                graph_used: false,
                intent: intent.as_str(),
                graph_template,
                graph_query,
            };
        }

        let best_score = vector_hits.first().map(|h| h.similarity).unwrap_or(0.0);
        let sources: Vec<SourceRef> = vector_hits
            .iter()
            .map(|h| SourceRef::from_document(&h.document, h.similarity))
            .collect();
        let similarities: Vec<f32> = vector_hits.iter().map(|h| h.similarity).collect();
        let documents: Vec<IndexedDocument> =
            vector_hits.into_iter().map(|h| h.document).collect();
        let answer = self.generate(query, &documents, None).await;

        HybridAnswer {
            answer,
            sources,
            similarities,
            best_score,
            graph_used: false,
            intent: intent.as_str(),
            graph_template,
            graph_query,
        }
    }

    /// Fetch graph-matched documents from the index, re-ranked by topic
    /// similarity when the query carries an "about X by Y" constraint.
    async fn graph_documents(&self, query: &str, ids: &[String]) -> Vec<IndexedDocument> {
        let mut documents = match self.index.fetch(ids).await {
            Ok(docs) => docs,
            Err(e) => {
                tracing::warn!(error = %e, "Metadata fetch for graph matches failed");
                return Vec::new();
            }
        };

        if documents.len() > 1 {
            if let Some(topic) = self
                .topic_by_author
                .captures(query)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().trim().to_string())
            {
                match self.embedder.embed(&topic).await {
                    Ok(topic_vector) => {
                        documents.sort_by(|a, b| {
                            let sa = cosine_similarity(&topic_vector, &a.embedding);
                            let sb = cosine_similarity(&topic_vector, &b.embedding);
                            sb.partial_cmp(&sa).unwrap_or(std::cmp::Ordering::Equal)
                        });
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Topic embedding failed, keeping graph order");
                    }
                }
            }
        }

        documents
    }

    async fn generate(
        &self,
        query: &str,
        documents: &[IndexedDocument],
        graph_narrative: Option<&str>,
    ) -> String {
        let prompt = build_prompt(query, documents, graph_narrative);
        respond(self.generator.as_ref(), &prompt, &self.options).await
    }
}
