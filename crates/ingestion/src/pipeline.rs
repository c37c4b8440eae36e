//! Ingestion pipeline
//!
//! One upload = one batch: normalize rows, project and load the graph,
//! embed and rebuild the vector index. Schema and embedding failures are
//! batch-fatal; an unreachable graph store degrades the dataset to
//! vector-only instead of failing the upload.

use crate::indexer::embed_and_store;
use crate::loader::GraphLoader;
use crate::projector::project;
use scholargraph_common::embeddings::Embedder;
use scholargraph_common::errors::{AppError, Result};
use scholargraph_common::graph::GraphStore;
use scholargraph_common::record::{normalize_batch, RawRecord};
use scholargraph_common::vector::VectorIndex;
use std::sync::Arc;
use std::time::Instant;

/// Outcome of one ingestion batch.
#[derive(Debug, Clone, serde::Serialize)]
pub struct IngestReport {
    /// Rows in the upload.
    pub records_received: usize,
    /// Records indexed after the quality filter.
    pub records_indexed: usize,
    /// Rows dropped for missing doi/title/abstract.
    pub records_dropped: usize,
    /// False when the graph store was unreachable (vector-only dataset).
    pub graph_loaded: bool,
    pub graph_nodes: usize,
    pub graph_edges: usize,
}

/// Run the full ingestion pipeline for one uploaded batch.
pub async fn ingest(
    rows: &[RawRecord],
    embedder: &dyn Embedder,
    index: &Arc<dyn VectorIndex>,
    graph: Option<&Arc<dyn GraphStore>>,
) -> Result<IngestReport> {
    let started = Instant::now();

    let batch = normalize_batch(rows)?;
    if batch.records.is_empty() {
        return Err(AppError::InvalidRequest {
            message: "No records with doi, title, and abstract in upload".into(),
        });
    }

    let projection = project(&batch.records);

    let mut graph_loaded = false;
    if let Some(store) = graph {
        match GraphLoader::new(store.clone()).load(&projection).await {
            Ok(()) => graph_loaded = true,
            Err(AppError::GraphUnavailable { message }) => {
                tracing::warn!(
                    error = %message,
                    "Graph store unavailable, dataset will be vector-only"
                );
            }
            Err(other) => return Err(other),
        }
    }

    let indexed = embed_and_store(&batch.records, embedder, index).await?;

    scholargraph_common::metrics::record_ingestion(started.elapsed().as_secs_f64(), indexed);
    tracing::info!(
        received = batch.received,
        indexed,
        dropped = batch.dropped,
        graph_loaded,
        "Ingestion batch complete"
    );

    Ok(IngestReport {
        records_received: batch.received,
        records_indexed: indexed,
        records_dropped: batch.dropped,
        graph_loaded,
        graph_nodes: projection.node_count(),
        graph_edges: projection.edge_count(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use scholargraph_common::embeddings::HashEmbedder;
    use scholargraph_common::graph::GraphRow;
    use scholargraph_common::vector::MemoryIndex;
    use std::collections::BTreeMap;

    struct DownStore;

    #[async_trait]
    impl GraphStore for DownStore {
        async fn run(
            &self,
            _query: &str,
            _params: serde_json::Value,
        ) -> scholargraph_common::Result<Vec<GraphRow>> {
            Err(AppError::GraphUnavailable {
                message: "connection refused".into(),
            })
        }

        async fn ping(&self) -> scholargraph_common::Result<()> {
            Err(AppError::GraphUnavailable {
                message: "connection refused".into(),
            })
        }
    }

    fn row(doi: &str) -> RawRecord {
        let mut r = BTreeMap::new();
        r.insert("doi".to_string(), doi.to_string());
        r.insert("title".to_string(), format!("Title {doi}"));
        r.insert("abstract".to_string(), "Abstract text.".to_string());
        r.insert("authors".to_string(), "Smith, J.".to_string());
        r.insert("date".to_string(), "2020".to_string());
        r.insert("journal_name".to_string(), "Journal".to_string());
        r
    }

    #[tokio::test]
    async fn test_missing_columns_abort_before_indexing() {
        let embedder = HashEmbedder::new(32);
        let index: Arc<dyn VectorIndex> = Arc::new(MemoryIndex::new());

        let mut bad = BTreeMap::new();
        bad.insert("title".to_string(), "T".to_string());
        let err = ingest(&[bad], &embedder, &index, None).await.unwrap_err();
        assert!(matches!(err, AppError::SchemaValidation { .. }));
        assert_eq!(index.len(), 0);
    }

    #[tokio::test]
    async fn test_unreachable_graph_degrades_to_vector_only() {
        let embedder = HashEmbedder::new(32);
        let index: Arc<dyn VectorIndex> = Arc::new(MemoryIndex::new());
        let store: Arc<dyn GraphStore> = Arc::new(DownStore);

        let report = ingest(&[row("10.1/a")], &embedder, &index, Some(&store))
            .await
            .unwrap();
        assert!(!report.graph_loaded);
        assert_eq!(report.records_indexed, 1);
        assert_eq!(index.len(), 1);
    }

    #[tokio::test]
    async fn test_report_counts() {
        let embedder = HashEmbedder::new(32);
        let index: Arc<dyn VectorIndex> = Arc::new(MemoryIndex::new());

        let mut no_doi = row("");
        no_doi.insert("doi".to_string(), String::new());
        let report = ingest(&[row("10.1/a"), row("10.1/b"), no_doi], &embedder, &index, None)
            .await
            .unwrap();
        assert_eq!(report.records_received, 3);
        assert_eq!(report.records_indexed, 2);
        assert_eq!(report.records_dropped, 1);
        assert!(report.graph_nodes > 0);
    }
}
