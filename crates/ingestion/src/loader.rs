//! Bulk graph load
//!
//! Pushes a projected `GraphBatch` into the graph store: clears the prior
//! dataset, ensures uniqueness constraints per entity id, then MERGEs nodes
//! and relationships with parameterized UNWIND statements. Stable ids make
//! the whole load idempotent, so a rerun converges to the same graph.

use crate::projector::GraphBatch;
use scholargraph_common::errors::Result;
use scholargraph_common::graph::GraphStore;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

const CONSTRAINTS: &[&str] = &[
    "CREATE CONSTRAINT document_id_unique IF NOT EXISTS FOR (d:Document) REQUIRE d.id IS UNIQUE",
    "CREATE CONSTRAINT author_id_unique IF NOT EXISTS FOR (a:Author) REQUIRE a.id IS UNIQUE",
    "CREATE CONSTRAINT journal_id_unique IF NOT EXISTS FOR (j:Journal) REQUIRE j.id IS UNIQUE",
    "CREATE CONSTRAINT ranking_id_unique IF NOT EXISTS FOR (r:Ranking) REQUIRE r.id IS UNIQUE",
    "CREATE CONSTRAINT body_id_unique IF NOT EXISTS FOR (b:RankingBody) REQUIRE b.id IS UNIQUE",
    "CREATE CONSTRAINT year_id_unique IF NOT EXISTS FOR (y:Year) REQUIRE y.id IS UNIQUE",
    "CREATE CONSTRAINT keyword_id_unique IF NOT EXISTS FOR (k:Keyword) REQUIRE k.id IS UNIQUE",
];

/// Loads projected batches into the graph store.
pub struct GraphLoader {
    store: Arc<dyn GraphStore>,
}

impl GraphLoader {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self { store }
    }

    /// Replace the graph contents with one projected batch.
    ///
    /// Single-writer bulk load: no concurrent ingestion is assumed against
    /// the same dataset.
    pub async fn load(&self, batch: &GraphBatch) -> Result<()> {
        self.store.ping().await?;

        tracing::info!(
            nodes = batch.node_count(),
            edges = batch.edge_count(),
            "Loading graph batch"
        );

        // Previous dataset is superseded wholesale, like the vector index.
        self.run("MATCH (n) DETACH DELETE n", json!({})).await?;

        for constraint in CONSTRAINTS {
            self.run(constraint, json!({})).await?;
        }

        self.merge_rows(
            "UNWIND $rows AS row \
             MERGE (d:Document {id: row.id}) \
             SET d.title = row.title, d.abstract = row.abstract_text, \
                 d.date = row.date, d.journal_name = row.journal_name, \
                 d.url = row.url, d.citations = row.citations",
            &batch.documents,
        )
        .await?;

        self.merge_rows(
            "UNWIND $rows AS row \
             MERGE (a:Author {id: row.id}) SET a.name = row.name",
            &batch.authors,
        )
        .await?;

        self.merge_rows(
            "UNWIND $rows AS row \
             MERGE (j:Journal {id: row.id}) SET j.name = row.name",
            &batch.journals,
        )
        .await?;

        self.merge_rows(
            "UNWIND $rows AS row \
             MERGE (r:Ranking {id: row.id}) SET r.code = row.code, r.body = row.body",
            &batch.rankings,
        )
        .await?;

        self.merge_rows(
            "UNWIND $rows AS row \
             MERGE (b:RankingBody {id: row.id}) SET b.name = row.name",
            &batch.ranking_bodies,
        )
        .await?;

        self.merge_rows(
            "UNWIND $rows AS row \
             MERGE (y:Year {id: row.id}) SET y.year = row.year",
            &batch.years,
        )
        .await?;

        self.merge_rows(
            "UNWIND $rows AS row \
             MERGE (k:Keyword {id: row.id}) SET k.name = row.name",
            &batch.keywords,
        )
        .await?;

        self.merge_rows(
            "UNWIND $rows AS row \
             MATCH (d:Document {id: row.from}) MATCH (a:Author {id: row.to}) \
             MERGE (d)-[:HAS_AUTHOR]->(a)",
            &batch.has_author,
        )
        .await?;

        self.merge_rows(
            "UNWIND $rows AS row \
             MATCH (d:Document {id: row.from}) MATCH (j:Journal {id: row.to}) \
             MERGE (d)-[:PUBLISHED_IN]->(j)",
            &batch.published_in,
        )
        .await?;

        self.merge_rows(
            "UNWIND $rows AS row \
             MATCH (j:Journal {id: row.from}) MATCH (r:Ranking {id: row.to}) \
             MERGE (j)-[:HAS_RATING]->(r)",
            &batch.has_rating,
        )
        .await?;

        self.merge_rows(
            "UNWIND $rows AS row \
             MATCH (r:Ranking {id: row.from}) MATCH (b:RankingBody {id: row.to}) \
             MERGE (r)-[:ISSUED_BY]->(b)",
            &batch.issued_by,
        )
        .await?;

        // Undirected pairs arrive canonically ordered; stored once.
        self.merge_rows(
            "UNWIND $rows AS row \
             MATCH (a:Author {id: row.from}) MATCH (b:Author {id: row.to}) \
             MERGE (a)-[:COLLABORATED_WITH]->(b)",
            &batch.collaborated_with,
        )
        .await?;

        self.merge_rows(
            "UNWIND $rows AS row \
             MATCH (a:Document {id: row.from}) MATCH (b:Document {id: row.to}) \
             MERGE (a)-[:SAME_YEAR_AS]->(b)",
            &batch.same_year_as,
        )
        .await?;

        self.merge_rows(
            "UNWIND $rows AS row \
             MATCH (d:Document {id: row.document_id}) MATCH (k:Keyword {id: row.keyword_id}) \
             MERGE (d)-[:HAS_KEYWORD {kind: row.kind}]->(k)",
            &batch.has_keyword,
        )
        .await?;

        Ok(())
    }

    async fn merge_rows<T: Serialize>(&self, statement: &str, rows: &[T]) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }
        self.run(statement, json!({ "rows": rows })).await
    }

    async fn run(&self, statement: &str, params: serde_json::Value) -> Result<()> {
        self.store.run(statement, params).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projector::project;
    use async_trait::async_trait;
    use scholargraph_common::graph::GraphRow;
    use scholargraph_common::record::CanonicalRecord;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    /// Records every statement it receives.
    struct RecordingStore {
        statements: Mutex<Vec<(String, serde_json::Value)>>,
    }

    #[async_trait]
    impl GraphStore for RecordingStore {
        async fn run(
            &self,
            query: &str,
            params: serde_json::Value,
        ) -> scholargraph_common::Result<Vec<GraphRow>> {
            self.statements
                .lock()
                .unwrap()
                .push((query.to_string(), params));
            Ok(Vec::new())
        }

        async fn ping(&self) -> scholargraph_common::Result<()> {
            Ok(())
        }
    }

    fn record(doi: &str, authors: &str) -> CanonicalRecord {
        CanonicalRecord {
            document_id: doi.to_string(),
            title: "T".into(),
            abstract_text: "A".into(),
            authors: authors.to_string(),
            journal_name: "J".into(),
            publication_date: "2020".into(),
            author_keywords: String::new(),
            index_keywords: String::new(),
            vhb_ranking: String::new(),
            abdc_ranking: String::new(),
            citations: None,
            url: None,
            extras: BTreeMap::new(),
        }
    }

    #[tokio::test]
    async fn test_load_clears_then_merges() {
        let store = Arc::new(RecordingStore {
            statements: Mutex::new(Vec::new()),
        });
        let loader = GraphLoader::new(store.clone());
        let batch = project(&[record("10.1/a", "Smith, J.; Doe, A.")]);

        loader.load(&batch).await.unwrap();

        let statements = store.statements.lock().unwrap();
        assert!(statements[0].0.contains("DETACH DELETE"));
        assert!(statements
            .iter()
            .any(|(s, _)| s.contains("MERGE (d:Document")));
        assert!(statements
            .iter()
            .any(|(s, _)| s.contains(":COLLABORATED_WITH")));
    }

    #[tokio::test]
    async fn test_entity_names_travel_as_parameters() {
        let store = Arc::new(RecordingStore {
            statements: Mutex::new(Vec::new()),
        });
        let loader = GraphLoader::new(store.clone());
        let batch = project(&[record("10.1/a", "O'Hara, C.")]);

        loader.load(&batch).await.unwrap();

        let statements = store.statements.lock().unwrap();
        // The quote-bearing name never appears in query text, only in params
        assert!(statements.iter().all(|(s, _)| !s.contains("O'Hara")));
        assert!(statements
            .iter()
            .any(|(_, p)| p.to_string().contains("O'Hara")));
    }

    #[tokio::test]
    async fn test_empty_edge_groups_emit_no_statements() {
        let store = Arc::new(RecordingStore {
            statements: Mutex::new(Vec::new()),
        });
        let loader = GraphLoader::new(store.clone());
        // Single-author record: no collaboration edges
        let batch = project(&[record("10.1/a", "Smith, J.")]);

        loader.load(&batch).await.unwrap();

        let statements = store.statements.lock().unwrap();
        assert!(!statements
            .iter()
            .any(|(s, _)| s.contains(":COLLABORATED_WITH")));
    }
}
