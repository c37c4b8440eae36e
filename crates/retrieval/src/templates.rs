//! Graph query templates
//!
//! A fixed set of parameterized Cypher templates, routed by classified
//! intent with a lexical fallback. Entity text extracted from the query is
//! always bound through the parameter map, never spliced into query text.
//! Author templates retry once with a relaxed last-name match before giving
//! up.

use crate::entities::{EntityExtractor, ExtractedEntities};
use crate::intent::IntentLabel;
use scholargraph_common::errors::Result;
use scholargraph_common::graph::{GraphRow, GraphStore};
use serde_json::json;
use std::sync::Arc;

pub const PAPERS_BY_AUTHOR: &str = "\
MATCH (d:Document)-[:HAS_AUTHOR]->(a:Author)
WHERE toLower(a.name) CONTAINS toLower($name)
RETURN a.name AS author, d.title AS title, d.id AS doi
LIMIT $limit";

pub const COLLABORATORS_OF_AUTHOR: &str = "\
MATCH (a1:Author)<-[:HAS_AUTHOR]-(d:Document)-[:HAS_AUTHOR]->(a2:Author)
WHERE toLower(a1.name) CONTAINS toLower($name) AND a1 <> a2
RETURN DISTINCT a2.name AS collaborator
LIMIT $limit";

pub const PAPERS_BY_TOPIC: &str = "\
MATCH (d:Document)-[:HAS_KEYWORD]->(k:Keyword)
WHERE toLower(k.name) CONTAINS toLower($topic)
RETURN DISTINCT d.title AS title, d.id AS doi
LIMIT $limit";

pub const TOPICS_BY_AUTHOR: &str = "\
MATCH (a:Author)<-[:HAS_AUTHOR]-(d:Document)-[:HAS_KEYWORD]->(k:Keyword)
WHERE toLower(a.name) CONTAINS toLower($name)
RETURN DISTINCT k.name AS topic
LIMIT $limit";

pub const LIST_ALL_AUTHORS: &str = "\
MATCH (a:Author)
RETURN a.name AS author
ORDER BY a.name
LIMIT $limit";

pub const LIST_ALL_TOPICS: &str = "\
MATCH (k:Keyword)
RETURN k.name AS topic
ORDER BY k.name
LIMIT $limit";

pub const AUTHORS_WITH_MULTIPLE_PAPERS: &str = "\
MATCH (a:Author)<-[:HAS_AUTHOR]-(d:Document)
WITH a, count(d) AS paper_count, collect(d.title) AS titles
WHERE paper_count > 1
RETURN a.name AS author, paper_count, titles
ORDER BY paper_count DESC
LIMIT $limit";

const SUGGESTED_QUERIES: &str = "No graph pattern matched. Try queries like:\n\
• 'Which papers were written by Klaus?'\n\
• 'Who collaborated with Maklan?'\n\
• 'Show me authors with multiple papers'";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphTemplate {
    PapersByAuthor,
    CollaboratorsOfAuthor,
    PapersByTopic,
    TopicsByAuthor,
    ListAllAuthors,
    ListAllTopics,
    AuthorsWithMultiplePapers,
}

impl GraphTemplate {
    pub fn name(&self) -> &'static str {
        match self {
            GraphTemplate::PapersByAuthor => "papers_by_author",
            GraphTemplate::CollaboratorsOfAuthor => "collaborators_of_author",
            GraphTemplate::PapersByTopic => "papers_by_topic",
            GraphTemplate::TopicsByAuthor => "topics_by_author",
            GraphTemplate::ListAllAuthors => "list_all_authors",
            GraphTemplate::ListAllTopics => "list_all_topics",
            GraphTemplate::AuthorsWithMultiplePapers => "authors_with_multiple_papers",
        }
    }

    pub fn cypher(&self) -> &'static str {
        match self {
            GraphTemplate::PapersByAuthor => PAPERS_BY_AUTHOR,
            GraphTemplate::CollaboratorsOfAuthor => COLLABORATORS_OF_AUTHOR,
            GraphTemplate::PapersByTopic => PAPERS_BY_TOPIC,
            GraphTemplate::TopicsByAuthor => TOPICS_BY_AUTHOR,
            GraphTemplate::ListAllAuthors => LIST_ALL_AUTHORS,
            GraphTemplate::ListAllTopics => LIST_ALL_TOPICS,
            GraphTemplate::AuthorsWithMultiplePapers => AUTHORS_WITH_MULTIPLE_PAPERS,
        }
    }

    fn needs_author(&self) -> bool {
        matches!(
            self,
            GraphTemplate::PapersByAuthor
                | GraphTemplate::CollaboratorsOfAuthor
                | GraphTemplate::TopicsByAuthor
        )
    }

    fn needs_topic(&self) -> bool {
        matches!(self, GraphTemplate::PapersByTopic)
    }

    /// Route a classified intent to a template. Lexical routing covers the
    /// `Other` case where the pre-filter fired without a usable label.
    pub fn route(intent: IntentLabel, query: &str) -> Option<GraphTemplate> {
        let template = match intent {
            IntentLabel::PapersByAuthor => Some(GraphTemplate::PapersByAuthor),
            IntentLabel::TopicsByAuthor => Some(GraphTemplate::TopicsByAuthor),
            IntentLabel::Collaborations => Some(GraphTemplate::CollaboratorsOfAuthor),
            IntentLabel::PapersByTopic => Some(GraphTemplate::PapersByTopic),
            IntentLabel::ListAuthors => Some(GraphTemplate::ListAllAuthors),
            IntentLabel::ListTopics => Some(GraphTemplate::ListAllTopics),
            IntentLabel::ConceptQuestion | IntentLabel::Other => None,
        };
        template.or_else(|| Self::route_lexical(query))
    }

    fn route_lexical(query: &str) -> Option<GraphTemplate> {
        let lower = query.to_lowercase();
        if lower.contains("same author") || lower.contains("multiple papers") {
            Some(GraphTemplate::AuthorsWithMultiplePapers)
        } else if lower.contains("all authors") || lower.contains("list authors") {
            Some(GraphTemplate::ListAllAuthors)
        } else if lower.contains("all topics")
            || lower.contains("list topics")
            || lower.contains("all keywords")
        {
            Some(GraphTemplate::ListAllTopics)
        } else if lower.contains("collaborat") || lower.contains("co-author") {
            Some(GraphTemplate::CollaboratorsOfAuthor)
        } else if lower.contains("papers by")
            || lower.contains("works by")
            || lower.contains("written by")
            || lower.contains("written")
            || lower.contains("wrote")
        {
            Some(GraphTemplate::PapersByAuthor)
        } else {
            None
        }
    }
}

/// Structured outcome of one graph search.
#[derive(Debug, Clone)]
pub struct GraphFinding {
    pub template: &'static str,
    pub query: &'static str,
    /// Human-readable summary of the rows.
    pub summary: String,
    /// Explicit document ids, when the template returns documents.
    pub document_ids: Vec<String>,
    /// False for the "no results" and "no pattern matched" outcomes.
    pub matched: bool,
}

impl GraphFinding {
    fn unmatched(template: &'static str, query: &'static str, summary: String) -> Self {
        Self {
            template,
            query,
            summary,
            document_ids: Vec::new(),
            matched: false,
        }
    }
}

/// Executes routed templates against the graph capability.
pub struct GraphSearcher {
    store: Arc<dyn GraphStore>,
    extractor: Arc<dyn EntityExtractor>,
    limit: usize,
}

impl GraphSearcher {
    pub fn new(
        store: Arc<dyn GraphStore>,
        extractor: Arc<dyn EntityExtractor>,
        limit: usize,
    ) -> Self {
        Self {
            store,
            extractor,
            limit,
        }
    }

    /// Run the template routed for this query. Extraction misses skip the
    /// template; empty author matches retry once with the last name only.
    /// The "nothing matched" outcomes come back as an unmatched finding,
    /// never as a silent empty.
    pub async fn search(&self, query: &str, intent: IntentLabel) -> Result<GraphFinding> {
        let Some(template) = GraphTemplate::route(intent, query) else {
            return Ok(GraphFinding::unmatched(
                "none",
                "",
                SUGGESTED_QUERIES.to_string(),
            ));
        };

        let entities = self.extractor.extract(query);
        let Some(params) = self.bind_params(template, &entities) else {
            tracing::debug!(
                template = template.name(),
                "Entity extraction found nothing, skipping template"
            );
            return Ok(GraphFinding::unmatched(
                template.name(),
                template.cypher(),
                SUGGESTED_QUERIES.to_string(),
            ));
        };

        let mut rows = self.store.run(template.cypher(), params).await?;

        // Relaxed retry: last name only, exactly once.
        if rows.is_empty() && template.needs_author() {
            if let Some(last) = entities
                .authors
                .first()
                .and_then(|name| name.split_whitespace().last())
            {
                let params = json!({ "name": last, "limit": self.limit });
                rows = self.store.run(template.cypher(), params).await?;
            }
        }

        if rows.is_empty() {
            return Ok(GraphFinding::unmatched(
                template.name(),
                template.cypher(),
                "No results found in the relationship graph.".to_string(),
            ));
        }

        Ok(GraphFinding {
            template: template.name(),
            query: template.cypher(),
            summary: summarize(template, &entities, &rows),
            document_ids: collect_doc_ids(&rows),
            matched: true,
        })
    }

    fn bind_params(
        &self,
        template: GraphTemplate,
        entities: &ExtractedEntities,
    ) -> Option<serde_json::Value> {
        if template.needs_author() {
            let name = entities.authors.first()?;
            Some(json!({ "name": name, "limit": self.limit }))
        } else if template.needs_topic() {
            let topic = entities.topics.first().or_else(|| entities.authors.first())?;
            Some(json!({ "topic": topic, "limit": self.limit }))
        } else {
            Some(json!({ "limit": self.limit }))
        }
    }
}

fn row_str<'a>(row: &'a GraphRow, key: &str) -> &'a str {
    row.get(key).and_then(|v| v.as_str()).unwrap_or("")
}

fn collect_doc_ids(rows: &[GraphRow]) -> Vec<String> {
    let mut ids = Vec::new();
    for row in rows {
        let doi = row_str(row, "doi");
        if !doi.is_empty() && !ids.iter().any(|id| id == doi) {
            ids.push(doi.to_string());
        }
    }
    ids
}

fn summarize(template: GraphTemplate, entities: &ExtractedEntities, rows: &[GraphRow]) -> String {
    match template {
        GraphTemplate::PapersByAuthor => {
            let name = entities.authors.first().map(String::as_str).unwrap_or("");
            let mut text = format!("Found {} paper(s) by authors matching '{}':", rows.len(), name);
            for row in rows {
                text.push_str(&format!(
                    "\n• '{}' by {}",
                    row_str(row, "title"),
                    row_str(row, "author")
                ));
            }
            text
        }
        GraphTemplate::CollaboratorsOfAuthor => {
            let name = entities.authors.first().map(String::as_str).unwrap_or("");
            let mut text = format!("Authors who collaborated with {}:", name);
            for row in rows {
                text.push_str(&format!("\n• {}", row_str(row, "collaborator")));
            }
            text
        }
        GraphTemplate::PapersByTopic => {
            let topic = entities
                .topics
                .first()
                .or_else(|| entities.authors.first())
                .map(String::as_str)
                .unwrap_or("");
            let mut text = format!("Found {} paper(s) on '{}':", rows.len(), topic);
            for row in rows {
                text.push_str(&format!("\n• '{}'", row_str(row, "title")));
            }
            text
        }
        GraphTemplate::TopicsByAuthor => {
            let name = entities.authors.first().map(String::as_str).unwrap_or("");
            let mut text = format!("Topics covered by {}:", name);
            for row in rows {
                text.push_str(&format!("\n• {}", row_str(row, "topic")));
            }
            text
        }
        GraphTemplate::ListAllAuthors => {
            let mut text = format!("All authors in the dataset ({} shown):", rows.len());
            for row in rows {
                text.push_str(&format!("\n• {}", row_str(row, "author")));
            }
            text
        }
        GraphTemplate::ListAllTopics => {
            let mut text = format!("All topics in the dataset ({} shown):", rows.len());
            for row in rows {
                text.push_str(&format!("\n• {}", row_str(row, "topic")));
            }
            text
        }
        GraphTemplate::AuthorsWithMultiplePapers => {
            let mut text = "Authors with multiple papers:".to_string();
            for row in rows {
                let count = row.get("paper_count").and_then(|v| v.as_u64()).unwrap_or(0);
                text.push_str(&format!("\n• {} ({} papers)", row_str(row, "author"), count));
                if let Some(titles) = row.get("titles").and_then(|v| v.as_array()) {
                    for title in titles {
                        if let Some(t) = title.as_str() {
                            text.push_str(&format!("\n  - {}", t));
                        }
                    }
                }
            }
            text
        }
    }
}
