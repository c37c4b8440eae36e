//! Graph projection
//!
//! Derives nodes and relationships from canonical records: documents,
//! authors, journals, rankings, years, keywords, plus co-authorship and
//! same-year links. Projection is a pure function; node ids are stable
//! hashes so projecting the same input twice yields identical output and
//! repeated graph merges are idempotent.

use scholargraph_common::ids;
use scholargraph_common::record::{parse_keywords, split_authors, CanonicalRecord};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Same-year buckets beyond this size generate quadratically many edges;
/// kept as-is but logged, since the pair semantics are part of the schema.
const SAME_YEAR_WARN_BUCKET: usize = 200;

/// Document node, keyed by DOI.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentNode {
    pub id: String,
    pub title: String,
    pub abstract_text: String,
    pub date: String,
    pub journal_name: String,
    pub url: String,
    pub citations: Option<u32>,
}

/// Named node (author, journal, ranking body, keyword).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamedNode {
    pub id: String,
    pub name: String,
}

/// Journal ranking node (e.g. VHB "A", ABDC "A*").
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankingNode {
    pub id: String,
    pub code: String,
    pub body: String,
}

/// Publication-year node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct YearNode {
    pub id: String,
    pub year: String,
}

/// Directed or canonically-ordered undirected edge.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Edge {
    pub from: String,
    pub to: String,
}

impl Edge {
    fn directed(from: &str, to: &str) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    /// Undirected edge stored with the lexicographically smaller id first,
    /// so the reverse pairing never produces a duplicate.
    fn undirected(a: &str, b: &str) -> Self {
        if a <= b {
            Self::directed(a, b)
        } else {
            Self::directed(b, a)
        }
    }
}

/// Keyword edge kind: which keyword field it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum KeywordKind {
    Author,
    Index,
}

impl KeywordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeywordKind::Author => "author",
            KeywordKind::Index => "index",
        }
    }
}

/// Document -> Keyword edge, typed by origin field.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct KeywordEdge {
    pub document_id: String,
    pub keyword_id: String,
    pub kind: KeywordKind,
}

/// Full projection output, grouped by entity and relationship type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphBatch {
    pub documents: Vec<DocumentNode>,
    pub authors: Vec<NamedNode>,
    pub journals: Vec<NamedNode>,
    pub rankings: Vec<RankingNode>,
    pub ranking_bodies: Vec<NamedNode>,
    pub years: Vec<YearNode>,
    pub keywords: Vec<NamedNode>,

    /// Document -> Author
    pub has_author: Vec<Edge>,
    /// Document -> Journal
    pub published_in: Vec<Edge>,
    /// Journal -> Ranking
    pub has_rating: Vec<Edge>,
    /// Ranking -> RankingBody
    pub issued_by: Vec<Edge>,
    /// Author <-> Author, canonical ordering
    pub collaborated_with: Vec<Edge>,
    /// Document <-> Document, canonical ordering
    pub same_year_as: Vec<Edge>,
    /// Document -> Keyword
    pub has_keyword: Vec<KeywordEdge>,
}

impl GraphBatch {
    pub fn node_count(&self) -> usize {
        self.documents.len()
            + self.authors.len()
            + self.journals.len()
            + self.rankings.len()
            + self.ranking_bodies.len()
            + self.years.len()
            + self.keywords.len()
    }

    pub fn edge_count(&self) -> usize {
        self.has_author.len()
            + self.published_in.len()
            + self.has_rating.len()
            + self.issued_by.len()
            + self.collaborated_with.len()
            + self.same_year_as.len()
            + self.has_keyword.len()
    }
}

/// Project canonical records into graph nodes and relationships.
///
/// Co-authorship pairs are O(k^2) per document; author lists are small in
/// practice. Same-year pairs are O(n^2) within a year bucket, which is the
/// dominant cost for large single-year batches (see `SAME_YEAR_WARN_BUCKET`).
pub fn project(records: &[CanonicalRecord]) -> GraphBatch {
    let mut documents: BTreeMap<String, DocumentNode> = BTreeMap::new();
    let mut authors: BTreeMap<String, NamedNode> = BTreeMap::new();
    let mut journals: BTreeMap<String, NamedNode> = BTreeMap::new();
    let mut rankings: BTreeMap<String, RankingNode> = BTreeMap::new();
    let mut ranking_bodies: BTreeMap<String, NamedNode> = BTreeMap::new();
    let mut years: BTreeMap<String, YearNode> = BTreeMap::new();
    let mut keywords: BTreeMap<String, NamedNode> = BTreeMap::new();

    let mut has_author: BTreeSet<Edge> = BTreeSet::new();
    let mut published_in: BTreeSet<Edge> = BTreeSet::new();
    let mut has_rating: BTreeSet<Edge> = BTreeSet::new();
    let mut issued_by: BTreeSet<Edge> = BTreeSet::new();
    let mut collaborated_with: BTreeSet<Edge> = BTreeSet::new();
    let mut has_keyword: BTreeSet<KeywordEdge> = BTreeSet::new();

    let mut year_buckets: BTreeMap<String, Vec<String>> = BTreeMap::new();

    for record in records {
        let doc_id = record.document_id.clone();
        documents.entry(doc_id.clone()).or_insert(DocumentNode {
            id: doc_id.clone(),
            title: record.title.clone(),
            abstract_text: record.abstract_text.clone(),
            date: record.publication_date.clone(),
            journal_name: record.journal_name.clone(),
            url: record.access_link(),
            citations: record.citations,
        });

        // Authors and co-authorship
        let author_ids: Vec<String> = split_authors(&record.authors)
            .into_iter()
            .map(|name| {
                let id = ids::make_id(ids::AUTHOR, &name);
                authors
                    .entry(id.clone())
                    .or_insert(NamedNode { id: id.clone(), name });
                has_author.insert(Edge::directed(&doc_id, &id));
                id
            })
            .collect();

        for (i, a) in author_ids.iter().enumerate() {
            for b in author_ids.iter().skip(i + 1) {
                if a != b {
                    collaborated_with.insert(Edge::undirected(a, b));
                }
            }
        }

        // Journal and rankings
        if !record.journal_name.is_empty() {
            let journal_id = ids::make_id(ids::JOURNAL, &record.journal_name);
            journals.entry(journal_id.clone()).or_insert(NamedNode {
                id: journal_id.clone(),
                name: record.journal_name.clone(),
            });
            published_in.insert(Edge::directed(&doc_id, &journal_id));

            for (body, code) in [("VHB", &record.vhb_ranking), ("ABDC", &record.abdc_ranking)] {
                let code = code.trim();
                if code.is_empty() {
                    continue;
                }
                let body_id = ids::make_id(ids::RANKING_BODY, body);
                ranking_bodies.entry(body_id.clone()).or_insert(NamedNode {
                    id: body_id.clone(),
                    name: body.to_string(),
                });
                let ranking_id = ids::make_id(ids::RANKING, &format!("{} {}", body, code));
                rankings.entry(ranking_id.clone()).or_insert(RankingNode {
                    id: ranking_id.clone(),
                    code: code.to_string(),
                    body: body.to_string(),
                });
                has_rating.insert(Edge::directed(&journal_id, &ranking_id));
                issued_by.insert(Edge::directed(&ranking_id, &body_id));
            }
        }

        // Year
        if let Some(year) = record.year() {
            let year_id = ids::make_id(ids::YEAR, &year);
            years.entry(year_id).or_insert_with(|| YearNode {
                id: ids::make_id(ids::YEAR, &year),
                year: year.clone(),
            });
            year_buckets.entry(year).or_default().push(doc_id.clone());
        }

        // Keywords, typed by origin field
        for (kind, raw) in [
            (KeywordKind::Author, &record.author_keywords),
            (KeywordKind::Index, &record.index_keywords),
        ] {
            for kw in parse_keywords(raw) {
                let kw_id = ids::make_id(ids::KEYWORD, &kw);
                keywords
                    .entry(kw_id.clone())
                    .or_insert(NamedNode { id: kw_id.clone(), name: kw });
                has_keyword.insert(KeywordEdge {
                    document_id: doc_id.clone(),
                    keyword_id: kw_id,
                    kind,
                });
            }
        }
    }

    // Same-year pairs: quadratic within each bucket
    let mut same_year_as: BTreeSet<Edge> = BTreeSet::new();
    for (year, bucket) in &year_buckets {
        if bucket.len() > SAME_YEAR_WARN_BUCKET {
            tracing::warn!(
                year = %year,
                documents = bucket.len(),
                "Large same-year bucket, edge generation is quadratic"
            );
        }
        for (i, a) in bucket.iter().enumerate() {
            for b in bucket.iter().skip(i + 1) {
                if a != b {
                    same_year_as.insert(Edge::undirected(a, b));
                }
            }
        }
    }

    GraphBatch {
        documents: documents.into_values().collect(),
        authors: authors.into_values().collect(),
        journals: journals.into_values().collect(),
        rankings: rankings.into_values().collect(),
        ranking_bodies: ranking_bodies.into_values().collect(),
        years: years.into_values().collect(),
        keywords: keywords.into_values().collect(),
        has_author: has_author.into_iter().collect(),
        published_in: published_in.into_iter().collect(),
        has_rating: has_rating.into_iter().collect(),
        issued_by: issued_by.into_iter().collect(),
        collaborated_with: collaborated_with.into_iter().collect(),
        same_year_as: same_year_as.into_iter().collect(),
        has_keyword: has_keyword.into_iter().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn record(doi: &str, authors: &str, date: &str) -> CanonicalRecord {
        CanonicalRecord {
            document_id: doi.to_string(),
            title: format!("Title {doi}"),
            abstract_text: "Abstract.".to_string(),
            authors: authors.to_string(),
            journal_name: "Journal of Tests".to_string(),
            publication_date: date.to_string(),
            author_keywords: String::new(),
            index_keywords: String::new(),
            vhb_ranking: String::new(),
            abdc_ranking: String::new(),
            citations: None,
            url: None,
            extras: BTreeMap::new(),
        }
    }

    #[test]
    fn test_three_authors_three_collaboration_pairs() {
        let batch = project(&[record("10.1/a", "A, X.; B, Y.; C, Z.", "2020")]);
        assert_eq!(batch.authors.len(), 3);
        assert_eq!(batch.collaborated_with.len(), 3);
        for edge in &batch.collaborated_with {
            assert!(edge.from <= edge.to);
        }
    }

    #[test]
    fn test_projection_is_idempotent() {
        let records = vec![
            record("10.1/a", "Smith, J.; Doe, A.", "2020"),
            record("10.1/b", "Smith, J.", "2020"),
        ];
        assert_eq!(project(&records), project(&records));
    }

    #[test]
    fn test_authors_deduplicated_across_documents() {
        let batch = project(&[
            record("10.1/a", "Smith, J.", "2020"),
            record("10.1/b", " smith, j. ", "2021"),
        ]);
        // Case/whitespace-insensitive stable id merges the two spellings
        assert_eq!(batch.authors.len(), 1);
        assert_eq!(batch.has_author.len(), 2);
    }

    #[test]
    fn test_same_year_pairs_are_mutual_links() {
        let batch = project(&[
            record("10.1/a", "Smith, J.", "2020-01-01"),
            record("10.1/b", "Doe, A.", "2020-06-01"),
            record("10.1/c", "Roe, B.", "2019"),
        ]);
        assert_eq!(batch.years.len(), 2);
        assert_eq!(batch.same_year_as.len(), 1);
        let edge = &batch.same_year_as[0];
        assert_eq!((edge.from.as_str(), edge.to.as_str()), ("10.1/a", "10.1/b"));
    }

    #[test]
    fn test_reverse_pair_does_not_duplicate() {
        let a = Edge::undirected("x", "y");
        let b = Edge::undirected("y", "x");
        assert_eq!(a, b);
    }

    #[test]
    fn test_rankings_link_journal_to_body() {
        let mut rec = record("10.1/a", "Smith, J.", "2020");
        rec.vhb_ranking = "A".to_string();
        rec.abdc_ranking = "A*".to_string();
        let batch = project(&[rec]);

        assert_eq!(batch.rankings.len(), 2);
        assert_eq!(batch.ranking_bodies.len(), 2);
        assert_eq!(batch.has_rating.len(), 2);
        assert_eq!(batch.issued_by.len(), 2);
    }

    #[test]
    fn test_keywords_typed_by_origin() {
        let mut rec = record("10.1/a", "Smith, J.", "2020");
        rec.author_keywords = "ai; ml".to_string();
        rec.index_keywords = "ml".to_string();
        let batch = project(&[rec]);

        // "ml" is one node but two typed edges
        assert_eq!(batch.keywords.len(), 2);
        assert_eq!(batch.has_keyword.len(), 3);
        assert!(batch
            .has_keyword
            .iter()
            .any(|e| e.kind == KeywordKind::Index));
    }

    #[test]
    fn test_duplicate_doi_projects_once() {
        let batch = project(&[
            record("10.1/a", "Smith, J.", "2020"),
            record("10.1/a", "Smith, J.", "2020"),
        ]);
        assert_eq!(batch.documents.len(), 1);
    }
}
