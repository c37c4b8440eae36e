//! Vector indexing
//!
//! Renders canonical records into embeddable text blocks with a fixed field
//! order (reproducible embeddings depend on it), batch-encodes them, and
//! rebuilds the vector index under a fresh generation.

use scholargraph_common::embeddings::Embedder;
use scholargraph_common::errors::Result;
use scholargraph_common::record::CanonicalRecord;
use scholargraph_common::vector::{DocMetadata, IndexedDocument, VectorIndex};
use std::sync::Arc;

/// Abstract snippet length for source display.
const SNIPPET_LEN: usize = 200;

/// Render the embeddable text block for one record.
///
/// Field order is fixed: title, abstract, authors, journal, year, then any
/// extras sorted by key. Changing the order changes every embedding.
pub fn build_text_block(record: &CanonicalRecord) -> String {
    let mut block = format!(
        "Title: {}\nAbstract: {}\nAuthors: {}\nJournal: {}\nYear: {}",
        record.title,
        record.abstract_text,
        record.authors,
        record.journal_name,
        record.year().unwrap_or_default(),
    );

    // extras is a BTreeMap, so iteration order is already stable
    let extra_parts: Vec<String> = record
        .extras
        .iter()
        .filter(|(_, v)| !v.is_empty())
        .map(|(k, v)| format!("{}: {}", k, v))
        .collect();
    if !extra_parts.is_empty() {
        block.push('\n');
        block.push_str(&extra_parts.join(" | "));
    }

    block
}

/// Build the display metadata stored alongside the embedding.
pub fn build_metadata(record: &CanonicalRecord) -> DocMetadata {
    let snippet = if record.abstract_text.chars().count() > SNIPPET_LEN {
        let cut: String = record.abstract_text.chars().take(SNIPPET_LEN).collect();
        format!("{}...", cut.trim_end())
    } else {
        record.abstract_text.clone()
    };

    DocMetadata {
        title: record.title.clone(),
        authors: record.authors.clone(),
        journal: record.journal_name.clone(),
        year: record.year().unwrap_or_default(),
        doi: record.document_id.clone(),
        link: record.access_link(),
        snippet,
        vhb_ranking: record.vhb_ranking.clone(),
        abdc_ranking: record.abdc_ranking.clone(),
        citations: record.citations,
    }
}

/// Encode all records in one batch call and pair each with its metadata.
pub async fn build_documents(
    records: &[CanonicalRecord],
    embedder: &dyn Embedder,
) -> Result<Vec<IndexedDocument>> {
    let text_blocks: Vec<String> = records.iter().map(build_text_block).collect();
    let embeddings = embedder.embed_batch(&text_blocks).await?;
    metrics::counter!(format!(
        "{}_embedding_requests_total",
        scholargraph_common::metrics::METRICS_PREFIX
    ))
    .increment(1);

    Ok(records
        .iter()
        .zip(text_blocks)
        .zip(embeddings)
        .map(|((record, text_block), embedding)| IndexedDocument {
            id: record.document_id.clone(),
            embedding,
            text_block,
            metadata: build_metadata(record),
        })
        .collect())
}

/// Embed all records and rebuild the index wholesale.
///
/// The rebuild lands under a fresh generation; readers of the previous
/// generation finish against their own snapshot.
pub async fn embed_and_store(
    records: &[CanonicalRecord],
    embedder: &dyn Embedder,
    index: &Arc<dyn VectorIndex>,
) -> Result<usize> {
    let documents = build_documents(records, embedder).await?;
    let count = documents.len();
    index.rebuild(documents).await?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use scholargraph_common::embeddings::HashEmbedder;
    use scholargraph_common::vector::MemoryIndex;
    use std::collections::BTreeMap;

    fn record() -> CanonicalRecord {
        CanonicalRecord {
            document_id: "10.1/a".into(),
            title: "Churn Prediction".into(),
            abstract_text: "We predict churn.".into(),
            authors: "Smith, J.; Doe, A.".into(),
            journal_name: "Journal of Prediction".into(),
            publication_date: "2020-05-01".into(),
            author_keywords: "churn; ml".into(),
            index_keywords: String::new(),
            vhb_ranking: "B".into(),
            abdc_ranking: String::new(),
            citations: Some(12),
            url: None,
            extras: BTreeMap::new(),
        }
    }

    #[test]
    fn test_text_block_field_order() {
        let block = build_text_block(&record());
        let title_pos = block.find("Title:").unwrap();
        let abstract_pos = block.find("Abstract:").unwrap();
        let authors_pos = block.find("Authors:").unwrap();
        let journal_pos = block.find("Journal:").unwrap();
        let year_pos = block.find("Year:").unwrap();
        assert!(title_pos < abstract_pos);
        assert!(abstract_pos < authors_pos);
        assert!(authors_pos < journal_pos);
        assert!(journal_pos < year_pos);
        assert!(block.contains("Year: 2020"));
    }

    #[test]
    fn test_text_block_deterministic_with_extras() {
        let mut rec = record();
        rec.extras.insert("funding".into(), "NSF".into());
        rec.extras.insert("affiliation".into(), "MIT".into());
        assert_eq!(build_text_block(&rec), build_text_block(&rec));
        // BTreeMap ordering: affiliation before funding
        let block = build_text_block(&rec);
        assert!(block.find("affiliation").unwrap() < block.find("funding").unwrap());
    }

    #[test]
    fn test_snippet_truncation() {
        let mut rec = record();
        rec.abstract_text = "x".repeat(500);
        let meta = build_metadata(&rec);
        assert!(meta.snippet.ends_with("..."));
        assert!(meta.snippet.chars().count() <= 203);

        let short = build_metadata(&record());
        assert_eq!(short.snippet, "We predict churn.");
    }

    #[test]
    fn test_metadata_link_falls_back_to_doi() {
        let meta = build_metadata(&record());
        assert_eq!(meta.link, "https://doi.org/10.1/a");
    }

    #[tokio::test]
    async fn test_embed_and_store_rebuilds_index() {
        let embedder = HashEmbedder::new(64);
        let index: Arc<dyn VectorIndex> = Arc::new(MemoryIndex::new());

        let count = embed_and_store(&[record()], &embedder, &index).await.unwrap();
        assert_eq!(count, 1);
        assert_eq!(index.len(), 1);
        assert_eq!(index.generation(), 1);

        let fetched = index.fetch(&["10.1/a".into()]).await.unwrap();
        assert_eq!(fetched[0].metadata.title, "Churn Prediction");
        let norm: f32 = fetched[0].embedding.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }
}
