//! Canonical bibliographic record model and normalization
//!
//! Uploaded exports arrive as loosely-typed rows with export-specific column
//! naming (Scopus-style long headers, Web-of-Science-style two-letter tags,
//! plus the legacy standardized export). Normalization maps those rows onto
//! one fixed record shape; rows that lack a DOI, title, or abstract after
//! cleaning are dropped from both indices.

use crate::errors::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A raw uploaded row: cleaned header name -> cell value.
pub type RawRecord = BTreeMap<String, String>;

/// One normalized bibliographic entry, used by both indexing paths.
///
/// Invariant: `document_id`, `title`, and `abstract_text` are non-empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    /// DOI; doubles as the document's graph node id and vector-index id.
    pub document_id: String,
    pub title: String,
    pub abstract_text: String,
    /// Raw semicolon-delimited author list as exported.
    pub authors: String,
    pub journal_name: String,
    /// Raw date string; year extraction is best-effort (see [`extract_year`]).
    pub publication_date: String,
    pub author_keywords: String,
    pub index_keywords: String,
    pub vhb_ranking: String,
    pub abdc_ranking: String,
    pub citations: Option<u32>,
    pub url: Option<String>,
    /// Unmapped but present columns, retained as opaque extras.
    pub extras: BTreeMap<String, String>,
}

/// Result of normalizing an uploaded batch.
#[derive(Debug, Clone)]
pub struct NormalizedBatch {
    pub records: Vec<CanonicalRecord>,
    /// Rows in the upload before the quality filter.
    pub received: usize,
    /// Rows dropped for missing doi/title/abstract.
    pub dropped: usize,
}

/// Canonical field names and their known aliases across export formats.
///
/// First entry per row is the canonical name; matching is case-insensitive
/// against cleaned headers.
const FIELD_ALIASES: &[(&str, &[&str])] = &[
    ("doi", &["doi", "di"]),
    ("title", &["title", "article title", "document title", "ti"]),
    ("abstract", &["abstract", "ab"]),
    (
        "authors",
        &["authors", "author full names", "author(s)", "au", "af"],
    ),
    (
        "date",
        &["date", "publication date", "year", "publication year", "py"],
    ),
    (
        "journal_name",
        &["journal_name", "source title", "journal", "so"],
    ),
    (
        "author_keywords",
        &["author_keywords", "author keywords", "de"],
    ),
    (
        "index_keywords",
        &["index_keywords", "index keywords", "keywords plus", "id"],
    ),
    ("vhb_ranking", &["vhbranking", "vhb_ranking", "vhb"]),
    // The legacy export carries a typo'd "abcdRanking" header; accept it.
    (
        "abdc_ranking",
        &["abdcranking", "abcdranking", "abdc_ranking", "abdc"],
    ),
    ("citations", &["citations", "cited by", "times cited", "tc"]),
    ("url", &["url", "link"]),
];

/// Columns that must be present (post-alias) or the whole batch is rejected.
const REQUIRED_FIELDS: &[&str] = &["doi", "title", "abstract", "authors", "date", "journal_name"];

/// Clean a column header: strip BOM and non-breaking spaces, collapse
/// whitespace, remove wrapping quotes, lowercase.
pub fn clean_header(raw: &str) -> String {
    let mut s = raw.replace('\u{feff}', "").replace('\u{a0}', " ");
    s = s.split_whitespace().collect::<Vec<_>>().join(" ");
    let trimmed = s
        .trim_matches(|c| c == '"' || c == '\'')
        .trim()
        .to_lowercase();
    trimmed
}

/// Resolve a cleaned header to its canonical field name, if known.
fn canonical_field(cleaned: &str) -> Option<&'static str> {
    FIELD_ALIASES
        .iter()
        .find(|(_, aliases)| aliases.contains(&cleaned))
        .map(|(canonical, _)| *canonical)
}

/// Split a raw author list on semicolons.
///
/// Commas are preserved: "Last, First" is a single name, not two.
pub fn split_authors(raw: &str) -> Vec<String> {
    raw.split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse a keyword field, splitting on semicolon, falling back to pipe,
/// falling back to comma. Deduplicates case-insensitively while preserving
/// first-seen order.
pub fn parse_keywords(raw: &str) -> Vec<String> {
    let delimiter = if raw.contains(';') {
        ';'
    } else if raw.contains('|') {
        '|'
    } else {
        ','
    };

    let mut seen = Vec::new();
    let mut out = Vec::new();
    for part in raw.split(delimiter) {
        let kw = part.trim();
        if kw.is_empty() {
            continue;
        }
        let folded = kw.to_lowercase();
        if !seen.contains(&folded) {
            seen.push(folded);
            out.push(kw.to_string());
        }
    }
    out
}

/// Scan a date string for the first 4-digit substring in a plausible year
/// range. Deliberately lossy: this is not a date parser.
pub fn extract_year(date: &str) -> Option<String> {
    let bytes = date.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i].is_ascii_digit() {
            let start = i;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
            if i - start == 4 {
                let candidate = &date[start..i];
                if let Ok(year) = candidate.parse::<u16>() {
                    if (1500..=2099).contains(&year) {
                        return Some(candidate.to_string());
                    }
                }
            }
        } else {
            i += 1;
        }
    }
    None
}

/// Normalize an uploaded batch into canonical records.
///
/// The column set is validated batch-wide: if any required column is absent
/// across the batch headers the whole upload is rejected before any indexing
/// work, naming the missing canonical fields.
pub fn normalize_batch(rows: &[RawRecord]) -> Result<NormalizedBatch> {
    if rows.is_empty() {
        return Ok(NormalizedBatch {
            records: Vec::new(),
            received: 0,
            dropped: 0,
        });
    }

    // Map cleaned headers of the batch to canonical names once.
    let mut header_map: BTreeMap<String, &'static str> = BTreeMap::new();
    for key in rows[0].keys() {
        let cleaned = clean_header(key);
        if let Some(canonical) = canonical_field(&cleaned) {
            header_map.insert(key.clone(), canonical);
        }
    }

    let present: Vec<&str> = header_map.values().copied().collect();
    let missing: Vec<String> = REQUIRED_FIELDS
        .iter()
        .filter(|f| !present.contains(*f))
        .map(|f| f.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(AppError::SchemaValidation { missing });
    }

    let received = rows.len();
    let mut records = Vec::with_capacity(received);

    for row in rows {
        let mut fields: BTreeMap<&'static str, String> = BTreeMap::new();
        let mut extras = BTreeMap::new();
        for (key, value) in row {
            match header_map.get(key) {
                Some(canonical) => {
                    fields.insert(canonical, value.trim().to_string());
                }
                None => {
                    let cleaned = clean_header(key);
                    if !cleaned.is_empty() && !value.trim().is_empty() {
                        extras.insert(cleaned, value.trim().to_string());
                    }
                }
            }
        }

        let get = |name: &str| fields.get(name).cloned().unwrap_or_default();

        let document_id = get("doi");
        let title = get("title");
        let abstract_text = get("abstract");
        if document_id.is_empty() || title.is_empty() || abstract_text.is_empty() {
            continue;
        }

        let citations = fields
            .get("citations")
            .and_then(|c| c.trim().parse::<u32>().ok());
        let url = fields
            .get("url")
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty());

        records.push(CanonicalRecord {
            document_id,
            title,
            abstract_text,
            authors: get("authors"),
            journal_name: get("journal_name"),
            publication_date: get("date"),
            author_keywords: get("author_keywords"),
            index_keywords: get("index_keywords"),
            vhb_ranking: get("vhb_ranking"),
            abdc_ranking: get("abdc_ranking"),
            citations,
            url,
            extras,
        });
    }

    let dropped = received - records.len();
    if dropped > 0 {
        tracing::info!(received, dropped, "Rows dropped by quality filter");
    }

    Ok(NormalizedBatch {
        records,
        received,
        dropped,
    })
}

impl CanonicalRecord {
    /// Access link for this record: explicit URL, else the DOI resolver.
    pub fn access_link(&self) -> String {
        self.url
            .clone()
            .unwrap_or_else(|| format!("https://doi.org/{}", self.document_id))
    }

    /// Extracted publication year, if the date field contains one.
    pub fn year(&self) -> Option<String> {
        extract_year(&self.publication_date)
    }
}
