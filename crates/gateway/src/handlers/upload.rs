//! Dataset upload handler
//!
//! Accepts one bibliographic export per request, as CSV or as a JSON array
//! of row objects. A successful upload runs the full ingestion pipeline and
//! swaps a fresh search engine into the shared state; the previous engine
//! keeps serving in-flight queries until they complete.

use crate::AppState;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap};
use axum::Json;
use scholargraph_common::errors::{AppError, Result};
use scholargraph_common::record::RawRecord;
use scholargraph_ingestion::{ingest, IngestReport};
use scholargraph_retrieval::SearchEngine;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Serialize)]
pub struct UploadResponse {
    pub status: &'static str,
    pub dataset_generation: u64,
    #[serde(flatten)]
    pub report: IngestReport,
}

pub async fn upload(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<UploadResponse>> {
    let rows = parse_rows(&headers, &body)?;
    tracing::info!(rows = rows.len(), "Upload received");

    let report = ingest(
        &rows,
        state.embedder.as_ref(),
        &state.index,
        state.graph.as_ref(),
    )
    .await?;

    let engine = Arc::new(SearchEngine::new(
        &state.config,
        state.embedder.clone(),
        state.index.clone(),
        state.graph.clone(),
        state.generator.clone(),
        state.extractor.clone(),
    ));
    let generation = engine.generation();

    *state.engine.write().await = Some(engine);
    tracing::info!(
        generation,
        indexed = report.records_indexed,
        "Active dataset swapped"
    );

    Ok(Json(UploadResponse {
        status: "ok",
        dataset_generation: generation,
        report,
    }))
}

/// Parse the upload body into raw rows. JSON payloads are arrays of flat
/// objects; anything else is treated as CSV with a header row.
fn parse_rows(headers: &HeaderMap, body: &[u8]) -> Result<Vec<RawRecord>> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if content_type.contains("json") {
        parse_json_rows(body)
    } else {
        parse_csv_rows(body)
    }
}

fn parse_json_rows(body: &[u8]) -> Result<Vec<RawRecord>> {
    let rows: Vec<BTreeMap<String, serde_json::Value>> =
        serde_json::from_slice(body).map_err(|e| AppError::InvalidRequest {
            message: format!("Invalid JSON upload: {}", e),
        })?;

    Ok(rows
        .into_iter()
        .map(|row| {
            row.into_iter()
                .map(|(key, value)| (key, value_to_cell(value)))
                .collect()
        })
        .collect())
}

fn value_to_cell(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    }
}

fn parse_csv_rows(body: &[u8]) -> Result<Vec<RawRecord>> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(body);

    let header_row: Vec<String> = reader
        .headers()
        .map_err(|e| AppError::InvalidRequest {
            message: format!("Invalid CSV upload: {}", e),
        })?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| AppError::InvalidRequest {
            message: format!("Invalid CSV row: {}", e),
        })?;
        let row: RawRecord = header_row
            .iter()
            .cloned()
            .zip(record.iter().map(|cell| cell.to_string()))
            .collect();
        rows.push(row);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_csv_rows_zips_headers() {
        let body = b"doi,title\n10.1/a,Doc A\n10.1/b,Doc B\n";
        let rows = parse_csv_rows(body).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("doi").unwrap(), "10.1/a");
        assert_eq!(rows[1].get("title").unwrap(), "Doc B");
    }

    #[test]
    fn test_parse_json_rows_stringifies_scalars() {
        let body = br#"[{"doi": "10.1/a", "cited by": 12, "url": null}]"#;
        let rows = parse_json_rows(body).unwrap();

        assert_eq!(rows[0].get("doi").unwrap(), "10.1/a");
        assert_eq!(rows[0].get("cited by").unwrap(), "12");
        assert_eq!(rows[0].get("url").unwrap(), "");
    }

    #[test]
    fn test_invalid_json_is_a_client_error() {
        let err = parse_json_rows(b"{not json").unwrap_err();
        assert!(matches!(err, AppError::InvalidRequest { .. }));
    }

    #[test]
    fn test_content_type_routing() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, "application/json".parse().unwrap());
        let rows = parse_rows(&headers, br#"[{"doi": "10.1/a"}]"#).unwrap();
        assert_eq!(rows.len(), 1);
    }
}
