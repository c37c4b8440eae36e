//! Search handler

use crate::AppState;
use axum::extract::State;
use axum::Json;
use scholargraph_common::errors::{AppError, Result};
use scholargraph_retrieval::SourceRef;
use serde::{Deserialize, Serialize};
use std::time::Instant;

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub answer: String,
    /// Best similarity in the winning source set (1.0 for graph-exact).
    pub confidence: f32,
    pub sources: Vec<SourceRef>,
    pub similarities: Vec<f32>,
    pub graph_used: bool,
    pub intent: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graph_template: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graph_query: Option<String>,
    pub processing_time_ms: u64,
}

/// Answer one natural-language question against the active dataset.
pub async fn search(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<SearchResponse>> {
    let query = request.query.trim().to_string();
    if query.is_empty() {
        return Err(AppError::InvalidRequest {
            message: "Query must not be empty".into(),
        });
    }

    let engine = {
        let guard = state.engine.read().await;
        guard.clone().ok_or(AppError::NotReady)?
    };

    let start = Instant::now();
    let result = engine.answer(&query).await;
    let processing_time_ms = start.elapsed().as_millis() as u64;

    tracing::info!(
        query = %query,
        intent = result.intent,
        graph_used = result.graph_used,
        sources = result.sources.len(),
        latency_ms = processing_time_ms,
        "Search completed"
    );

    Ok(Json(SearchResponse {
        query,
        answer: result.answer,
        confidence: result.best_score,
        sources: result.sources,
        similarities: result.similarities,
        graph_used: result.graph_used,
        intent: result.intent,
        graph_template: result.graph_template,
        graph_query: result.graph_query,
        processing_time_ms,
    }))
}
