//! Health and status handlers

use crate::AppState;
use axum::extract::State;
use axum::Json;
use serde::Serialize;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub timestamp: String,
}

#[derive(Serialize)]
pub struct StatusResponse {
    /// True once a dataset has been uploaded and the engine is serving.
    pub ready: bool,
    pub dataset_generation: u64,
    pub documents: usize,
    /// True when the graph store failed mid-session and queries run
    /// vector-only.
    pub graph_degraded: bool,
    pub embedding_model: String,
    pub generation_model: String,
}

/// Liveness check
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: scholargraph_common::VERSION,
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// Active-dataset status
pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let engine = state.engine.read().await;

    let (ready, generation, documents, graph_degraded) = match engine.as_ref() {
        Some(engine) => (
            true,
            engine.generation(),
            engine.document_count(),
            engine.graph_degraded(),
        ),
        None => (false, 0, 0, false),
    };

    Json(StatusResponse {
        ready,
        dataset_generation: generation,
        documents,
        graph_degraded,
        embedding_model: state.embedder.model_name().to_string(),
        generation_model: state.generator.model_name().to_string(),
    })
}
