//! ScholarGraph API gateway
//!
//! HTTP entry point for the hybrid scholarly search service:
//! - dataset upload (CSV or JSON rows) and the active-engine swap
//! - hybrid search over the active dataset
//! - status, health, and Prometheus metrics

mod handlers;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusBuilder;
use scholargraph_common::config::AppConfig;
use scholargraph_common::embeddings::{create_embedder, Embedder};
use scholargraph_common::generation::{Generator, OllamaGenerator};
use scholargraph_common::graph::{GraphStore, Neo4jHttpStore};
use scholargraph_common::metrics;
use scholargraph_common::vector::{MemoryIndex, VectorIndex};
use scholargraph_retrieval::{EntityExtractor, RegexEntityExtractor, SearchEngine};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Application state shared across handlers.
///
/// Capability clients are built once at startup. The vector index is shared
/// across uploads (each rebuild swaps in a fresh snapshot under a new
/// generation); the engine pointer is replaced wholesale on every upload and
/// never mutated in place.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub embedder: Arc<dyn Embedder>,
    pub index: Arc<dyn VectorIndex>,
    pub graph: Option<Arc<dyn GraphStore>>,
    pub generator: Arc<dyn Generator>,
    pub extractor: Arc<dyn EntityExtractor>,
    pub engine: Arc<RwLock<Option<Arc<SearchEngine>>>>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Arc::new(AppConfig::load()?);
    init_tracing(&config);

    info!("Starting ScholarGraph gateway v{}", scholargraph_common::VERSION);

    metrics::register_metrics();
    if config.observability.metrics_port != 0 {
        let metrics_addr = SocketAddr::from(([0, 0, 0, 0], config.observability.metrics_port));
        PrometheusBuilder::new()
            .with_http_listener(metrics_addr)
            .install()?;
        info!("Metrics exporter listening on {}", metrics_addr);
    }

    let embedder = create_embedder(&config.embedding)?;
    let generator: Arc<dyn Generator> = Arc::new(OllamaGenerator::new(&config.generation)?);
    let graph: Option<Arc<dyn GraphStore>> = match Neo4jHttpStore::new(&config.graph) {
        Ok(store) => Some(Arc::new(store)),
        Err(e) => {
            tracing::warn!(error = %e, "Graph store client unavailable, running vector-only");
            None
        }
    };

    let state = AppState {
        config: config.clone(),
        embedder,
        index: Arc::new(MemoryIndex::new()),
        graph,
        generator,
        extractor: Arc::new(RegexEntityExtractor::new()),
        engine: Arc::new(RwLock::new(None)),
    };

    let app = create_router(state, config.server.max_upload_bytes);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.observability.log_level.clone()));

    if config.observability.json_logging {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }
}

/// Create the main application router
fn create_router(state: AppState, max_upload_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/status", get(handlers::health::status))
        .route("/upload", post(handlers::upload::upload))
        .route("/search", post(handlers::search::search));

    Router::new()
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}
