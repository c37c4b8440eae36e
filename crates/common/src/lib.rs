//! ScholarGraph Common Library
//!
//! Shared code for all ScholarGraph services including:
//! - Canonical bibliographic record model and normalization
//! - Stable entity-id generation
//! - Capability clients (embedding, vector index, graph store, generation)
//! - Error types and handling
//! - Configuration management
//! - Metrics and observability

pub mod config;
pub mod embeddings;
pub mod errors;
pub mod generation;
pub mod graph;
pub mod ids;
pub mod metrics;
pub mod record;
pub mod vector;

// Re-export commonly used types
pub use config::AppConfig;
pub use embeddings::Embedder;
pub use errors::{AppError, Result};
pub use generation::Generator;
pub use graph::GraphStore;
pub use record::CanonicalRecord;
pub use vector::VectorIndex;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default embedding dimension (all-MiniLM-class models)
pub const DEFAULT_EMBEDDING_DIMENSION: usize = 384;

/// Default similarity threshold below which vector hits are discarded
pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.35;
