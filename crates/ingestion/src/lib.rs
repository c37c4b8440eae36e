//! ScholarGraph ingestion
//!
//! Turns normalized bibliographic records into the two retrieval
//! substrates: the relationship graph (projection + bulk load) and the
//! vector index (text-block rendering + batch embedding). Both paths key
//! entities by stable ids so repeated imports merge idempotently.

pub mod indexer;
pub mod loader;
pub mod pipeline;
pub mod projector;

pub use indexer::{build_documents, build_text_block};
pub use loader::GraphLoader;
pub use pipeline::{ingest, IngestReport};
pub use projector::{project, GraphBatch};
