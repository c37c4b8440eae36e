//! ScholarGraph retrieval
//!
//! The query path: intent classification, entity extraction, graph query
//! templates, and the hybrid retriever that merges graph-exact matches with
//! embedding-approximate matches into one ranked source list.

pub mod assemble;
pub mod entities;
pub mod hybrid;
pub mod intent;
pub mod templates;

pub use assemble::{build_prompt, FALLBACK_ANSWER};
pub use entities::{EntityExtractor, ExtractedEntities, RegexEntityExtractor};
pub use hybrid::{HybridAnswer, SearchEngine, SourceRef};
pub use intent::{should_use_graph, IntentClassifier, IntentLabel};
pub use templates::{GraphFinding, GraphSearcher, GraphTemplate};
