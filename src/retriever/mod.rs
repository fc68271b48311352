//! Hybrid graph + vector retrieval.
//!
//! Components:
//! - `entity_extractor`: LLM-backed entity extraction with lenient parsing
//! - `graph`: neighbor traversal and shortest-path lookups
//! - `context`: text rendering of graph results
//! - `result`: `GraphPath` and `RetrievalResult`
//! - `hybrid`: the orchestrating `HybridRetriever`

pub mod context;
pub mod entity_extractor;
pub mod graph;
pub mod hybrid;
pub mod result;
pub mod stage;

pub use context::format_graph_context;
pub use entity_extractor::{parse_entities, EntityExtractor};
pub use graph::{
    neighbor_query, shortest_path_query, NeighborFinder, NeighborRecord, PathFinder,
    GRAPH_QUERY_TIMEOUT,
};
pub use hybrid::{HybridRetriever, RetrievalSettings, HEALTH_PROBE_TIMEOUT};
pub use result::{GraphPath, RetrievalResult};
pub use stage::{Severity, Stage};
