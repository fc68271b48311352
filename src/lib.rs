//! Atlas-GRAG hybrid retrieval library
//!
//! Answers supply-chain questions with context fused from two sources:
//! - semantic search over document chunks in Qdrant
//! - multi-hop traversal of an entity graph in Neo4j
//!
//! Entities are pulled out of the question by a local Ollama model, expanded
//! through the graph, and rendered together with the matching chunks into a
//! single context block for answer generation.

pub mod config;
pub mod error;
pub mod integrations;
pub mod metrics;
pub mod retriever;
pub mod stores;

// Re-export common types
pub use config::Config;
pub use error::{Error, Result};
pub use integrations::{LanguageModel, OllamaClient, OllamaLanguageModel};
pub use retriever::{GraphPath, HybridRetriever, RetrievalResult, RetrievalSettings};
pub use stores::{GraphQuery, GraphRow, GraphStore, VectorHit, VectorSearch};

// Commands module uses re-exported types, so it must be declared after the re-exports
pub mod commands;
