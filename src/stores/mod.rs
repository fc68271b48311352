//! Graph and vector store access.
//!
//! The retriever talks to both stores through the traits defined here:
//! - [`GraphStore`]: parameterized read queries against a property graph (Neo4j)
//! - [`VectorSearch`]: nearest-neighbor search over embedded chunks (Qdrant)
//!
//! Raw driver values never leave the adapters. A [`GraphQuery`] declares the
//! columns it returns and the adapter hands back exactly those as [`GraphRow`]s.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::Result;

pub mod embeddings;
pub mod graph_db;
pub mod vector_db;

pub use embeddings::EmbeddingBackend;
pub use graph_db::Neo4jGraphStore;
pub use vector_db::QdrantVectorStore;

/// Read-only access to the knowledge graph.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Run a read query and return one row per result record.
    async fn execute(&self, query: &GraphQuery) -> Result<Vec<GraphRow>>;

    /// Cheap liveness probe.
    async fn is_healthy(&self) -> Result<bool>;
}

/// Similarity search over stored document chunks.
#[async_trait]
pub trait VectorSearch: Send + Sync {
    /// Return up to `n_results` hits, best match first.
    async fn query_similar(
        &self,
        collection: &str,
        query_text: &str,
        n_results: usize,
    ) -> Result<Vec<VectorHit>>;
}

/// One ranked chunk from the vector store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VectorHit {
    pub id: String,
    pub document: String,
    pub score: f32,
}

/// Bound query parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryParam {
    Text(String),
    Integer(i64),
}

impl From<String> for QueryParam {
    fn from(value: String) -> Self {
        QueryParam::Text(value)
    }
}

impl From<&str> for QueryParam {
    fn from(value: &str) -> Self {
        QueryParam::Text(value.to_string())
    }
}

impl From<i64> for QueryParam {
    fn from(value: i64) -> Self {
        QueryParam::Integer(value)
    }
}

/// Cypher text plus bound parameters and the columns each row carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphQuery {
    pub cypher: String,
    pub params: Vec<(String, QueryParam)>,
    pub columns: &'static [&'static str],
}

impl GraphQuery {
    pub fn new(cypher: impl Into<String>, columns: &'static [&'static str]) -> Self {
        Self {
            cypher: cypher.into(),
            params: Vec::new(),
            columns,
        }
    }

    pub fn param(mut self, name: &str, value: impl Into<QueryParam>) -> Self {
        self.params.push((name.to_string(), value.into()));
        self
    }

    pub fn get_param(&self, name: &str) -> Option<&QueryParam> {
        self.params
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    pub fn text_param(&self, name: &str) -> Option<&str> {
        match self.get_param(name)? {
            QueryParam::Text(value) => Some(value),
            QueryParam::Integer(_) => None,
        }
    }
}

/// A result record reduced to its declared columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphRow {
    fields: HashMap<String, Value>,
}

impl GraphRow {
    pub fn new(fields: HashMap<String, Value>) -> Self {
        Self { fields }
    }

    /// Build a row from a JSON object; anything else yields `None`.
    pub fn from_json(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self {
                fields: map.into_iter().collect(),
            }),
            _ => None,
        }
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.fields.get(column)
    }

    /// Column as text; numbers and booleans are rendered, null and missing are `None`.
    pub fn text(&self, column: &str) -> Option<String> {
        self.get(column).and_then(value_to_text)
    }

    /// Column as a list of text values, dropping nulls.
    pub fn text_list(&self, column: &str) -> Option<Vec<String>> {
        match self.get(column)? {
            Value::Array(items) => Some(items.iter().filter_map(value_to_text).collect()),
            _ => None,
        }
    }

    pub fn integer(&self, column: &str) -> Option<i64> {
        match self.get(column)? {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

fn value_to_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
