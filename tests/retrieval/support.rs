//! In-memory collaborators that record every call.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use atlas_grag::{
    Error, GraphQuery, GraphRow, GraphStore, HybridRetriever, LanguageModel, Result,
    RetrievalSettings, VectorHit, VectorSearch,
};

/// Graph store answering neighbor queries by the entity in the bound pattern.
#[derive(Default)]
pub struct FakeGraph {
    pub healthy: bool,
    pub probe_fails: bool,
    pub execute_fails: bool,
    /// (entity substring, neighbor rows) pairs
    pub neighbors: Vec<(String, Vec<Value>)>,
    pub paths: Vec<Value>,
    pub queries: Mutex<Vec<GraphQuery>>,
}

impl FakeGraph {
    pub fn healthy() -> Self {
        Self {
            healthy: true,
            ..Default::default()
        }
    }

    pub fn with_neighbors(mut self, entity: &str, rows: Vec<Value>) -> Self {
        self.neighbors.push((entity.to_string(), rows));
        self
    }

    pub fn with_paths(mut self, rows: Vec<Value>) -> Self {
        self.paths = rows;
        self
    }

    pub fn neighbor_patterns(&self) -> Vec<String> {
        self.queries
            .lock()
            .unwrap()
            .iter()
            .filter_map(|q| q.text_param("pattern").map(str::to_string))
            .collect()
    }

    pub fn path_queries(&self) -> Vec<GraphQuery> {
        self.queries
            .lock()
            .unwrap()
            .iter()
            .filter(|q| q.text_param("from_pattern").is_some())
            .cloned()
            .collect()
    }

    pub fn query_count(&self) -> usize {
        self.queries.lock().unwrap().len()
    }
}

fn rows(values: &[Value]) -> Vec<GraphRow> {
    values.iter().cloned().filter_map(GraphRow::from_json).collect()
}

#[async_trait]
impl GraphStore for FakeGraph {
    async fn execute(&self, query: &GraphQuery) -> Result<Vec<GraphRow>> {
        self.queries.lock().unwrap().push(query.clone());
        if self.execute_fails {
            return Err(Error::GraphError("connection reset".to_string()));
        }

        if query.text_param("from_pattern").is_some() {
            return Ok(rows(&self.paths));
        }

        let pattern = query.text_param("pattern").unwrap_or_default();
        Ok(self
            .neighbors
            .iter()
            .find(|(entity, _)| pattern.contains(entity.as_str()))
            .map(|(_, values)| rows(values))
            .unwrap_or_default())
    }

    async fn is_healthy(&self) -> Result<bool> {
        if self.probe_fails {
            return Err(Error::ConnectionError("bolt handshake failed".to_string()));
        }
        Ok(self.healthy)
    }
}

pub struct FakeVector {
    pub documents: Vec<String>,
    pub fails: bool,
    pub calls: AtomicUsize,
}

impl FakeVector {
    pub fn with_documents(documents: &[&str]) -> Self {
        Self {
            documents: documents.iter().map(|d| d.to_string()).collect(),
            fails: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            documents: Vec::new(),
            fails: true,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl VectorSearch for FakeVector {
    async fn query_similar(
        &self,
        _collection: &str,
        _query_text: &str,
        n_results: usize,
    ) -> Result<Vec<VectorHit>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fails {
            return Err(Error::VectorStoreError("collection not found".to_string()));
        }
        Ok(self
            .documents
            .iter()
            .take(n_results)
            .enumerate()
            .map(|(i, doc)| VectorHit {
                id: i.to_string(),
                document: doc.clone(),
                score: 1.0 - i as f32 * 0.1,
            })
            .collect())
    }
}

pub struct FakeModel {
    pub reply: std::result::Result<String, String>,
    pub calls: AtomicUsize,
}

impl FakeModel {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Ok(reply.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            reply: Err(message.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LanguageModel for FakeModel {
    async fn complete(&self, _prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.reply.clone().map_err(Error::LlmError)
    }
}

pub struct Fixture {
    pub graph: Arc<FakeGraph>,
    pub vector: Arc<FakeVector>,
    pub model: Arc<FakeModel>,
    pub retriever: HybridRetriever,
}

pub fn fixture(graph: FakeGraph, vector: FakeVector, model: FakeModel) -> Fixture {
    let graph = Arc::new(graph);
    let vector = Arc::new(vector);
    let model = Arc::new(model);
    let retriever = HybridRetriever::new(
        RetrievalSettings::default(),
        graph.clone(),
        vector.clone(),
        model.clone(),
    )
    .expect("default settings are valid");

    Fixture {
        graph,
        vector,
        model,
        retriever,
    }
}

/// The supply-chain graph used by most scenarios.
pub fn supply_chain_graph() -> FakeGraph {
    use serde_json::json;

    FakeGraph::healthy()
        .with_neighbors(
            "Singapore",
            vec![
                json!({ "source": "Port of Singapore", "target": "FlowChips", "relationships": ["OPERATES_AT"], "path_length": 1 }),
                json!({ "source": "Port of Singapore", "target": "GlobalTech", "relationships": ["OPERATES_AT", "SUPPLIES"], "path_length": 2 }),
            ],
        )
        .with_neighbors(
            "GlobalTech",
            vec![
                json!({ "source": "GlobalTech", "target": "FlowChips", "relationships": ["SOURCES_FROM"], "path_length": 1 }),
                json!({ "source": "GlobalTech", "target": "Port of Singapore", "relationships": ["DEPENDS_ON"], "path_length": 2 }),
            ],
        )
        .with_paths(vec![json!({
            "nodes": ["Port of Singapore", "FlowChips", "GlobalTech"],
            "relationships": ["OPERATES_AT", "SUPPLIES"],
            "path_length": 2
        })])
}
