//! Hybrid retriever: vector search plus multi-hop graph context.
//!
//! One call runs, in order of data dependency:
//! 1. entity extraction (skipped for vector-only calls) alongside vector search
//! 2. per-entity neighbor lookups alongside the path search, once entities exist
//! 3. formatting of the graph context
//!
//! Every stage degrades to an empty value on failure, so `retrieve` always
//! returns a result. The only hard failure is invalid settings at construction.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::context::format_graph_context;
use super::entity_extractor::EntityExtractor;
use super::graph::{NeighborFinder, NeighborRecord, PathFinder};
use super::result::RetrievalResult;
use super::stage::{degrade, Severity, Stage};
use crate::config::{
    Config, DEFAULT_COLLECTION_NAME, DEFAULT_GRAPH_MAX_HOPS, DEFAULT_OLLAMA_MODEL,
    DEFAULT_VECTOR_TOP_K,
};
use crate::integrations::{LanguageModel, OllamaClient, OllamaLanguageModel};
use crate::metrics;
use crate::stores::{GraphStore, Neo4jGraphStore, QdrantVectorStore, VectorHit, VectorSearch};
use crate::{Error, Result};

/// Upper bound on the graph liveness probe before falling back to vector-only.
pub const HEALTH_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

const MODE_HYBRID: &str = "hybrid";
const MODE_VECTOR_ONLY: &str = "vector_only";

/// Flat option set a retriever is built from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievalSettings {
    pub vector_top_k: usize,
    pub graph_max_hops: u32,
    pub model_name: String,
    pub collection_name: String,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            vector_top_k: DEFAULT_VECTOR_TOP_K,
            graph_max_hops: DEFAULT_GRAPH_MAX_HOPS,
            model_name: DEFAULT_OLLAMA_MODEL.to_string(),
            collection_name: DEFAULT_COLLECTION_NAME.to_string(),
        }
    }
}

impl RetrievalSettings {
    pub fn validate(&self) -> Result<()> {
        if self.vector_top_k == 0 {
            return Err(Error::ConfigError(
                "vector_top_k must be >= 1".to_string(),
            ));
        }
        if self.graph_max_hops == 0 {
            return Err(Error::ConfigError(
                "graph_max_hops must be >= 1".to_string(),
            ));
        }
        if self.model_name.trim().is_empty() {
            return Err(Error::ConfigError("model_name must not be empty".to_string()));
        }
        if self.collection_name.trim().is_empty() {
            return Err(Error::ConfigError(
                "collection_name must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

pub struct HybridRetriever {
    graph: Arc<dyn GraphStore>,
    vector: Arc<dyn VectorSearch>,
    extractor: EntityExtractor,
    neighbors: NeighborFinder,
    paths: PathFinder,
    settings: RetrievalSettings,
}

impl HybridRetriever {
    pub fn new(
        settings: RetrievalSettings,
        graph: Arc<dyn GraphStore>,
        vector: Arc<dyn VectorSearch>,
        llm: Arc<dyn LanguageModel>,
    ) -> Result<Self> {
        settings.validate()?;

        Ok(Self {
            extractor: EntityExtractor::new(llm),
            neighbors: NeighborFinder::new(graph.clone()),
            paths: PathFinder::new(graph.clone(), settings.graph_max_hops),
            graph,
            vector,
            settings,
        })
    }

    /// Build against Neo4j, Qdrant and Ollama as configured.
    pub async fn connect(config: &Config) -> Result<Self> {
        config.validate()?;

        let graph = Neo4jGraphStore::connect(&config.neo4j).await?;
        let vector = QdrantVectorStore::from_config(config)?;
        let settings = config.retrieval_settings();
        let llm = language_model(config, &settings)?;

        info!(
            neo4j = %config.neo4j.uri,
            qdrant = %config.qdrant.url,
            model = %settings.model_name,
            "Hybrid retriever ready"
        );

        Self::new(
            settings,
            Arc::new(graph),
            Arc::new(vector),
            Arc::new(llm),
        )
    }

    /// Bound each graph query by `timeout` instead of [`super::GRAPH_QUERY_TIMEOUT`].
    pub fn with_graph_timeout(mut self, timeout: Duration) -> Self {
        self.neighbors = self.neighbors.with_timeout(timeout);
        self.paths = self.paths.with_timeout(timeout);
        self
    }

    pub fn settings(&self) -> &RetrievalSettings {
        &self.settings
    }

    /// Entities named in `query`; empty when extraction fails.
    pub async fn extract_entities(&self, query: &str) -> Vec<String> {
        self.extractor.extract(query).await
    }

    /// Most similar chunks; `n_results` of `None` or zero uses the configured top-k.
    pub async fn search_documents(&self, query: &str, n_results: Option<usize>) -> Vec<VectorHit> {
        let n_results = n_results
            .filter(|n| *n > 0)
            .unwrap_or(self.settings.vector_top_k);

        match self
            .vector
            .query_similar(&self.settings.collection_name, query, n_results)
            .await
        {
            Ok(hits) => hits,
            Err(err) => degrade(
                Stage::VectorSearch,
                Severity::Error,
                format!("Vector retrieval failed: {}", err),
            ),
        }
    }

    /// Run one retrieval. Graph stages are skipped when `include_graph` is false.
    pub async fn retrieve(&self, query: &str, include_graph: bool) -> RetrievalResult {
        let started = Instant::now();
        let mut result = RetrievalResult::new(query);

        let (entities, hits) = if include_graph {
            tokio::join!(
                self.extractor.extract(query),
                self.search_documents(query, None)
            )
        } else {
            (Vec::new(), self.search_documents(query, None).await)
        };

        result.vector_chunks = hits
            .into_iter()
            .map(|hit| hit.document)
            .filter(|document| !document.is_empty())
            .collect();

        if !entities.is_empty() {
            let (neighbors, paths) = tokio::join!(
                self.collect_neighbors(&entities),
                self.paths.find_paths(&entities)
            );
            result.graph_context = format_graph_context(&neighbors, &paths);
            result.graph_paths = paths;
        }
        result.entities = entities;

        let mode = if include_graph {
            MODE_HYBRID
        } else {
            MODE_VECTOR_ONLY
        };
        metrics::record_retrieval(mode, started.elapsed());

        info!(
            mode,
            chunks = result.vector_chunks.len(),
            entities = result.entities.len(),
            paths = result.graph_paths.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Retrieval finished"
        );

        result
    }

    /// Probe the graph store first and go vector-only if it is not healthy.
    pub async fn retrieve_with_fallback(&self, query: &str) -> RetrievalResult {
        let probe = tokio::time::timeout(HEALTH_PROBE_TIMEOUT, self.graph.is_healthy()).await;
        let healthy = match probe {
            Ok(Ok(true)) => true,
            Ok(Ok(false)) => degrade(
                Stage::HealthProbe,
                Severity::Warning,
                "Graph database unavailable, using vector-only retrieval",
            ),
            Ok(Err(err)) => degrade(
                Stage::HealthProbe,
                Severity::Warning,
                format!("Graph health check failed ({}), using vector-only retrieval", err),
            ),
            Err(_) => degrade(
                Stage::HealthProbe,
                Severity::Warning,
                format!(
                    "Graph health check timed out after {:?}, using vector-only retrieval",
                    HEALTH_PROBE_TIMEOUT
                ),
            ),
        };

        self.retrieve(query, healthy).await
    }

    /// Neighbor records in entity order, then per-entity result order.
    async fn collect_neighbors(&self, entities: &[String]) -> Vec<NeighborRecord> {
        let max_hops = self.settings.graph_max_hops;
        join_all(
            entities
                .iter()
                .map(|entity| self.neighbors.find_neighbors(entity, max_hops)),
        )
        .await
        .into_iter()
        .flatten()
        .collect()
    }
}

/// Ollama completion model named by the retrieval settings.
fn language_model(config: &Config, settings: &RetrievalSettings) -> Result<OllamaLanguageModel> {
    let client = OllamaClient::with_url(&config.ollama.base_url, config.ollama_timeout())?;
    Ok(OllamaLanguageModel::new(client, &settings.model_name))
}
