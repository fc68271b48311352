//! Vector database integration with Qdrant

use async_trait::async_trait;
use qdrant_client::qdrant::point_id::PointIdOptions;
use qdrant_client::qdrant::{PointId, ScoredPoint, SearchPointsBuilder, Value as QdrantValue};
use qdrant_client::Qdrant;
use tracing::debug;

use super::{EmbeddingBackend, VectorHit, VectorSearch};
use crate::config::Config;
use crate::Result;

/// Payload field holding the chunk text.
pub const DOCUMENT_FIELD: &str = "document";
/// Older ingestion runs stored the chunk under this key.
pub const LEGACY_TEXT_FIELD: &str = "text";

/// Vector store backed by Qdrant
pub struct QdrantVectorStore {
    client: Qdrant,
    embedder: EmbeddingBackend,
}

impl QdrantVectorStore {
    /// Connect to Qdrant server
    pub fn new(url: &str, embedder: EmbeddingBackend) -> Result<Self> {
        let client = Qdrant::from_url(url).build()?;
        Ok(Self { client, embedder })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let embedder = EmbeddingBackend::from_config(config)?;
        Self::new(&config.qdrant.url, embedder)
    }

    pub fn embedder(&self) -> &EmbeddingBackend {
        &self.embedder
    }

    /// True when the server answers its health endpoint.
    pub async fn is_healthy(&self) -> Result<bool> {
        self.client.health_check().await?;
        Ok(true)
    }
}

#[async_trait]
impl VectorSearch for QdrantVectorStore {
    async fn query_similar(
        &self,
        collection: &str,
        query_text: &str,
        n_results: usize,
    ) -> Result<Vec<VectorHit>> {
        if n_results == 0 {
            return Ok(Vec::new());
        }

        let embedding = self.embedder.embed(query_text).await?;

        let search = SearchPointsBuilder::new(collection, embedding, n_results as u64)
            .with_payload(true);
        let response = self.client.search_points(search).await?;

        let hits: Vec<VectorHit> = response.result.into_iter().map(to_hit).collect();
        debug!(collection, hits = hits.len(), "Vector search finished");
        Ok(hits)
    }
}

fn to_hit(point: ScoredPoint) -> VectorHit {
    let document = point
        .payload
        .get(DOCUMENT_FIELD)
        .or_else(|| point.payload.get(LEGACY_TEXT_FIELD))
        .and_then(|v| QdrantValueExt::as_str(v))
        .map(|s| s.to_string())
        .unwrap_or_default();

    VectorHit {
        id: point.id.map(point_id_to_string).unwrap_or_default(),
        document,
        score: point.score,
    }
}

fn point_id_to_string(id: PointId) -> String {
    match id.point_id_options {
        Some(PointIdOptions::Uuid(uuid)) => uuid,
        Some(PointIdOptions::Num(num)) => num.to_string(),
        None => String::new(),
    }
}

trait QdrantValueExt {
    fn as_str(&self) -> Option<&str>;
}

impl QdrantValueExt for QdrantValue {
    fn as_str(&self) -> Option<&str> {
        match &self.kind {
            Some(qdrant_client::qdrant::value::Kind::StringValue(v)) => Some(v),
            _ => None,
        }
    }
}
