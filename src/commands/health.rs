//! `health` command: liveness of Neo4j, Qdrant and Ollama.

use std::future::Future;
use std::time::Duration;

use anyhow::{bail, Result};
use serde::Serialize;
use tracing::warn;

use crate::config::Config;
use crate::integrations::OllamaClient;
use crate::retriever::HEALTH_PROBE_TIMEOUT;
use crate::stores::{GraphStore, Neo4jGraphStore, QdrantVectorStore};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceStatus {
    pub service: &'static str,
    pub endpoint: String,
    pub healthy: bool,
    pub detail: String,
}

impl ServiceStatus {
    fn up(service: &'static str, endpoint: &str) -> Self {
        Self {
            service,
            endpoint: endpoint.to_string(),
            healthy: true,
            detail: "ok".to_string(),
        }
    }

    fn down(service: &'static str, endpoint: &str, detail: impl Into<String>) -> Self {
        Self {
            service,
            endpoint: endpoint.to_string(),
            healthy: false,
            detail: detail.into(),
        }
    }
}

pub async fn run(config: &Config, json: bool) -> Result<()> {
    let (graph, vector, llm) = tokio::join!(
        probe_graph(config),
        probe_vector(config),
        probe_ollama(config)
    );
    let statuses = vec![graph, vector, llm];

    if json {
        println!("{}", serde_json::to_string_pretty(&statuses)?);
    } else {
        println!("{}", render_table(&statuses));
    }

    let down: Vec<&str> = statuses
        .iter()
        .filter(|s| !s.healthy)
        .map(|s| s.service)
        .collect();
    if !down.is_empty() {
        bail!("unavailable services: {}", down.join(", "));
    }
    Ok(())
}

pub fn render_table(statuses: &[ServiceStatus]) -> String {
    statuses
        .iter()
        .map(|s| {
            format!(
                "{:<8} {:<5} {:<28} {}",
                s.service,
                if s.healthy { "UP" } else { "DOWN" },
                s.endpoint,
                s.detail
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Run a probe under the shared timeout, folding errors into a status.
async fn bounded<F>(service: &'static str, endpoint: &str, probe: F) -> ServiceStatus
where
    F: Future<Output = crate::Result<bool>>,
{
    match tokio::time::timeout(HEALTH_PROBE_TIMEOUT, probe).await {
        Ok(Ok(true)) => ServiceStatus::up(service, endpoint),
        Ok(Ok(false)) => ServiceStatus::down(service, endpoint, "reported unhealthy"),
        Ok(Err(err)) => {
            warn!(service, "Health probe failed: {}", err);
            ServiceStatus::down(service, endpoint, err.to_string())
        }
        Err(_) => ServiceStatus::down(
            service,
            endpoint,
            format!("timed out after {:?}", HEALTH_PROBE_TIMEOUT),
        ),
    }
}

async fn probe_graph(config: &Config) -> ServiceStatus {
    bounded("neo4j", &config.neo4j.uri, async {
        let store = Neo4jGraphStore::connect(&config.neo4j).await?;
        store.is_healthy().await
    })
    .await
}

async fn probe_vector(config: &Config) -> ServiceStatus {
    bounded("qdrant", &config.qdrant.url, async {
        let store = QdrantVectorStore::from_config(config)?;
        store.is_healthy().await
    })
    .await
}

async fn probe_ollama(config: &Config) -> ServiceStatus {
    bounded("ollama", &config.ollama.base_url, async {
        let client = OllamaClient::with_url(&config.ollama.base_url, Duration::from_secs(5))?;
        Ok(client.is_running().await)
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use httpmock::prelude::*;

    #[test]
    fn table_marks_down_services() {
        let statuses = vec![
            ServiceStatus::up("neo4j", "bolt://localhost:7687"),
            ServiceStatus::down("qdrant", "http://localhost:6334", "connection refused"),
        ];

        let table = render_table(&statuses);
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("neo4j    UP"));
        assert!(lines[1].contains("DOWN"));
        assert!(lines[1].ends_with("connection refused"));
    }

    #[tokio::test]
    async fn bounded_folds_errors_into_status() {
        let status = bounded("neo4j", "bolt://x", async {
            Err(Error::GraphError("auth failed".to_string()))
        })
        .await;

        assert!(!status.healthy);
        assert!(status.detail.contains("auth failed"));
    }

    #[tokio::test]
    async fn ollama_probe_reflects_server_state() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/api/tags");
            then.status(200).body("{\"models\": []}");
        });

        let mut config = Config::default();
        config.ollama.base_url = server.base_url();

        let status = probe_ollama(&config).await;
        assert!(status.healthy);
        assert_eq!(status.endpoint, server.base_url());
    }
}
