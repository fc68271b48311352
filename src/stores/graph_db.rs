//! Graph database integration with Neo4j

use std::collections::HashMap;

use async_trait::async_trait;
use neo4rs::{query, ConfigBuilder, Graph, Query};
use serde_json::Value;
use tracing::debug;

use super::{GraphQuery, GraphRow, GraphStore, QueryParam};
use crate::config::Neo4jConfig;
use crate::Result;

/// Graph store backed by Neo4j
#[derive(Clone)]
pub struct Neo4jGraphStore {
    graph: Graph,
}

impl Neo4jGraphStore {
    /// Connect to Neo4j server
    pub async fn connect(config: &Neo4jConfig) -> Result<Self> {
        let neo4j_config = ConfigBuilder::default()
            .uri(config.uri.as_str())
            .user(config.username.as_str())
            .password(config.password.as_str())
            .db(config.database.as_str())
            .fetch_size(500)
            .max_connections(10)
            .build()?;

        let graph = Graph::connect(neo4j_config).await?;
        debug!(uri = %config.uri, database = %config.database, "Connected to Neo4j");

        Ok(Self { graph })
    }

    /// Wrap an existing connection pool.
    pub fn from_graph(graph: Graph) -> Self {
        Self { graph }
    }

    pub fn inner(&self) -> &Graph {
        &self.graph
    }
}

fn bind(graph_query: &GraphQuery) -> Query {
    graph_query
        .params
        .iter()
        .fold(query(&graph_query.cypher), |q, (name, value)| match value {
            QueryParam::Text(text) => q.param(name, text.clone()),
            QueryParam::Integer(n) => q.param(name, *n),
        })
}

#[async_trait]
impl GraphStore for Neo4jGraphStore {
    async fn execute(&self, graph_query: &GraphQuery) -> Result<Vec<GraphRow>> {
        let mut result = self.graph.execute(bind(graph_query)).await?;

        let mut rows = Vec::new();
        while let Some(row) = result.next().await? {
            let fields: HashMap<String, Value> = graph_query
                .columns
                .iter()
                .map(|column| {
                    let value = row.get::<Value>(column).unwrap_or(Value::Null);
                    (column.to_string(), value)
                })
                .collect();
            rows.push(GraphRow::new(fields));
        }

        debug!(rows = rows.len(), "Graph query finished");
        Ok(rows)
    }

    async fn is_healthy(&self) -> Result<bool> {
        let mut result = self.graph.execute(query("RETURN 1 AS ok")).await?;
        match result.next().await? {
            Some(row) => Ok(row.get::<i64>("ok").map(|v| v == 1).unwrap_or(false)),
            None => Ok(false),
        }
    }
}

