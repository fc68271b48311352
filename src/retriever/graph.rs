//! Graph-side retrieval: bounded neighbor traversal and shortest paths.
//!
//! Entity text is always bound as a query parameter. Only the hop bounds are
//! written into the Cypher text, and those are integers we control.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use super::result::GraphPath;
use super::stage::{degrade, Severity, Stage};
use crate::stores::{GraphQuery, GraphRow, GraphStore};

/// Neighbor rows returned per entity.
pub const NEIGHBOR_LIMIT: i64 = 10;
/// Shortest paths returned per entity pair.
pub const PATH_LIMIT: i64 = 3;
/// Upper bound on a single graph query before the stage degrades.
pub const GRAPH_QUERY_TIMEOUT: Duration = Duration::from_secs(30);

const NEIGHBOR_COLUMNS: &[&str] = &["source", "target", "relationships", "path_length"];
const PATH_COLUMNS: &[&str] = &["nodes", "relationships", "path_length"];

/// One row of a neighbor traversal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NeighborRecord {
    pub source: String,
    pub target: String,
    pub relationships: Vec<String>,
    pub path_length: usize,
}

impl NeighborRecord {
    /// Coerce a traversal row; rows without usable names yield `None`.
    pub fn from_row(row: &GraphRow) -> Option<Self> {
        let source = row.text("source")?;
        let target = row.text("target")?;
        let relationships = row.text_list("relationships").unwrap_or_default();
        let path_length = row
            .integer("path_length")
            .and_then(|n| usize::try_from(n).ok())
            .unwrap_or(relationships.len());

        Some(Self {
            source,
            target,
            relationships,
            path_length,
        })
    }
}

/// Case-insensitive "contains" pattern for a node name.
pub fn substring_pattern(entity: &str) -> String {
    format!("(?i).*{}.*", regex::escape(entity.trim()))
}

/// Nodes within `max_hops` of any node whose name contains `entity`.
pub fn neighbor_query(entity: &str, max_hops: u32) -> GraphQuery {
    let cypher = format!(
        "MATCH (n)
         WHERE n.name =~ $pattern
         MATCH path = (n)-[*1..{max_hops}]-(neighbor)
         WHERE neighbor <> n
         RETURN DISTINCT n.name AS source,
                neighbor.name AS target,
                [r IN relationships(path) | type(r)] AS relationships,
                length(path) AS path_length
         ORDER BY path_length
         LIMIT $limit",
        max_hops = max_hops.max(1)
    );

    GraphQuery::new(cypher, NEIGHBOR_COLUMNS)
        .param("pattern", substring_pattern(entity))
        .param("limit", NEIGHBOR_LIMIT)
}

/// Shortest paths of at most `max_hops + 1` hops between two name matches.
pub fn shortest_path_query(from: &str, to: &str, max_hops: u32) -> GraphQuery {
    let cypher = format!(
        "MATCH (a), (b)
         WHERE a.name =~ $from_pattern
           AND b.name =~ $to_pattern
           AND a <> b
         MATCH path = shortestPath((a)-[*..{bound}]-(b))
         RETURN [n IN nodes(path) | n.name] AS nodes,
                [r IN relationships(path) | type(r)] AS relationships,
                length(path) AS path_length
         LIMIT $limit",
        bound = max_hops.saturating_add(1)
    );

    GraphQuery::new(cypher, PATH_COLUMNS)
        .param("from_pattern", substring_pattern(from))
        .param("to_pattern", substring_pattern(to))
        .param("limit", PATH_LIMIT)
}

#[derive(Clone)]
pub struct NeighborFinder {
    store: Arc<dyn GraphStore>,
    timeout: Duration,
}

impl NeighborFinder {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self {
            store,
            timeout: GRAPH_QUERY_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Neighbors of `entity`, nearest first. Empty on any store failure or timeout.
    pub async fn find_neighbors(&self, entity: &str, max_hops: u32) -> Vec<NeighborRecord> {
        if entity.trim().is_empty() {
            return Vec::new();
        }

        let query = neighbor_query(entity, max_hops);
        let outcome = tokio::time::timeout(self.timeout, self.store.execute(&query)).await;
        match outcome {
            Ok(Ok(rows)) => {
                let records: Vec<NeighborRecord> =
                    rows.iter().filter_map(NeighborRecord::from_row).collect();
                debug!(entity, neighbors = records.len(), "Neighbor lookup finished");
                records
            }
            Ok(Err(err)) => degrade(
                Stage::GraphNeighbors,
                Severity::Error,
                format!("Graph neighbor retrieval failed for '{}': {}", entity, err),
            ),
            Err(_) => degrade(
                Stage::GraphNeighbors,
                Severity::Error,
                format!(
                    "Graph neighbor retrieval for '{}' timed out after {:?}",
                    entity, self.timeout
                ),
            ),
        }
    }
}

#[derive(Clone)]
pub struct PathFinder {
    store: Arc<dyn GraphStore>,
    max_hops: u32,
    timeout: Duration,
}

impl PathFinder {
    pub fn new(store: Arc<dyn GraphStore>, max_hops: u32) -> Self {
        Self {
            store,
            max_hops,
            timeout: GRAPH_QUERY_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Shortest paths between the first two entities.
    ///
    /// Issues no query when there are fewer than two entities or either of the
    /// first two is blank, since an empty name would match every node.
    pub async fn find_paths(&self, entities: &[String]) -> Vec<GraphPath> {
        let [from, to, ..] = entities else {
            return Vec::new();
        };
        if from.trim().is_empty() || to.trim().is_empty() {
            return Vec::new();
        }

        let query = shortest_path_query(from, to, self.max_hops);
        let outcome = tokio::time::timeout(self.timeout, self.store.execute(&query)).await;
        match outcome {
            Ok(Ok(rows)) => rows
                .iter()
                .filter_map(|row| match GraphPath::from_row(row) {
                    Ok(path) => Some(path),
                    Err(err) => {
                        warn!("Skipping malformed path row: {}", err);
                        None
                    }
                })
                .collect(),
            Ok(Err(err)) => degrade(
                Stage::GraphPaths,
                Severity::Warning,
                format!("Path finding failed: {}", err),
            ),
            Err(_) => degrade(
                Stage::GraphPaths,
                Severity::Warning,
                format!("Path finding timed out after {:?}", self.timeout),
            ),
        }
    }
}
