//! Retrieval output: graph paths and the fused result bundle.

use std::fmt;

use serde::Serialize;

use crate::stores::GraphRow;
use crate::{Error, Result};

/// An ordered walk through the knowledge graph.
///
/// Always holds one more node than relationships; `path_length` is the
/// relationship count. Fields are private so the invariant survives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphPath {
    nodes: Vec<String>,
    relationships: Vec<String>,
    path_length: usize,
}

impl GraphPath {
    pub fn new(nodes: Vec<String>, relationships: Vec<String>) -> Result<Self> {
        if nodes.is_empty() {
            return Err(Error::InvalidRecord("graph path has no nodes".to_string()));
        }
        if relationships.len() + 1 != nodes.len() {
            return Err(Error::InvalidRecord(format!(
                "graph path has {} nodes but {} relationships",
                nodes.len(),
                relationships.len()
            )));
        }

        let path_length = relationships.len();
        Ok(Self {
            nodes,
            relationships,
            path_length,
        })
    }

    /// Build from a `nodes` / `relationships` / `path_length` row.
    pub fn from_row(row: &GraphRow) -> Result<Self> {
        let nodes = row
            .text_list("nodes")
            .ok_or_else(|| Error::InvalidRecord("path row without nodes".to_string()))?;
        let relationships = row
            .text_list("relationships")
            .ok_or_else(|| Error::InvalidRecord("path row without relationships".to_string()))?;

        let path = Self::new(nodes, relationships)?;

        if let Some(reported) = row.integer("path_length") {
            if reported != path.path_length as i64 {
                return Err(Error::InvalidRecord(format!(
                    "path_length {} does not match {} relationships",
                    reported, path.path_length
                )));
            }
        }

        Ok(path)
    }

    pub fn nodes(&self) -> &[String] {
        &self.nodes
    }

    pub fn relationships(&self) -> &[String] {
        &self.relationships
    }

    pub fn path_length(&self) -> usize {
        self.path_length
    }
}

/// Renders as `A -[TYPE]-> B -[TYPE2]-> C`.
impl fmt::Display for GraphPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, node) in self.nodes.iter().enumerate() {
            if i > 0 {
                write!(f, " -[{}]-> ", self.relationships[i - 1])?;
            }
            f.write_str(node)?;
        }
        Ok(())
    }
}

/// Everything one retrieval call found for a question.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RetrievalResult {
    pub query: String,
    pub vector_chunks: Vec<String>,
    pub graph_context: String,
    pub entities: Vec<String>,
    pub graph_paths: Vec<GraphPath>,
}

impl RetrievalResult {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    /// True when neither store contributed anything.
    pub fn is_empty(&self) -> bool {
        self.vector_chunks.is_empty() && self.graph_context.is_empty() && self.graph_paths.is_empty()
    }

    /// Documents, then graph relationships, then paths; empty sections are left out.
    pub fn combined_context(&self) -> String {
        let mut sections = Vec::new();

        if !self.vector_chunks.is_empty() {
            sections.push("## Relevant Documents".to_string());
            for (i, chunk) in self.vector_chunks.iter().enumerate() {
                sections.push(format!("{}. {}", i + 1, chunk));
            }
        }

        if !self.graph_context.is_empty() {
            sections.push("\n## Knowledge Graph Relationships".to_string());
            sections.push(self.graph_context.clone());
        }

        if !self.graph_paths.is_empty() {
            sections.push("\n## Graph Paths".to_string());
            for path in &self.graph_paths {
                sections.push(format!("- {}", path));
            }
        }

        sections.join("\n")
    }
}
