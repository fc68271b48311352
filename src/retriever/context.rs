//! Renders graph results as plain-text context lines.

use std::collections::HashSet;

use super::graph::NeighborRecord;
use super::result::GraphPath;

/// Label used when a neighbor row carries no relationship types.
pub const FALLBACK_RELATIONSHIP: &str = "RELATED";

/// Neighbor lines followed by path lines, newline-joined.
///
/// Neighbors are de-duplicated on the unordered (source, target) pair, first
/// occurrence wins. Records missing either name are skipped.
pub fn format_graph_context(neighbors: &[NeighborRecord], paths: &[GraphPath]) -> String {
    let mut lines = Vec::new();
    let mut seen = HashSet::new();

    for neighbor in neighbors {
        if neighbor.source.is_empty() || neighbor.target.is_empty() {
            continue;
        }
        if !seen.insert(ordered(&neighbor.source, &neighbor.target)) {
            continue;
        }

        let rels = if neighbor.relationships.is_empty() {
            FALLBACK_RELATIONSHIP.to_string()
        } else {
            neighbor.relationships.join(" -> ")
        };
        lines.push(format!(
            "- {} --[{}]--> {}",
            neighbor.source, rels, neighbor.target
        ));
    }

    for path in paths {
        lines.push(format!("- Path: {}", path));
    }

    lines.join("\n")
}

fn ordered<'a>(a: &'a str, b: &'a str) -> (&'a str, &'a str) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}
