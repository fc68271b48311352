//! Retrieval stages and the single place where a failed stage degrades.

use std::fmt;

use tracing::{error, warn};

use crate::metrics;

/// A sub-call of one retrieval that may fail without failing the whole call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    EntityExtraction,
    VectorSearch,
    GraphNeighbors,
    GraphPaths,
    HealthProbe,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::EntityExtraction => "entity_extraction",
            Stage::VectorSearch => "vector_search",
            Stage::GraphNeighbors => "graph_neighbors",
            Stage::GraphPaths => "graph_paths",
            Stage::HealthProbe => "health_probe",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log level a degrade event is reported at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

/// Record that `stage` fell back to an empty result and return that result.
pub fn degrade<T: Default>(stage: Stage, severity: Severity, reason: impl fmt::Display) -> T {
    match severity {
        Severity::Warning => warn!(stage = stage.as_str(), "Stage degraded: {}", reason),
        Severity::Error => error!(stage = stage.as_str(), "Stage degraded: {}", reason),
    }
    metrics::record_degraded(stage.as_str());
    T::default()
}
