//! Persisted chart dependency graph and change-impact queries

pub mod dependency_graph;
pub mod impact;

pub use dependency_graph::{ChartNode, DependencyGraph, GRAPH_SCHEMA_VERSION, hash_file};

use crate::analysis::AnalysisError;

/// Errors raised while building, saving or loading the dependency graph
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("Failed to access {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid graph file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize graph: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),
}

/// Result type for graph operations
pub type GraphResult<T> = Result<T, GraphError>;
