//! Static analysis of chart sources
//!
//! Chart files are parsed with tree-sitter (never executed) to recover
//! documentation, constructor dependencies and explicit dependency calls.
//! The entry point is parsed with the same grammar to recover the runtime
//! wiring between chart instances.

pub mod chart;
pub mod discovery;
pub mod entry_point;
pub mod syntax;

pub use chart::{
    AnalyzedChart, ChartAnalyzer, ChartRelationship, ChartRelationshipKind, ConstructorDependency,
    ImportInfo, MethodCall, MethodCallKind, PropInfo, chart_id_from_class,
};
pub use discovery::{analyze_directory, discover_chart_files};
pub use entry_point::{ConstructionFact, DependencyFact, EntryPointFacts};
pub use syntax::JsDoc;

/// Errors raised while analyzing chart sources
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("Failed to load TypeScript grammar: {0}")]
    Language(String),

    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to walk source directory: {0}")]
    Walk(#[from] walkdir::Error),
}

/// Result type for analysis operations
pub type AnalysisResult<T> = Result<T, AnalysisError>;
