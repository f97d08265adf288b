//! Chart selection for planning and synthesis

pub mod filter;
pub mod git;

pub use filter::{ChartFilter, SelectionCriteria};
pub use git::changed_files_since;

/// Selection error types
#[derive(Debug, thiserror::Error)]
pub enum SelectionError {
    #[error("Invalid glob pattern {pattern:?}: {source}")]
    Glob {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("Invalid chart regex: {0}")]
    Regex(#[from] regex::Error),

    #[error("Unknown chart: {0}")]
    UnknownChart(String),

    #[error("Failed to run git: {0}")]
    GitSpawn(#[source] std::io::Error),

    #[error("git diff against {reference} failed: {stderr}")]
    GitDiff { reference: String, stderr: String },
}

pub type SelectionResult<T> = Result<T, SelectionError>;
