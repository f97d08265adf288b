//! chartscope
//!
//! Catalog and build-graph tooling for cdk8s chart repositories:
//!
//! - [`extract`] walks a synthesized construct tree into resources and
//!   typed relationships
//! - [`catalog`] turns them into Backstage entities with deterministic names
//! - [`analysis`] and [`graph`] recover chart dependencies from TypeScript
//!   sources and answer change-impact queries
//! - [`scheduler`] synthesizes charts level by level in parallel

pub mod analysis;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod extract;
pub mod graph;
pub mod models;
pub mod scheduler;
pub mod selection;
pub mod watch;

// Re-export commonly used types for convenience
pub use catalog::{CatalogEntity, CatalogGenerator};
pub use extract::{ExtractedGraph, SynthesisContext, extract_graph};
pub use graph::DependencyGraph;
pub use models::{ConstructTree, ResourceNode, ResourceRelationship};
pub use scheduler::{ExecutionPlan, ParallelSynthesizer};
