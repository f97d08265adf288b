//! Resource and relationship extraction
//!
//! Stages, each taking immutable input and returning new output:
//!
//! 1. [`walk`] - classify every construct node (charts, resources)
//! 2. [`extract_resources`] - one [`ResourceNode`] per resource node
//! 3. [`analyze_relationships`] - typed edges between resources
//! 4. [`resolve_argocd_ownership`] - Application ownership tags and edges
//!
//! [`extract_graph`] runs all four.

pub mod argocd;
pub mod context;
pub mod relationships;
pub mod resources;
pub mod walker;

pub use argocd::resolve_argocd_ownership;
pub use context::{ChartRegistry, KindRegistry, SynthesisContext};
pub use relationships::analyze_relationships;
pub use resources::{ResourceSet, extract_resources};
pub use walker::{NodeClass, TreeIndex, walk};

use crate::models::{ConstructTree, ResourceNode, ResourceRelationship};

/// Final output of the extraction pipeline
#[derive(Debug, Clone, Default)]
pub struct ExtractedGraph {
    pub resources: Vec<ResourceNode>,
    pub relationships: Vec<ResourceRelationship>,
}

impl ExtractedGraph {
    pub fn resource(&self, id: &str) -> Option<&ResourceNode> {
        self.resources.iter().find(|r| r.id == id)
    }
}

/// Run the full extraction pipeline over a construct tree
pub fn extract_graph(tree: &ConstructTree, ctx: &SynthesisContext) -> ExtractedGraph {
    let index = walk(tree, ctx);
    let resources = extract_resources(tree, &index, ctx);
    let relationships = analyze_relationships(tree, &index, &resources);
    let (resources, relationships) =
        resolve_argocd_ownership(resources.into_vec(), relationships);

    tracing::info!(
        "Extracted {} resources and {} relationships from {} charts",
        resources.len(),
        relationships.len(),
        index.charts.len()
    );

    ExtractedGraph {
        resources,
        relationships: relationships.into_vec(),
    }
}
