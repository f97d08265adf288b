//! Resource extraction
//!
//! Turns the resource nodes found by the walker into [`ResourceNode`]
//! records with deterministic composite ids.

use super::context::SynthesisContext;
use super::walker::TreeIndex;
use crate::models::{ConstructTree, NodeId, ResourceNode, UNKNOWN_CHART, resource_id};
use std::collections::HashMap;

/// Output of the extraction stage
#[derive(Debug, Clone, Default)]
pub struct ResourceSet {
    resources: Vec<ResourceNode>,
    nodes: Vec<NodeId>,
    by_id: HashMap<String, usize>,
    by_node: HashMap<NodeId, usize>,
}

impl ResourceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a record for a tree node; duplicate ids are rejected
    pub fn push(&mut self, node: NodeId, resource: ResourceNode) -> bool {
        if self.by_id.contains_key(&resource.id) {
            return false;
        }
        let idx = self.resources.len();
        self.by_id.insert(resource.id.clone(), idx);
        self.by_node.insert(node, idx);
        self.nodes.push(node);
        self.resources.push(resource);
        true
    }

    pub fn as_slice(&self) -> &[ResourceNode] {
        &self.resources
    }

    pub fn into_vec(self) -> Vec<ResourceNode> {
        self.resources
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&ResourceNode> {
        self.by_id.get(id).map(|&idx| &self.resources[idx])
    }

    /// Record extracted from a given tree node
    pub fn for_node(&self, node: NodeId) -> Option<&ResourceNode> {
        self.by_node.get(&node).map(|&idx| &self.resources[idx])
    }

    /// Pairs of (tree node, record) in extraction order
    pub fn iter_with_nodes(&self) -> impl Iterator<Item = (NodeId, &ResourceNode)> {
        self.nodes.iter().copied().zip(self.resources.iter())
    }

    /// Records owned by a chart
    pub fn in_chart<'a>(&'a self, chart_id: &'a str) -> impl Iterator<Item = &'a ResourceNode> + 'a {
        self.resources.iter().filter(move |r| r.chart_id == chart_id)
    }

    /// First record matching kind, name and namespace exactly
    pub fn find(&self, kind: &str, name: &str, namespace: &str) -> Option<&ResourceNode> {
        self.resources
            .iter()
            .find(|r| r.kind() == kind && r.name() == name && r.namespace() == namespace)
    }
}

/// Nearest enclosing chart of a node, walking the scope chain upward
pub fn enclosing_chart(tree: &ConstructTree, index: &TreeIndex, node: NodeId) -> String {
    let mut current = tree.scope(node);
    while let Some(id) = current {
        if let Some(chart_id) = index.chart_id(id) {
            return chart_id.to_string();
        }
        current = tree.scope(id);
    }
    UNKNOWN_CHART.to_string()
}

/// Extract one record per resource node
///
/// Requires the walker to have classified every node, since the chart
/// lookup re-walks ancestors rather than relying on traversal order.
pub fn extract_resources(
    tree: &ConstructTree,
    index: &TreeIndex,
    ctx: &SynthesisContext,
) -> ResourceSet {
    let mut set = ResourceSet::new();

    for &node_id in &index.resources {
        let node = tree.node(node_id);
        let Some(mut api_object) = node.api_object.clone() else {
            continue;
        };
        if let Some(entry) = ctx.kinds.lookup(&node.construct_type) {
            api_object.apply_type_info(&entry.api_version, &entry.kind);
        }

        let chart_id = enclosing_chart(tree, index, node_id);
        let name = api_object
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| node.segment.clone());
        let id = resource_id(
            &chart_id,
            api_object.kind(),
            api_object.namespace_or_default(),
            &name,
        );

        let record = ResourceNode {
            id: id.clone(),
            path: tree.path(node_id),
            chart_id,
            construct_type: node.construct_type.clone(),
            api_object,
            argocd_app: None,
        };

        if !set.push(node_id, record) {
            tracing::warn!(
                "Duplicate resource id {} at {}, keeping the first occurrence",
                id,
                tree.path(node_id)
            );
        }
    }

    tracing::debug!("Extracted {} resources", set.len());
    set
}
