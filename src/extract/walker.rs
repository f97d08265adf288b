//! Construct tree traversal
//!
//! Depth-first walk with an explicit stack so that arbitrarily deep trees
//! cannot overflow the call stack. Each node is classified exactly once.

use super::context::SynthesisContext;
use crate::models::{ConstructNode, ConstructTree, NodeId};
use std::collections::{BTreeMap, HashMap};

/// Classification of a construct node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeClass {
    /// Grouping boundary with its chart id
    Chart(String),
    /// Leaf carrying a Kubernetes-shaped object
    Resource,
    /// Anything else
    Construct,
}

/// Result of the traversal stage
#[derive(Debug, Clone, Default)]
pub struct TreeIndex {
    /// Chart id -> chart node
    pub charts: BTreeMap<String, NodeId>,
    /// Chart node -> chart id
    pub chart_ids: HashMap<NodeId, String>,
    /// Resource nodes in traversal order
    pub resources: Vec<NodeId>,
    /// Number of nodes visited
    pub visited: usize,
}

impl TreeIndex {
    pub fn is_chart(&self, node: NodeId) -> bool {
        self.chart_ids.contains_key(&node)
    }

    pub fn chart_id(&self, node: NodeId) -> Option<&str> {
        self.chart_ids.get(&node).map(String::as_str)
    }
}

/// Classify a single node
pub fn classify(node: &ConstructNode, ctx: &SynthesisContext) -> NodeClass {
    if node.chart_marker || ctx.charts.is_chart_type(&node.construct_type) {
        let chart_id = ctx
            .charts
            .chart_id(&node.construct_type)
            .unwrap_or(&node.segment)
            .to_string();
        return NodeClass::Chart(chart_id);
    }

    if let Some(obj) = &node.api_object {
        if obj.has_type_info() || ctx.kinds.lookup(&node.construct_type).is_some() {
            return NodeClass::Resource;
        }
    }

    NodeClass::Construct
}

/// Walk every node below (and including) the root
pub fn walk(tree: &ConstructTree, ctx: &SynthesisContext) -> TreeIndex {
    let mut index = TreeIndex::default();
    if tree.is_empty() {
        return index;
    }

    let mut stack = vec![tree.root()];
    while let Some(id) = stack.pop() {
        index.visited += 1;
        let node = tree.node(id);

        match classify(node, ctx) {
            NodeClass::Chart(chart_id) => {
                if let Some(existing) = index.charts.get(&chart_id) {
                    tracing::warn!(
                        "Chart id '{}' used by both {} and {}, keeping the first",
                        chart_id,
                        tree.path(*existing),
                        tree.path(id)
                    );
                } else {
                    index.charts.insert(chart_id.clone(), id);
                }
                index.chart_ids.insert(id, chart_id);
            }
            NodeClass::Resource => index.resources.push(id),
            NodeClass::Construct => {}
        }

        // Reverse so children are visited in declaration order
        stack.extend(tree.children(id).iter().rev().copied());
    }

    tracing::debug!(
        "Walked {} nodes: {} charts, {} resources",
        index.visited,
        index.charts.len(),
        index.resources.len()
    );
    index
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ApiObject;

    #[test]
    fn test_walk_classifies_nodes() {
        let mut tree = ConstructTree::new("app", "App");
        let chart = tree.add_chart(tree.root(), "web", "WebChart");
        let group = tree.add_construct(chart, "group", "Construct");
        tree.add_resource(
            group,
            "svc",
            "KubeService",
            ApiObject::with_identity("v1", "Service", "web", None),
        );

        let index = walk(&tree, &SynthesisContext::new());
        assert_eq!(index.visited, 4);
        assert_eq!(index.charts.get("web"), Some(&chart));
        assert_eq!(index.resources.len(), 1);
        assert!(index.is_chart(chart));
        assert!(!index.is_chart(group));
    }

    #[test]
    fn test_registry_chart_id_wins_over_segment() {
        let mut tree = ConstructTree::new("app", "App");
        tree.add_construct(tree.root(), "Backstage", "BackstageChart");
        let ctx = SynthesisContext::new().with_chart("BackstageChart", "backstage");
        let index = walk(&tree, &ctx);
        assert!(index.charts.contains_key("backstage"));
    }

    #[test]
    fn test_object_without_type_needs_registry() {
        let mut tree = ConstructTree::new("app", "App");
        let obj = ApiObject::new(serde_json::json!({"metadata": {"name": "x"}}));
        tree.add_resource(tree.root(), "x", "KubeConfigMap", obj);

        assert!(walk(&tree, &SynthesisContext::new()).resources.is_empty());
        assert_eq!(walk(&tree, &SynthesisContext::with_core_kinds()).resources.len(), 1);
    }

    #[test]
    fn test_deep_tree_does_not_recurse() {
        let mut tree = ConstructTree::new("app", "App");
        let mut parent = tree.root();
        for i in 0..50_000 {
            parent = tree.add_construct(parent, &format!("n{}", i), "Construct");
        }
        let index = walk(&tree, &SynthesisContext::new());
        assert_eq!(index.visited, 50_001);
    }
}
