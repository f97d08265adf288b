//! Construct tree handed over by the chart layer
//!
//! The tree is an arena: nodes reference their parent and children by
//! [`NodeId`]. Charts are grouping boundaries, resources are leaves carrying
//! an [`ApiObject`]. Anything else is a plain construct that only contributes
//! to the path.

use super::api_object::ApiObject;
use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use std::sync::OnceLock;

/// Index of a node inside a [`ConstructTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A node of the construct tree
#[derive(Debug, Clone)]
pub struct ConstructNode {
    /// Path segment (the construct id given by its parent)
    pub segment: String,
    /// Concrete construct type name
    pub construct_type: String,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// Set for nodes the chart layer marked as chart boundaries
    pub chart_marker: bool,
    /// Present on resource leaves
    pub api_object: Option<ApiObject>,
    /// Chart ids this chart explicitly depends on (charts only)
    pub chart_dependencies: Vec<String>,
}

/// Arena-backed construct tree
#[derive(Debug, Clone)]
pub struct ConstructTree {
    nodes: Vec<ConstructNode>,
}

impl ConstructTree {
    /// Create a tree holding only its root construct
    pub fn new(root_segment: &str, construct_type: &str) -> Self {
        Self {
            nodes: vec![ConstructNode {
                segment: root_segment.to_string(),
                construct_type: construct_type.to_string(),
                parent: None,
                children: Vec::new(),
                chart_marker: false,
                api_object: None,
                chart_dependencies: Vec::new(),
            }],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &ConstructNode {
        &self.nodes[id.0]
    }

    /// Children accessor
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Scope (parent) accessor
    pub fn scope(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    /// Add a plain construct
    pub fn add_construct(&mut self, parent: NodeId, segment: &str, construct_type: &str) -> NodeId {
        self.push(parent, segment, construct_type, false, None)
    }

    /// Add a chart boundary
    pub fn add_chart(&mut self, parent: NodeId, segment: &str, construct_type: &str) -> NodeId {
        self.push(parent, segment, construct_type, true, None)
    }

    /// Add a resource leaf
    pub fn add_resource(
        &mut self,
        parent: NodeId,
        segment: &str,
        construct_type: &str,
        api_object: ApiObject,
    ) -> NodeId {
        self.push(parent, segment, construct_type, false, Some(api_object))
    }

    /// Record that `chart` depends on the chart identified by `chart_id`
    pub fn add_chart_dependency(&mut self, chart: NodeId, chart_id: &str) {
        let deps = &mut self.nodes[chart.0].chart_dependencies;
        if !deps.iter().any(|d| d == chart_id) {
            deps.push(chart_id.to_string());
        }
    }

    /// Tree path of a node, root segment excluded
    pub fn path(&self, id: NodeId) -> String {
        let mut segments = Vec::new();
        let mut current = Some(id);
        while let Some(node_id) = current {
            let node = self.node(node_id);
            if node.parent.is_some() {
                segments.push(node.segment.as_str());
            }
            current = node.parent;
        }
        segments.reverse();
        segments.join("/")
    }

    fn push(
        &mut self,
        parent: NodeId,
        segment: &str,
        construct_type: &str,
        chart_marker: bool,
        api_object: Option<ApiObject>,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(ConstructNode {
            segment: segment.to_string(),
            construct_type: construct_type.to_string(),
            parent: Some(parent),
            children: Vec::new(),
            chart_marker,
            api_object,
            chart_dependencies: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Build a tree from a serialized tree document
    pub fn from_document(document: &TreeDocument) -> Self {
        let mut tree = Self::new(&document.id, &document.construct_type);
        tree.nodes[0].chart_marker = document.chart;
        tree.nodes[0].api_object = document.manifest.clone().map(ApiObject::new);
        tree.nodes[0].chart_dependencies = document.depends_on.clone();

        let mut stack: Vec<(NodeId, &TreeDocument)> = document
            .children
            .iter()
            .rev()
            .map(|child| (tree.root(), child))
            .collect();

        while let Some((parent, doc)) = stack.pop() {
            let id = tree.push(
                parent,
                &doc.id,
                &doc.construct_type,
                doc.chart,
                doc.manifest.clone().map(ApiObject::new),
            );
            for dep in &doc.depends_on {
                tree.add_chart_dependency(id, dep);
            }
            stack.extend(doc.children.iter().rev().map(|child| (id, child)));
        }

        tree
    }

    /// Load a tree document from a YAML or JSON file
    pub fn load_document(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read tree document: {}", path.display()))?;
        let document: TreeDocument = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse tree document: {}", path.display()))?;
        Ok(Self::from_document(&document))
    }

    /// Rebuild a tree from a directory of synthesized manifests
    ///
    /// Every `NNNN-<chart>.k8s.yaml` file becomes a chart named `<chart>`,
    /// every YAML document in it a resource of that chart.
    pub fn from_manifest_dir(dir: &Path) -> Result<Self> {
        let mut files: Vec<_> = std::fs::read_dir(dir)
            .with_context(|| format!("Failed to read manifest directory: {}", dir.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| n.ends_with(".k8s.yaml"))
                    .unwrap_or(false)
            })
            .collect();
        files.sort();

        let mut tree = Self::new("app", "App");
        for file in files {
            let file_name = file
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default()
                .to_string();
            let chart_name = chart_name_from_manifest_file(&file_name);
            let contents = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read manifest: {}", file.display()))?;

            let chart = tree.add_chart(tree.root(), &chart_name, "Chart");
            let mut count = 0usize;
            for document in serde_yaml::Deserializer::from_str(&contents) {
                let value = Value::deserialize(document)
                    .with_context(|| format!("Failed to parse manifest: {}", file.display()))?;
                if value.is_null() {
                    continue;
                }
                let object = ApiObject::new(value);
                let segment = object
                    .name()
                    .map(|n| format!("{}-{}", object.kind().to_lowercase(), n))
                    .unwrap_or_else(|| format!("resource{}", count));
                let construct_type = object.kind().to_string();
                tree.add_resource(chart, &segment, &construct_type, object);
                count += 1;
            }
            tracing::debug!("Loaded {} resources for chart {}", count, chart_name);
        }

        Ok(tree)
    }
}

/// Chart name encoded in a synthesized manifest file name
pub fn chart_name_from_manifest_file(file_name: &str) -> String {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| {
        Regex::new(r"^\d{4}-(?P<chart>.+)\.k8s\.yaml$").expect("static regex is valid")
    });
    if let Some(caps) = pattern.captures(file_name) {
        return caps["chart"].to_string();
    }
    file_name.trim_end_matches(".k8s.yaml").to_string()
}

/// Serialized form of a construct tree
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeDocument {
    pub id: String,
    #[serde(rename = "type", default)]
    pub construct_type: String,
    #[serde(default)]
    pub chart: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeDocument>,
}
