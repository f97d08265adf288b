//! Chart dependency graph
//!
//! Nodes are keyed by chart class name. Every collection is ordered so the
//! serialized file is byte-stable across runs with identical input.

use super::{GraphError, GraphResult};
use crate::analysis::{
    AnalyzedChart, ChartAnalyzer, ChartRelationship, ChartRelationshipKind, EntryPointFacts,
    analyze_directory, discover_chart_files, discovery::relative_path,
};
use crate::config::AnalysisConfig;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Current on-disk format version
pub const GRAPH_SCHEMA_VERSION: u32 = 1;

/// One chart class
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartNode {
    pub name: String,
    /// Runtime chart identifier
    pub chart_id: String,
    pub file_path: String,
    /// Charts this chart needs synthesized first
    #[serde(default)]
    pub dependencies: BTreeSet<String>,
    /// Charts that need this chart
    #[serde(default)]
    pub dependents: BTreeSet<String>,
    /// Chart classes merely imported
    #[serde(default)]
    pub imports: BTreeSet<String>,
}

impl ChartNode {
    fn from_analysis(chart: &AnalyzedChart) -> Self {
        Self {
            name: chart.class_name.clone(),
            chart_id: chart.chart_id.clone(),
            file_path: chart.file_path.clone(),
            dependencies: BTreeSet::new(),
            dependents: BTreeSet::new(),
            imports: BTreeSet::new(),
        }
    }
}

/// Serializable chart graph with source file hashes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyGraph {
    /// Files written before versioning was introduced read as 0
    #[serde(default)]
    pub schema_version: u32,
    #[serde(default)]
    pub nodes: BTreeMap<String, ChartNode>,
    #[serde(default)]
    pub relationships: Vec<ChartRelationship>,
    /// Relative file path -> SHA-256 hex digest
    #[serde(default)]
    pub file_hashes: BTreeMap<String, String>,
}

impl Default for DependencyGraph {
    fn default() -> Self {
        Self {
            schema_version: GRAPH_SCHEMA_VERSION,
            nodes: BTreeMap::new(),
            relationships: Vec::new(),
            file_hashes: BTreeMap::new(),
        }
    }
}

/// SHA-256 hex digest of a file
pub fn hash_file(path: &Path) -> GraphResult<String> {
    let bytes = std::fs::read(path).map_err(|source| GraphError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}

impl DependencyGraph {
    /// Build from static analyses and optional entry-point facts
    ///
    /// Relationships whose endpoints are not both known charts are dropped.
    pub fn build(analyses: &[AnalyzedChart], entry_point: Option<&EntryPointFacts>) -> Self {
        let mut graph = DependencyGraph::default();
        for chart in analyses {
            graph
                .nodes
                .entry(chart.class_name.clone())
                .or_insert_with(|| ChartNode::from_analysis(chart));
        }

        let mut relationships: BTreeSet<ChartRelationship> = BTreeSet::new();
        for chart in analyses {
            for rel in &chart.relationships {
                relationships.insert(rel.clone());
            }
        }

        if let Some(facts) = entry_point {
            for (class, id) in facts.chart_ids() {
                if let Some(node) = graph.nodes.get_mut(&class) {
                    node.chart_id = id;
                }
            }
            for construction in &facts.constructions {
                for var in &construction.constructed_with {
                    if let Some(dep) = facts.class_of(var) {
                        relationships.insert(ChartRelationship {
                            source: construction.class_name.clone(),
                            target: dep.to_string(),
                            kind: ChartRelationshipKind::Constructor,
                            optional: false,
                        });
                    }
                }
            }
            for fact in &facts.dependencies {
                if let (Some(dependent), Some(dependency)) =
                    (facts.class_of(&fact.dependent), facts.class_of(&fact.dependency))
                {
                    relationships.insert(ChartRelationship {
                        source: dependent.to_string(),
                        target: dependency.to_string(),
                        kind: ChartRelationshipKind::Explicit,
                        optional: false,
                    });
                }
            }
        }

        let mut dropped = 0usize;
        for rel in relationships {
            let known = graph.nodes.contains_key(&rel.source) && graph.nodes.contains_key(&rel.target);
            if !known || rel.source == rel.target {
                dropped += 1;
                continue;
            }
            graph.add_edge(&rel);
            graph.relationships.push(rel);
        }
        if dropped > 0 {
            tracing::debug!("Dropped {} relationships to unknown charts", dropped);
        }

        tracing::info!(
            "Dependency graph: {} charts, {} relationships",
            graph.nodes.len(),
            graph.relationships.len()
        );
        graph
    }

    fn add_edge(&mut self, rel: &ChartRelationship) {
        if rel.kind.is_hard() {
            if let Some(source) = self.nodes.get_mut(&rel.source) {
                source.dependencies.insert(rel.target.clone());
            }
            if let Some(target) = self.nodes.get_mut(&rel.target) {
                target.dependents.insert(rel.source.clone());
            }
        } else if let Some(source) = self.nodes.get_mut(&rel.source) {
            source.imports.insert(rel.target.clone());
        }
    }

    /// Analyze the configured source tree and build a hashed graph
    pub fn build_from_directory(root: &Path, config: &AnalysisConfig) -> GraphResult<Self> {
        let mut analyzer = ChartAnalyzer::new()?;
        let analyses = analyze_directory(&mut analyzer, root, &config.source_dirs)?;

        let entry_path = root.join(&config.entry_point);
        let facts = if entry_path.is_file() {
            let source = std::fs::read_to_string(&entry_path).map_err(|source| GraphError::Io {
                path: entry_path.display().to_string(),
                source,
            })?;
            Some(analyzer.analyze_entry_point(&source))
        } else {
            tracing::debug!("Entry point {} not found", entry_path.display());
            None
        };

        let mut graph = Self::build(&analyses, facts.as_ref());
        graph.file_hashes = current_hashes(root, config)?;
        Ok(graph)
    }

    /// Files whose content differs from the stored hashes, sorted
    ///
    /// Added and removed files count as changed.
    pub fn changed_files(&self, root: &Path, config: &AnalysisConfig) -> GraphResult<Vec<String>> {
        let current = current_hashes(root, config)?;
        let mut changed: BTreeSet<String> = BTreeSet::new();
        for (path, hash) in &current {
            if self.file_hashes.get(path) != Some(hash) {
                changed.insert(path.clone());
            }
        }
        for path in self.file_hashes.keys() {
            if !current.contains_key(path) {
                changed.insert(path.clone());
            }
        }
        Ok(changed.into_iter().collect())
    }

    pub fn node(&self, name: &str) -> Option<&ChartNode> {
        self.nodes.get(name)
    }

    /// Chart class for a runtime chart id or a class name
    pub fn resolve_chart(&self, name: &str) -> Option<&ChartNode> {
        self.nodes
            .get(name)
            .or_else(|| self.nodes.values().find(|n| n.chart_id == name))
    }

    /// Write pretty JSON
    pub fn save(&self, path: &Path) -> GraphResult<()> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|source| GraphError::Io {
                path: parent.display().to_string(),
                source,
            })?;
        }
        std::fs::write(path, json).map_err(|source| GraphError::Io {
            path: path.display().to_string(),
            source,
        })?;
        tracing::debug!("Saved dependency graph to {}", path.display());
        Ok(())
    }

    /// Read a graph file regardless of version
    pub fn load(path: &Path) -> GraphResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| GraphError::Io {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| GraphError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Read a graph file when it exists and has the current version
    ///
    /// A version mismatch is logged and reported as `None` so the caller
    /// rebuilds.
    pub fn load_compatible(path: &Path) -> GraphResult<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let graph = Self::load(path)?;
        if graph.schema_version != GRAPH_SCHEMA_VERSION {
            tracing::warn!(
                "Graph file {} has schema version {}, expected {}; rebuilding",
                path.display(),
                graph.schema_version,
                GRAPH_SCHEMA_VERSION
            );
            return Ok(None);
        }
        Ok(Some(graph))
    }
}

/// Hashes of every chart file plus the entry point
fn current_hashes(root: &Path, config: &AnalysisConfig) -> GraphResult<BTreeMap<String, String>> {
    let mut hashes = BTreeMap::new();
    for file in discover_chart_files(root, &config.source_dirs)? {
        hashes.insert(relative_path(root, &file), hash_file(&file)?);
    }
    let entry = root.join(&config.entry_point);
    if entry.is_file() {
        hashes.insert(relative_path(root, &entry), hash_file(&entry)?);
    }
    Ok(hashes)
}
