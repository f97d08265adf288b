//! Chart filtering by name, path and relationship

use super::{SelectionError, SelectionResult};
use crate::graph::{ChartNode, DependencyGraph};
use globset::{Glob, GlobSet, GlobSetBuilder};
use regex::Regex;
use std::collections::BTreeSet;

/// What to select
///
/// Positive criteria are unioned; with none given every chart is selected.
/// Expansion to dependencies and dependents happens before exclusion.
#[derive(Debug, Clone, Default)]
pub struct SelectionCriteria {
    /// Globs matched against chart class name, chart id and source path
    pub patterns: Vec<String>,
    /// Regex matched against chart class name and chart id
    pub regex: Option<String>,
    /// Source directory prefixes
    pub directories: Vec<String>,
    /// Charts whose whole dependency neighbourhood is selected
    pub related_to: Vec<String>,
    /// Changed files; the affected charts are selected
    pub changed_files: Option<Vec<String>>,
    pub with_dependencies: bool,
    pub with_dependents: bool,
    /// Globs removing charts from the final selection
    pub exclude: Vec<String>,
}

impl SelectionCriteria {
    fn has_positive_criteria(&self) -> bool {
        !self.patterns.is_empty()
            || self.regex.is_some()
            || !self.directories.is_empty()
            || !self.related_to.is_empty()
            || self.changed_files.is_some()
    }
}

/// Compiled [`SelectionCriteria`]
pub struct ChartFilter {
    criteria: SelectionCriteria,
    include: Option<GlobSet>,
    regex: Option<Regex>,
    exclude: Option<GlobSet>,
}

fn compile_globset(patterns: &[String]) -> SelectionResult<Option<GlobSet>> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|source| SelectionError::Glob {
            pattern: pattern.clone(),
            source,
        })?;
        builder.add(glob);
    }
    builder
        .build()
        .map(Some)
        .map_err(|source| SelectionError::Glob {
            pattern: patterns.join(","),
            source,
        })
}

fn glob_matches(set: &GlobSet, node: &ChartNode) -> bool {
    set.is_match(&node.name) || set.is_match(&node.chart_id) || set.is_match(&node.file_path)
}

fn directory_prefix(dir: &str) -> String {
    let trimmed = dir.trim_start_matches("./").trim_end_matches('/');
    format!("{}/", trimmed)
}

impl ChartFilter {
    pub fn new(criteria: SelectionCriteria) -> SelectionResult<Self> {
        let include = compile_globset(&criteria.patterns)?;
        let exclude = compile_globset(&criteria.exclude)?;
        let regex = criteria.regex.as_deref().map(Regex::new).transpose()?;
        Ok(Self {
            criteria,
            include,
            regex,
            exclude,
        })
    }

    /// Chart class names selected from `graph`
    pub fn select(&self, graph: &DependencyGraph) -> SelectionResult<BTreeSet<String>> {
        let mut selected: BTreeSet<String> = if self.criteria.has_positive_criteria() {
            self.positive_matches(graph)?
        } else {
            graph.nodes.keys().cloned().collect()
        };

        if self.criteria.with_dependencies {
            selected = graph.transitive_dependencies(&selected);
        }
        if self.criteria.with_dependents {
            selected = graph.transitive_dependents(&selected);
        }

        if let Some(exclude) = &self.exclude {
            selected.retain(|name| {
                graph
                    .node(name)
                    .is_none_or(|node| !glob_matches(exclude, node))
            });
        }

        tracing::debug!("Selected {} of {} charts", selected.len(), graph.nodes.len());
        Ok(selected)
    }

    fn positive_matches(&self, graph: &DependencyGraph) -> SelectionResult<BTreeSet<String>> {
        let mut selected = BTreeSet::new();

        for node in graph.nodes.values() {
            let by_glob = self.include.as_ref().is_some_and(|set| glob_matches(set, node));
            let by_regex = self
                .regex
                .as_ref()
                .is_some_and(|re| re.is_match(&node.name) || re.is_match(&node.chart_id));
            let by_dir = self
                .criteria
                .directories
                .iter()
                .any(|dir| node.file_path.starts_with(&directory_prefix(dir)));
            if by_glob || by_regex || by_dir {
                selected.insert(node.name.clone());
            }
        }

        for name in &self.criteria.related_to {
            let node = graph
                .resolve_chart(name)
                .ok_or_else(|| SelectionError::UnknownChart(name.clone()))?;
            let seed: BTreeSet<String> = [node.name.clone()].into();
            selected.extend(graph.transitive_dependencies(&seed));
            selected.extend(graph.transitive_dependents(&seed));
        }

        if let Some(changed) = &self.criteria.changed_files {
            selected.extend(graph.affected_charts(changed));
        }

        Ok(selected)
    }
}
