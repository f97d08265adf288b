//! Leveled execution plans over strongly connected chart groups

use super::tarjan::find_strongly_connected_components;
use crate::graph::DependencyGraph;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write;

/// Charts synthesized together as one unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartGroup {
    pub id: usize,
    /// Chart class names, sorted
    pub charts: Vec<String>,
    /// Chart ids in the same order as `charts`
    pub chart_ids: Vec<String>,
    /// Ids of groups this group depends on, never its own
    pub dependencies: BTreeSet<usize>,
}

impl ChartGroup {
    pub fn label(&self) -> String {
        self.charts.join("+")
    }

    /// More than one chart means the charts depend on each other
    pub fn is_cyclic(&self) -> bool {
        self.charts.len() > 1
    }
}

/// Ordered levels of groups; every group only depends on earlier levels
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionPlan {
    pub groups: Vec<ChartGroup>,
    pub levels: Vec<Vec<usize>>,
    /// Level holding leftovers that could not be ordered; run one group at a time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sequential_level: Option<usize>,
}

impl ExecutionPlan {
    /// Plan for the whole graph, or only the `selection` charts
    ///
    /// Dependencies on charts outside the selection are treated as
    /// already satisfied.
    pub fn build(graph: &DependencyGraph, selection: Option<&BTreeSet<String>>) -> Self {
        let mut edges: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        let mut chart_ids: BTreeMap<String, String> = BTreeMap::new();

        if let Some(selected) = selection {
            for name in selected {
                if !graph.nodes.contains_key(name) {
                    tracing::warn!("Selected chart {} is not in the dependency graph", name);
                }
            }
        }
        let included = |name: &str| selection.is_none_or(|s| s.contains(name));

        for node in graph.nodes.values().filter(|n| included(&n.name)) {
            let deps = node
                .dependencies
                .iter()
                .filter(|d| graph.nodes.contains_key(*d) && included(d))
                .cloned()
                .collect();
            edges.insert(node.name.clone(), deps);
            chart_ids.insert(node.name.clone(), node.chart_id.clone());
        }

        Self::from_parts(&edges, &chart_ids)
    }

    /// Plan from a bare `chart -> dependencies` map; chart ids equal names
    pub fn from_dependencies(edges: &BTreeMap<String, BTreeSet<String>>) -> Self {
        Self::from_parts(edges, &BTreeMap::new())
    }

    fn from_parts(
        edges: &BTreeMap<String, BTreeSet<String>>,
        chart_ids: &BTreeMap<String, String>,
    ) -> Self {
        let mut components = find_strongly_connected_components(edges);
        components.sort();

        let group_of: BTreeMap<&str, usize> = components
            .iter()
            .enumerate()
            .flat_map(|(id, charts)| charts.iter().map(move |c| (c.as_str(), id)))
            .collect();

        let groups: Vec<ChartGroup> = components
            .iter()
            .enumerate()
            .map(|(id, charts)| {
                let dependencies = charts
                    .iter()
                    .filter_map(|c| edges.get(c))
                    .flatten()
                    .filter_map(|dep| group_of.get(dep.as_str()).copied())
                    .filter(|dep_group| *dep_group != id)
                    .collect();
                ChartGroup {
                    id,
                    charts: charts.clone(),
                    chart_ids: charts
                        .iter()
                        .map(|c| chart_ids.get(c).cloned().unwrap_or_else(|| c.clone()))
                        .collect(),
                    dependencies,
                }
            })
            .collect();

        let (levels, sequential_level) = levelize(&groups);
        let plan = Self {
            groups,
            levels,
            sequential_level,
        };
        tracing::info!(
            "Execution plan: {} charts in {} groups over {} levels",
            plan.chart_count(),
            plan.groups.len(),
            plan.levels.len()
        );
        plan
    }

    pub fn group(&self, id: usize) -> Option<&ChartGroup> {
        self.groups.get(id)
    }

    pub fn chart_count(&self) -> usize {
        self.groups.iter().map(|g| g.charts.len()).sum()
    }

    pub fn fallback_used(&self) -> bool {
        self.sequential_level.is_some()
    }

    pub fn level_of(&self, group: usize) -> Option<usize> {
        self.levels.iter().position(|level| level.contains(&group))
    }

    /// Every group depends only on groups in strictly earlier levels
    pub fn is_valid(&self) -> bool {
        self.levels.iter().enumerate().all(|(n, level)| {
            level.iter().all(|id| {
                self.group(*id).is_some_and(|group| {
                    group
                        .dependencies
                        .iter()
                        .all(|dep| self.level_of(*dep).is_some_and(|l| l < n))
                })
            })
        })
    }

    /// Human-readable plan listing
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{} charts, {} groups, {} levels",
            self.chart_count(),
            self.groups.len(),
            self.levels.len()
        );
        for (n, level) in self.levels.iter().enumerate() {
            let suffix = if self.sequential_level == Some(n) {
                " (sequential)"
            } else {
                ""
            };
            let _ = writeln!(out, "Level {}{}:", n, suffix);
            for group in level.iter().filter_map(|id| self.group(*id)) {
                let marker = if group.is_cyclic() { " [cycle]" } else { "" };
                let _ = writeln!(out, "  - {}{}", group.label(), marker);
            }
        }
        out
    }
}

/// Assign groups to levels; leftovers go into one final sequential level
pub(crate) fn levelize(groups: &[ChartGroup]) -> (Vec<Vec<usize>>, Option<usize>) {
    let mut scheduled: BTreeSet<usize> = BTreeSet::new();
    let mut levels: Vec<Vec<usize>> = Vec::new();

    while scheduled.len() < groups.len() {
        let ready: Vec<usize> = groups
            .iter()
            .filter(|g| !scheduled.contains(&g.id))
            .filter(|g| g.dependencies.iter().all(|d| scheduled.contains(d)))
            .map(|g| g.id)
            .collect();

        if ready.is_empty() {
            let remaining: Vec<usize> = groups
                .iter()
                .map(|g| g.id)
                .filter(|id| !scheduled.contains(id))
                .collect();
            tracing::warn!(
                "Unresolvable dependencies between {} groups, running them sequentially",
                remaining.len()
            );
            levels.push(remaining);
            let fallback = levels.len() - 1;
            return (levels, Some(fallback));
        }

        scheduled.extend(ready.iter().copied());
        levels.push(ready);
    }
    (levels, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::ChartNode;

    fn deps(edges: &[(&str, &[&str])]) -> BTreeMap<String, BTreeSet<String>> {
        edges
            .iter()
            .map(|(k, v)| (k.to_string(), v.iter().map(|s| s.to_string()).collect()))
            .collect()
    }

    fn group(id: usize, chart: &str, dependencies: &[usize]) -> ChartGroup {
        ChartGroup {
            id,
            charts: vec![chart.to_string()],
            chart_ids: vec![chart.to_lowercase()],
            dependencies: dependencies.iter().copied().collect(),
        }
    }

    #[test]
    fn test_cycle_grouped_in_single_level() {
        let plan = ExecutionPlan::from_dependencies(&deps(&[
            ("A", &["B"]),
            ("B", &["A"]),
            ("C", &["A"]),
        ]));
        assert_eq!(plan.groups.len(), 2);
        assert_eq!(plan.groups[0].charts, vec!["A", "B"]);
        assert!(plan.groups[0].is_cyclic());
        assert_eq!(plan.levels, vec![vec![0], vec![1]]);
        assert!(plan.is_valid());
        assert!(!plan.fallback_used());
    }

    #[test]
    fn test_diamond_levels() {
        let plan = ExecutionPlan::from_dependencies(&deps(&[
            ("Base", &[]),
            ("Left", &["Base"]),
            ("Right", &["Base"]),
            ("Top", &["Left", "Right"]),
            ("Solo", &[]),
        ]));
        let level_of = |name: &str| {
            let id = plan.groups.iter().find(|g| g.charts[0] == name).unwrap().id;
            plan.level_of(id).unwrap()
        };
        assert_eq!(level_of("Base"), 0);
        assert_eq!(level_of("Solo"), 0);
        assert_eq!(level_of("Left"), 1);
        assert_eq!(level_of("Right"), 1);
        assert_eq!(level_of("Top"), 2);
        assert!(plan.is_valid());
    }

    #[test]
    fn test_levelize_fallback_on_cyclic_groups() {
        let groups = vec![group(0, "A", &[1]), group(1, "B", &[0]), group(2, "C", &[])];
        let (levels, fallback) = levelize(&groups);
        assert_eq!(levels, vec![vec![2], vec![0, 1]]);
        assert_eq!(fallback, Some(1));
    }

    #[test]
    fn test_build_respects_selection() {
        let mut graph = DependencyGraph::default();
        for (name, dependencies) in [("AppChart", vec!["DbChart"]), ("DbChart", vec![]), ("Other", vec![])] {
            graph.nodes.insert(
                name.to_string(),
                ChartNode {
                    name: name.to_string(),
                    chart_id: name.trim_end_matches("Chart").to_lowercase(),
                    file_path: format!("charts/{}.ts", name),
                    dependencies: dependencies.iter().map(|s| s.to_string()).collect(),
                    dependents: BTreeSet::new(),
                    imports: BTreeSet::new(),
                },
            );
        }
        let selection: BTreeSet<String> = ["AppChart".to_string()].into();
        let plan = ExecutionPlan::build(&graph, Some(&selection));
        assert_eq!(plan.groups.len(), 1);
        assert_eq!(plan.groups[0].chart_ids, vec!["app"]);
        assert!(plan.groups[0].dependencies.is_empty());

        let full = ExecutionPlan::build(&graph, None);
        assert_eq!(full.levels.len(), 2);
        assert!(full.render().contains("Level 1:\n  - AppChart"));
    }
}
