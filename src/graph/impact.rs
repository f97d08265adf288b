//! Change-impact queries over the dependency graph

use super::DependencyGraph;
use std::collections::{BTreeSet, VecDeque};

/// Normalize a user-supplied path for comparison with stored relative paths
fn normalize(path: &str) -> String {
    let unified = path.replace('\\', "/");
    unified.trim_start_matches("./").to_string()
}

fn path_matches(changed: &str, file_path: &str) -> bool {
    changed == file_path || changed.ends_with(&format!("/{}", file_path))
}

impl DependencyGraph {
    /// Charts defined in any of the given files
    pub fn charts_in_files<S: AsRef<str>>(&self, files: &[S]) -> BTreeSet<String> {
        let normalized: Vec<String> = files.iter().map(|f| normalize(f.as_ref())).collect();
        self.nodes
            .values()
            .filter(|node| normalized.iter().any(|f| path_matches(f, &node.file_path)))
            .map(|node| node.name.clone())
            .collect()
    }

    /// Every chart potentially affected by a change to the given files
    ///
    /// Charts defined in the files plus all their transitive dependents.
    pub fn affected_charts<S: AsRef<str>>(&self, files: &[S]) -> BTreeSet<String> {
        let direct = self.charts_in_files(files);
        self.transitive_dependents(&direct)
    }

    /// Closure over `dependents`, including the seeds
    pub fn transitive_dependents(&self, seeds: &BTreeSet<String>) -> BTreeSet<String> {
        self.closure(seeds, |node| &node.dependents)
    }

    /// Closure over `dependencies`, including the seeds
    pub fn transitive_dependencies(&self, seeds: &BTreeSet<String>) -> BTreeSet<String> {
        self.closure(seeds, |node| &node.dependencies)
    }

    fn closure<F>(&self, seeds: &BTreeSet<String>, next: F) -> BTreeSet<String>
    where
        F: Fn(&super::ChartNode) -> &BTreeSet<String>,
    {
        let mut seen: BTreeSet<String> = BTreeSet::new();
        let mut queue: VecDeque<&str> = seeds.iter().map(String::as_str).collect();
        while let Some(name) = queue.pop_front() {
            if !seen.insert(name.to_string()) {
                continue;
            }
            if let Some(node) = self.nodes.get(name) {
                for neighbour in next(node) {
                    if !seen.contains(neighbour) {
                        queue.push_back(neighbour.as_str());
                    }
                }
            }
        }
        seen
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::ChartNode;

    fn node(name: &str, file: &str, deps: &[&str], dependents: &[&str]) -> ChartNode {
        ChartNode {
            name: name.to_string(),
            chart_id: name.to_lowercase(),
            file_path: file.to_string(),
            dependencies: deps.iter().map(|s| s.to_string()).collect(),
            dependents: dependents.iter().map(|s| s.to_string()).collect(),
            imports: BTreeSet::new(),
        }
    }

    fn chain() -> DependencyGraph {
        // E -> D -> C
        let mut graph = DependencyGraph::default();
        for n in [
            node("C", "charts/c-chart.ts", &[], &["D"]),
            node("D", "charts/d-chart.ts", &["C"], &["E"]),
            node("E", "charts/e-chart.ts", &["D"], &[]),
            node("X", "charts/x-chart.ts", &[], &[]),
        ] {
            graph.nodes.insert(n.name.clone(), n);
        }
        graph
    }

    #[test]
    fn test_affected_is_transitive() {
        let graph = chain();
        let affected = graph.affected_charts(&["charts/c-chart.ts"]);
        let expected: BTreeSet<String> = ["C", "D", "E"].iter().map(|s| s.to_string()).collect();
        assert_eq!(affected, expected);
    }

    #[test]
    fn test_path_forms() {
        let graph = chain();
        assert!(graph.affected_charts(&["./charts/e-chart.ts"]).contains("E"));
        assert!(graph.affected_charts(&["/repo/charts/x-chart.ts"]).contains("X"));
        assert!(graph.affected_charts(&["charts\\x-chart.ts"]).contains("X"));
        assert!(graph.affected_charts(&["lib/util.ts"]).is_empty());
    }

    #[test]
    fn test_dependencies_closure() {
        let graph = chain();
        let seeds: BTreeSet<String> = ["E".to_string()].into();
        let deps = graph.transitive_dependencies(&seeds);
        assert_eq!(deps.len(), 3);
    }
}
