//! Grouping, leveling and level-by-level execution

use async_trait::async_trait;
use chartscope::graph::{ChartNode, DependencyGraph};
use chartscope::scheduler::{
    ChartGroup, ExecutionPlan, GroupOutput, GroupRunner, ParallelSynthesizer,
    ProcessGroupRunner, SchedulerError, SchedulerResult,
};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

fn graph(edges: &[(&str, &[&str])]) -> DependencyGraph {
    let mut graph = DependencyGraph::default();
    for (name, deps) in edges {
        graph.nodes.insert(
            name.to_string(),
            ChartNode {
                name: name.to_string(),
                chart_id: name.to_lowercase(),
                file_path: format!("charts/{}-chart.ts", name.to_lowercase()),
                dependencies: deps.iter().map(|d| d.to_string()).collect(),
                dependents: BTreeSet::new(),
                imports: BTreeSet::new(),
            },
        );
    }
    let pairs: Vec<(String, String)> = graph
        .nodes
        .values()
        .flat_map(|n| n.dependencies.iter().map(|d| (d.clone(), n.name.clone())))
        .collect();
    for (dependency, dependent) in pairs {
        if let Some(node) = graph.nodes.get_mut(&dependency) {
            node.dependents.insert(dependent);
        }
    }
    graph
}

fn labels(plan: &ExecutionPlan, level: usize) -> Vec<String> {
    plan.levels[level]
        .iter()
        .filter_map(|id| plan.group(*id))
        .map(ChartGroup::label)
        .collect()
}

/// Records finished groups and fails the named charts
#[derive(Default)]
struct RecordingRunner {
    finished: Mutex<Vec<String>>,
    failing: BTreeSet<String>,
}

#[async_trait]
impl GroupRunner for RecordingRunner {
    async fn run_group(&self, group: &ChartGroup) -> SchedulerResult<GroupOutput> {
        tokio::task::yield_now().await;
        if group.charts.iter().any(|c| self.failing.contains(c)) {
            return Err(SchedulerError::GroupFailed {
                group: group.label(),
                status: "exit status: 1".to_string(),
                stderr: "boom".to_string(),
            });
        }
        self.finished.lock().unwrap().push(group.label());
        Ok(GroupOutput::default())
    }
}

#[test]
fn test_cycle_collapses_into_one_group() {
    let graph = graph(&[
        ("Alpha", &["Beta"]),
        ("Beta", &["Alpha"]),
        ("Gamma", &["Alpha"]),
        ("Delta", &[]),
    ]);
    let plan = ExecutionPlan::build(&graph, None);

    assert_eq!(plan.groups.len(), 3);
    assert_eq!(plan.chart_count(), 4);
    assert!(plan.is_valid());
    assert!(!plan.fallback_used());
    assert_eq!(labels(&plan, 0), vec!["Alpha+Beta", "Delta"]);
    assert_eq!(labels(&plan, 1), vec!["Gamma"]);

    let cycle = plan.groups.iter().find(|g| g.is_cyclic()).unwrap();
    assert_eq!(cycle.chart_ids, vec!["alpha", "beta"]);
    assert!(plan.render().contains("  - Alpha+Beta [cycle]"));
}

#[test]
fn test_levels_respect_every_dependency() {
    let mut edges: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for i in 0..40usize {
        let deps = [i / 2, i / 3, i.saturating_sub(7)]
            .into_iter()
            .filter(|d| *d < i)
            .map(|d| format!("c{:02}", d))
            .collect();
        edges.insert(format!("c{:02}", i), deps);
    }
    let plan = ExecutionPlan::from_dependencies(&edges);

    assert_eq!(plan.groups.len(), 40);
    assert!(plan.is_valid());
    for group in &plan.groups {
        let level = plan.level_of(group.id).unwrap();
        for dep in &group.dependencies {
            assert!(plan.level_of(*dep).unwrap() < level);
        }
    }
    assert_eq!(labels(&plan, 0), vec!["c00"]);
}

#[test]
fn test_selection_treats_outside_dependencies_as_satisfied() {
    let graph = graph(&[("Base", &[]), ("Api", &["Base"]), ("Web", &["Api"])]);
    let selection: BTreeSet<String> = ["Api".to_string(), "Web".to_string()].into();
    let plan = ExecutionPlan::build(&graph, Some(&selection));

    assert_eq!(plan.chart_count(), 2);
    assert_eq!(labels(&plan, 0), vec!["Api"]);
    assert_eq!(labels(&plan, 1), vec!["Web"]);
}

#[tokio::test]
async fn test_levels_execute_in_order() {
    let graph = graph(&[
        ("Base", &[]),
        ("Secrets", &[]),
        ("Api", &["Base", "Secrets"]),
        ("Web", &["Api"]),
    ]);
    let plan = ExecutionPlan::build(&graph, None);
    let runner = RecordingRunner::default();
    let synthesizer = ParallelSynthesizer::new(&runner, 4);

    let report = synthesizer.execute(&plan).await.unwrap();
    assert_eq!(report.charts_synthesized(), 4);
    assert_eq!(report.levels.len(), 3);
    assert!(report.failed_groups().is_empty());

    let finished = runner.finished.lock().unwrap().clone();
    assert_eq!(finished.len(), 4);
    assert_eq!(&finished[2..], ["Api".to_string(), "Web".to_string()]);
}

#[tokio::test]
async fn test_failed_level_stops_the_run() {
    let graph = graph(&[
        ("Base", &[]),
        ("Secrets", &[]),
        ("Api", &["Base", "Secrets"]),
    ]);
    let plan = ExecutionPlan::build(&graph, None);
    let runner = RecordingRunner {
        failing: ["Base".to_string()].into(),
        ..Default::default()
    };
    let synthesizer = ParallelSynthesizer::new(&runner, 2);

    let err = synthesizer.execute(&plan).await.unwrap_err();
    match err {
        SchedulerError::LevelFailed { level, groups } => {
            assert_eq!(level, 0);
            assert_eq!(groups, vec!["Base".to_string()]);
        }
        other => panic!("unexpected error: {}", other),
    }
    // Secrets shares the failed level and still completes; Api never starts
    assert_eq!(*runner.finished.lock().unwrap(), vec!["Secrets".to_string()]);
}

#[cfg(unix)]
#[tokio::test]
async fn test_process_runner_runs_each_group() {
    let temp = tempfile::TempDir::new().unwrap();
    let graph = graph(&[("Base", &[]), ("Api", &["Base"])]);
    let plan = ExecutionPlan::build(&graph, None);

    let command = vec![
        "sh".to_string(),
        "-c".to_string(),
        "echo \"$CHARTSCOPE_CHARTS\" >> synth.log".to_string(),
    ];
    let runner = ProcessGroupRunner::new(command, temp.path().to_path_buf(), temp.path().join("dist"));
    ParallelSynthesizer::new(runner, 2).execute(&plan).await.unwrap();

    let log = std::fs::read_to_string(temp.path().join("synth.log")).unwrap();
    assert_eq!(log, "base\napi\n");
}

#[cfg(unix)]
#[tokio::test]
async fn test_process_runner_failure_fails_level() {
    let temp = tempfile::TempDir::new().unwrap();
    let plan = ExecutionPlan::build(&graph(&[("Base", &[])]), None);
    let command = vec![
        "sh".to_string(),
        "-c".to_string(),
        "echo 'cannot synth' >&2; exit 3".to_string(),
    ];
    let runner = ProcessGroupRunner::new(command, temp.path().to_path_buf(), temp.path().join("dist"));

    let report_err = ParallelSynthesizer::new(runner, 1).execute(&plan).await.unwrap_err();
    assert!(matches!(report_err, SchedulerError::LevelFailed { level: 0, .. }));
}
