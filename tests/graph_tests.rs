//! Dependency graph construction, persistence and change impact

use chartscope::config::AnalysisConfig;
use chartscope::graph::{DependencyGraph, GRAPH_SCHEMA_VERSION};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn chart(class: &str, deps: &[(&str, &str)]) -> String {
    let imports: String = deps
        .iter()
        .map(|(ty, file)| format!("import {{ {} }} from './{}';\n", ty, file))
        .collect();
    let params: String = deps
        .iter()
        .enumerate()
        .map(|(i, (ty, _))| format!(", dep{}: {}", i, ty))
        .collect();
    format!(
        "import {{ Chart }} from 'cdk8s';\n{}\nexport class {} extends Chart {{\n  constructor(scope: Construct, id: string{}) {{\n    super(scope, id);\n  }}\n}}\n",
        imports, class, params
    )
}

const MAIN: &str = r#"
import { App } from 'cdk8s';

const app = new App();
const base = new BaseChart(app, 'platform-base');
const middle = new MiddleChart(app, 'middle', base);
const top = new TopChart(app, 'top', middle);
const side = new SideChart(app, 'side');
side.addDependency(base);
app.synth();
"#;

/// Base <- Middle <- Top, plus Side wired to Base only in main.ts
fn write_fixture(root: &Path) {
    fs::create_dir_all(root.join("charts")).unwrap();
    fs::write(root.join("charts/base-chart.ts"), chart("BaseChart", &[])).unwrap();
    fs::write(
        root.join("charts/middle-chart.ts"),
        chart("MiddleChart", &[("BaseChart", "base-chart")]),
    )
    .unwrap();
    fs::write(
        root.join("charts/top-chart.ts"),
        chart("TopChart", &[("MiddleChart", "middle-chart")]),
    )
    .unwrap();
    fs::write(root.join("charts/side-chart.ts"), chart("SideChart", &[])).unwrap();
    fs::write(root.join("main.ts"), MAIN).unwrap();
}

fn set(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_build_from_directory() {
    let temp = TempDir::new().unwrap();
    write_fixture(temp.path());
    let config = AnalysisConfig::default();

    let graph = DependencyGraph::build_from_directory(temp.path(), &config).unwrap();
    assert_eq!(graph.schema_version, GRAPH_SCHEMA_VERSION);
    assert_eq!(graph.nodes.len(), 4);

    let middle = graph.node("MiddleChart").unwrap();
    assert_eq!(middle.dependencies, set(&["BaseChart"]));
    assert_eq!(middle.dependents, set(&["TopChart"]));

    // Only the entry point knows about this edge
    assert_eq!(graph.node("SideChart").unwrap().dependencies, set(&["BaseChart"]));

    // Literal ids from main.ts override the file-derived id
    assert_eq!(graph.node("BaseChart").unwrap().chart_id, "platform-base");
    assert_eq!(graph.resolve_chart("platform-base").unwrap().name, "BaseChart");

    assert_eq!(graph.file_hashes.len(), 5);
    assert!(graph.file_hashes.contains_key("main.ts"));
}

#[test]
fn test_affected_charts_are_transitive() {
    let temp = TempDir::new().unwrap();
    write_fixture(temp.path());
    let graph = DependencyGraph::build_from_directory(temp.path(), &AnalysisConfig::default()).unwrap();

    assert_eq!(
        graph.affected_charts(&["charts/base-chart.ts"]),
        set(&["BaseChart", "MiddleChart", "SideChart", "TopChart"])
    );
    assert_eq!(
        graph.affected_charts(&["charts/middle-chart.ts"]),
        set(&["MiddleChart", "TopChart"])
    );
    assert_eq!(graph.affected_charts(&["charts/top-chart.ts"]), set(&["TopChart"]));
    assert!(graph.affected_charts(&["main.ts"]).is_empty());
}

#[test]
fn test_save_load_is_stable() {
    let temp = TempDir::new().unwrap();
    write_fixture(temp.path());
    let graph = DependencyGraph::build_from_directory(temp.path(), &AnalysisConfig::default()).unwrap();

    let path = temp.path().join(".chartscope/graph.json");
    graph.save(&path).unwrap();
    let first = fs::read_to_string(&path).unwrap();

    let loaded = DependencyGraph::load(&path).unwrap();
    assert_eq!(loaded, graph);
    loaded.save(&path).unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), first);

    // Rebuilding unchanged sources gives the same bytes
    let rebuilt = DependencyGraph::build_from_directory(temp.path(), &AnalysisConfig::default()).unwrap();
    rebuilt.save(&path).unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), first);
}

#[test]
fn test_incompatible_schema_is_rejected() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("graph.json");
    fs::write(&path, r#"{"nodes": {}, "relationships": [], "fileHashes": {}}"#).unwrap();
    assert!(DependencyGraph::load_compatible(&path).unwrap().is_none());
    assert!(DependencyGraph::load_compatible(&temp.path().join("missing.json")).unwrap().is_none());

    fs::write(&path, "not json").unwrap();
    assert!(DependencyGraph::load(&path).is_err());
}

#[test]
fn test_changed_files_detects_edits_additions_and_removals() {
    let temp = TempDir::new().unwrap();
    write_fixture(temp.path());
    let config = AnalysisConfig::default();
    let graph = DependencyGraph::build_from_directory(temp.path(), &config).unwrap();
    assert!(graph.changed_files(temp.path(), &config).unwrap().is_empty());

    fs::write(
        temp.path().join("charts/middle-chart.ts"),
        chart("MiddleChart", &[]),
    )
    .unwrap();
    fs::write(temp.path().join("charts/extra-chart.ts"), chart("ExtraChart", &[])).unwrap();
    fs::remove_file(temp.path().join("charts/side-chart.ts")).unwrap();

    let changed = graph.changed_files(temp.path(), &config).unwrap();
    assert_eq!(
        changed,
        vec![
            "charts/extra-chart.ts".to_string(),
            "charts/middle-chart.ts".to_string(),
            "charts/side-chart.ts".to_string(),
        ]
    );
    assert_eq!(
        graph.affected_charts(&changed),
        set(&["MiddleChart", "SideChart", "TopChart"])
    );
}
