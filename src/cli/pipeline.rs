//! Analysis, planning, synthesis and catalog command handlers

use anyhow::{Context, Result};
use clap::Args;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::analysis::{ChartAnalyzer, analyze_directory};
use crate::catalog::{CatalogGenerator, to_yaml_stream};
use crate::config::Config;
use crate::extract::{SynthesisContext, extract_graph};
use crate::graph::DependencyGraph;
use crate::models::ConstructTree;
use crate::scheduler::{ExecutionPlan, ParallelSynthesizer, ProcessGroupRunner};
use crate::selection::{ChartFilter, SelectionCriteria, changed_files_since};
use crate::watch::{SourceWatcher, rebuild_affected};

/// Chart selection flags shared by `plan`, `synth` and `watch`
#[derive(Args, Debug, Clone, Default)]
pub struct SelectionArgs {
    /// Glob over chart class name, chart id or source path (repeatable)
    #[arg(long = "chart", short = 'c')]
    pub patterns: Vec<String>,

    /// Regex over chart class name or chart id
    #[arg(long)]
    pub regex: Option<String>,

    /// Source directory prefix (repeatable)
    #[arg(long = "dir")]
    pub directories: Vec<String>,

    /// Select a chart with everything it depends on and everything depending on it
    #[arg(long)]
    pub related_to: Vec<String>,

    /// Select charts affected by files changed since this git ref
    #[arg(long)]
    pub changed_since: Option<String>,

    /// Add transitive dependencies of the selection
    #[arg(long)]
    pub with_dependencies: bool,

    /// Add transitive dependents of the selection
    #[arg(long)]
    pub with_dependents: bool,

    /// Glob removing charts from the selection (repeatable)
    #[arg(long)]
    pub exclude: Vec<String>,
}

impl SelectionArgs {
    fn criteria(&self, root: &Path) -> Result<SelectionCriteria> {
        let changed_files = match &self.changed_since {
            Some(reference) => Some(changed_files_since(root, reference)?),
            None => None,
        };
        Ok(SelectionCriteria {
            patterns: self.patterns.clone(),
            regex: self.regex.clone(),
            directories: self.directories.clone(),
            related_to: self.related_to.clone(),
            changed_files,
            with_dependencies: self.with_dependencies,
            with_dependents: self.with_dependents,
            exclude: self.exclude.clone(),
        })
    }
}

fn graph_path(root: &Path, config: &Config) -> PathBuf {
    root.join(&config.analysis.graph_file)
}

/// Persisted graph when still current, otherwise a fresh one (saved)
pub fn load_or_build_graph(root: &Path, config: &Config, force: bool) -> Result<DependencyGraph> {
    let path = graph_path(root, config);
    if !force
        && let Some(graph) = DependencyGraph::load_compatible(&path)?
    {
        let changed = graph.changed_files(root, &config.analysis)?;
        if changed.is_empty() {
            tracing::info!("Dependency graph {} is up to date", path.display());
            return Ok(graph);
        }
        tracing::info!("{} source files changed, rebuilding graph", changed.len());
    }

    let graph = DependencyGraph::build_from_directory(root, &config.analysis)?;
    graph
        .save(&path)
        .with_context(|| format!("Failed to save dependency graph to {}", path.display()))?;
    Ok(graph)
}

fn select(root: &Path, graph: &DependencyGraph, args: &SelectionArgs) -> Result<BTreeSet<String>> {
    let filter = ChartFilter::new(args.criteria(root)?)?;
    Ok(filter.select(graph)?)
}

/// `analyze`
pub fn analyze(root: &Path, config: &Config, force: bool, stats: bool) -> Result<()> {
    let graph = load_or_build_graph(root, config, force)?;
    println!(
        "Dependency graph: {} charts -> {}",
        graph.nodes.len(),
        graph_path(root, config).display()
    );

    if stats {
        let hard = graph.nodes.values().map(|n| n.dependencies.len()).sum::<usize>();
        let imports = graph.nodes.values().map(|n| n.imports.len()).sum::<usize>();
        let plan = ExecutionPlan::build(&graph, None);
        let cyclic = plan.groups.iter().filter(|g| g.is_cyclic()).count();
        println!("  source files:      {}", graph.file_hashes.len());
        println!("  dependency edges:  {}", hard);
        println!("  import edges:      {}", imports);
        println!("  execution levels:  {}", plan.levels.len());
        println!("  cyclic groups:     {}", cyclic);
        let isolated = graph
            .nodes
            .values()
            .filter(|n| n.dependencies.is_empty() && n.dependents.is_empty())
            .count();
        println!("  independent charts: {}", isolated);
    }
    Ok(())
}

/// `impact`
pub fn impact(root: &Path, config: &Config, files: &[String]) -> Result<()> {
    let graph = load_or_build_graph(root, config, false)?;
    let direct = graph.charts_in_files(files);
    let affected = graph.affected_charts(files);
    if affected.is_empty() {
        println!("No charts affected");
        return Ok(());
    }
    for name in &affected {
        let marker = if direct.contains(name) { "changed" } else { "dependent" };
        let id = graph.node(name).map(|n| n.chart_id.as_str()).unwrap_or_default();
        println!("{} ({}) [{}]", name, id, marker);
    }
    Ok(())
}

/// `plan`
pub fn plan(root: &Path, config: &Config, args: &SelectionArgs) -> Result<()> {
    let graph = load_or_build_graph(root, config, false)?;
    let selection = select(root, &graph, args)?;
    let plan = ExecutionPlan::build(&graph, Some(&selection));
    print!("{}", plan.render());
    Ok(())
}

/// `synth`
pub async fn synth(
    root: &Path,
    config: &Config,
    args: &SelectionArgs,
    dry_run: bool,
    concurrency: Option<usize>,
) -> Result<()> {
    let graph = load_or_build_graph(root, config, false)?;
    let selection = select(root, &graph, args)?;
    if selection.is_empty() {
        println!("No charts selected");
        return Ok(());
    }
    let plan = ExecutionPlan::build(&graph, Some(&selection));

    if dry_run {
        print!("{}", plan.render());
        return Ok(());
    }

    run_plan(root, config, &plan, concurrency).await
}

async fn run_plan(
    root: &Path,
    config: &Config,
    plan: &ExecutionPlan,
    concurrency: Option<usize>,
) -> Result<()> {
    let runner = ProcessGroupRunner::from_config(&config.synthesis, root.to_path_buf());
    let max_parallel = concurrency.unwrap_or(config.synthesis.max_parallel);
    let report = ParallelSynthesizer::new(runner, max_parallel)
        .execute(plan)
        .await
        .context("Synthesis failed")?;
    println!(
        "Synthesized {} charts in {} groups over {} levels ({:.2?}, {:.1}x parallel speedup)",
        report.charts_synthesized(),
        report.groups.len(),
        report.levels.len(),
        report.total_duration,
        report.parallel_speedup()
    );
    Ok(())
}

/// `watch`
pub async fn watch(
    root: &Path,
    config: &Config,
    debounce_ms: Option<u64>,
    concurrency: Option<usize>,
) -> Result<()> {
    let mut graph = load_or_build_graph(root, config, false)?;
    let mut watcher = SourceWatcher::new(root, &config.analysis)?;
    let quiet = Duration::from_millis(debounce_ms.unwrap_or(config.synthesis.debounce_ms));
    println!("Watching for changes (Ctrl-C to stop)");

    loop {
        let batch = tokio::select! {
            batch = watcher.next_batch(quiet) => batch,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(changed) = batch else { break };
        tracing::info!("{} files changed", changed.len());

        let (rebuilt, affected) = match rebuild_affected(root, &config.analysis, &graph, &changed) {
            Ok(result) => result,
            Err(e) => {
                tracing::error!("Analysis failed: {}", e);
                continue;
            }
        };
        graph = rebuilt;
        if let Err(e) = graph.save(&graph_path(root, config)) {
            tracing::warn!("Failed to save dependency graph: {}", e);
        }

        if affected.is_empty() {
            println!("No charts affected by {} changed files", changed.len());
            continue;
        }
        println!(
            "Rebuilding {} charts: {}",
            affected.len(),
            affected.iter().cloned().collect::<Vec<_>>().join(", ")
        );
        let plan = ExecutionPlan::build(&graph, Some(&affected));
        // A failed rebuild keeps the session alive
        if let Err(e) = run_plan(root, config, &plan, concurrency).await {
            eprintln!("{:#}", e);
        }
    }

    println!("Stopped watching");
    Ok(())
}

/// `catalog`
pub fn catalog(
    root: &Path,
    config: &Config,
    input: &Path,
    output: Option<&Path>,
    with_analysis: bool,
) -> Result<()> {
    let tree = if input.is_dir() {
        ConstructTree::from_manifest_dir(input)?
    } else {
        ConstructTree::load_document(input)?
    };

    let mut ctx = SynthesisContext::with_core_kinds();
    let analyses = if with_analysis {
        let mut analyzer = ChartAnalyzer::new()?;
        let charts = analyze_directory(&mut analyzer, root, &config.analysis.source_dirs)?;
        for chart in &charts {
            ctx.charts.register(&chart.class_name, &chart.chart_id);
        }
        Some(charts)
    } else {
        None
    };

    let extracted = extract_graph(&tree, &ctx);
    let entities = CatalogGenerator::new(&config.catalog).generate(
        &extracted.resources,
        &extracted.relationships,
        analyses.as_deref(),
    );
    let yaml = to_yaml_stream(&entities).context("Failed to serialize catalog")?;

    match output {
        Some(path) => {
            std::fs::write(path, &yaml)
                .with_context(|| format!("Failed to write catalog: {}", path.display()))?;
            println!("Wrote {} entities to {}", entities.len(), path.display());
        }
        None => print!("{}", yaml),
    }
    Ok(())
}
