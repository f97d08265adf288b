//! Level-by-level concurrent synthesis

use super::plan::{ChartGroup, ExecutionPlan};
use super::{GroupReport, LevelReport, SchedulerError, SchedulerResult, SynthesisReport};
use crate::config::SynthesisConfig;
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Instant;

/// Environment variable carrying the comma-separated chart ids of a group
pub const ENV_CHARTS: &str = "CHARTSCOPE_CHARTS";
/// Environment variable carrying the chart class names of a group
pub const ENV_CHART_CLASSES: &str = "CHARTSCOPE_CHART_CLASSES";
/// Environment variable carrying the group label
pub const ENV_GROUP: &str = "CHARTSCOPE_GROUP";
/// Environment variable carrying the manifest output directory
pub const ENV_OUTPUT_DIR: &str = "CHARTSCOPE_OUTPUT_DIR";

/// Captured output of a successful group run
#[derive(Debug, Clone, Default)]
pub struct GroupOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Synthesizes one chart group
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GroupRunner: Send + Sync {
    async fn run_group(&self, group: &ChartGroup) -> SchedulerResult<GroupOutput>;
}

#[async_trait]
impl<T: GroupRunner + ?Sized> GroupRunner for &T {
    async fn run_group(&self, group: &ChartGroup) -> SchedulerResult<GroupOutput> {
        (**self).run_group(group).await
    }
}

/// Runs the configured synthesis command once per group
pub struct ProcessGroupRunner {
    command: Vec<String>,
    working_dir: PathBuf,
    output_dir: PathBuf,
}

impl ProcessGroupRunner {
    pub fn new(command: Vec<String>, working_dir: PathBuf, output_dir: PathBuf) -> Self {
        Self {
            command,
            working_dir,
            output_dir,
        }
    }

    pub fn from_config(config: &SynthesisConfig, working_dir: PathBuf) -> Self {
        let output_dir = working_dir.join(&config.output_dir);
        Self::new(config.command.clone(), working_dir, output_dir)
    }
}

#[async_trait]
impl GroupRunner for ProcessGroupRunner {
    async fn run_group(&self, group: &ChartGroup) -> SchedulerResult<GroupOutput> {
        let (program, args) = self
            .command
            .split_first()
            .ok_or(SchedulerError::EmptyCommand)?;

        tracing::debug!("Running {} for group {}", program, group.label());
        let output = tokio::process::Command::new(program)
            .args(args)
            .current_dir(&self.working_dir)
            .env(ENV_CHARTS, group.chart_ids.join(","))
            .env(ENV_CHART_CLASSES, group.charts.join(","))
            .env(ENV_GROUP, group.label())
            .env(ENV_OUTPUT_DIR, &self.output_dir)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| SchedulerError::Spawn {
                group: group.label(),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        if !output.status.success() {
            return Err(SchedulerError::GroupFailed {
                group: group.label(),
                status: output.status.to_string(),
                stderr: stderr.trim().to_string(),
            });
        }
        Ok(GroupOutput { stdout, stderr })
    }
}

/// Executes an [`ExecutionPlan`] level by level
///
/// Groups in a level run concurrently up to `max_parallel`. When any group
/// fails, the rest of its level still finishes but no later level starts.
pub struct ParallelSynthesizer<R> {
    runner: R,
    max_parallel: usize,
}

impl<R: GroupRunner> ParallelSynthesizer<R> {
    pub fn new(runner: R, max_parallel: usize) -> Self {
        Self {
            runner,
            max_parallel: max_parallel.max(1),
        }
    }

    pub async fn execute(&self, plan: &ExecutionPlan) -> SchedulerResult<SynthesisReport> {
        let started = Instant::now();
        let mut report = SynthesisReport::default();

        for (n, level) in plan.levels.iter().enumerate() {
            let level_started = Instant::now();
            let concurrency = if plan.sequential_level == Some(n) {
                1
            } else {
                self.max_parallel
            };
            tracing::info!(
                "Level {}: {} groups (concurrency {})",
                n,
                level.len(),
                concurrency
            );

            let mut results: Vec<GroupReport> =
                stream::iter(level.iter().filter_map(|id| plan.group(*id)))
                    .map(|group| self.run_one(group, n))
                    .buffer_unordered(concurrency)
                    .collect()
                    .await;
            results.sort_by_key(|r| r.group);

            let failed: Vec<String> = results
                .iter()
                .filter(|r| !r.success)
                .map(|r| r.charts.join("+"))
                .collect();

            report.levels.push(LevelReport {
                level: n,
                groups: results.len(),
                duration: level_started.elapsed(),
            });
            report.groups.extend(results);

            if !failed.is_empty() {
                return Err(SchedulerError::LevelFailed {
                    level: n,
                    groups: failed,
                });
            }
        }

        report.total_duration = started.elapsed();
        tracing::info!(
            "Synthesized {} charts in {:.2?} (speedup {:.1}x)",
            report.charts_synthesized(),
            report.total_duration,
            report.parallel_speedup()
        );
        Ok(report)
    }

    async fn run_one(&self, group: &ChartGroup, level: usize) -> GroupReport {
        let started = Instant::now();
        let result = self.runner.run_group(group).await;
        let duration = started.elapsed();
        let error = match result {
            Ok(output) => {
                if !output.stderr.trim().is_empty() {
                    tracing::debug!("{} stderr: {}", group.label(), output.stderr.trim());
                }
                tracing::debug!("Group {} finished in {:.2?}", group.label(), duration);
                None
            }
            Err(e) => {
                tracing::error!("{}", e);
                Some(e.to_string())
            }
        };
        GroupReport {
            group: group.id,
            charts: group.charts.clone(),
            level,
            duration,
            success: error.is_none(),
            error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{BTreeMap, BTreeSet};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn plan(edges: &[(&str, &[&str])]) -> ExecutionPlan {
        let edges: BTreeMap<String, BTreeSet<String>> = edges
            .iter()
            .map(|(k, v)| (k.to_string(), v.iter().map(|s| s.to_string()).collect()))
            .collect();
        ExecutionPlan::from_dependencies(&edges)
    }

    #[tokio::test]
    async fn test_all_levels_run_in_order() {
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        let seen = order.clone();
        let mut runner = MockGroupRunner::new();
        runner.expect_run_group().times(3).returning(move |group| {
            seen.lock().unwrap().push(group.label());
            Ok(GroupOutput::default())
        });

        let plan = plan(&[("A", &[]), ("B", &["A"]), ("C", &["B"])]);
        let report = ParallelSynthesizer::new(runner, 4).execute(&plan).await.unwrap();

        assert_eq!(*order.lock().unwrap(), vec!["A", "B", "C"]);
        assert_eq!(report.levels.len(), 3);
        assert_eq!(report.charts_synthesized(), 3);
        assert!(report.failed_groups().is_empty());
    }

    #[tokio::test]
    async fn test_failure_drains_level_then_stops() {
        let mut runner = MockGroupRunner::new();
        // Bad and Good share level 0; Top must never run
        runner.expect_run_group().times(2).returning(|group| {
            if group.charts[0] == "Bad" {
                Err(SchedulerError::GroupFailed {
                    group: group.label(),
                    status: "exit status: 1".to_string(),
                    stderr: "boom".to_string(),
                })
            } else {
                Ok(GroupOutput::default())
            }
        });

        let plan = plan(&[("Bad", &[]), ("Good", &[]), ("Top", &["Bad", "Good"])]);
        let err = ParallelSynthesizer::new(runner, 4)
            .execute(&plan)
            .await
            .unwrap_err();
        match err {
            SchedulerError::LevelFailed { level, groups } => {
                assert_eq!(level, 0);
                assert_eq!(groups, vec!["Bad"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    struct CountingRunner {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl GroupRunner for CountingRunner {
        async fn run_group(&self, _group: &ChartGroup) -> SchedulerResult<GroupOutput> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(GroupOutput::default())
        }
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let charts: Vec<String> = (0..8).map(|i| format!("C{i}")).collect();
        let edges: BTreeMap<String, BTreeSet<String>> =
            charts.iter().map(|c| (c.clone(), BTreeSet::new())).collect();
        let plan = ExecutionPlan::from_dependencies(&edges);

        let synthesizer = ParallelSynthesizer::new(
            CountingRunner {
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            },
            3,
        );
        let report = synthesizer.execute(&plan).await.unwrap();
        assert_eq!(report.groups.len(), 8);
        let peak = synthesizer.runner.peak.load(Ordering::SeqCst);
        assert!(peak <= 3 && peak >= 2, "peak was {peak}");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_process_runner_passes_group_env() {
        let temp = tempfile::TempDir::new().unwrap();
        let runner = ProcessGroupRunner::new(
            vec![
                "sh".to_string(),
                "-c".to_string(),
                "test \"$CHARTSCOPE_CHARTS\" = \"a,b\" && echo \"$CHARTSCOPE_GROUP\"".to_string(),
            ],
            temp.path().to_path_buf(),
            temp.path().join("dist"),
        );
        let group = ChartGroup {
            id: 0,
            charts: vec!["AChart".to_string(), "BChart".to_string()],
            chart_ids: vec!["a".to_string(), "b".to_string()],
            dependencies: BTreeSet::new(),
        };
        let output = runner.run_group(&group).await.unwrap();
        assert_eq!(output.stdout.trim(), "AChart+BChart");

        let failing = ProcessGroupRunner::new(
            vec!["sh".to_string(), "-c".to_string(), "echo nope >&2; exit 3".to_string()],
            temp.path().to_path_buf(),
            temp.path().join("dist"),
        );
        match failing.run_group(&group).await {
            Err(SchedulerError::GroupFailed { stderr, .. }) => assert_eq!(stderr, "nope"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_command_is_an_error() {
        let runner = ProcessGroupRunner::new(Vec::new(), PathBuf::from("."), PathBuf::from("dist"));
        let group = ChartGroup {
            id: 0,
            charts: vec!["A".to_string()],
            chart_ids: vec!["a".to_string()],
            dependencies: BTreeSet::new(),
        };
        assert!(matches!(
            runner.run_group(&group).await,
            Err(SchedulerError::EmptyCommand)
        ));
    }
}
