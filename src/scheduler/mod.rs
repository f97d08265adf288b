//! Parallel synthesis scheduling
//!
//! Charts are partitioned into strongly connected groups, the groups are
//! arranged into dependency levels and every level is synthesized
//! concurrently before the next one starts.

pub mod executor;
pub mod plan;
pub mod tarjan;

pub use executor::{GroupOutput, GroupRunner, ParallelSynthesizer, ProcessGroupRunner};
pub use plan::{ChartGroup, ExecutionPlan};
pub use tarjan::find_strongly_connected_components;

use serde::Serialize;
use std::time::Duration;

/// Scheduler error types
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("No synthesis command configured")]
    EmptyCommand,

    #[error("Failed to spawn synthesis for group {group}: {source}")]
    Spawn {
        group: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Synthesis of group {group} failed ({status}): {stderr}")]
    GroupFailed {
        group: String,
        status: String,
        stderr: String,
    },

    #[error("Level {level} failed for groups: {}", groups.join(", "))]
    LevelFailed { level: usize, groups: Vec<String> },
}

pub type SchedulerResult<T> = Result<T, SchedulerError>;

/// Outcome of one group within a run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupReport {
    pub group: usize,
    pub charts: Vec<String>,
    pub level: usize,
    #[serde(with = "duration_millis")]
    pub duration: Duration,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Wall-clock time of one level
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelReport {
    pub level: usize,
    pub groups: usize,
    #[serde(with = "duration_millis")]
    pub duration: Duration,
}

/// Summary of a complete synthesis run
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SynthesisReport {
    pub groups: Vec<GroupReport>,
    pub levels: Vec<LevelReport>,
    #[serde(with = "duration_millis")]
    pub total_duration: Duration,
}

impl SynthesisReport {
    pub fn charts_synthesized(&self) -> usize {
        self.groups
            .iter()
            .filter(|g| g.success)
            .map(|g| g.charts.len())
            .sum()
    }

    pub fn failed_groups(&self) -> Vec<&GroupReport> {
        self.groups.iter().filter(|g| !g.success).collect()
    }

    /// Sum of group durations over wall-clock time
    pub fn parallel_speedup(&self) -> f64 {
        let sequential: Duration = self.groups.iter().map(|g| g.duration).sum();
        if self.total_duration.is_zero() {
            return 1.0;
        }
        sequential.as_secs_f64() / self.total_duration.as_secs_f64()
    }
}

mod duration_millis {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_millis() as u64)
    }
}
