//! Source watching with debounced change batches
//!
//! Filesystem events are funnelled through a channel into a single
//! consumer which waits for a quiet period before handing out the batch.

use crate::analysis::discovery::relative_path;
use crate::config::AnalysisConfig;
use crate::graph::{DependencyGraph, GraphResult};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;

/// Watch error types
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("File watcher error: {0}")]
    Notify(#[from] notify::Error),

    #[error("Nothing to watch under {0}")]
    NothingToWatch(String),
}

/// Whether a changed path can affect chart analysis
pub fn is_relevant(path: &Path) -> bool {
    let in_skipped_dir = path.components().any(|c| {
        matches!(
            c.as_os_str().to_str(),
            Some("node_modules" | ".git" | "dist" | "cdk8s.out")
        )
    });
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    !in_skipped_dir && name.ends_with(".ts") && !name.ends_with(".d.ts")
}

/// Watches the configured source directories and entry point
pub struct SourceWatcher {
    // Dropping the watcher stops event delivery
    _watcher: RecommendedWatcher,
    events: mpsc::UnboundedReceiver<PathBuf>,
    root: PathBuf,
}

impl SourceWatcher {
    pub fn new(root: &Path, config: &AnalysisConfig) -> Result<Self, WatchError> {
        let (tx, events) = mpsc::unbounded_channel();
        let mut watcher = notify::recommended_watcher(move |result: notify::Result<Event>| {
            match result {
                Ok(event) => {
                    if matches!(
                        event.kind,
                        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
                    ) {
                        for path in event.paths {
                            // Receiver gone means the session is shutting down
                            let _ = tx.send(path);
                        }
                    }
                }
                Err(e) => tracing::error!("File watcher error: {:?}", e),
            }
        })?;

        let mut watched = 0;
        for dir in &config.source_dirs {
            let path = root.join(dir);
            if path.is_dir() {
                watcher.watch(&path, RecursiveMode::Recursive)?;
                tracing::debug!("Watching {}", path.display());
                watched += 1;
            }
        }
        let entry_point = root.join(&config.entry_point);
        if entry_point.is_file() {
            watcher.watch(&entry_point, RecursiveMode::NonRecursive)?;
            watched += 1;
        }
        if watched == 0 {
            return Err(WatchError::NothingToWatch(root.display().to_string()));
        }

        Ok(Self {
            _watcher: watcher,
            events,
            root: root.to_path_buf(),
        })
    }

    /// Next debounced batch of relevant changed files, relative to the root
    ///
    /// Returns `None` once the watcher has shut down.
    pub async fn next_batch(&mut self, quiet: Duration) -> Option<BTreeSet<String>> {
        loop {
            let batch = next_batch(&mut self.events, quiet).await?;
            let relevant: BTreeSet<String> = batch
                .iter()
                .filter(|p| is_relevant(p))
                .map(|p| relative_path(&self.root, p))
                .collect();
            if !relevant.is_empty() {
                return Some(relevant);
            }
            tracing::debug!("Ignoring {} irrelevant changes", batch.len());
        }
    }
}

/// Wait for one event, then keep collecting until `quiet` passes without any
///
/// Returns `None` when the channel is closed and nothing is pending.
pub async fn next_batch<T: Ord>(
    events: &mut mpsc::UnboundedReceiver<T>,
    quiet: Duration,
) -> Option<BTreeSet<T>> {
    let first = events.recv().await?;
    let mut batch: BTreeSet<T> = BTreeSet::new();
    batch.insert(first);
    loop {
        match tokio::time::timeout(quiet, events.recv()).await {
            Ok(Some(event)) => {
                batch.insert(event);
            }
            // Closed or quiet: either way the batch is complete
            Ok(None) | Err(_) => return Some(batch),
        }
    }
}

/// Re-analyze the sources and report the charts a change batch affects
///
/// Charts are looked up in both the previous and the rebuilt graph so that
/// newly added and deleted chart files are covered.
pub fn rebuild_affected(
    root: &Path,
    config: &AnalysisConfig,
    previous: &DependencyGraph,
    changed: &BTreeSet<String>,
) -> GraphResult<(DependencyGraph, BTreeSet<String>)> {
    let changed: Vec<&String> = changed.iter().collect();
    let graph = DependencyGraph::build_from_directory(root, config)?;
    let mut affected = graph.affected_charts(&changed);
    for name in previous.affected_charts(&changed) {
        if graph.nodes.contains_key(&name) {
            affected.insert(name);
        }
    }
    if changed.iter().any(|c| c.as_str() == config.entry_point) {
        tracing::info!("Entry point changed, rebuilding all charts");
        affected = graph.nodes.keys().cloned().collect();
    }
    Ok((graph, affected))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relevance() {
        assert!(is_relevant(Path::new("/repo/charts/web-chart.ts")));
        assert!(is_relevant(Path::new("/repo/lib/util.ts")));
        assert!(!is_relevant(Path::new("/repo/charts/types.d.ts")));
        assert!(!is_relevant(Path::new("/repo/node_modules/x/index.ts")));
        assert!(!is_relevant(Path::new("/repo/README.md")));
    }

    #[tokio::test]
    async fn test_burst_is_coalesced() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        tx.send("a.ts").unwrap();
        tx.send("b.ts").unwrap();
        tx.send("a.ts").unwrap();
        let sender = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            tx.send("c.ts").unwrap();
            tokio::time::sleep(Duration::from_millis(300)).await;
            tx.send("late.ts").unwrap();
        });

        let first = next_batch(&mut rx, Duration::from_millis(100)).await.unwrap();
        assert_eq!(first.into_iter().collect::<Vec<_>>(), vec!["a.ts", "b.ts", "c.ts"]);

        let second = next_batch(&mut rx, Duration::from_millis(100)).await.unwrap();
        assert_eq!(second.into_iter().collect::<Vec<_>>(), vec!["late.ts"]);

        sender.await.unwrap();
        assert!(next_batch(&mut rx, Duration::from_millis(10)).await.is_none());
    }
}
