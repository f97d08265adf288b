//! Chart source discovery

use super::chart::{AnalyzedChart, ChartAnalyzer};
use super::{AnalysisError, AnalysisResult};
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Directories never descended into
const SKIPPED_DIRS: &[&str] = &["node_modules", ".git", "dist", "cdk8s.out"];

/// `backstage-chart.ts` or `BackstageChart.ts`
pub fn is_chart_file(file_name: &str) -> bool {
    if file_name.ends_with(".d.ts") {
        return false;
    }
    file_name.ends_with("-chart.ts") || file_name.ends_with("Chart.ts")
}

fn is_skipped(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| SKIPPED_DIRS.contains(&name))
}

/// Chart files under `root/<dir>` for each configured dir, sorted
///
/// Missing directories are skipped.
pub fn discover_chart_files(root: &Path, source_dirs: &[String]) -> AnalysisResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    for dir in source_dirs {
        let dir_path = root.join(dir);
        if !dir_path.is_dir() {
            tracing::debug!("Source directory {} not found, skipping", dir_path.display());
            continue;
        }
        for entry in WalkDir::new(&dir_path)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| !is_skipped(e))
        {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            if entry.file_name().to_str().is_some_and(is_chart_file) {
                files.push(entry.into_path());
            }
        }
    }
    files.sort();
    files.dedup();
    Ok(files)
}

/// `/`-separated path relative to `root`
pub fn relative_path(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Discover and analyze every chart source under `root`
///
/// Files without a chart class contribute nothing; unreadable files are
/// logged and skipped.
pub fn analyze_directory(
    analyzer: &mut ChartAnalyzer,
    root: &Path,
    source_dirs: &[String],
) -> AnalysisResult<Vec<AnalyzedChart>> {
    let files = discover_chart_files(root, source_dirs)?;
    let mut charts = Vec::new();
    for file in &files {
        let source = match std::fs::read_to_string(file) {
            Ok(source) => source,
            Err(e) => {
                let err = AnalysisError::Read {
                    path: file.display().to_string(),
                    source: e,
                };
                tracing::warn!("{}", err);
                continue;
            }
        };
        let relative = relative_path(root, file);
        match analyzer.analyze_source(&relative, &source) {
            Some(chart) => charts.push(chart),
            None => tracing::debug!("No chart class in {}", relative),
        }
    }
    tracing::info!("Analyzed {} charts from {} files", charts.len(), files.len());
    Ok(charts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_is_chart_file() {
        assert!(is_chart_file("backstage-chart.ts"));
        assert!(is_chart_file("BackstageChart.ts"));
        assert!(!is_chart_file("chart-utils.ts"));
        assert!(!is_chart_file("types-chart.d.ts"));
    }

    #[test]
    fn test_discovery_walks_recursively_and_skips_node_modules() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("charts/apps")).unwrap();
        fs::create_dir_all(root.join("lib/node_modules/x")).unwrap();
        fs::write(root.join("charts/apps/web-chart.ts"), "").unwrap();
        fs::write(root.join("charts/helpers.ts"), "").unwrap();
        fs::write(root.join("lib/BaseChart.ts"), "").unwrap();
        fs::write(root.join("lib/node_modules/x/dep-chart.ts"), "").unwrap();

        let files = discover_chart_files(root, &["charts".to_string(), "lib".to_string(), "missing".to_string()]).unwrap();
        let rel: Vec<String> = files.iter().map(|f| relative_path(root, f)).collect();
        assert_eq!(rel, vec!["charts/apps/web-chart.ts", "lib/BaseChart.ts"]);
    }

    #[test]
    fn test_analyze_directory_skips_non_charts() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("charts")).unwrap();
        fs::write(
            root.join("charts/web-chart.ts"),
            "export class WebChart extends Chart { constructor(s: Construct, id: string) { super(s, id); } }",
        )
        .unwrap();
        fs::write(root.join("charts/broken-chart.ts"), "export const x = ;").unwrap();

        let mut analyzer = ChartAnalyzer::new().unwrap();
        let charts = analyze_directory(&mut analyzer, root, &["charts".to_string()]).unwrap();
        assert_eq!(charts.len(), 1);
        assert_eq!(charts[0].class_name, "WebChart");
        assert_eq!(charts[0].file_path, "charts/web-chart.ts");
    }
}
