//! Changed files from git

use super::{SelectionError, SelectionResult};
use std::path::Path;
use std::process::Command;

/// Files changed between `reference` and the working tree, relative to the repository root
pub fn changed_files_since(repo: &Path, reference: &str) -> SelectionResult<Vec<String>> {
    let output = Command::new("git")
        .arg("diff")
        .arg("--name-only")
        .arg(reference)
        .current_dir(repo)
        .output()
        .map_err(SelectionError::GitSpawn)?;

    if !output.status.success() {
        return Err(SelectionError::GitDiff {
            reference: reference.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    let files: Vec<String> = String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect();
    tracing::debug!("{} files changed since {}", files.len(), reference);
    Ok(files)
}
