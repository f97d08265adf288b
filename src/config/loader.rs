//! Configuration loading and merging logic
//!
//! Handles loading configuration from multiple sources and merging them
//! according to precedence rules.

use super::{paths, schema::Config};
use anyhow::{Context, Result};
use serde_yaml::Value;
use std::path::Path;

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with all layers merged, relative to the working directory
    pub fn load(explicit: Option<&Path>) -> Result<Config> {
        let cwd = std::env::current_dir().context("Failed to resolve working directory")?;
        Self::load_layers(&paths::user_config_path(), &cwd, explicit)
    }

    /// Load and merge every layer
    ///
    /// Precedence order (highest to lowest):
    /// 1. Environment variable overrides
    /// 2. `explicit` file, or `chartscope.yaml` in `project_dir`
    /// 3. User config file
    /// 4. Built-in defaults
    ///
    /// Files only override the keys they set.
    pub fn load_layers(user_path: &Path, project_dir: &Path, explicit: Option<&Path>) -> Result<Config> {
        let mut merged =
            serde_yaml::to_value(Config::default()).context("Failed to serialize defaults")?;

        if user_path.exists() {
            match Self::load_value(user_path) {
                Ok(user) => merge_values(&mut merged, user),
                Err(e) => tracing::warn!("Ignoring user config: {:#}", e),
            }
        }

        match explicit {
            Some(path) => {
                if !path.exists() {
                    anyhow::bail!("Config file not found: {}", path.display());
                }
                merge_values(&mut merged, Self::load_value(path)?);
            }
            None => {
                let project = paths::project_config_path(project_dir);
                if project.exists() {
                    tracing::debug!("Using project config {}", project.display());
                    merge_values(&mut merged, Self::load_value(&project)?);
                }
            }
        }

        let config: Config =
            serde_yaml::from_value(merged).context("Failed to apply configuration layers")?;
        Ok(Self::apply_overrides(config, |key| std::env::var(key).ok()))
    }

    fn load_value(path: &Path) -> Result<Value> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let value: Value = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(value)
    }

    /// Load configuration from a single file
    pub fn load_file(path: &Path) -> Result<Config> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Validate every config file that would be loaded, then the merged result
    pub fn validate(explicit: Option<&Path>) -> Result<()> {
        let cwd = std::env::current_dir().context("Failed to resolve working directory")?;
        let project = paths::project_config_path(&cwd);
        let candidates = [
            Some(paths::user_config_path()),
            Some(explicit.map(Path::to_path_buf).unwrap_or(project)),
        ];
        for path in candidates.into_iter().flatten().filter(|p| p.exists()) {
            let config = Self::load_file(&path)?;
            validate_config(&config)
                .with_context(|| format!("Invalid configuration in {}", path.display()))?;
        }

        let merged = Self::load(explicit).context("Failed to load merged configuration")?;
        validate_config(&merged)
    }

    /// Apply `CHARTSCOPE_*` overrides looked up through `lookup`
    pub fn apply_overrides<F>(mut config: Config, lookup: F) -> Config
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(owner) = lookup("CHARTSCOPE_OWNER") {
            config.catalog.owner = owner;
        }

        if let Some(graph_file) = lookup("CHARTSCOPE_GRAPH_FILE") {
            config.analysis.graph_file = graph_file;
        }

        if let Some(max_parallel) = lookup("CHARTSCOPE_MAX_PARALLEL") {
            match max_parallel.parse() {
                Ok(value) => config.synthesis.max_parallel = value,
                Err(_) => tracing::warn!("Ignoring invalid CHARTSCOPE_MAX_PARALLEL={}", max_parallel),
            }
        }

        if let Some(debounce) = lookup("CHARTSCOPE_DEBOUNCE_MS") {
            match debounce.parse() {
                Ok(value) => config.synthesis.debounce_ms = value,
                Err(_) => tracing::warn!("Ignoring invalid CHARTSCOPE_DEBOUNCE_MS={}", debounce),
            }
        }

        config
    }

    /// Save configuration to a file
    pub fn save(config: &Config, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            paths::ensure_dir(parent)?;
        }

        let yaml =
            serde_yaml::to_string(config).context("Failed to serialize configuration to YAML")?;

        std::fs::write(path, yaml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }
}

/// Semantic checks serde cannot express
pub fn validate_config(config: &Config) -> Result<()> {
    if config.synthesis.command.is_empty() {
        anyhow::bail!("synthesis.command must not be empty");
    }
    if config.synthesis.max_parallel == 0 {
        anyhow::bail!("synthesis.maxParallel must be at least 1");
    }
    if config.analysis.source_dirs.is_empty() {
        anyhow::bail!("analysis.sourceDirs must list at least one directory");
    }
    if config.catalog.owner.trim().is_empty() {
        anyhow::bail!("catalog.owner must not be empty");
    }
    Ok(())
}

/// Recursively overlay `overlay` onto `base`; mappings merge, everything else replaces
fn merge_values(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Mapping(base_map), Value::Mapping(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        // An empty file parses as null and changes nothing
        (_, Value::Null) => {}
        (base, overlay) => *base = overlay,
    }
}
