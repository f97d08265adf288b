//! Configuration system for chartscope
//!
//! Layered YAML configuration: built-in defaults, the user config file,
//! the project `chartscope.yaml` and `CHARTSCOPE_*` environment overrides.

pub mod loader;
pub mod paths;
pub mod schema;

pub use loader::{ConfigLoader, validate_config};
pub use schema::{AnalysisConfig, CatalogConfig, Config, SynthesisConfig};

use anyhow::Context;

fn parse_list(value: &str, key: &str) -> anyhow::Result<Vec<String>> {
    if value.trim_start().starts_with('[') {
        serde_yaml::from_str(value)
            .with_context(|| format!("{} must be a YAML array (e.g., ['a', 'b'])", key))
    } else {
        Ok(value
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect())
    }
}

fn to_yaml<T: serde::Serialize>(value: &T, key: &str) -> anyhow::Result<String> {
    serde_yaml::to_string(value).map_err(|e| anyhow::anyhow!("Failed to serialize {}: {}", key, e))
}

/// Get a configuration value by key (dot notation)
pub fn get_config_value(config: &Config, key: &str) -> anyhow::Result<String> {
    if let Some(namespace) = key.strip_prefix("catalog.namespaceSystems.") {
        return config
            .catalog
            .namespace_systems
            .get(namespace)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("No system mapped for namespace: {}", namespace));
    }
    match key {
        "catalog.owner" => Ok(config.catalog.owner.clone()),
        "catalog.lifecycle" => Ok(config.catalog.lifecycle.clone()),
        "catalog.includeCrdEntities" => Ok(config.catalog.include_crd_entities.to_string()),
        "catalog.includeChartEntities" => Ok(config.catalog.include_chart_entities.to_string()),
        "catalog.argocdUrl" => Ok(config.catalog.argocd_url.clone().unwrap_or_default()),
        "catalog.namespaceSystems" => to_yaml(&config.catalog.namespace_systems, key),
        "catalog.applicationNamespaces" => to_yaml(&config.catalog.application_namespaces, key),
        "catalog.criticalResources" => to_yaml(&config.catalog.critical_resources, key),
        "catalog.coreApiMarkers" => to_yaml(&config.catalog.core_api_markers, key),
        "analysis.sourceDirs" => to_yaml(&config.analysis.source_dirs, key),
        "analysis.entryPoint" => Ok(config.analysis.entry_point.clone()),
        "analysis.graphFile" => Ok(config.analysis.graph_file.clone()),
        "synthesis.command" => Ok(config.synthesis.command.join(" ")),
        "synthesis.maxParallel" => Ok(config.synthesis.max_parallel.to_string()),
        "synthesis.debounceMs" => Ok(config.synthesis.debounce_ms.to_string()),
        "synthesis.outputDir" => Ok(config.synthesis.output_dir.clone()),
        _ => Err(anyhow::anyhow!("Unknown configuration key: {}", key)),
    }
}

/// Set a configuration value by key (dot notation)
pub fn set_config_value(config: &mut Config, key: &str, value: &str) -> anyhow::Result<()> {
    if let Some(namespace) = key.strip_prefix("catalog.namespaceSystems.") {
        if value.is_empty() {
            config.catalog.namespace_systems.remove(namespace);
        } else {
            config
                .catalog
                .namespace_systems
                .insert(namespace.to_string(), value.to_string());
        }
        return Ok(());
    }
    match key {
        "catalog.owner" => {
            config.catalog.owner = value.to_string();
        }
        "catalog.lifecycle" => {
            config.catalog.lifecycle = value.to_string();
        }
        "catalog.includeCrdEntities" => {
            config.catalog.include_crd_entities = value
                .parse()
                .context("catalog.includeCrdEntities must be 'true' or 'false'")?;
        }
        "catalog.includeChartEntities" => {
            config.catalog.include_chart_entities = value
                .parse()
                .context("catalog.includeChartEntities must be 'true' or 'false'")?;
        }
        "catalog.argocdUrl" => {
            config.catalog.argocd_url = if value.is_empty() {
                None
            } else {
                Some(value.trim_end_matches('/').to_string())
            };
        }
        "catalog.applicationNamespaces" => {
            config.catalog.application_namespaces = parse_list(value, key)?;
        }
        "catalog.criticalResources" => {
            config.catalog.critical_resources = parse_list(value, key)?;
        }
        "catalog.coreApiMarkers" => {
            config.catalog.core_api_markers = parse_list(value, key)?;
        }
        "analysis.sourceDirs" => {
            config.analysis.source_dirs = parse_list(value, key)?;
        }
        "analysis.entryPoint" => {
            config.analysis.entry_point = value.to_string();
        }
        "analysis.graphFile" => {
            config.analysis.graph_file = value.to_string();
        }
        "synthesis.command" => {
            let command: Vec<String> = if value.trim_start().starts_with('[') {
                parse_list(value, key)?
            } else {
                value.split_whitespace().map(String::from).collect()
            };
            if command.is_empty() {
                return Err(anyhow::anyhow!("synthesis.command must not be empty"));
            }
            config.synthesis.command = command;
        }
        "synthesis.maxParallel" => {
            let max: usize = value
                .parse()
                .context("synthesis.maxParallel must be a number")?;
            if max == 0 {
                return Err(anyhow::anyhow!("synthesis.maxParallel must be at least 1"));
            }
            config.synthesis.max_parallel = max;
        }
        "synthesis.debounceMs" => {
            config.synthesis.debounce_ms = value
                .parse()
                .context("synthesis.debounceMs must be a number")?;
        }
        "synthesis.outputDir" => {
            config.synthesis.output_dir = value.to_string();
        }
        _ => return Err(anyhow::anyhow!("Unknown configuration key: {}", key)),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_set_roundtrip() {
        let mut config = Config::default();
        set_config_value(&mut config, "catalog.owner", "sre").unwrap();
        set_config_value(&mut config, "synthesis.command", "npm run synth").unwrap();
        set_config_value(&mut config, "catalog.applicationNamespaces", "web, api").unwrap();
        set_config_value(&mut config, "catalog.namespaceSystems.web", "storefront").unwrap();

        assert_eq!(get_config_value(&config, "catalog.owner").unwrap(), "sre");
        assert_eq!(config.synthesis.command, vec!["npm", "run", "synth"]);
        assert_eq!(config.catalog.application_namespaces, vec!["web", "api"]);
        assert_eq!(
            get_config_value(&config, "catalog.namespaceSystems.web").unwrap(),
            "storefront"
        );
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = Config::default();
        assert!(set_config_value(&mut config, "synthesis.maxParallel", "0").is_err());
        assert!(set_config_value(&mut config, "catalog.includeCrdEntities", "maybe").is_err());
        assert!(set_config_value(&mut config, "ui.skin", "dark").is_err());
        assert!(get_config_value(&config, "nope").is_err());
    }
}
