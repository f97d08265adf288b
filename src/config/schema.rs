//! Configuration schema definitions
//!
//! Defines the structure of configuration files using serde for serialization.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Catalog generation settings
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Static analysis and dependency graph settings
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Parallel synthesis settings
    #[serde(default)]
    pub synthesis: SynthesisConfig,
}

/// Catalog generation configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CatalogConfig {
    /// Owning group of every generated entity
    #[serde(default = "default_owner")]
    pub owner: String,

    /// Lifecycle stamped on components and resources
    #[serde(default = "default_lifecycle")]
    pub lifecycle: String,

    /// Emit one Resource entity per observed (apiVersion, kind)
    #[serde(default = "default_true")]
    pub include_crd_entities: bool,

    /// Emit one Component entity per chart
    #[serde(default = "default_true")]
    pub include_chart_entities: bool,

    /// Namespace -> System name; unmapped namespaces use `{namespace}-resources`
    #[serde(default = "default_namespace_systems")]
    pub namespace_systems: BTreeMap<String, String>,

    /// Namespaces whose Services and Ingresses are promoted to Components
    #[serde(default = "default_application_namespaces")]
    pub application_namespaces: Vec<String>,

    /// Resource names always promoted to Components
    #[serde(default = "default_critical_resources")]
    pub critical_resources: Vec<String>,

    /// API group markers identifying core (non-custom) resource types
    #[serde(default = "default_core_api_markers")]
    pub core_api_markers: Vec<String>,

    /// ArgoCD UI base URL used for application links
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub argocd_url: Option<String>,
}

/// Static analysis configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisConfig {
    /// Directories searched recursively for chart sources
    #[serde(default = "default_source_dirs")]
    pub source_dirs: Vec<String>,

    /// Entry point wiring charts together
    #[serde(default = "default_entry_point")]
    pub entry_point: String,

    /// Persisted dependency graph location
    #[serde(default = "default_graph_file")]
    pub graph_file: String,
}

/// Synthesis scheduling configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SynthesisConfig {
    /// Program and arguments run once per chart group
    #[serde(default = "default_command")]
    pub command: Vec<String>,

    /// Maximum groups running at once within a level
    #[serde(default = "default_max_parallel")]
    pub max_parallel: usize,

    /// Quiet period before a watch-triggered rebuild
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Directory holding synthesized manifests
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
}

// Default value functions
fn default_true() -> bool {
    true
}

fn default_owner() -> String {
    "platform-team".to_string()
}

fn default_lifecycle() -> String {
    "production".to_string()
}

fn default_namespace_systems() -> BTreeMap<String, String> {
    [
        ("backstage", "developer-portal"),
        ("nextjs", "chat-application"),
        ("kargo", "gitops-promotion"),
        ("argocd", "gitops-delivery"),
        ("external-secrets", "secret-management"),
        ("vcluster", "virtual-clusters"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

fn default_application_namespaces() -> Vec<String> {
    vec!["backstage".to_string(), "nextjs".to_string()]
}

fn default_critical_resources() -> Vec<String> {
    vec![
        "backstage".to_string(),
        "nextjs".to_string(),
        "postgres".to_string(),
    ]
}

fn default_core_api_markers() -> Vec<String> {
    [
        "k8s.io",
        "apps",
        "batch",
        "policy",
        "autoscaling",
        "coordination.k8s.io",
        "discovery.k8s.io",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_source_dirs() -> Vec<String> {
    vec!["charts".to_string(), "lib".to_string()]
}

fn default_entry_point() -> String {
    "main.ts".to_string()
}

fn default_graph_file() -> String {
    ".chart-graph.json".to_string()
}

fn default_command() -> Vec<String> {
    vec![
        "npx".to_string(),
        "ts-node".to_string(),
        "main-selective.ts".to_string(),
    ]
}

fn default_max_parallel() -> usize {
    4
}

fn default_debounce_ms() -> u64 {
    500
}

fn default_output_dir() -> String {
    "dist".to_string()
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            owner: default_owner(),
            lifecycle: default_lifecycle(),
            include_crd_entities: default_true(),
            include_chart_entities: default_true(),
            namespace_systems: default_namespace_systems(),
            application_namespaces: default_application_namespaces(),
            critical_resources: default_critical_resources(),
            core_api_markers: default_core_api_markers(),
            argocd_url: None,
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            source_dirs: default_source_dirs(),
            entry_point: default_entry_point(),
            graph_file: default_graph_file(),
        }
    }
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            command: default_command(),
            max_parallel: default_max_parallel(),
            debounce_ms: default_debounce_ms(),
            output_dir: default_output_dir(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = Config::default();
        assert_eq!(config.catalog.owner, "platform-team");
        assert!(config.catalog.include_crd_entities);
        assert_eq!(config.analysis.source_dirs, vec!["charts", "lib"]);
        assert_eq!(config.synthesis.max_parallel, 4);
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        assert!(yaml.contains("namespaceSystems"));
        assert!(yaml.contains("graphFile"));
        assert!(!yaml.contains("argocdUrl"));
    }

    #[test]
    fn test_config_deserialization() {
        let yaml = r#"
catalog:
  owner: sre
  includeCrdEntities: false
synthesis:
  maxParallel: 8
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.catalog.owner, "sre");
        assert!(!config.catalog.include_crd_entities);
        assert!(config.catalog.include_chart_entities);
        assert_eq!(config.synthesis.max_parallel, 8);
        assert_eq!(config.analysis.entry_point, "main.ts");
    }
}
