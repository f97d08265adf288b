//! ArgoCD ownership resolution
//!
//! Applications point at a synthesized manifest through a directory include
//! pattern such as `[0-9][0-9][0-9][0-9]-backstage.k8s.yaml`. The captured
//! chart name ties every resource of that chart to the Application.

use crate::models::{RelationshipSet, RelationshipType, ResourceNode};
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// apiVersion of the deployment Application type
pub const APPLICATION_API_VERSION: &str = "argoproj.io/v1alpha1";
/// kind of the deployment Application type
pub const APPLICATION_KIND: &str = "Application";

fn include_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        // Four placeholders: a digit, a [0-9] class, `?` or `*`
        Regex::new(r"^(?:\[0-9\]|\d|\?|\*){4}-(?P<chart>[A-Za-z0-9][A-Za-z0-9._-]*?)\.k8s\.yaml$")
            .expect("static regex is valid")
    })
}

/// Chart name captured by an include pattern
pub fn chart_from_include(include: &str) -> Option<String> {
    include_pattern()
        .captures(include.trim())
        .map(|caps| caps["chart"].to_string())
}

/// True for resources of the deployment Application type
pub fn is_application(resource: &ResourceNode) -> bool {
    resource.api_version() == APPLICATION_API_VERSION && resource.kind() == APPLICATION_KIND
}

/// Include patterns of an Application (single and multi-source)
fn include_patterns(spec: &Value) -> Vec<&str> {
    let mut patterns = Vec::new();
    let single = spec.get("source").into_iter();
    let multi = spec
        .get("sources")
        .and_then(|s| s.as_array())
        .into_iter()
        .flatten();
    for source in single.chain(multi) {
        if let Some(include) = source
            .get("directory")
            .and_then(|d| d.get("include"))
            .and_then(|i| i.as_str())
        {
            patterns.push(include);
        }
    }
    patterns
}

/// Chart name -> (application name, application resource id)
pub fn application_owners(resources: &[ResourceNode]) -> BTreeMap<String, (String, String)> {
    let mut owners = BTreeMap::new();
    for app in resources.iter().filter(|r| is_application(r)) {
        let Some(spec) = app.api_object.spec() else {
            continue;
        };
        for include in include_patterns(spec) {
            match chart_from_include(include) {
                Some(chart) => {
                    tracing::debug!("Application {} deploys chart {}", app.name(), chart);
                    owners
                        .entry(chart)
                        .or_insert_with(|| (app.name().to_string(), app.id.clone()));
                }
                None => tracing::debug!(
                    "Include pattern '{}' of {} does not name a chart",
                    include,
                    app.name()
                ),
            }
        }
    }
    owners
}

/// Tag resources with their owning Application and add ownership edges
///
/// Resources of charts no Application references stay untagged.
pub fn resolve_argocd_ownership(
    resources: Vec<ResourceNode>,
    relationships: RelationshipSet,
) -> (Vec<ResourceNode>, RelationshipSet) {
    let owners = application_owners(&resources);
    let mut relationships = relationships;

    let resources: Vec<ResourceNode> = resources
        .into_iter()
        .map(|mut resource| {
            if let Some((app_name, app_id)) = owners.get(&resource.chart_id) {
                resource.argocd_app = Some(app_name.clone());
                if &resource.id != app_id {
                    relationships.add(
                        &resource.id,
                        app_id,
                        RelationshipType::ArgocdApplicationOwns,
                    );
                }
            }
            resource
        })
        .collect();

    tracing::debug!(
        "Resolved {} Application-owned charts",
        owners.len()
    );
    (resources, relationships)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_include_pattern_variants() {
        assert_eq!(
            chart_from_include("[0-9][0-9][0-9][0-9]-backstage.k8s.yaml"),
            Some("backstage".to_string())
        );
        assert_eq!(
            chart_from_include("0007-external-secrets.k8s.yaml"),
            Some("external-secrets".to_string())
        );
        assert_eq!(
            chart_from_include("????-nextjs.k8s.yaml"),
            Some("nextjs".to_string())
        );
        assert_eq!(chart_from_include("*.yaml"), None);
        assert_eq!(chart_from_include("000-short.k8s.yaml"), None);
    }

    #[test]
    fn test_include_patterns_multi_source() {
        let spec = serde_json::json!({
            "sources": [
                {"directory": {"include": "0001-a.k8s.yaml"}},
                {"repoURL": "https://example.invalid/charts"}
            ]
        });
        assert_eq!(include_patterns(&spec), vec!["0001-a.k8s.yaml"]);
    }
}
