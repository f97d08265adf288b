//! Display label selector derivation
//!
//! The selector only feeds the `backstage.io/kubernetes-label-selector`
//! annotation; relationship inference never reads it.

use crate::extract::relationships::service_selector;
use crate::models::{ResourceKind, ResourceNode};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use std::collections::BTreeMap;

/// Label keys consulted in priority order
pub const WELL_KNOWN_LABELS: &[&str] = &[
    "app.kubernetes.io/name",
    "app.kubernetes.io/instance",
    "app",
    "component",
    "name",
];

/// Derive `key=value[,key=value]` for a resource
pub fn label_selector(resource: &ResourceNode) -> String {
    let from_spec = spec_selector(resource);
    if !from_spec.is_empty() {
        return format_selector(&from_spec);
    }

    let labels = resource.api_object.labels();
    for key in WELL_KNOWN_LABELS {
        if let Some(value) = labels.get(*key) {
            return format!("{}={}", key, value);
        }
    }

    let name = resource.name();
    let stripped = match ResourceKind::parse_optional(resource.kind()) {
        Some(ResourceKind::Deployment) => name.strip_suffix("-deployment"),
        Some(ResourceKind::Service) => name.strip_suffix("-service"),
        _ => None,
    };
    match stripped {
        Some(base) if !base.is_empty() => format!("app={}", base),
        _ => format!("app={}", name),
    }
}

fn spec_selector(resource: &ResourceNode) -> BTreeMap<String, String> {
    match ResourceKind::parse_optional(resource.kind()) {
        Some(ResourceKind::Service) => service_selector(&resource.api_object),
        Some(kind) if kind.is_pod_workload() => resource
            .api_object
            .spec()
            .and_then(|spec| spec.get("selector").cloned())
            .and_then(|sel| serde_json::from_value::<LabelSelector>(sel).ok())
            .and_then(|sel| sel.match_labels)
            .unwrap_or_default(),
        _ => BTreeMap::new(),
    }
}

fn format_selector(selector: &BTreeMap<String, String>) -> String {
    selector
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(",")
}
