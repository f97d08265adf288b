//! Relationship inference between extracted resources
//!
//! A rule table keyed by kind produces typed edges. References that do not
//! resolve to a synthesized resource are dropped: operator-injected secrets
//! and pre-existing objects are common and must not fail the pass.

use super::resources::ResourceSet;
use super::walker::TreeIndex;
use crate::models::{
    ApiObject, ConstructTree, RelationshipSet, RelationshipType, ResourceKind, ResourceNode,
    api_object::api_group_of,
};
use k8s_openapi::api::core::v1::Service;
use k8s_openapi::api::networking::v1::{Ingress, IngressBackend};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

/// Run every rule over the resource set
pub fn analyze_relationships(
    tree: &ConstructTree,
    index: &TreeIndex,
    resources: &ResourceSet,
) -> RelationshipSet {
    let mut relationships = RelationshipSet::new();

    for resource in resources.as_slice() {
        match ResourceKind::parse_optional(resource.kind()) {
            Some(ResourceKind::Service) => {
                service_selector_edges(resource, resources, &mut relationships)
            }
            Some(kind) if kind.is_pod_workload() || kind.is_catalog_workload() => {
                workload_reference_edges(resource, resources, &mut relationships)
            }
            Some(ResourceKind::Ingress) => {
                ingress_backend_edges(resource, resources, &mut relationships)
            }
            // ConfigMaps and Secrets are only ever referenced
            _ => {}
        }
    }

    construct_parent_edges(tree, index, resources, &mut relationships);
    chart_dependency_edges(tree, index, resources, &mut relationships);
    namespace_membership_edges(resources, &mut relationships);
    crd_instance_edges(resources, &mut relationships);

    tracing::debug!("Inferred {} relationships", relationships.len());
    relationships
}

/// Pod template labels of a workload
pub fn pod_template_labels(object: &ApiObject) -> BTreeMap<String, String> {
    pod_template(object)
        .and_then(|template| template.get("metadata").cloned())
        .and_then(|meta| serde_json::from_value::<ObjectMeta>(meta).ok())
        .and_then(|meta| meta.labels)
        .unwrap_or_default()
}

/// Selector of a Service (empty when unset)
pub fn service_selector(object: &ApiObject) -> BTreeMap<String, String> {
    object
        .typed::<Service>()
        .and_then(|svc| svc.spec)
        .and_then(|spec| spec.selector)
        .unwrap_or_default()
}

/// True when every selector pair is present in the labels
pub fn selector_matches(
    selector: &BTreeMap<String, String>,
    labels: &BTreeMap<String, String>,
) -> bool {
    selector
        .iter()
        .all(|(key, value)| labels.get(key) == Some(value))
}

fn pod_template(object: &ApiObject) -> Option<&Value> {
    let spec = object.spec()?;
    if object.kind() == ResourceKind::CronJob.as_str() {
        spec.get("jobTemplate")?.get("spec")?.get("template")
    } else {
        spec.get("template")
    }
}

fn service_selector_edges(
    service: &ResourceNode,
    resources: &ResourceSet,
    relationships: &mut RelationshipSet,
) {
    let selector = service_selector(&service.api_object);
    // An empty selector would vacuously match everything
    if selector.is_empty() {
        return;
    }

    for workload in resources.as_slice() {
        let is_workload = ResourceKind::parse_optional(workload.kind())
            .map(|k| k.is_pod_workload())
            .unwrap_or(false);
        if !is_workload {
            continue;
        }
        let labels = pod_template_labels(&workload.api_object);
        if selector_matches(&selector, &labels) {
            relationships.add(&service.id, &workload.id, RelationshipType::LabelSelector);
        }
    }
}

/// A reference from a pod template to a named object
#[derive(Debug, Clone, PartialEq, Eq)]
struct PodReference {
    kind: ResourceKind,
    name: String,
}

fn workload_reference_edges(
    workload: &ResourceNode,
    resources: &ResourceSet,
    relationships: &mut RelationshipSet,
) {
    let Some(pod_spec) = pod_template(&workload.api_object).and_then(|t| t.get("spec")) else {
        return;
    };

    let namespace = workload.namespace();
    for reference in pod_references(pod_spec) {
        let relationship_type = match reference.kind {
            ResourceKind::ConfigMap => RelationshipType::ConfigmapReference,
            ResourceKind::Secret => RelationshipType::SecretReference,
            ResourceKind::PersistentVolumeClaim => RelationshipType::PvcReference,
            _ => continue,
        };
        match resources.find(reference.kind.as_str(), &reference.name, namespace) {
            Some(target) => {
                relationships.add(&workload.id, &target.id, relationship_type);
            }
            None => tracing::debug!(
                "Unresolved {} reference '{}' from {}",
                reference.kind,
                reference.name,
                workload.id
            ),
        }
    }
}

fn pod_references(pod_spec: &Value) -> Vec<PodReference> {
    let mut refs = Vec::new();
    let mut push = |kind: ResourceKind, name: Option<&Value>| {
        if let Some(name) = name.and_then(|n| n.as_str()).filter(|n| !n.is_empty()) {
            let reference = PodReference {
                kind,
                name: name.to_string(),
            };
            if !refs.contains(&reference) {
                refs.push(reference);
            }
        }
    };

    for list in ["containers", "initContainers"] {
        let containers = pod_spec.get(list).and_then(|c| c.as_array());
        for container in containers.into_iter().flatten() {
            for env in array_at(container, "env") {
                if let Some(source) = env.get("valueFrom") {
                    if let Some(cm) = source.get("configMapKeyRef") {
                        push(ResourceKind::ConfigMap, cm.get("name"));
                    }
                    if let Some(secret) = source.get("secretKeyRef") {
                        push(ResourceKind::Secret, secret.get("name"));
                    }
                }
            }
            for env_from in array_at(container, "envFrom") {
                if let Some(cm) = env_from.get("configMapRef") {
                    push(ResourceKind::ConfigMap, cm.get("name"));
                }
                if let Some(secret) = env_from.get("secretRef") {
                    push(ResourceKind::Secret, secret.get("name"));
                }
            }
        }
    }

    for volume in array_at(pod_spec, "volumes") {
        if let Some(cm) = volume.get("configMap") {
            push(ResourceKind::ConfigMap, cm.get("name"));
        }
        if let Some(secret) = volume.get("secret") {
            push(ResourceKind::Secret, secret.get("secretName"));
        }
        if let Some(pvc) = volume.get("persistentVolumeClaim") {
            push(ResourceKind::PersistentVolumeClaim, pvc.get("claimName"));
        }
    }

    refs
}

fn array_at<'a>(value: &'a Value, key: &str) -> impl Iterator<Item = &'a Value> {
    value
        .get(key)
        .and_then(|v| v.as_array())
        .into_iter()
        .flatten()
}

fn ingress_backend_edges(
    ingress: &ResourceNode,
    resources: &ResourceSet,
    relationships: &mut RelationshipSet,
) {
    let Some(spec) = ingress.api_object.typed::<Ingress>().and_then(|i| i.spec) else {
        return;
    };

    let mut backends: Vec<IngressBackend> = spec.default_backend.into_iter().collect();
    for rule in spec.rules.unwrap_or_default() {
        if let Some(http) = rule.http {
            backends.extend(http.paths.into_iter().map(|p| p.backend));
        }
    }

    let namespace = ingress.namespace();
    for backend in backends {
        let Some(service) = backend.service else {
            continue;
        };
        if let Some(target) = resources.find(ResourceKind::Service.as_str(), &service.name, namespace)
        {
            relationships.add(&ingress.id, &target.id, RelationshipType::IngressBackend);
        }
    }
}

/// Edge from each resource to its nearest resource ancestor within its chart
fn construct_parent_edges(
    tree: &ConstructTree,
    index: &TreeIndex,
    resources: &ResourceSet,
    relationships: &mut RelationshipSet,
) {
    for (node, resource) in resources.iter_with_nodes() {
        let mut current = tree.scope(node);
        while let Some(ancestor) = current {
            if index.is_chart(ancestor) {
                break;
            }
            if let Some(parent) = resources.for_node(ancestor) {
                relationships.add(&resource.id, &parent.id, RelationshipType::ConstructParent);
                break;
            }
            current = tree.scope(ancestor);
        }
    }
}

/// Chart-level dependencies fanned out to every resource pair
fn chart_dependency_edges(
    tree: &ConstructTree,
    index: &TreeIndex,
    resources: &ResourceSet,
    relationships: &mut RelationshipSet,
) {
    let mut by_chart: HashMap<&str, Vec<&str>> = HashMap::new();
    for resource in resources.as_slice() {
        by_chart
            .entry(resource.chart_id.as_str())
            .or_default()
            .push(resource.id.as_str());
    }

    for (chart_id, &chart_node) in &index.charts {
        let Some(sources) = by_chart.get(chart_id.as_str()) else {
            continue;
        };
        for dependency in &tree.node(chart_node).chart_dependencies {
            let Some(targets) = by_chart.get(dependency.as_str()) else {
                tracing::debug!(
                    "Chart {} depends on {} which has no resources",
                    chart_id,
                    dependency
                );
                continue;
            };
            for source in sources {
                for target in targets {
                    relationships.add(source, target, RelationshipType::ChartDependency);
                }
            }
        }
    }
}

fn namespace_membership_edges(resources: &ResourceSet, relationships: &mut RelationshipSet) {
    let namespaces: HashMap<&str, &str> = resources
        .as_slice()
        .iter()
        .filter(|r| r.kind() == ResourceKind::Namespace.as_str())
        .map(|r| (r.name(), r.id.as_str()))
        .collect();
    if namespaces.is_empty() {
        return;
    }

    for resource in resources.as_slice() {
        if resource.kind() == ResourceKind::Namespace.as_str() {
            continue;
        }
        let Some(ns) = resource.api_object.namespace() else {
            continue;
        };
        if let Some(ns_id) = namespaces.get(ns) {
            relationships.add(&resource.id, ns_id, RelationshipType::NamespaceMembership);
        }
    }
}

fn crd_instance_edges(resources: &ResourceSet, relationships: &mut RelationshipSet) {
    let mut definitions: HashMap<(String, String), &str> = HashMap::new();
    for crd in resources
        .as_slice()
        .iter()
        .filter(|r| r.kind() == ResourceKind::CustomResourceDefinition.as_str())
    {
        let Some(spec) = crd.api_object.spec() else {
            continue;
        };
        let group = spec.get("group").and_then(|g| g.as_str());
        let kind = spec
            .get("names")
            .and_then(|n| n.get("kind"))
            .and_then(|k| k.as_str());
        if let (Some(group), Some(kind)) = (group, kind) {
            definitions.insert((group.to_string(), kind.to_string()), crd.id.as_str());
        }
    }
    if definitions.is_empty() {
        return;
    }

    for resource in resources.as_slice() {
        let key = (
            api_group_of(resource.api_version()).to_string(),
            resource.kind().to_string(),
        );
        if let Some(crd_id) = definitions.get(&key) {
            relationships.add(&resource.id, crd_id, RelationshipType::CrdInstanceOf);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_selector_superset_and_subset() {
        let selector = labels(&[("app", "x"), ("tier", "web")]);
        assert!(selector_matches(
            &selector,
            &labels(&[("app", "x"), ("tier", "web"), ("extra", "1")])
        ));
        assert!(!selector_matches(&selector, &labels(&[("app", "x")])));
        assert!(!selector_matches(
            &selector,
            &labels(&[("app", "y"), ("tier", "web")])
        ));
    }

    #[test]
    fn test_pod_references_collects_env_and_volumes() {
        let spec = json!({
            "containers": [{
                "name": "app",
                "env": [
                    {"name": "A", "valueFrom": {"configMapKeyRef": {"name": "cfg", "key": "a"}}},
                    {"name": "B", "valueFrom": {"secretKeyRef": {"name": "creds", "key": "b"}}},
                    {"name": "C", "value": "plain"}
                ],
                "envFrom": [{"configMapRef": {"name": "cfg"}}]
            }],
            "volumes": [
                {"name": "data", "persistentVolumeClaim": {"claimName": "data"}},
                {"name": "tls", "secret": {"secretName": "tls"}}
            ]
        });
        let refs = pod_references(&spec);
        assert_eq!(refs.len(), 4);
        assert!(refs.contains(&PodReference {
            kind: ResourceKind::PersistentVolumeClaim,
            name: "data".to_string()
        }));
    }

    #[test]
    fn test_cron_job_template_location() {
        let obj = ApiObject::new(json!({
            "apiVersion": "batch/v1",
            "kind": "CronJob",
            "metadata": {"name": "nightly"},
            "spec": {"jobTemplate": {"spec": {"template": {"metadata": {"labels": {"job": "nightly"}}}}}}
        }));
        assert_eq!(pod_template_labels(&obj), labels(&[("job", "nightly")]));
    }
}
