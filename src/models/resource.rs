//! Extracted resource records and the relationships between them

use super::api_object::ApiObject;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Chart id used when a resource has no enclosing chart
pub const UNKNOWN_CHART: &str = "unknown";

/// One resource of the construct tree, normalized
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceNode {
    /// `{chartId}/{kind}/{namespace}/{name}`
    pub id: String,
    /// Full tree path, diagnostic only
    pub path: String,
    pub chart_id: String,
    pub construct_type: String,
    pub api_object: ApiObject,
    /// Owning deployment Application, set by the ownership pass
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub argocd_app: Option<String>,
}

impl ResourceNode {
    pub fn kind(&self) -> &str {
        self.api_object.kind()
    }

    pub fn api_version(&self) -> &str {
        self.api_object.api_version()
    }

    pub fn namespace(&self) -> &str {
        self.api_object.namespace_or_default()
    }

    /// `metadata.name`, falling back to the last path segment
    pub fn name(&self) -> &str {
        self.api_object
            .name()
            .unwrap_or_else(|| self.path.rsplit('/').next().unwrap_or(&self.path))
    }
}

/// Build the composite resource id
pub fn resource_id(chart_id: &str, kind: &str, namespace: &str, name: &str) -> String {
    format!("{}/{}/{}/{}", chart_id, kind, namespace, name)
}

/// Type of a relationship edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RelationshipType {
    ServiceSelector,
    ConfigmapReference,
    SecretReference,
    PvcReference,
    IngressBackend,
    LabelSelector,
    NamespaceMembership,
    ChartDependency,
    ConstructParent,
    CrdInstanceOf,
    ArgocdApplicationOwns,
}

impl RelationshipType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationshipType::ServiceSelector => "service-selector",
            RelationshipType::ConfigmapReference => "configmap-reference",
            RelationshipType::SecretReference => "secret-reference",
            RelationshipType::PvcReference => "pvc-reference",
            RelationshipType::IngressBackend => "ingress-backend",
            RelationshipType::LabelSelector => "label-selector",
            RelationshipType::NamespaceMembership => "namespace-membership",
            RelationshipType::ChartDependency => "chart-dependency",
            RelationshipType::ConstructParent => "construct-parent",
            RelationshipType::CrdInstanceOf => "crd-instance-of",
            RelationshipType::ArgocdApplicationOwns => "argocd-application-owns",
        }
    }
}

impl fmt::Display for RelationshipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Directed, typed edge between two resource ids
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRelationship {
    pub source_id: String,
    pub target_id: String,
    #[serde(rename = "type")]
    pub relationship_type: RelationshipType,
}

impl ResourceRelationship {
    pub fn new(source_id: &str, target_id: &str, relationship_type: RelationshipType) -> Self {
        Self {
            source_id: source_id.to_string(),
            target_id: target_id.to_string(),
            relationship_type,
        }
    }
}

/// Insertion-ordered relationship list, deduplicated on the full triple
#[derive(Debug, Clone, Default)]
pub struct RelationshipSet {
    edges: Vec<ResourceRelationship>,
    seen: HashSet<ResourceRelationship>,
}

impl RelationshipSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an edge, returning false when it was already present
    pub fn insert(&mut self, relationship: ResourceRelationship) -> bool {
        if self.seen.contains(&relationship) {
            return false;
        }
        self.seen.insert(relationship.clone());
        self.edges.push(relationship);
        true
    }

    pub fn add(&mut self, source_id: &str, target_id: &str, relationship_type: RelationshipType) -> bool {
        self.insert(ResourceRelationship::new(
            source_id,
            target_id,
            relationship_type,
        ))
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResourceRelationship> {
        self.edges.iter()
    }

    pub fn contains(&self, source_id: &str, target_id: &str, relationship_type: RelationshipType) -> bool {
        self.seen
            .contains(&ResourceRelationship::new(source_id, target_id, relationship_type))
    }

    pub fn into_vec(self) -> Vec<ResourceRelationship> {
        self.edges
    }

    pub fn as_slice(&self) -> &[ResourceRelationship] {
        &self.edges
    }
}

impl FromIterator<ResourceRelationship> for RelationshipSet {
    fn from_iter<I: IntoIterator<Item = ResourceRelationship>>(iter: I) -> Self {
        let mut set = RelationshipSet::new();
        for rel in iter {
            set.insert(rel);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relationship_set_dedupes_triples() {
        let mut set = RelationshipSet::new();
        assert!(set.add("a", "b", RelationshipType::LabelSelector));
        assert!(!set.add("a", "b", RelationshipType::LabelSelector));
        assert!(set.add("a", "b", RelationshipType::ConstructParent));
        assert_eq!(set.len(), 2);
        assert!(set.contains("a", "b", RelationshipType::ConstructParent));
    }

    #[test]
    fn test_self_reference_is_kept() {
        let mut set = RelationshipSet::new();
        assert!(set.add("a", "a", RelationshipType::ConfigmapReference));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_relationship_type_serialization() {
        let json = serde_json::to_string(&RelationshipType::ArgocdApplicationOwns).unwrap();
        assert_eq!(json, "\"argocd-application-owns\"");
        assert_eq!(RelationshipType::PvcReference.to_string(), "pvc-reference");
    }

    #[test]
    fn test_resource_id_format() {
        assert_eq!(resource_id("web", "Service", "default", "web"), "web/Service/default/web");
    }
}
