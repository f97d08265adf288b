//! Catalog entity descriptors
//!
//! Shapes follow the Backstage descriptor format
//! (https://backstage.io/docs/features/software-catalog/descriptor-format).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Descriptor apiVersion for every generated entity
pub const CATALOG_API_VERSION: &str = "backstage.io/v1alpha1";

/// Hard ceiling on entity names
pub const MAX_ENTITY_NAME_LEN: usize = 63;

/// Catalog entity kinds produced by the generator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityKind {
    System,
    Group,
    Component,
    Resource,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::System => "System",
            EntityKind::Group => "Group",
            EntityKind::Component => "Component",
            EntityKind::Resource => "Resource",
        }
    }

    /// Prefix used in entity references (`component:foo`)
    pub fn ref_prefix(&self) -> &'static str {
        match self {
            EntityKind::System => "system",
            EntityKind::Group => "group",
            EntityKind::Component => "component",
            EntityKind::Resource => "resource",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// External link attached to an entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityLink {
    pub url: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

/// Entity metadata block
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EntityMetadata {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<EntityLink>,
}

/// Entity spec block; unused fields are omitted from output
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitySpec {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lifecycle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
    /// Group children
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<String>>,
}

/// One catalog entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntity {
    pub api_version: String,
    pub kind: EntityKind,
    pub metadata: EntityMetadata,
    pub spec: EntitySpec,
}

impl CatalogEntity {
    pub fn new(kind: EntityKind, name: &str) -> Self {
        Self {
            api_version: CATALOG_API_VERSION.to_string(),
            kind,
            metadata: EntityMetadata {
                name: name.to_string(),
                ..Default::default()
            },
            spec: EntitySpec::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    /// Reference string (`component:web-deployment`)
    pub fn entity_ref(&self) -> String {
        format!("{}:{}", self.kind.ref_prefix(), self.metadata.name)
    }

    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.metadata.annotations.get(key).map(String::as_str)
    }
}

/// Render entities as a multi-document YAML stream
pub fn to_yaml_stream(entities: &[CatalogEntity]) -> Result<String, serde_yaml::Error> {
    let mut out = String::new();
    for entity in entities {
        out.push_str("---\n");
        out.push_str(&serde_yaml::to_string(entity)?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_serialization_shape() {
        let mut entity = CatalogEntity::new(EntityKind::Component, "web-deployment");
        entity.spec.entity_type = Some("service".to_string());
        entity.spec.depends_on = vec!["resource:cfg-configmap".to_string()];

        let value = serde_json::to_value(&entity).unwrap();
        assert_eq!(value["apiVersion"], "backstage.io/v1alpha1");
        assert_eq!(value["kind"], "Component");
        assert_eq!(value["metadata"]["name"], "web-deployment");
        assert_eq!(value["spec"]["type"], "service");
        assert_eq!(value["spec"]["dependsOn"][0], "resource:cfg-configmap");
        assert!(value["spec"].get("children").is_none());
    }

    #[test]
    fn test_yaml_stream() {
        let entities = vec![
            CatalogEntity::new(EntityKind::Group, "platform-team"),
            CatalogEntity::new(EntityKind::System, "apps-resources"),
        ];
        let yaml = to_yaml_stream(&entities).unwrap();
        assert_eq!(yaml.matches("---\n").count(), 2);
        assert!(yaml.contains("kind: Group"));
    }

    #[test]
    fn test_entity_ref() {
        let entity = CatalogEntity::new(EntityKind::Resource, "cfg-configmap");
        assert_eq!(entity.entity_ref(), "resource:cfg-configmap");
    }
}
