//! Kubernetes-shaped object carried by resource nodes
//!
//! The manifest is kept as raw JSON so that custom resources survive
//! unchanged. Typed views of core kinds are produced on demand through
//! `k8s-openapi` deserialization.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Namespace assumed when a manifest does not set one
pub const DEFAULT_NAMESPACE: &str = "default";

/// An `{apiVersion, kind, metadata, spec}` object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApiObject {
    manifest: Value,
}

impl ApiObject {
    /// Wrap a manifest value
    pub fn new(manifest: Value) -> Self {
        Self { manifest }
    }

    /// Build a minimal object from its identifying fields
    pub fn with_identity(api_version: &str, kind: &str, name: &str, namespace: Option<&str>) -> Self {
        let mut metadata = serde_json::Map::new();
        metadata.insert("name".to_string(), Value::String(name.to_string()));
        if let Some(ns) = namespace {
            metadata.insert("namespace".to_string(), Value::String(ns.to_string()));
        }
        Self::new(serde_json::json!({
            "apiVersion": api_version,
            "kind": kind,
            "metadata": metadata,
        }))
    }

    /// Raw manifest
    pub fn manifest(&self) -> &Value {
        &self.manifest
    }

    pub fn api_version(&self) -> &str {
        self.manifest
            .get("apiVersion")
            .and_then(|v| v.as_str())
            .unwrap_or("")
    }

    pub fn kind(&self) -> &str {
        self.manifest
            .get("kind")
            .and_then(|v| v.as_str())
            .unwrap_or("")
    }

    /// API group portion of apiVersion (empty for the core group)
    pub fn api_group(&self) -> &str {
        api_group_of(self.api_version())
    }

    /// `metadata.name`, if set
    pub fn name(&self) -> Option<&str> {
        self.metadata_str("name")
    }

    /// `metadata.namespace`, if set
    pub fn namespace(&self) -> Option<&str> {
        self.metadata_str("namespace")
    }

    /// Namespace with the Kubernetes default applied
    pub fn namespace_or_default(&self) -> &str {
        self.namespace().unwrap_or(DEFAULT_NAMESPACE)
    }

    /// `metadata.labels` as a sorted map (non-string values are skipped)
    pub fn labels(&self) -> BTreeMap<String, String> {
        string_map(self.manifest.get("metadata").and_then(|m| m.get("labels")))
    }

    /// `spec` section, if present
    pub fn spec(&self) -> Option<&Value> {
        self.manifest.get("spec")
    }

    /// True when both apiVersion and kind are set
    pub fn has_type_info(&self) -> bool {
        !self.api_version().is_empty() && !self.kind().is_empty()
    }

    /// Fill in apiVersion/kind when the manifest lacks them
    pub fn apply_type_info(&mut self, api_version: &str, kind: &str) {
        if let Value::Object(map) = &mut self.manifest {
            if map.get("apiVersion").and_then(|v| v.as_str()).is_none() {
                map.insert(
                    "apiVersion".to_string(),
                    Value::String(api_version.to_string()),
                );
            }
            if !map.contains_key("kind") {
                map.insert("kind".to_string(), Value::String(kind.to_string()));
            }
        }
    }

    /// Deserialize the manifest into a typed Kubernetes object
    ///
    /// Returns None when the manifest does not fit the type; callers treat
    /// that like a resource without the inspected fields.
    pub fn typed<K: DeserializeOwned>(&self) -> Option<K> {
        match serde_json::from_value(self.manifest.clone()) {
            Ok(obj) => Some(obj),
            Err(e) => {
                tracing::debug!(
                    "Manifest {}/{} does not deserialize as typed object: {}",
                    self.kind(),
                    self.name().unwrap_or(""),
                    e
                );
                None
            }
        }
    }

    fn metadata_str(&self, key: &str) -> Option<&str> {
        self.manifest
            .get("metadata")
            .and_then(|m| m.get(key))
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
    }
}

/// Split the group out of an apiVersion (`apps/v1` -> `apps`, `v1` -> ``)
pub fn api_group_of(api_version: &str) -> &str {
    match api_version.rsplit_once('/') {
        Some((group, _)) => group,
        None => "",
    }
}

/// Collect a JSON object of strings into a sorted map
pub fn string_map(value: Option<&Value>) -> BTreeMap<String, String> {
    value
        .and_then(|v| v.as_object())
        .map(|obj| {
            obj.iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::Service;
    use serde_json::json;

    #[test]
    fn test_identity_accessors() {
        let obj = ApiObject::new(json!({
            "apiVersion": "apps/v1",
            "kind": "Deployment",
            "metadata": {"name": "web", "labels": {"app": "web", "replicas": 3}}
        }));
        assert_eq!(obj.kind(), "Deployment");
        assert_eq!(obj.api_group(), "apps");
        assert_eq!(obj.name(), Some("web"));
        assert_eq!(obj.namespace(), None);
        assert_eq!(obj.namespace_or_default(), "default");
        assert_eq!(obj.labels().len(), 1);
    }

    #[test]
    fn test_apply_type_info_keeps_existing() {
        let mut obj = ApiObject::new(json!({"kind": "Service", "metadata": {"name": "a"}}));
        obj.apply_type_info("v1", "Other");
        assert_eq!(obj.api_version(), "v1");
        assert_eq!(obj.kind(), "Service");
    }

    #[test]
    fn test_typed_view() {
        let obj = ApiObject::new(json!({
            "apiVersion": "v1",
            "kind": "Service",
            "metadata": {"name": "web"},
            "spec": {"selector": {"app": "web"}}
        }));
        let svc: Service = obj.typed().unwrap();
        let selector = svc.spec.and_then(|s| s.selector).unwrap();
        assert_eq!(selector.get("app").map(String::as_str), Some("web"));
    }

    #[test]
    fn test_api_group_of() {
        assert_eq!(api_group_of("v1"), "");
        assert_eq!(api_group_of("external-secrets.io/v1beta1"), "external-secrets.io");
    }
}
