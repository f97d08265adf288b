//! Per-invocation synthesis context
//!
//! Holds the registration tables the chart layer supplies: which construct
//! types are charts (and their canonical chart ids), and which construct
//! types produce which `(apiVersion, kind)`. A context lives for a single
//! extraction run; nothing here is process-wide.

use std::collections::HashMap;

/// Registry entry describing a resource-producing construct type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KindEntry {
    pub api_version: String,
    pub kind: String,
}

/// Construct type -> canonical chart identifier
#[derive(Debug, Clone, Default)]
pub struct ChartRegistry {
    charts: HashMap<String, String>,
}

impl ChartRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a chart construct type under its canonical identifier
    pub fn register(&mut self, construct_type: &str, chart_id: &str) {
        self.charts
            .insert(construct_type.to_string(), chart_id.to_string());
    }

    /// Canonical chart id for a construct type
    pub fn chart_id(&self, construct_type: &str) -> Option<&str> {
        self.charts.get(construct_type).map(String::as_str)
    }

    pub fn is_chart_type(&self, construct_type: &str) -> bool {
        self.charts.contains_key(construct_type)
    }

    pub fn len(&self) -> usize {
        self.charts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.charts.is_empty()
    }
}

/// Construct type -> `(apiVersion, kind)`
#[derive(Debug, Clone, Default)]
pub struct KindRegistry {
    kinds: HashMap<String, KindEntry>,
}

impl KindRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, construct_type: &str, api_version: &str, kind: &str) {
        self.kinds.insert(
            construct_type.to_string(),
            KindEntry {
                api_version: api_version.to_string(),
                kind: kind.to_string(),
            },
        );
    }

    pub fn lookup(&self, construct_type: &str) -> Option<&KindEntry> {
        self.kinds.get(construct_type)
    }
}

/// Registration tables for one extraction run
#[derive(Debug, Clone, Default)]
pub struct SynthesisContext {
    pub charts: ChartRegistry,
    pub kinds: KindRegistry,
}

impl SynthesisContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context preloaded with the cdk8s `Kube*` construct types for core kinds
    pub fn with_core_kinds() -> Self {
        let mut ctx = Self::new();
        for (construct_type, api_version, kind) in CORE_CONSTRUCTS {
            ctx.kinds.register(construct_type, api_version, kind);
        }
        ctx
    }

    /// Builder-style chart registration
    pub fn with_chart(mut self, construct_type: &str, chart_id: &str) -> Self {
        self.charts.register(construct_type, chart_id);
        self
    }
}

/// Generated construct classes for the core API kinds
const CORE_CONSTRUCTS: &[(&str, &str, &str)] = &[
    ("KubeDeployment", "apps/v1", "Deployment"),
    ("KubeStatefulSet", "apps/v1", "StatefulSet"),
    ("KubeDaemonSet", "apps/v1", "DaemonSet"),
    ("KubeReplicaSet", "apps/v1", "ReplicaSet"),
    ("KubeJob", "batch/v1", "Job"),
    ("KubeCronJob", "batch/v1", "CronJob"),
    ("KubeService", "v1", "Service"),
    ("KubeConfigMap", "v1", "ConfigMap"),
    ("KubeSecret", "v1", "Secret"),
    ("KubeNamespace", "v1", "Namespace"),
    ("KubeServiceAccount", "v1", "ServiceAccount"),
    ("KubePersistentVolumeClaim", "v1", "PersistentVolumeClaim"),
    ("KubeIngress", "networking.k8s.io/v1", "Ingress"),
    ("KubeRole", "rbac.authorization.k8s.io/v1", "Role"),
    ("KubeRoleBinding", "rbac.authorization.k8s.io/v1", "RoleBinding"),
    ("KubeClusterRole", "rbac.authorization.k8s.io/v1", "ClusterRole"),
    (
        "KubeClusterRoleBinding",
        "rbac.authorization.k8s.io/v1",
        "ClusterRoleBinding",
    ),
    (
        "KubeCustomResourceDefinition",
        "apiextensions.k8s.io/v1",
        "CustomResourceDefinition",
    ),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_kinds_registered() {
        let ctx = SynthesisContext::with_core_kinds();
        let entry = ctx.kinds.lookup("KubeDeployment").unwrap();
        assert_eq!(entry.api_version, "apps/v1");
        assert_eq!(entry.kind, "Deployment");
        assert!(ctx.kinds.lookup("Construct").is_none());
    }

    #[test]
    fn test_chart_registration() {
        let ctx = SynthesisContext::new().with_chart("BackstageChart", "backstage");
        assert!(ctx.charts.is_chart_type("BackstageChart"));
        assert_eq!(ctx.charts.chart_id("BackstageChart"), Some("backstage"));
        assert_eq!(ctx.charts.len(), 1);
    }
}
