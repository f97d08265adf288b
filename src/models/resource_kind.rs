//! Kubernetes resource kind definitions
//!
//! This module provides a centralized enum for the resource kinds the
//! extraction and catalog passes treat specially. Kinds outside this set are
//! still extracted, they simply have no dedicated rules.

use std::fmt;
use std::str::FromStr;

/// Resource kinds with dedicated relationship or catalog rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    // Workloads
    Deployment,
    StatefulSet,
    DaemonSet,
    ReplicaSet,
    Job,
    CronJob,
    // Networking
    Service,
    Ingress,
    // Configuration and storage
    ConfigMap,
    Secret,
    PersistentVolumeClaim,
    Namespace,
    // RBAC
    ServiceAccount,
    Role,
    RoleBinding,
    ClusterRole,
    ClusterRoleBinding,
    // Extensions
    CustomResourceDefinition,
    Certificate,
    ExternalSecret,
    SecretStore,
    ClusterSecretStore,
    // GitOps
    Application,
}

impl ResourceKind {
    /// Get the display name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Deployment => "Deployment",
            ResourceKind::StatefulSet => "StatefulSet",
            ResourceKind::DaemonSet => "DaemonSet",
            ResourceKind::ReplicaSet => "ReplicaSet",
            ResourceKind::Job => "Job",
            ResourceKind::CronJob => "CronJob",
            ResourceKind::Service => "Service",
            ResourceKind::Ingress => "Ingress",
            ResourceKind::ConfigMap => "ConfigMap",
            ResourceKind::Secret => "Secret",
            ResourceKind::PersistentVolumeClaim => "PersistentVolumeClaim",
            ResourceKind::Namespace => "Namespace",
            ResourceKind::ServiceAccount => "ServiceAccount",
            ResourceKind::Role => "Role",
            ResourceKind::RoleBinding => "RoleBinding",
            ResourceKind::ClusterRole => "ClusterRole",
            ResourceKind::ClusterRoleBinding => "ClusterRoleBinding",
            ResourceKind::CustomResourceDefinition => "CustomResourceDefinition",
            ResourceKind::Certificate => "Certificate",
            ResourceKind::ExternalSecret => "ExternalSecret",
            ResourceKind::SecretStore => "SecretStore",
            ResourceKind::ClusterSecretStore => "ClusterSecretStore",
            ResourceKind::Application => "Application",
        }
    }

    /// Try to parse a string into a ResourceKind, returning None if unknown
    pub fn parse_optional(s: &str) -> Option<Self> {
        s.parse().ok()
    }

    /// Kinds whose pod template is inspected by the Service selector rule
    /// and the env/volume reference rule
    pub fn is_pod_workload(&self) -> bool {
        matches!(
            self,
            ResourceKind::Deployment
                | ResourceKind::StatefulSet
                | ResourceKind::DaemonSet
                | ResourceKind::ReplicaSet
        )
    }

    /// Kinds that become catalog Components (the workload allow-list)
    pub fn is_catalog_workload(&self) -> bool {
        matches!(
            self,
            ResourceKind::Deployment
                | ResourceKind::StatefulSet
                | ResourceKind::DaemonSet
                | ResourceKind::Job
                | ResourceKind::CronJob
        )
    }

    /// Kinds that become catalog Resources (the non-workload allow-list)
    pub fn is_catalog_resource(&self) -> bool {
        matches!(
            self,
            ResourceKind::ConfigMap
                | ResourceKind::Secret
                | ResourceKind::Service
                | ResourceKind::Ingress
                | ResourceKind::PersistentVolumeClaim
                | ResourceKind::ServiceAccount
                | ResourceKind::Role
                | ResourceKind::RoleBinding
                | ResourceKind::ClusterRole
                | ResourceKind::ClusterRoleBinding
                | ResourceKind::Certificate
                | ResourceKind::ExternalSecret
                | ResourceKind::SecretStore
                | ResourceKind::ClusterSecretStore
                | ResourceKind::Application
        )
    }

    /// Get all known kinds
    pub fn all() -> &'static [Self] {
        &[
            ResourceKind::Deployment,
            ResourceKind::StatefulSet,
            ResourceKind::DaemonSet,
            ResourceKind::ReplicaSet,
            ResourceKind::Job,
            ResourceKind::CronJob,
            ResourceKind::Service,
            ResourceKind::Ingress,
            ResourceKind::ConfigMap,
            ResourceKind::Secret,
            ResourceKind::PersistentVolumeClaim,
            ResourceKind::Namespace,
            ResourceKind::ServiceAccount,
            ResourceKind::Role,
            ResourceKind::RoleBinding,
            ResourceKind::ClusterRole,
            ResourceKind::ClusterRoleBinding,
            ResourceKind::CustomResourceDefinition,
            ResourceKind::Certificate,
            ResourceKind::ExternalSecret,
            ResourceKind::SecretStore,
            ResourceKind::ClusterSecretStore,
            ResourceKind::Application,
        ]
    }
}

/// Whether a kind string belongs to the catalog workload allow-list
pub fn is_workload_kind(kind: &str) -> bool {
    ResourceKind::parse_optional(kind)
        .map(|k| k.is_catalog_workload())
        .unwrap_or(false)
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResourceKind::all()
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("Unknown resource kind: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str() {
        assert_eq!(
            ResourceKind::parse_optional("Deployment"),
            Some(ResourceKind::Deployment)
        );
        assert_eq!(
            ResourceKind::parse_optional("ExternalSecret"),
            Some(ResourceKind::ExternalSecret)
        );
        assert_eq!(ResourceKind::parse_optional("Widget"), None);
        assert_eq!(ResourceKind::parse_optional("deployment"), None);
    }

    #[test]
    fn test_workload_classification() {
        assert!(ResourceKind::ReplicaSet.is_pod_workload());
        assert!(!ResourceKind::ReplicaSet.is_catalog_workload());
        assert!(ResourceKind::CronJob.is_catalog_workload());
        assert!(!ResourceKind::CronJob.is_pod_workload());
        assert!(is_workload_kind("StatefulSet"));
        assert!(!is_workload_kind("Service"));
    }

    #[test]
    fn test_allow_lists_are_disjoint() {
        for kind in ResourceKind::all() {
            assert!(
                !(kind.is_catalog_resource() && kind.is_catalog_workload()),
                "{} is in both allow-lists",
                kind
            );
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", ResourceKind::ConfigMap), "ConfigMap");
    }
}
