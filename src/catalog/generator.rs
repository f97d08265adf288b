//! Deterministic catalog generation
//!
//! Entities are produced in a fixed order: the owning group, systems, CRD
//! type entities, chart components, resource entities, then workload
//! components. Every name goes through one [`EntityNamer`], so names are
//! unique across the whole output and never exceed 63 characters.

use super::entity::{CatalogEntity, EntityKind, EntityLink};
use super::naming::{EntityNamer, NameCandidate, sanitize};
use super::selector::label_selector;
use crate::analysis::AnalyzedChart;
use crate::analysis::chart::index_by_class;
use crate::config::CatalogConfig;
use crate::models::{
    RelationshipType, ResourceKind, ResourceNode, ResourceRelationship, api_object::api_group_of,
};
use std::collections::{BTreeMap, BTreeSet, HashMap};

pub const ANNOTATION_KUBERNETES_ID: &str = "backstage.io/kubernetes-id";
pub const ANNOTATION_KUBERNETES_NAMESPACE: &str = "backstage.io/kubernetes-namespace";
pub const ANNOTATION_LABEL_SELECTOR: &str = "backstage.io/kubernetes-label-selector";
pub const ANNOTATION_CHART: &str = "chartscope.io/chart";
pub const ANNOTATION_RESOURCE_ID: &str = "chartscope.io/resource-id";
pub const ANNOTATION_API_VERSION: &str = "chartscope.io/api-version";
pub const ANNOTATION_SOURCE_FILE: &str = "chartscope.io/source-file";
pub const ANNOTATION_ARGOCD_APP: &str = "argocd/app-name";

/// System holding built-in Kubernetes type entities
pub const CORE_SYSTEM: &str = "kubernetes-core-resources";
/// System holding custom resource type entities
pub const CUSTOM_SYSTEM: &str = "custom-resources";

/// Which generation step an entity-producing resource belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Resource,
    Workload,
}

fn step_of(resource: &ResourceNode) -> Option<Step> {
    let kind = ResourceKind::parse_optional(resource.kind())?;
    if kind.is_catalog_workload() {
        Some(Step::Workload)
    } else if kind.is_catalog_resource() {
        Some(Step::Resource)
    } else {
        None
    }
}

/// Lowercase tag restricted to `[a-z0-9-]`
fn tag(value: &str) -> String {
    sanitize(value).replace(['.', '_'], "-")
}

fn push_tag(tags: &mut Vec<String>, value: &str) {
    let value = tag(value);
    if !value.is_empty() && !tags.contains(&value) {
        tags.push(value);
    }
}

/// Generates Backstage catalog entities from the extracted resource graph
pub struct CatalogGenerator<'a> {
    config: &'a CatalogConfig,
}

/// Naming state and lookups shared across generation steps
struct Generation {
    namer: EntityNamer,
    entities: Vec<CatalogEntity>,
    /// namespace -> system entity name
    systems: BTreeMap<String, String>,
    /// (apiVersion, kind) -> CRD entity name
    crd_entities: BTreeMap<(String, String), String>,
    /// chartId -> chart component name
    chart_components: BTreeMap<String, String>,
    /// fixed system -> name it was claimed under
    fixed_systems: BTreeMap<&'static str, String>,
    /// resource id -> entity reference
    resource_refs: HashMap<String, String>,
}

impl<'a> CatalogGenerator<'a> {
    pub fn new(config: &'a CatalogConfig) -> Self {
        Self { config }
    }

    /// Produce the catalog entity list
    ///
    /// When static analyses are supplied, chart components are enriched
    /// with their documentation and source-declared dependencies.
    pub fn generate(
        &self,
        resources: &[ResourceNode],
        relationships: &[ResourceRelationship],
        analyses: Option<&[AnalyzedChart]>,
    ) -> Vec<CatalogEntity> {
        let candidates: Vec<NameCandidate> = resources
            .iter()
            .filter(|r| step_of(r).is_some())
            .map(name_candidate)
            .collect();

        let mut generation = Generation {
            namer: EntityNamer::with_resources(&candidates),
            entities: Vec::new(),
            systems: BTreeMap::new(),
            crd_entities: BTreeMap::new(),
            chart_components: BTreeMap::new(),
            fixed_systems: BTreeMap::new(),
            resource_refs: HashMap::new(),
        };

        self.generate_group(&mut generation);
        self.generate_systems(&mut generation, resources);
        if self.config.include_crd_entities {
            self.generate_crd_entities(&mut generation, resources);
        }
        if self.config.include_chart_entities {
            self.name_chart_components(&mut generation, resources);
        }

        // Resource and workload names are fixed before any dependsOn is
        // resolved so that references between the two steps are stable.
        let mut ordered: Vec<(&ResourceNode, Step)> = Vec::new();
        for step in [Step::Resource, Step::Workload] {
            for resource in resources {
                if step_of(resource) == Some(step) {
                    ordered.push((resource, step));
                }
            }
        }
        let mut names: Vec<(String, EntityKind)> = Vec::with_capacity(ordered.len());
        for (resource, step) in &ordered {
            let name = generation.namer.assign(&name_candidate(resource));
            let kind = match step {
                Step::Workload => EntityKind::Component,
                Step::Resource if self.is_promoted(resource) => EntityKind::Component,
                Step::Resource => EntityKind::Resource,
            };
            generation
                .resource_refs
                .insert(resource.id.clone(), format!("{}:{}", kind.ref_prefix(), name));
            names.push((name, kind));
        }

        let mut outgoing: HashMap<&str, Vec<&ResourceRelationship>> = HashMap::new();
        for relationship in relationships {
            outgoing
                .entry(relationship.source_id.as_str())
                .or_default()
                .push(relationship);
        }

        if self.config.include_chart_entities {
            let charts = self.chart_components(&generation, resources, relationships, analyses);
            generation.entities.extend(charts);
        }

        for ((resource, step), (name, kind)) in ordered.iter().zip(names) {
            let edges = outgoing
                .get(resource.id.as_str())
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            let entity = self.resource_entity(&generation, resource, *step, name, kind, edges);
            generation.entities.push(entity);
        }

        tracing::info!(
            "Generated {} catalog entities from {} resources",
            generation.entities.len(),
            resources.len()
        );
        generation.entities
    }

    fn generate_group(&self, generation: &mut Generation) {
        let name = generation.namer.claim(&self.config.owner);
        let mut group = CatalogEntity::new(EntityKind::Group, &name);
        group.metadata.description = Some("Owner of all generated catalog entities".to_string());
        group.spec.entity_type = Some("team".to_string());
        group.spec.children = Some(Vec::new());
        generation.entities.push(group);
    }

    fn system_name_for(&self, namespace: &str) -> String {
        self.config
            .namespace_systems
            .get(namespace)
            .cloned()
            .unwrap_or_else(|| format!("{}-resources", namespace))
    }

    fn generate_systems(&self, generation: &mut Generation, resources: &[ResourceNode]) {
        let namespaces: BTreeSet<&str> = resources.iter().map(|r| r.namespace()).collect();

        // Several namespaces may share one system
        let mut by_system: BTreeMap<String, Vec<&str>> = BTreeMap::new();
        for namespace in namespaces.iter().copied() {
            by_system
                .entry(self.system_name_for(namespace))
                .or_default()
                .push(namespace);
        }

        for (system, members) in &by_system {
            let name = generation.namer.claim(system);
            let mut entity = CatalogEntity::new(EntityKind::System, &name);
            entity.metadata.description = Some(format!(
                "Resources in namespace{} {}",
                if members.len() > 1 { "s" } else { "" },
                members.join(", ")
            ));
            for namespace in members {
                push_tag(&mut entity.metadata.tags, namespace);
                generation.systems.insert(namespace.to_string(), name.clone());
            }
            entity.spec.owner = Some(self.owner_ref(generation));
            generation.entities.push(entity);
        }

        for (system, description) in [
            (CORE_SYSTEM, "Built-in Kubernetes resource types"),
            (CUSTOM_SYSTEM, "Custom resource types"),
        ] {
            let name = generation.namer.claim(system);
            let mut entity = CatalogEntity::new(EntityKind::System, &name);
            entity.metadata.description = Some(description.to_string());
            entity.spec.owner = Some(self.owner_ref(generation));
            generation.fixed_systems.insert(system, name);
            generation.entities.push(entity);
        }
    }

    fn owner_ref(&self, generation: &Generation) -> String {
        // The group is always the first entity
        generation
            .entities
            .first()
            .map(|g| g.entity_ref())
            .unwrap_or_else(|| format!("group:{}", self.config.owner))
    }

    /// Whether an apiVersion belongs to a built-in API group
    pub fn is_core_api(&self, api_version: &str) -> bool {
        let group = api_group_of(api_version);
        group.is_empty()
            || self
                .config
                .core_api_markers
                .iter()
                .any(|marker| group == marker || group.ends_with(&format!(".{}", marker)))
    }

    fn generate_crd_entities(&self, generation: &mut Generation, resources: &[ResourceNode]) {
        let types: BTreeSet<(&str, &str)> = resources
            .iter()
            .map(|r| (r.api_version(), r.kind()))
            .collect();

        for (api_version, kind) in types {
            if kind.trim().is_empty() || api_version.trim().is_empty() {
                tracing::warn!(
                    "Skipping type entity with missing metadata (apiVersion '{}', kind '{}')",
                    api_version,
                    kind
                );
                continue;
            }

            let core = self.is_core_api(api_version);
            let group = api_group_of(api_version);
            let group_label = if group.is_empty() { "core" } else { group };
            let name = generation
                .namer
                .claim(&format!("{}-{}-type", kind.to_lowercase(), group_label));

            let mut entity = CatalogEntity::new(EntityKind::Resource, &name);
            entity.metadata.description = Some(format!("{} ({})", kind, api_version));
            entity
                .metadata
                .annotations
                .insert(ANNOTATION_API_VERSION.to_string(), api_version.to_string());
            push_tag(&mut entity.metadata.tags, "crd");
            push_tag(
                &mut entity.metadata.tags,
                if core { "core-resource" } else { "custom-resource" },
            );
            push_tag(&mut entity.metadata.tags, group_label);
            entity.spec.entity_type = Some(
                if core { "kubernetes-resource-type" } else { "custom-resource-definition" }
                    .to_string(),
            );
            entity.spec.owner = Some(self.owner_ref(generation));
            let system = if core { CORE_SYSTEM } else { CUSTOM_SYSTEM };
            entity.spec.system = generation.fixed_systems.get(system).cloned();
            entity.spec.lifecycle = Some(self.config.lifecycle.clone());

            generation
                .crd_entities
                .insert((api_version.to_string(), kind.to_string()), name);
            generation.entities.push(entity);
        }
    }

    fn name_chart_components(&self, generation: &mut Generation, resources: &[ResourceNode]) {
        let charts: BTreeSet<&str> = resources.iter().map(|r| r.chart_id.as_str()).collect();
        for chart in charts {
            let name = generation.namer.claim(&format!("{}-chart", chart));
            generation.chart_components.insert(chart.to_string(), name);
        }
    }

    fn chart_components(
        &self,
        generation: &Generation,
        resources: &[ResourceNode],
        relationships: &[ResourceRelationship],
        analyses: Option<&[AnalyzedChart]>,
    ) -> Vec<CatalogEntity> {
        let chart_of: HashMap<&str, &str> = resources
            .iter()
            .map(|r| (r.id.as_str(), r.chart_id.as_str()))
            .collect();

        // Runtime chart-to-chart dependencies
        let mut runtime_deps: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        for rel in relationships {
            if rel.relationship_type != RelationshipType::ChartDependency {
                continue;
            }
            if let (Some(from), Some(to)) = (
                chart_of.get(rel.source_id.as_str()),
                chart_of.get(rel.target_id.as_str()),
            ) && from != to
            {
                runtime_deps.entry(*from).or_default().insert(*to);
            }
        }

        let analyzed: HashMap<&str, &AnalyzedChart> = analyses
            .map(|a| a.iter().map(|c| (c.chart_id.as_str(), c)).collect())
            .unwrap_or_default();
        let by_class = analyses.map(index_by_class).unwrap_or_default();

        let mut entities = Vec::new();
        for (chart, name) in &generation.chart_components {
            let members: Vec<&ResourceNode> =
                resources.iter().filter(|r| &r.chart_id == chart).collect();

            let mut kind_counts: BTreeMap<&str, usize> = BTreeMap::new();
            let mut namespace_counts: BTreeMap<&str, usize> = BTreeMap::new();
            for member in &members {
                *kind_counts.entry(member.kind()).or_default() += 1;
                *namespace_counts.entry(member.namespace()).or_default() += 1;
            }
            let summary = kind_counts
                .iter()
                .map(|(kind, count)| format!("{} ({})", kind, count))
                .collect::<Vec<_>>()
                .join(", ");

            let mut entity = CatalogEntity::new(EntityKind::Component, name);
            entity.metadata.description = Some(format!("Chart {} creating {}", chart, summary));
            entity
                .metadata
                .annotations
                .insert(ANNOTATION_CHART.to_string(), chart.clone());
            if let Some(app) = members.iter().find_map(|m| m.argocd_app.as_deref()) {
                entity
                    .metadata
                    .annotations
                    .insert(ANNOTATION_ARGOCD_APP.to_string(), app.to_string());
                if let Some(link) = self.argocd_link(app) {
                    entity.metadata.links.push(link);
                }
            }
            push_tag(&mut entity.metadata.tags, "cdk8s-chart");
            entity.spec.entity_type = Some("cdk8s-chart".to_string());
            entity.spec.lifecycle = Some(self.config.lifecycle.clone());
            entity.spec.owner = Some(self.owner_ref(generation));

            // Most common namespace, ties broken by name
            let home = namespace_counts
                .iter()
                .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
                .map(|(ns, _)| *ns);
            entity.spec.system = home.and_then(|ns| generation.systems.get(ns)).cloned();

            let mut depends_on: BTreeSet<String> = BTreeSet::new();
            for dep in runtime_deps.get(chart.as_str()).into_iter().flatten() {
                if let Some(dep_name) = generation.chart_components.get(*dep) {
                    depends_on.insert(format!("component:{}", dep_name));
                }
            }

            if let Some(analysis) = analyzed.get(chart.as_str()) {
                if let Some(description) = &analysis.documentation.description {
                    entity.metadata.description = Some(description.clone());
                }
                for doc_tag in analysis.doc_tags() {
                    push_tag(&mut entity.metadata.tags, &doc_tag);
                }
                entity
                    .metadata
                    .annotations
                    .insert(ANNOTATION_SOURCE_FILE.to_string(), analysis.file_path.clone());
                for target in analysis.hard_dependencies() {
                    let Some(target_chart) = by_class.get(target).map(|c| c.chart_id.as_str())
                    else {
                        continue;
                    };
                    if let Some(dep_name) = generation.chart_components.get(target_chart)
                        && target_chart != chart
                    {
                        depends_on.insert(format!("component:{}", dep_name));
                    }
                }
            }

            entity.spec.depends_on = depends_on.into_iter().collect();
            entities.push(entity);
        }
        entities
    }

    /// Service/Ingress in an application namespace, or a critical name
    fn is_promoted(&self, resource: &ResourceNode) -> bool {
        let kind = ResourceKind::parse_optional(resource.kind());
        let app_facing = matches!(kind, Some(ResourceKind::Service | ResourceKind::Ingress))
            && self
                .config
                .application_namespaces
                .iter()
                .any(|ns| ns == resource.namespace());
        app_facing
            || self
                .config
                .critical_resources
                .iter()
                .any(|critical| critical == resource.name())
    }

    fn argocd_link(&self, app: &str) -> Option<EntityLink> {
        let base = self.config.argocd_url.as_deref()?;
        Some(EntityLink {
            url: format!("{}/applications/{}", base.trim_end_matches('/'), app),
            title: "ArgoCD Application".to_string(),
            icon: Some("dashboard".to_string()),
        })
    }

    fn resource_entity(
        &self,
        generation: &Generation,
        resource: &ResourceNode,
        step: Step,
        name: String,
        kind: EntityKind,
        edges: &[&ResourceRelationship],
    ) -> CatalogEntity {
        let mut entity = CatalogEntity::new(kind, &name);
        let namespace = resource.namespace();

        entity.metadata.description = Some(format!(
            "{} {} in namespace {}",
            resource.kind(),
            resource.name(),
            namespace
        ));
        let annotations = &mut entity.metadata.annotations;
        annotations.insert(ANNOTATION_KUBERNETES_ID.to_string(), resource.name().to_string());
        annotations.insert(ANNOTATION_KUBERNETES_NAMESPACE.to_string(), namespace.to_string());
        annotations.insert(ANNOTATION_LABEL_SELECTOR.to_string(), label_selector(resource));
        annotations.insert(ANNOTATION_CHART.to_string(), resource.chart_id.clone());
        annotations.insert(ANNOTATION_RESOURCE_ID.to_string(), resource.id.clone());
        if let Some(app) = &resource.argocd_app {
            annotations.insert(ANNOTATION_ARGOCD_APP.to_string(), app.clone());
            if let Some(link) = self.argocd_link(app) {
                entity.metadata.links.push(link);
            }
        }

        push_tag(&mut entity.metadata.tags, resource.kind());
        push_tag(&mut entity.metadata.tags, &resource.chart_id);
        push_tag(&mut entity.metadata.tags, namespace);

        entity.spec.entity_type = Some(match (step, kind) {
            (Step::Workload, _) => match ResourceKind::parse_optional(resource.kind()) {
                Some(ResourceKind::Job | ResourceKind::CronJob) => "job".to_string(),
                _ => "service".to_string(),
            },
            (Step::Resource, EntityKind::Component) => "service".to_string(),
            _ => resource.kind().to_lowercase(),
        });
        entity.spec.lifecycle = Some(self.config.lifecycle.clone());
        entity.spec.owner = Some(self.owner_ref(generation));
        entity.spec.system = generation.systems.get(namespace).cloned();
        entity.spec.depends_on = self.depends_on(generation, resource, &entity, edges);
        entity
    }

    fn depends_on(
        &self,
        generation: &Generation,
        resource: &ResourceNode,
        entity: &CatalogEntity,
        edges: &[&ResourceRelationship],
    ) -> Vec<String> {
        let own_ref = entity.entity_ref();
        let mut deps: BTreeSet<String> = edges
            .iter()
            .filter_map(|edge| generation.resource_refs.get(&edge.target_id))
            .filter(|target| **target != own_ref)
            .cloned()
            .collect();

        let type_key = (resource.api_version().to_string(), resource.kind().to_string());
        if let Some(type_entity) = generation.crd_entities.get(&type_key) {
            deps.insert(format!("resource:{}", type_entity));
        }
        deps.into_iter().collect()
    }
}

fn name_candidate(resource: &ResourceNode) -> NameCandidate {
    NameCandidate::new(
        &resource.chart_id,
        resource.namespace(),
        resource.name(),
        resource.kind(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ApiObject;
    use serde_json::json;

    fn resource(chart: &str, manifest: serde_json::Value) -> ResourceNode {
        let api_object = ApiObject::new(manifest);
        let kind = api_object.kind().to_string();
        let namespace = api_object.namespace_or_default().to_string();
        let name = api_object.name().unwrap_or("x").to_string();
        ResourceNode {
            id: crate::models::resource_id(chart, &kind, &namespace, &name),
            path: format!("{}/{}", chart, name),
            chart_id: chart.to_string(),
            construct_type: kind.clone(),
            api_object,
            argocd_app: None,
        }
    }

    fn sample() -> Vec<ResourceNode> {
        vec![
            resource(
                "web",
                json!({"apiVersion": "v1", "kind": "Service", "metadata": {"name": "web", "namespace": "apps"}, "spec": {"selector": {"app": "web"}}}),
            ),
            resource(
                "web",
                json!({"apiVersion": "apps/v1", "kind": "Deployment", "metadata": {"name": "web", "namespace": "apps"}}),
            ),
            resource(
                "web",
                json!({"apiVersion": "external-secrets.io/v1beta1", "kind": "ExternalSecret", "metadata": {"name": "creds", "namespace": "apps"}}),
            ),
        ]
    }

    #[test]
    fn test_generation_order() {
        let config = CatalogConfig::default();
        let entities = CatalogGenerator::new(&config).generate(&sample(), &[], None);
        let kinds: Vec<EntityKind> = entities.iter().map(|e| e.kind).collect();

        assert_eq!(kinds[0], EntityKind::Group);
        assert_eq!(entities[0].name(), "platform-team");
        // apps-resources + two fixed systems
        assert_eq!(&kinds[1..4], &[EntityKind::System; 3]);
        assert_eq!(entities[1].name(), "apps-resources");
        // three type entities, one chart, then resources and workloads
        assert_eq!(entities[7].name(), "web-chart");
        assert_eq!(entities.last().unwrap().name(), "web-deployment");
    }

    #[test]
    fn test_core_api_detection() {
        let config = CatalogConfig::default();
        let generator = CatalogGenerator::new(&config);
        assert!(generator.is_core_api("v1"));
        assert!(generator.is_core_api("apps/v1"));
        assert!(generator.is_core_api("networking.k8s.io/v1"));
        assert!(generator.is_core_api("rbac.authorization.k8s.io/v1"));
        assert!(!generator.is_core_api("external-secrets.io/v1beta1"));
        assert!(!generator.is_core_api("argoproj.io/v1alpha1"));
    }

    #[test]
    fn test_type_entity_systems() {
        let config = CatalogConfig::default();
        let entities = CatalogGenerator::new(&config).generate(&sample(), &[], None);
        let external = entities
            .iter()
            .find(|e| e.name() == "externalsecret-external-secrets.io-type")
            .unwrap();
        assert_eq!(external.spec.system.as_deref(), Some(CUSTOM_SYSTEM));
        assert!(external.metadata.tags.contains(&"custom-resource".to_string()));

        let service_type = entities.iter().find(|e| e.name() == "service-core-type").unwrap();
        assert_eq!(service_type.spec.system.as_deref(), Some(CORE_SYSTEM));
    }

    #[test]
    fn test_optional_steps_can_be_disabled() {
        let config = CatalogConfig {
            include_crd_entities: false,
            include_chart_entities: false,
            ..Default::default()
        };
        let entities = CatalogGenerator::new(&config).generate(&sample(), &[], None);
        assert!(entities.iter().all(|e| !e.name().ends_with("-type")));
        assert!(entities.iter().all(|e| e.name() != "web-chart"));
        let deploy = entities.iter().find(|e| e.name() == "web-deployment").unwrap();
        assert!(deploy.spec.depends_on.is_empty());
    }

    #[test]
    fn test_promotion_in_application_namespace() {
        let config = CatalogConfig {
            application_namespaces: vec!["apps".to_string()],
            ..Default::default()
        };
        let entities = CatalogGenerator::new(&config).generate(&sample(), &[], None);
        let service = entities.iter().find(|e| e.name() == "web-service").unwrap();
        assert_eq!(service.kind, EntityKind::Component);
        let secret = entities.iter().find(|e| e.name() == "creds-externalsecret").unwrap();
        assert_eq!(secret.kind, EntityKind::Resource);
    }

    #[test]
    fn test_argocd_annotation_and_link() {
        let config = CatalogConfig {
            argocd_url: Some("https://argocd.example.com/".to_string()),
            ..Default::default()
        };
        let mut resources = sample();
        resources[1].argocd_app = Some("web-app".to_string());
        let entities = CatalogGenerator::new(&config).generate(&resources, &[], None);
        let deploy = entities.iter().find(|e| e.name() == "web-deployment").unwrap();
        assert_eq!(deploy.annotation(ANNOTATION_ARGOCD_APP), Some("web-app"));
        assert_eq!(
            deploy.metadata.links[0].url,
            "https://argocd.example.com/applications/web-app"
        );
    }
}
