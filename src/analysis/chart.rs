//! Per-file chart analysis

use super::AnalysisResult;
use super::syntax::{
    JsDoc, annotated_type, call_arguments, descendants, has_token, line_of, named_children,
    node_text, parse_jsdoc, preceding_jsdoc, typescript_parser, unquote,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tree_sitter::{Node, Parser};

/// Method names recorded when called inside a chart constructor
pub const INTERESTING_METHODS: &[&str] = &["addDependency", "addJsonPatch", "addOverride"];

/// Strength of a chart-to-chart relationship
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartRelationshipKind {
    /// Required typed constructor input (strongest)
    Constructor,
    /// `addDependency` call
    Explicit,
    /// Merely imported (weakest)
    Import,
}

impl ChartRelationshipKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChartRelationshipKind::Constructor => "constructor",
            ChartRelationshipKind::Explicit => "explicit",
            ChartRelationshipKind::Import => "import",
        }
    }

    /// Whether the relationship orders synthesis
    pub fn is_hard(&self) -> bool {
        !matches!(self, ChartRelationshipKind::Import)
    }
}

/// Chart-to-chart edge recovered from source
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartRelationship {
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub kind: ChartRelationshipKind,
    #[serde(default)]
    pub optional: bool,
}

/// One import statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportInfo {
    pub source: String,
    pub names: Vec<String>,
    pub is_chart: bool,
}

/// Property of the props interface
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropInfo {
    pub name: String,
    pub type_name: String,
    pub optional: bool,
    pub is_chart_dependency: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub import_path: Option<String>,
}

/// Chart-typed constructor input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstructorDependency {
    pub name: String,
    pub type_name: String,
    pub optional: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub import_path: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MethodCallKind {
    Method,
    Factory,
    Construct,
}

/// Call of interest inside a constructor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodCall {
    pub method: String,
    pub kind: MethodCallKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub arguments: Vec<String>,
    pub line: usize,
}

/// Everything recovered from one chart source file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzedChart {
    /// Path relative to the analysis root, `/`-separated
    pub file_path: String,
    pub class_name: String,
    pub base_class: String,
    /// Runtime chart identifier this class is expected to synthesize as
    pub chart_id: String,
    #[serde(default)]
    pub documentation: JsDoc,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub props_interface: Option<String>,
    #[serde(default)]
    pub props: Vec<PropInfo>,
    #[serde(default)]
    pub imports: Vec<ImportInfo>,
    #[serde(default)]
    pub constructor_dependencies: Vec<ConstructorDependency>,
    #[serde(default)]
    pub method_calls: Vec<MethodCall>,
    #[serde(default)]
    pub relationships: Vec<ChartRelationship>,
}

impl AnalyzedChart {
    /// Chart classes this chart depends on through hard relationships
    pub fn hard_dependencies(&self) -> impl Iterator<Item = &str> {
        self.relationships
            .iter()
            .filter(|r| r.kind.is_hard())
            .map(|r| r.target.as_str())
    }

    /// Chart classes imported by this chart
    pub fn imported_charts(&self) -> impl Iterator<Item = &str> {
        self.imports
            .iter()
            .filter(|i| i.is_chart)
            .flat_map(|i| i.names.iter().map(String::as_str))
            .filter(|n| is_chart_class_name(n))
    }

    /// `@tag` and `@category` values
    pub fn doc_tags(&self) -> Vec<String> {
        let mut tags: Vec<String> = self
            .documentation
            .tag_values("tag")
            .iter()
            .chain(self.documentation.tag_values("category"))
            .flat_map(|v| v.split([',', ' ']))
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(String::from)
            .collect();
        tags.dedup();
        tags
    }
}

/// A concrete chart class name (`PostgresChart`, not `Chart` itself)
pub fn is_chart_class_name(name: &str) -> bool {
    name != "Chart" && name.ends_with("Chart")
}

/// Whether a type name counts as a chart dependency
pub fn is_chart_type(type_name: &str) -> bool {
    type_name.contains("Chart") && !type_name.ends_with("Props")
}

fn is_chart_base(base: &str) -> bool {
    let last = base.rsplit('.').next().unwrap_or(base);
    last == "Chart" || last.ends_with("Chart")
}

/// `ExternalSecretsChart` -> `external-secrets`
pub fn chart_id_from_class(class_name: &str) -> String {
    let stem = class_name.strip_suffix("Chart").unwrap_or(class_name);
    let mut out = String::new();
    let chars: Vec<char> = stem.chars().collect();
    for (i, ch) in chars.iter().enumerate() {
        if ch.is_uppercase() {
            let prev_lower = i > 0 && (chars[i - 1].is_lowercase() || chars[i - 1].is_ascii_digit());
            let next_lower = chars.get(i + 1).is_some_and(|c| c.is_lowercase());
            let prev_upper = i > 0 && chars[i - 1].is_uppercase();
            if i > 0 && (prev_lower || (prev_upper && next_lower)) {
                out.push('-');
            }
            out.extend(ch.to_lowercase());
        } else {
            out.push(*ch);
        }
    }
    out
}

/// Chart id from a `backstage-chart.ts` style file name
fn chart_id_from_path(file_path: &str) -> Option<String> {
    let file = file_path.rsplit('/').next()?;
    let stem = file.strip_suffix(".ts")?;
    stem.strip_suffix("-chart")
        .filter(|s| !s.is_empty())
        .map(String::from)
}

/// Parses chart sources; holds one reusable parser
pub struct ChartAnalyzer {
    pub(crate) parser: Parser,
}

impl ChartAnalyzer {
    pub fn new() -> AnalysisResult<Self> {
        Ok(Self {
            parser: typescript_parser()?,
        })
    }

    /// Analyze one source file; `None` when it declares no chart class
    pub fn analyze_source(&mut self, file_path: &str, source: &str) -> Option<AnalyzedChart> {
        let tree = self.parser.parse(source, None)?;
        let root = tree.root_node();

        let (class_node, declaration) = find_chart_class(root, source)?;
        let class_name = class_node
            .child_by_field_name("name")
            .map(|n| node_text(n, source))?;
        let base_class = base_class(class_node, source)?;

        let imports = collect_imports(root, source);
        let import_paths: HashMap<&str, &str> = imports
            .iter()
            .flat_map(|i| i.names.iter().map(move |n| (n.as_str(), i.source.as_str())))
            .collect();
        let interfaces = collect_interfaces(root, source);

        let documentation = preceding_jsdoc(declaration, source)
            .map(|raw| parse_jsdoc(&raw))
            .unwrap_or_default();

        let body = class_node.child_by_field_name("body");
        let constructor = body.and_then(|b| find_constructor(b, source));
        let params = constructor
            .map(|c| constructor_params(c, source))
            .unwrap_or_default();

        let props_interface = params
            .iter()
            .map(|p| p.type_name.clone())
            .find(|t| interfaces.contains_key(t))
            .or_else(|| {
                let conventional = format!("{}Props", class_name);
                interfaces.contains_key(&conventional).then_some(conventional)
            });

        let props: Vec<PropInfo> = props_interface
            .as_ref()
            .and_then(|name| interfaces.get(name))
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .map(|mut prop| {
                prop.import_path = import_paths.get(prop.type_name.as_str()).map(|s| s.to_string());
                prop
            })
            .collect();

        // name -> declared type for props, constructor params and class fields
        let mut type_map: HashMap<String, String> = HashMap::new();
        for prop in &props {
            type_map.insert(prop.name.clone(), prop.type_name.clone());
        }
        for param in &params {
            type_map.insert(param.name.clone(), param.type_name.clone());
        }
        if let Some(body) = body {
            for (name, ty) in class_fields(body, source) {
                type_map.insert(name, ty);
            }
        }

        let mut constructor_dependencies: Vec<ConstructorDependency> = props
            .iter()
            .filter(|p| p.is_chart_dependency)
            .map(|p| ConstructorDependency {
                name: p.name.clone(),
                type_name: p.type_name.clone(),
                optional: p.optional,
                import_path: p.import_path.clone(),
            })
            .collect();
        for param in params.iter().filter(|p| is_chart_type(&p.type_name)) {
            constructor_dependencies.push(ConstructorDependency {
                name: param.name.clone(),
                type_name: param.type_name.clone(),
                optional: param.optional,
                import_path: import_paths.get(param.type_name.as_str()).map(|s| s.to_string()),
            });
        }

        let constructor_body = constructor.and_then(|c| c.child_by_field_name("body"));
        if let Some(ctor_body) = constructor_body {
            for (name, ty) in local_constructions(ctor_body, source) {
                type_map.entry(name).or_insert(ty);
            }
        }
        let method_calls = constructor_body
            .map(|b| collect_calls(b, source))
            .unwrap_or_default();

        let mut relationships: Vec<ChartRelationship> = Vec::new();
        for dep in &constructor_dependencies {
            push_relationship(
                &mut relationships,
                &class_name,
                &dep.type_name,
                ChartRelationshipKind::Constructor,
                dep.optional,
            );
        }
        if let Some(ctor_body) = constructor_body {
            for target in explicit_dependency_targets(ctor_body, source, &type_map) {
                push_relationship(
                    &mut relationships,
                    &class_name,
                    &target,
                    ChartRelationshipKind::Explicit,
                    false,
                );
            }
        }
        let imported: Vec<String> = imports
            .iter()
            .filter(|i| i.is_chart)
            .flat_map(|i| i.names.iter())
            .filter(|n| is_chart_class_name(n))
            .cloned()
            .collect();
        for name in imported {
            if !relationships.iter().any(|r| r.target == name) {
                push_relationship(
                    &mut relationships,
                    &class_name,
                    &name,
                    ChartRelationshipKind::Import,
                    true,
                );
            }
        }

        let chart_id =
            chart_id_from_path(file_path).unwrap_or_else(|| chart_id_from_class(&class_name));

        tracing::debug!(
            "Analyzed {} ({}): {} relationships",
            class_name,
            file_path,
            relationships.len()
        );

        Some(AnalyzedChart {
            file_path: file_path.to_string(),
            class_name,
            base_class,
            chart_id,
            documentation,
            props_interface,
            props,
            imports,
            constructor_dependencies,
            method_calls,
            relationships,
        })
    }
}

fn push_relationship(
    relationships: &mut Vec<ChartRelationship>,
    source: &str,
    target: &str,
    kind: ChartRelationshipKind,
    optional: bool,
) {
    if target == source {
        return;
    }
    if relationships
        .iter()
        .any(|r| r.target == target && r.kind == kind)
    {
        return;
    }
    relationships.push(ChartRelationship {
        source: source.to_string(),
        target: target.to_string(),
        kind,
        optional,
    });
}

/// First top-level class extending a chart base, with its declaration node
fn find_chart_class<'a>(root: Node<'a>, source: &str) -> Option<(Node<'a>, Node<'a>)> {
    for child in named_children(root) {
        let class = match child.kind() {
            "class_declaration" | "abstract_class_declaration" => Some(child),
            "export_statement" => child
                .child_by_field_name("declaration")
                .filter(|d| matches!(d.kind(), "class_declaration" | "abstract_class_declaration")),
            _ => None,
        };
        if let Some(class) = class
            && base_class(class, source).is_some_and(|b| is_chart_base(&b))
        {
            return Some((class, child));
        }
    }
    None
}

fn base_class(class: Node<'_>, source: &str) -> Option<String> {
    let heritage = named_children(class)
        .into_iter()
        .find(|c| c.kind() == "class_heritage")?;
    let extends = named_children(heritage)
        .into_iter()
        .find(|c| c.kind() == "extends_clause")?;
    let value = extends
        .child_by_field_name("value")
        .or_else(|| named_children(extends).into_iter().next())?;
    Some(node_text(value, source))
}

fn collect_imports(root: Node<'_>, source: &str) -> Vec<ImportInfo> {
    let mut imports = Vec::new();
    for statement in named_children(root) {
        if statement.kind() != "import_statement" {
            continue;
        }
        let Some(module) = statement
            .child_by_field_name("source")
            .and_then(|s| unquote(&node_text(s, source)))
        else {
            continue;
        };

        let mut names = Vec::new();
        for node in descendants(statement) {
            match node.kind() {
                "import_specifier" => {
                    // `{ A as B }` binds B locally
                    let bound = node
                        .child_by_field_name("alias")
                        .or_else(|| node.child_by_field_name("name"));
                    if let Some(bound) = bound {
                        names.push(node_text(bound, source));
                    }
                }
                "namespace_import" => {
                    if let Some(id) = named_children(node).into_iter().next() {
                        names.push(node_text(id, source));
                    }
                }
                "import_clause" => {
                    // Default import is a bare identifier child
                    for child in named_children(node) {
                        if child.kind() == "identifier" {
                            names.push(node_text(child, source));
                        }
                    }
                }
                _ => {}
            }
        }

        let is_chart = names.iter().any(|n| is_chart_class_name(n))
            || module.ends_with("-chart")
            || module.ends_with("Chart");
        imports.push(ImportInfo {
            source: module,
            names,
            is_chart,
        });
    }
    imports
}

/// Interface name -> properties
fn collect_interfaces(root: Node<'_>, source: &str) -> HashMap<String, Vec<PropInfo>> {
    let mut interfaces = HashMap::new();
    for node in descendants(root) {
        if node.kind() != "interface_declaration" {
            continue;
        }
        let Some(name) = node.child_by_field_name("name").map(|n| node_text(n, source)) else {
            continue;
        };
        let Some(body) = node.child_by_field_name("body") else {
            continue;
        };
        let props = named_children(body)
            .into_iter()
            .filter(|member| member.kind() == "property_signature")
            .filter_map(|member| {
                let prop_name = node_text(member.child_by_field_name("name")?, source);
                let type_name = annotated_type(member, source).unwrap_or_default();
                Some(PropInfo {
                    is_chart_dependency: is_chart_type(&type_name),
                    optional: has_token(member, "?"),
                    name: prop_name,
                    type_name,
                    import_path: None,
                })
            })
            .collect();
        interfaces.insert(name, props);
    }
    interfaces
}

fn find_constructor<'a>(body: Node<'a>, source: &str) -> Option<Node<'a>> {
    named_children(body).into_iter().find(|member| {
        member.kind() == "method_definition"
            && member
                .child_by_field_name("name")
                .is_some_and(|n| node_text(n, source) == "constructor")
    })
}

struct Param {
    name: String,
    type_name: String,
    optional: bool,
}

fn constructor_params(constructor: Node<'_>, source: &str) -> Vec<Param> {
    let Some(params) = constructor.child_by_field_name("parameters") else {
        return Vec::new();
    };
    named_children(params)
        .into_iter()
        .filter(|p| matches!(p.kind(), "required_parameter" | "optional_parameter"))
        .filter_map(|p| {
            let pattern = p.child_by_field_name("pattern")?;
            Some(Param {
                name: node_text(pattern, source),
                type_name: annotated_type(p, source).unwrap_or_default(),
                optional: p.kind() == "optional_parameter",
            })
        })
        .collect()
}

/// Typed class fields: `private readonly db: PostgresChart;`
fn class_fields(body: Node<'_>, source: &str) -> Vec<(String, String)> {
    named_children(body)
        .into_iter()
        .filter(|m| m.kind() == "public_field_definition")
        .filter_map(|m| {
            let name = node_text(m.child_by_field_name("name")?, source);
            let ty = annotated_type(m, source)?;
            Some((name, ty))
        })
        .collect()
}

/// `const x = new FooChart(...)` and `this.x = new FooChart(...)` inside a constructor
fn local_constructions(body: Node<'_>, source: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for node in descendants(body) {
        let (target, value) = match node.kind() {
            "variable_declarator" => (
                node.child_by_field_name("name"),
                node.child_by_field_name("value"),
            ),
            "assignment_expression" => (
                node.child_by_field_name("left").and_then(|l| this_member(l, source)),
                node.child_by_field_name("right"),
            ),
            _ => continue,
        };
        let (Some(target), Some(value)) = (target, value) else {
            continue;
        };
        if let Some(class) = constructed_class(value, source)
            && is_chart_type(&class)
        {
            out.push((node_text(target, source), class));
        }
    }
    out
}

/// Class name of a `new X(...)` expression
pub(crate) fn constructed_class(node: Node<'_>, source: &str) -> Option<String> {
    if node.kind() != "new_expression" {
        return None;
    }
    let constructor = node.child_by_field_name("constructor")?;
    let text = node_text(constructor, source);
    Some(text.rsplit('.').next().unwrap_or(&text).to_string())
}

/// Property node of a `this.<field>` member expression
fn this_member<'a>(node: Node<'a>, _source: &str) -> Option<Node<'a>> {
    if node.kind() != "member_expression" {
        return None;
    }
    let object = node.child_by_field_name("object")?;
    if object.kind() != "this" {
        return None;
    }
    node.child_by_field_name("property")
}

/// Receiver text and method name of a call expression's callee
pub(crate) fn member_call<'a>(node: Node<'a>, source: &str) -> Option<(Option<Node<'a>>, String)> {
    let function = node.child_by_field_name("function")?;
    match function.kind() {
        "member_expression" => {
            let object = function.child_by_field_name("object");
            let method = node_text(function.child_by_field_name("property")?, source);
            Some((object, method))
        }
        "identifier" => Some((None, node_text(function, source))),
        _ => None,
    }
}

fn collect_calls(body: Node<'_>, source: &str) -> Vec<MethodCall> {
    let mut calls = Vec::new();
    for node in descendants(body) {
        match node.kind() {
            "call_expression" => {
                let Some((receiver, method)) = member_call(node, source) else {
                    continue;
                };
                let kind = if INTERESTING_METHODS.contains(&method.as_str()) {
                    MethodCallKind::Method
                } else if method.starts_with("create") && method.len() > "create".len() {
                    MethodCallKind::Factory
                } else {
                    continue;
                };
                calls.push(MethodCall {
                    method,
                    kind,
                    receiver: receiver.map(|r| node_text(r, source)),
                    arguments: call_arguments(node)
                        .into_iter()
                        .map(|a| node_text(a, source))
                        .collect(),
                    line: line_of(node),
                });
            }
            "new_expression" => {
                let Some(class) = constructed_class(node, source) else {
                    continue;
                };
                if class.ends_with("Chart") || class.starts_with("Kube") {
                    calls.push(MethodCall {
                        method: class,
                        kind: MethodCallKind::Construct,
                        receiver: None,
                        arguments: call_arguments(node)
                            .into_iter()
                            .take(2)
                            .map(|a| node_text(a, source))
                            .collect(),
                        line: line_of(node),
                    });
                }
            }
            _ => {}
        }
    }
    calls
}

/// Chart types named by `addDependency` arguments
///
/// Only bare identifiers and `this.<field>` are resolved; other argument
/// shapes are ignored.
fn explicit_dependency_targets(
    body: Node<'_>,
    source: &str,
    type_map: &HashMap<String, String>,
) -> Vec<String> {
    let mut targets = Vec::new();
    for node in descendants(body) {
        if node.kind() != "call_expression" {
            continue;
        }
        let Some((_, method)) = member_call(node, source) else {
            continue;
        };
        if method != "addDependency" {
            continue;
        }
        for arg in call_arguments(node) {
            let key = match arg.kind() {
                "identifier" => Some(node_text(arg, source)),
                "member_expression" => this_member(arg, source).map(|p| node_text(p, source)),
                _ => None,
            };
            let Some(ty) = key.and_then(|k| type_map.get(&k)) else {
                continue;
            };
            if is_chart_type(ty) && !targets.contains(ty) {
                targets.push(ty.clone());
            }
        }
    }
    targets
}

/// Group analyses by class name; later duplicates are dropped with a warning
pub fn index_by_class(analyses: &[AnalyzedChart]) -> BTreeMap<&str, &AnalyzedChart> {
    let mut index = BTreeMap::new();
    for analysis in analyses {
        if index.insert(analysis.class_name.as_str(), analysis).is_some() {
            tracing::warn!(
                "Chart class {} is declared in more than one file; using {}",
                analysis.class_name,
                analysis.file_path
            );
        }
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;

    const BACKSTAGE: &str = r#"
import { Chart, ChartProps } from 'cdk8s';
import { Construct } from 'constructs';
import { PostgresChart } from './postgres-chart';
import { ExternalSecretsChart } from './external-secrets-chart';
import { MonitoringChart } from '../lib/monitoring-chart';

export interface BackstageChartProps extends ChartProps {
  postgres: PostgresChart;
  secrets?: ExternalSecretsChart;
  replicas?: number;
}

/**
 * Backstage developer portal.
 * @tag portal
 */
export class BackstageChart extends Chart {
  private readonly db: PostgresChart;

  constructor(scope: Construct, id: string, props: BackstageChartProps) {
    super(scope, id, props);
    this.db = props.postgres;
    this.addDependency(this.db);
    this.addJsonPatch(JsonPatch.add('/spec', {}));
    new KubeDeployment(this, 'deployment', {});
  }
}
"#;

    #[test]
    fn test_analyze_chart() {
        let mut analyzer = ChartAnalyzer::new().unwrap();
        let chart = analyzer
            .analyze_source("charts/backstage-chart.ts", BACKSTAGE)
            .unwrap();

        assert_eq!(chart.class_name, "BackstageChart");
        assert_eq!(chart.base_class, "Chart");
        assert_eq!(chart.chart_id, "backstage");
        assert_eq!(chart.props_interface.as_deref(), Some("BackstageChartProps"));
        assert_eq!(chart.props.len(), 3);
        assert_eq!(
            chart.documentation.description.as_deref(),
            Some("Backstage developer portal.")
        );

        let deps: Vec<&str> = chart
            .constructor_dependencies
            .iter()
            .map(|d| d.type_name.as_str())
            .collect();
        assert_eq!(deps, vec!["PostgresChart", "ExternalSecretsChart"]);
        assert!(chart.constructor_dependencies[1].optional);
        assert_eq!(
            chart.constructor_dependencies[0].import_path.as_deref(),
            Some("./postgres-chart")
        );

        let kinds: Vec<(&str, ChartRelationshipKind)> = chart
            .relationships
            .iter()
            .map(|r| (r.target.as_str(), r.kind))
            .collect();
        assert!(kinds.contains(&("PostgresChart", ChartRelationshipKind::Constructor)));
        assert!(kinds.contains(&("PostgresChart", ChartRelationshipKind::Explicit)));
        assert!(kinds.contains(&("MonitoringChart", ChartRelationshipKind::Import)));
        assert!(!kinds.contains(&("ExternalSecretsChart", ChartRelationshipKind::Import)));

        let methods: Vec<&str> = chart.method_calls.iter().map(|c| c.method.as_str()).collect();
        assert!(methods.contains(&"addDependency"));
        assert!(methods.contains(&"addJsonPatch"));
        assert!(methods.contains(&"KubeDeployment"));
    }

    #[test]
    fn test_non_chart_file_yields_none() {
        let mut analyzer = ChartAnalyzer::new().unwrap();
        let source = "export class Helper { run() {} }\nexport const x = 1;";
        assert!(analyzer.analyze_source("lib/helper.ts", source).is_none());
    }

    #[test]
    fn test_unresolved_dependency_shapes_are_ignored() {
        let source = r#"
export class AChart extends Chart {
  constructor(scope: Construct, id: string, props: any) {
    super(scope, id);
    this.addDependency(props.other);
    this.addDependency(getChart());
  }
}
"#;
        let mut analyzer = ChartAnalyzer::new().unwrap();
        let chart = analyzer.analyze_source("a-chart.ts", source).unwrap();
        assert!(chart.relationships.is_empty());
    }

    #[test]
    fn test_chart_id_from_class() {
        assert_eq!(chart_id_from_class("BackstageChart"), "backstage");
        assert_eq!(chart_id_from_class("ExternalSecretsChart"), "external-secrets");
        assert_eq!(chart_id_from_class("ArgoCDChart"), "argo-cd");
        assert_eq!(chart_id_from_class("Vcluster2Chart"), "vcluster2");
    }
}
