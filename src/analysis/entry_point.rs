//! Runtime wiring recovered from the entry point
//!
//! Recognized shapes:
//!
//! ```text
//! const backstage = new BackstageChart(app, 'backstage', { postgres, db: pg });
//! backstage.addDependency(postgres);
//! ```

use super::chart::{ChartAnalyzer, constructed_class, is_chart_type, member_call};
use super::syntax::{call_arguments, descendants, line_of, named_children, node_text, unquote};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tree_sitter::Node;

/// `const <variable> = new <class_name>(scope, '<id>', ...)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstructionFact {
    pub variable: String,
    pub class_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart_id: Option<String>,
    /// Other chart variables passed as arguments or props values
    #[serde(default)]
    pub constructed_with: Vec<String>,
    pub line: usize,
}

/// `<dependent>.addDependency(<dependency>)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyFact {
    pub dependent: String,
    pub dependency: String,
    pub line: usize,
}

/// Structured facts of an entry point
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryPointFacts {
    pub constructions: Vec<ConstructionFact>,
    pub dependencies: Vec<DependencyFact>,
}

impl EntryPointFacts {
    pub fn class_of(&self, variable: &str) -> Option<&str> {
        self.constructions
            .iter()
            .find(|c| c.variable == variable)
            .map(|c| c.class_name.as_str())
    }

    /// `(dependent class, dependency class)` pairs from both fact kinds
    pub fn class_dependencies(&self) -> BTreeSet<(String, String)> {
        let mut pairs = BTreeSet::new();
        for construction in &self.constructions {
            for var in &construction.constructed_with {
                if let Some(dep) = self.class_of(var) {
                    pairs.insert((construction.class_name.clone(), dep.to_string()));
                }
            }
        }
        for fact in &self.dependencies {
            if let (Some(dependent), Some(dependency)) =
                (self.class_of(&fact.dependent), self.class_of(&fact.dependency))
            {
                pairs.insert((dependent.to_string(), dependency.to_string()));
            }
        }
        pairs.retain(|(a, b)| a != b);
        pairs
    }

    /// Chart class -> runtime chart id, for constructions with a literal id
    pub fn chart_ids(&self) -> BTreeMap<String, String> {
        self.constructions
            .iter()
            .filter_map(|c| Some((c.class_name.clone(), c.chart_id.clone()?)))
            .collect()
    }
}

impl ChartAnalyzer {
    /// Parse an entry point into construction and dependency facts
    pub fn analyze_entry_point(&mut self, source: &str) -> EntryPointFacts {
        let Some(tree) = self.parser.parse(source, None) else {
            tracing::warn!("Entry point could not be parsed");
            return EntryPointFacts::default();
        };
        let nodes = descendants(tree.root_node());

        // Pass 1: chart variables, so props can reference later declarations
        let mut constructions: Vec<(ConstructionFact, Node<'_>)> = Vec::new();
        for node in &nodes {
            if node.kind() != "variable_declarator" {
                continue;
            }
            let (Some(name), Some(value)) = (
                node.child_by_field_name("name"),
                node.child_by_field_name("value"),
            ) else {
                continue;
            };
            let Some(class_name) = constructed_class(value, source) else {
                continue;
            };
            if !is_chart_type(&class_name) {
                continue;
            }
            let args = call_arguments(value);
            let chart_id = args.get(1).and_then(|a| unquote(&node_text(*a, source)));
            constructions.push((
                ConstructionFact {
                    variable: node_text(name, source),
                    class_name,
                    chart_id,
                    constructed_with: Vec::new(),
                    line: line_of(*node),
                },
                value,
            ));
        }

        let variables: BTreeSet<String> = constructions
            .iter()
            .map(|(fact, _)| fact.variable.clone())
            .collect();

        // Pass 2: constructed-with references
        let constructions = constructions
            .into_iter()
            .map(|(mut fact, value)| {
                let mut with = Vec::new();
                for arg in call_arguments(value) {
                    collect_chart_refs(arg, source, &variables, &mut with);
                }
                with.retain(|v| v != &fact.variable);
                fact.constructed_with = with;
                fact
            })
            .collect();

        let mut dependencies = Vec::new();
        for node in &nodes {
            if node.kind() != "call_expression" {
                continue;
            }
            let Some((Some(receiver), method)) = member_call(*node, source) else {
                continue;
            };
            if method != "addDependency" || receiver.kind() != "identifier" {
                continue;
            }
            let dependent = node_text(receiver, source);
            for arg in call_arguments(*node) {
                if arg.kind() != "identifier" {
                    continue;
                }
                dependencies.push(DependencyFact {
                    dependent: dependent.clone(),
                    dependency: node_text(arg, source),
                    line: line_of(*node),
                });
            }
        }

        let facts = EntryPointFacts {
            constructions,
            dependencies,
        };
        tracing::debug!(
            "Entry point: {} chart constructions, {} addDependency calls",
            facts.constructions.len(),
            facts.dependencies.len()
        );
        facts
    }
}

/// Identifiers and object-literal values naming chart variables
fn collect_chart_refs(
    node: Node<'_>,
    source: &str,
    variables: &BTreeSet<String>,
    out: &mut Vec<String>,
) {
    let mut push = |name: String| {
        if variables.contains(&name) && !out.contains(&name) {
            out.push(name);
        }
    };
    match node.kind() {
        "identifier" => push(node_text(node, source)),
        "object" => {
            for member in named_children(node) {
                match member.kind() {
                    "shorthand_property_identifier" => push(node_text(member, source)),
                    "pair" => {
                        if let Some(value) = member.child_by_field_name("value")
                            && value.kind() == "identifier"
                        {
                            push(node_text(value, source));
                        }
                    }
                    _ => {}
                }
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAIN: &str = r#"
import { App } from 'cdk8s';

const app = new App();
const postgres = new PostgresChart(app, 'postgres', { namespace: 'db' });
const secrets = new ExternalSecretsChart(app, 'external-secrets');
const backstage = new BackstageChart(app, 'backstage', { postgres, store: secrets, replicas: 2 });
const monitoring = new MonitoringChart(app, 'monitoring');
monitoring.addDependency(backstage);
monitoring.addDependency(unknownThing);
app.synth();
"#;

    #[test]
    fn test_construction_facts() {
        let mut analyzer = ChartAnalyzer::new().unwrap();
        let facts = analyzer.analyze_entry_point(MAIN);

        assert_eq!(facts.constructions.len(), 4);
        let backstage = &facts.constructions[2];
        assert_eq!(backstage.variable, "backstage");
        assert_eq!(backstage.class_name, "BackstageChart");
        assert_eq!(backstage.chart_id.as_deref(), Some("backstage"));
        assert_eq!(backstage.constructed_with, vec!["postgres", "secrets"]);
    }

    #[test]
    fn test_class_dependencies() {
        let mut analyzer = ChartAnalyzer::new().unwrap();
        let facts = analyzer.analyze_entry_point(MAIN);
        let pairs = facts.class_dependencies();

        assert!(pairs.contains(&("BackstageChart".to_string(), "PostgresChart".to_string())));
        assert!(pairs.contains(&(
            "BackstageChart".to_string(),
            "ExternalSecretsChart".to_string()
        )));
        assert!(pairs.contains(&("MonitoringChart".to_string(), "BackstageChart".to_string())));
        // unknownThing is not a chart variable
        assert_eq!(pairs.len(), 3);
        assert_eq!(facts.dependencies.len(), 2);
    }

    #[test]
    fn test_chart_ids() {
        let mut analyzer = ChartAnalyzer::new().unwrap();
        let ids = analyzer.analyze_entry_point(MAIN).chart_ids();
        assert_eq!(ids.get("ExternalSecretsChart").map(String::as_str), Some("external-secrets"));
    }
}
