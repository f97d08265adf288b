//! tree-sitter helpers shared by the chart and entry-point analyzers

use super::{AnalysisError, AnalysisResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tree_sitter::{Node, Parser};

/// Parser configured for TypeScript sources
pub fn typescript_parser() -> AnalysisResult<Parser> {
    let mut parser = Parser::new();
    let language = tree_sitter_typescript::LANGUAGE_TYPESCRIPT;
    parser
        .set_language(&language.into())
        .map_err(|e| AnalysisError::Language(e.to_string()))?;
    Ok(parser)
}

pub fn node_text(node: Node<'_>, source: &str) -> String {
    source
        .get(node.start_byte()..node.end_byte())
        .unwrap_or("")
        .trim()
        .to_string()
}

/// 1-based line of a node
pub fn line_of(node: Node<'_>) -> usize {
    node.start_position().row + 1
}

pub fn named_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}

/// Whether a node has an anonymous child token such as `?`
pub fn has_token(node: Node<'_>, token: &str) -> bool {
    let mut cursor = node.walk();
    let found = node
        .children(&mut cursor)
        .any(|child| !child.is_named() && child.kind() == token);
    found
}

/// Every descendant in source order, including the node itself
///
/// Explicit stack so deeply nested sources cannot exhaust the call stack.
pub fn descendants(node: Node<'_>) -> Vec<Node<'_>> {
    let mut out = Vec::new();
    let mut stack = vec![node];
    while let Some(current) = stack.pop() {
        out.push(current);
        let mut children = named_children(current);
        children.reverse();
        stack.extend(children);
    }
    out
}

pub fn unquote(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.len() < 2 {
        return None;
    }
    let first = trimmed.chars().next()?;
    if matches!(first, '"' | '\'' | '`') && trimmed.ends_with(first) {
        return Some(trimmed[1..trimmed.len() - 1].to_string());
    }
    None
}

/// Arguments of a call or `new` expression
pub fn call_arguments(node: Node<'_>) -> Vec<Node<'_>> {
    node.child_by_field_name("arguments")
        .map(named_children)
        .unwrap_or_default()
}

/// Bare type name from an annotation such as `: Foo<Bar> | undefined`
pub fn type_name(annotation: &str) -> String {
    let raw = annotation.trim().trim_start_matches(':').trim();
    let primary = raw
        .split('|')
        .map(str::trim)
        .find(|part| !matches!(*part, "undefined" | "null" | ""))
        .unwrap_or(raw);
    let without_generics = primary.split('<').next().unwrap_or(primary);
    let without_array = without_generics.trim_end_matches("[]").trim();
    without_array
        .rsplit('.')
        .next()
        .unwrap_or(without_array)
        .to_string()
}

/// Type text of a node's `type` field (a type annotation)
pub fn annotated_type(node: Node<'_>, source: &str) -> Option<String> {
    let annotation = node.child_by_field_name("type")?;
    let name = type_name(&node_text(annotation, source));
    (!name.is_empty()).then_some(name)
}

/// JSDoc block attached to a declaration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsDoc {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Tag name -> values in source order
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, Vec<String>>,
    /// `@example` blocks with their line structure kept
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<String>,
}

impl JsDoc {
    pub fn tag_values(&self, tag: &str) -> &[String] {
        self.tags.get(tag).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.description.is_none() && self.tags.is_empty() && self.examples.is_empty()
    }
}

/// `/** ... */` comment immediately preceding a node
pub fn preceding_jsdoc(node: Node<'_>, source: &str) -> Option<String> {
    let prev = node.prev_named_sibling()?;
    if prev.kind() != "comment" {
        return None;
    }
    let text = node_text(prev, source);
    text.starts_with("/**").then_some(text)
}

/// Parse a raw JSDoc comment
pub fn parse_jsdoc(raw: &str) -> JsDoc {
    let body = raw
        .trim()
        .trim_start_matches("/**")
        .trim_end_matches("*/");

    let mut doc = JsDoc::default();
    let mut description: Vec<String> = Vec::new();
    // (tag, lines) of the tag being collected
    let mut current: Option<(String, Vec<String>)> = None;

    for line in body.lines() {
        let stripped = line.trim_start();
        let stripped = stripped.strip_prefix('*').unwrap_or(stripped);
        // Keep example indentation past the conventional single space
        let content = stripped.strip_prefix(' ').unwrap_or(stripped);

        if let Some(tag_line) = content.trim_start().strip_prefix('@') {
            if let Some((tag, lines)) = current.take() {
                finish_tag(&mut doc, tag, lines);
            }
            let mut parts = tag_line.splitn(2, char::is_whitespace);
            let tag = parts.next().unwrap_or_default().to_string();
            let rest = parts.next().unwrap_or_default().trim().to_string();
            let lines = if rest.is_empty() { Vec::new() } else { vec![rest] };
            current = Some((tag, lines));
        } else if let Some((_, lines)) = current.as_mut() {
            lines.push(content.trim_end().to_string());
        } else {
            let text = content.trim();
            if !text.is_empty() {
                description.push(text.to_string());
            }
        }
    }
    if let Some((tag, lines)) = current.take() {
        finish_tag(&mut doc, tag, lines);
    }

    if !description.is_empty() {
        doc.description = Some(description.join(" "));
    }
    doc
}

fn finish_tag(doc: &mut JsDoc, tag: String, lines: Vec<String>) {
    if tag == "example" {
        let example = lines.join("\n").trim_matches('\n').trim_end().to_string();
        if !example.is_empty() {
            doc.examples.push(example);
        }
        return;
    }
    let value = lines
        .iter()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    doc.tags.entry(tag).or_default().push(value);
}
