//! Fragment: one batch of candidate nodes and links, validated at the boundary
//!
//! Extractor responses are duck-typed JSON, often wrapped in prose or a
//! fenced code block. Nothing unchecked crosses this boundary: a response
//! either parses into a [`Fragment`] of typed candidates or fails with a
//! [`ParseFailure`]. Fields of the wrong shape are treated as empty, and
//! individual malformed items are dropped with a rejection.

use crate::graph::{Link, Node, NodeId, NodeKind, Properties, PropertyValue, Rejection, RejectionReason};
use serde_json::{Map, Value};
use thiserror::Error;

/// Why a response could not be read as a fragment at all.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseFailure {
    #[error("no JSON object found in response")]
    NoJson,
    #[error("expected a JSON object, found {0}")]
    NotAnObject(&'static str),
}

/// Candidate nodes and links prior to merge validation.
#[derive(Debug, Clone, Default)]
pub struct Fragment {
    pub nodes: Vec<Node>,
    pub links: Vec<Link>,
    /// Items dropped while parsing
    pub rejections: Vec<Rejection>,
}

impl Fragment {
    pub fn new(nodes: Vec<Node>, links: Vec<Link>) -> Self {
        Self {
            nodes,
            links,
            rejections: Vec::new(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.links.is_empty()
    }

    /// Parse raw response text (pure JSON, fenced JSON, or JSON inside prose).
    pub fn from_response_text(text: &str) -> Result<Self, ParseFailure> {
        let value = extract_json(text).ok_or(ParseFailure::NoJson)?;
        Self::from_value(&value)
    }

    /// Parse a JSON value shaped as `{ "nodes": [...], "links": [...] }`.
    ///
    /// `edges` is accepted in place of `links`. A missing or non-list field
    /// is an empty list.
    pub fn from_value(value: &Value) -> Result<Self, ParseFailure> {
        let object = value
            .as_object()
            .ok_or_else(|| ParseFailure::NotAnObject(json_type_name(value)))?;

        let mut fragment = Fragment::empty();

        for item in list_field(object, &["nodes", "entities"]) {
            match parse_node(item) {
                Ok(node) => fragment.nodes.push(node),
                Err(rejection) => fragment.rejections.push(rejection),
            }
        }

        for item in list_field(object, &["links", "edges", "relationships"]) {
            match parse_link(item) {
                Ok(link) => fragment.links.push(link),
                Err(rejection) => fragment.rejections.push(rejection),
            }
        }

        Ok(fragment)
    }
}

/// Extract a JSON object from response text.
///
/// Tries, in order:
/// 1. Direct parse
/// 2. A ```json ... ``` or ``` ... ``` fenced block
/// 3. The span from the first `{` to the last `}`
pub fn extract_json(text: &str) -> Option<Value> {
    let trimmed = text.trim();

    if let Ok(v) = serde_json::from_str::<Value>(trimmed) {
        if v.is_object() {
            return Some(v);
        }
    }

    let fenced = if let Some(start) = trimmed.find("```json") {
        let after = &trimmed[start + 7..];
        after.find("```").map(|end| &after[..end])
    } else if let Some(start) = trimmed.find("```\n") {
        let after = &trimmed[start + 4..];
        after.find("```").map(|end| &after[..end])
    } else {
        None
    };

    if let Some(block) = fenced {
        if let Ok(v) = serde_json::from_str::<Value>(block.trim()) {
            if v.is_object() {
                return Some(v);
            }
        }
    }

    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if start < end {
            if let Ok(v) = serde_json::from_str::<Value>(&trimmed[start..=end]) {
                if v.is_object() {
                    return Some(v);
                }
            }
        }
    }

    None
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// The first of `keys` holding an array; anything else reads as empty.
fn list_field<'a>(object: &'a Map<String, Value>, keys: &[&str]) -> &'a [Value] {
    keys.iter()
        .find_map(|key| object.get(*key).and_then(Value::as_array))
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Read a string-ish field: strings as-is, numbers stringified, and
/// `{ "id": ... }` objects (endpoint references) by their id.
fn string_field(object: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match object.get(*key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Object(inner) => string_field(inner, &["id"]),
        _ => None,
    })
}

fn parse_node(item: &Value) -> Result<Node, Rejection> {
    let object = item.as_object().ok_or_else(|| {
        Rejection::new(
            format!("node item {}", item),
            RejectionReason::Malformed(format!("expected object, found {}", json_type_name(item))),
        )
    })?;

    let id = string_field(object, &["id", "@id"]).ok_or_else(|| {
        Rejection::new(
            format!("node item {}", item),
            RejectionReason::Malformed("missing id".to_string()),
        )
    })?;

    let label = string_field(object, &["label", "name"]).unwrap_or_else(|| id.clone());
    // Unrecognized kinds fall back to Concept rather than dropping the entity.
    let kind = string_field(object, &["kind", "type", "@type"])
        .and_then(|k| k.parse::<NodeKind>().ok())
        .unwrap_or(NodeKind::Concept);

    let mut properties = Properties::new();
    if let Some(Value::Object(props)) = object.get("properties") {
        for (key, value) in props {
            if let Some(value) = PropertyValue::from_json(value) {
                properties.insert(key.clone(), value);
            }
        }
    }

    let mut node = Node::new(NodeId::from(id), label, kind);
    node.properties = properties;
    Ok(node)
}

fn parse_link(item: &Value) -> Result<Link, Rejection> {
    let object = item.as_object().ok_or_else(|| {
        Rejection::new(
            format!("link item {}", item),
            RejectionReason::Malformed(format!("expected object, found {}", json_type_name(item))),
        )
    })?;

    let missing = |field: &str| {
        Rejection::new(
            format!("link item {}", item),
            RejectionReason::Malformed(format!("missing {}", field)),
        )
    };

    let source = string_field(object, &["source", "sourceId", "from"]).ok_or_else(|| missing("source"))?;
    let target = string_field(object, &["target", "targetId", "to"]).ok_or_else(|| missing("target"))?;
    let predicate =
        string_field(object, &["predicate", "relation"]).ok_or_else(|| missing("predicate"))?;

    let mut link = Link::new(NodeId::from(source), NodeId::from(target), predicate);
    if let Some(label) = string_field(object, &["label"]) {
        link = link.with_label(label);
    }
    Ok(link)
}
