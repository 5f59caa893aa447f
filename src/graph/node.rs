//! Node representation in the knowledge graph

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Unique, caller-assigned identifier for a node
///
/// Serializes as a plain string (e.g. "UN", "Person", "person:ada-lovelace")
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Create a NodeId from a string
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Entity classification
///
/// `Class` marks a schema node (T-Box); every other kind is an instance
/// node (A-Box) whose canonical name doubles as the id of its Class node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Person,
    Organization,
    Location,
    Event,
    Concept,
    Document,
    Artifact,
    Class,
}

impl NodeKind {
    /// Every instance kind, in declaration order.
    pub const INSTANCE_KINDS: [NodeKind; 7] = [
        NodeKind::Person,
        NodeKind::Organization,
        NodeKind::Location,
        NodeKind::Event,
        NodeKind::Concept,
        NodeKind::Document,
        NodeKind::Artifact,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Person => "Person",
            Self::Organization => "Organization",
            Self::Location => "Location",
            Self::Event => "Event",
            Self::Concept => "Concept",
            Self::Document => "Document",
            Self::Artifact => "Artifact",
            Self::Class => "Class",
        }
    }

    pub fn is_class(self) -> bool {
        self == Self::Class
    }

    /// Id of the Class node that types instances of this kind.
    pub fn class_id(self) -> NodeId {
        NodeId::from(self.as_str())
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a kind name is not recognized
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown node kind: {0}")]
pub struct UnknownKind(pub String);

impl FromStr for NodeKind {
    type Err = UnknownKind;

    /// Case-insensitive; accepts a few common aliases emitted by extractors.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "person" | "people" => Ok(Self::Person),
            "organization" | "organisation" | "org" => Ok(Self::Organization),
            "location" | "place" => Ok(Self::Location),
            "event" => Ok(Self::Event),
            "concept" | "topic" => Ok(Self::Concept),
            "document" => Ok(Self::Document),
            "artifact" | "artefact" => Ok(Self::Artifact),
            "class" => Ok(Self::Class),
            _ => Err(UnknownKind(s.to_string())),
        }
    }
}

/// Typed property values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl PropertyValue {
    /// Convert a JSON scalar; arrays, objects and null have no property form.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Bool(b) => Some(Self::Bool(*b)),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(Self::Int)
                .or_else(|| n.as_f64().map(Self::Float)),
            serde_json::Value::String(s) => Some(Self::String(s.clone())),
            _ => None,
        }
    }
}

/// Properties collection (ordered for stable export)
pub type Properties = BTreeMap<String, PropertyValue>;

/// A node in the knowledge graph
///
/// Nodes are immutable once stored: the first write for an id wins.
/// Layout state (position, velocity, pin) is kept by the layout engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique identifier
    pub id: NodeId,
    /// Display string
    pub label: String,
    /// Entity classification
    pub kind: NodeKind,
    /// Domain-specific properties
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: Properties,
}

impl Node {
    /// Create a new node
    pub fn new(id: impl Into<NodeId>, label: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            kind,
            properties: BTreeMap::new(),
        }
    }

    /// Create a schema (Class) node
    pub fn class(id: impl Into<NodeId>, label: impl Into<String>) -> Self {
        Self::new(id, label, NodeKind::Class)
    }

    /// Add a property to the node
    pub fn with_property(mut self, key: impl Into<String>, value: PropertyValue) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    pub fn is_class(&self) -> bool {
        self.kind.is_class()
    }

    /// True when `other` carries a different label or kind for the same id.
    pub fn conflicts_with(&self, other: &Node) -> bool {
        self.id == other.id && (self.label != other.label || self.kind != other.kind)
    }
}
