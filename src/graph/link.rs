//! Directed, predicate-labelled links between nodes

use super::node::NodeId;
use serde::{Deserialize, Serialize};

/// Predicate typing an instance by its class
pub const RDF_TYPE: &str = "rdf:type";
/// Predicate relating a class to its superclass
pub const RDFS_SUBCLASS_OF: &str = "rdfs:subClassOf";

/// Normalize a predicate as emitted by an extractor.
///
/// Trims whitespace and maps the usual shorthands onto the RDF names.
/// Returns `None` for an empty predicate.
pub fn normalize_predicate(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    match trimmed {
        "" => None,
        "a" | "type" => Some(RDF_TYPE.to_string()),
        "subClassOf" => Some(RDFS_SUBCLASS_OF.to_string()),
        other => Some(other.to_string()),
    }
}

/// True for predicates that express typing or subsumption.
pub fn is_ontology_predicate(predicate: &str) -> bool {
    predicate == RDF_TYPE || predicate == RDFS_SUBCLASS_OF
}

/// Identity of a link: the same triple may not appear twice in a graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LinkKey {
    pub source: NodeId,
    pub target: NodeId,
    pub predicate: String,
}

/// A directed link
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    /// Source node
    pub source: NodeId,
    /// Target node
    pub target: NodeId,
    /// Relation name (e.g. "org:memberOf", "rdf:type")
    pub predicate: String,
    /// Display string
    pub label: String,
    /// Derived at merge time; see [`is_ontology_predicate`]
    #[serde(default)]
    pub is_ontology_link: bool,
}

impl Link {
    /// Create a link; the label defaults to the predicate.
    pub fn new(
        source: impl Into<NodeId>,
        target: impl Into<NodeId>,
        predicate: impl Into<String>,
    ) -> Self {
        let predicate = predicate.into();
        Self {
            source: source.into(),
            target: target.into(),
            label: predicate.clone(),
            predicate,
            is_ontology_link: false,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn key(&self) -> LinkKey {
        LinkKey {
            source: self.source.clone(),
            target: self.target.clone(),
            predicate: self.predicate.clone(),
        }
    }

    pub fn is_self_link(&self) -> bool {
        self.source == self.target
    }
}
