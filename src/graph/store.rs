//! EntityStore: the canonical, append-only graph of one session
//!
//! All canonical mutation goes through [`EntityStore::merge`]. A merge
//! deduplicates candidates against what is already stored, back-fills
//! `rdf:type` links for untyped instance nodes, drops links whose endpoints
//! do not resolve, and returns only the net-new items.

use super::link::{is_ontology_predicate, normalize_predicate, Link, LinkKey, RDF_TYPE};
use super::node::{Node, NodeId};
use super::ontology::upper_ontology;
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::debug;

/// Why an individual candidate was not merged.
#[derive(Debug, Clone, PartialEq)]
pub enum RejectionReason {
    /// Node id already stored with the same label and kind
    DuplicateNode,
    /// Node id already stored with a different label or kind; the stored one wins
    ConflictingNode,
    /// Link triple already stored
    DuplicateLink,
    /// Link endpoint does not resolve to a stored node
    MissingEndpoint(NodeId),
    /// Candidate is missing a required field
    Malformed(String),
}

impl std::fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateNode => write!(f, "duplicate node"),
            Self::ConflictingNode => write!(f, "conflicting node (first write wins)"),
            Self::DuplicateLink => write!(f, "duplicate link"),
            Self::MissingEndpoint(id) => write!(f, "missing endpoint {}", id),
            Self::Malformed(msg) => write!(f, "malformed: {}", msg),
        }
    }
}

/// A single rejected candidate.
#[derive(Debug, Clone)]
pub struct Rejection {
    /// Human-readable description of what was rejected
    pub description: String,
    /// Why it was rejected
    pub reason: RejectionReason,
}

impl Rejection {
    pub fn new(description: impl Into<String>, reason: RejectionReason) -> Self {
        Self {
            description: description.into(),
            reason,
        }
    }
}

/// The result of a merge: net-new items plus what was dropped.
///
/// Rejections never make a delta non-empty; an empty delta is a no-op
/// for every downstream component.
#[derive(Debug, Clone, Default)]
pub struct MergeDelta {
    pub added_nodes: Vec<Node>,
    pub added_links: Vec<Link>,
    pub rejections: Vec<Rejection>,
}

impl MergeDelta {
    pub fn is_empty(&self) -> bool {
        self.added_nodes.is_empty() && self.added_links.is_empty()
    }

    pub fn added_node_ids(&self) -> Vec<NodeId> {
        self.added_nodes.iter().map(|n| n.id.clone()).collect()
    }

    /// Number of links synthesized by typing back-fill.
    pub fn synthesized_type_links(&self) -> usize {
        self.added_links
            .iter()
            .filter(|l| l.predicate == RDF_TYPE)
            .count()
    }
}

/// The canonical node/link store of one session.
#[derive(Debug, Clone, Default)]
pub struct EntityStore {
    /// Nodes in insertion order
    nodes: Vec<Node>,
    index: HashMap<NodeId, usize>,
    /// Links in insertion order
    links: Vec<Link>,
    link_keys: HashSet<LinkKey>,
    outgoing: HashMap<NodeId, Vec<usize>>,
    /// Instance nodes without an outgoing `rdf:type` link
    untyped: BTreeSet<NodeId>,
}

impl EntityStore {
    /// Create an empty store with no ontology.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-seeded with the upper ontology.
    pub fn seeded() -> Self {
        let mut store = Self::new();
        let (nodes, links) = upper_ontology();
        store.merge(nodes, links);
        store
    }

    /// Merge candidate nodes and links; see the module docs for the rules.
    pub fn merge(&mut self, nodes: Vec<Node>, links: Vec<Link>) -> MergeDelta {
        let mut delta = MergeDelta::default();

        for node in nodes {
            self.accept_node(node, &mut delta);
        }

        for link in links {
            self.accept_link(link, &mut delta);
        }

        self.backfill_types(&mut delta);

        debug!(
            added_nodes = delta.added_nodes.len(),
            added_links = delta.added_links.len(),
            rejected = delta.rejections.len(),
            "merge applied"
        );
        for rejection in &delta.rejections {
            debug!(item = %rejection.description, reason = %rejection.reason, "merge rejection");
        }

        delta
    }

    fn accept_node(&mut self, node: Node, delta: &mut MergeDelta) {
        if node.id.as_str().trim().is_empty() {
            delta.rejections.push(Rejection::new(
                format!("node '{}'", node.label),
                RejectionReason::Malformed("empty id".to_string()),
            ));
            return;
        }

        if let Some(existing) = self.node(&node.id) {
            let reason = if existing.conflicts_with(&node) {
                RejectionReason::ConflictingNode
            } else {
                RejectionReason::DuplicateNode
            };
            delta
                .rejections
                .push(Rejection::new(format!("node {}", node.id), reason));
            return;
        }

        if !node.is_class() {
            self.untyped.insert(node.id.clone());
        }
        self.index.insert(node.id.clone(), self.nodes.len());
        self.nodes.push(node.clone());
        delta.added_nodes.push(node);
    }

    fn accept_link(&mut self, mut link: Link, delta: &mut MergeDelta) {
        let Some(predicate) = normalize_predicate(&link.predicate) else {
            delta.rejections.push(Rejection::new(
                format!("link {} -> {}", link.source, link.target),
                RejectionReason::Malformed("empty predicate".to_string()),
            ));
            return;
        };
        link.predicate = predicate;
        if link.label.trim().is_empty() {
            link.label = link.predicate.clone();
        }

        let description = format!("link {} -[{}]-> {}", link.source, link.predicate, link.target);
        let key = link.key();
        if self.link_keys.contains(&key) {
            delta
                .rejections
                .push(Rejection::new(description, RejectionReason::DuplicateLink));
            return;
        }

        let source_is_class = match self.node(&link.source) {
            Some(node) => node.is_class(),
            None => {
                delta.rejections.push(Rejection::new(
                    description,
                    RejectionReason::MissingEndpoint(link.source.clone()),
                ));
                return;
            }
        };
        let target_is_class = match self.node(&link.target) {
            Some(node) => node.is_class(),
            None => {
                delta.rejections.push(Rejection::new(
                    description,
                    RejectionReason::MissingEndpoint(link.target.clone()),
                ));
                return;
            }
        };

        link.is_ontology_link =
            is_ontology_predicate(&link.predicate) || source_is_class || target_is_class;

        if link.predicate == RDF_TYPE {
            self.untyped.remove(&link.source);
        }
        self.outgoing
            .entry(link.source.clone())
            .or_default()
            .push(self.links.len());
        self.link_keys.insert(key);
        self.links.push(link.clone());
        delta.added_links.push(link);
    }

    /// Give every untyped instance node an `rdf:type` link to its kind's class.
    ///
    /// Nodes whose class is absent (unseeded store) stay untyped until the
    /// class appears.
    fn backfill_types(&mut self, delta: &mut MergeDelta) {
        let pending: Vec<(NodeId, NodeId)> = self
            .untyped
            .iter()
            .filter_map(|id| self.node(id).map(|node| (id.clone(), node.kind.class_id())))
            .filter(|(_, class_id)| self.node(class_id).is_some_and(Node::is_class))
            .collect();

        for (id, class_id) in pending {
            let link = Link::new(id, class_id, RDF_TYPE).with_label("type");
            self.accept_link(link, delta);
        }
    }

    // --- Read ---

    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.index.contains_key(id)
    }

    pub fn contains_link(&self, source: &NodeId, target: &NodeId, predicate: &str) -> bool {
        self.link_keys.contains(&LinkKey {
            source: source.clone(),
            target: target.clone(),
            predicate: predicate.to_string(),
        })
    }

    /// Nodes in insertion order
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Links in insertion order
    pub fn links(&self) -> &[Link] {
        &self.links
    }

    /// Outgoing links of a node, in insertion order
    pub fn outgoing(&self, id: &NodeId) -> impl Iterator<Item = &Link> {
        self.outgoing
            .get(id)
            .into_iter()
            .flat_map(|indices| indices.iter().map(|&i| &self.links[i]))
    }

    /// Ids of all Class nodes; handed to extractors as known classes.
    pub fn class_ids(&self) -> Vec<String> {
        self.nodes
            .iter()
            .filter(|n| n.is_class())
            .map(|n| n.id.as_str().to_string())
            .collect()
    }

    /// True if the node has at least one outgoing `rdf:type` link.
    pub fn is_typed(&self, id: &NodeId) -> bool {
        self.outgoing(id).any(|l| l.predicate == RDF_TYPE)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
