//! Filtered view: the renderable subset of the canonical graph
//!
//! A view is derived, never stored back: it clones what it keeps and leaves
//! the store untouched. A link is kept only when both of its endpoints are.

use crate::graph::{EntityStore, Link, Node, NodeId, NodeKind};
use crate::layout::{LayoutLink, LayoutNode};
use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Active filter predicates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Filters {
    /// Keep only instances of this kind; Class nodes are exempt. `None` keeps all.
    pub type_filter: Option<NodeKind>,
    /// When false, drop every Class node and every ontology link
    pub show_ontology_layer: bool,
    /// Highlights label matches; never removes nodes
    pub search_term: String,
}

impl Default for Filters {
    fn default() -> Self {
        Self {
            type_filter: None,
            show_ontology_layer: true,
            search_term: String::new(),
        }
    }
}

impl Filters {
    pub fn with_type(mut self, kind: NodeKind) -> Self {
        self.type_filter = Some(kind);
        self
    }

    pub fn with_ontology_layer(mut self, show: bool) -> Self {
        self.show_ontology_layer = show;
        self
    }

    pub fn with_search(mut self, term: impl Into<String>) -> Self {
        self.search_term = term.into();
        self
    }

    fn keeps_node(&self, node: &Node) -> bool {
        if node.is_class() {
            return self.show_ontology_layer;
        }
        self.type_filter.map_or(true, |kind| node.kind == kind)
    }

    fn keeps_link_kind(&self, link: &Link) -> bool {
        self.show_ontology_layer || !link.is_ontology_link
    }

    /// Case-insensitive substring match on the label.
    pub fn highlights(&self, label: &str) -> bool {
        let term = self.search_term.trim();
        !term.is_empty() && label.to_lowercase().contains(&term.to_lowercase())
    }
}

/// A kept node and whether it matches the search term.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewNode {
    pub node: Node,
    pub highlighted: bool,
}

/// Visible nodes and links, in store insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewGraph {
    pub nodes: Vec<ViewNode>,
    pub links: Vec<Link>,
}

/// Counts for a status line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ViewCounts {
    pub nodes: usize,
    pub links: usize,
    pub highlighted: usize,
}

/// Derive the view of `store` under `filters`.
pub fn view(store: &EntityStore, filters: &Filters) -> ViewGraph {
    let mut kept: HashSet<&NodeId> = HashSet::new();
    let mut nodes = Vec::new();
    for node in store.nodes() {
        if filters.keeps_node(node) {
            kept.insert(&node.id);
            nodes.push(ViewNode {
                node: node.clone(),
                highlighted: filters.highlights(&node.label),
            });
        }
    }

    let links = store
        .links()
        .iter()
        .filter(|link| filters.keeps_link_kind(link))
        .filter(|link| kept.contains(&link.source) && kept.contains(&link.target))
        .cloned()
        .collect();

    ViewGraph { nodes, links }
}

impl ViewGraph {
    pub fn contains(&self, id: &NodeId) -> bool {
        self.nodes.iter().any(|n| &n.node.id == id)
    }

    pub fn highlighted(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|n| n.highlighted).map(|n| &n.node)
    }

    pub fn counts(&self) -> ViewCounts {
        ViewCounts {
            nodes: self.nodes.len(),
            links: self.links.len(),
            highlighted: self.nodes.iter().filter(|n| n.highlighted).count(),
        }
    }

    /// Visible nodes ranked by fuzzy label match, best first.
    pub fn ranked_matches(&self, term: &str, limit: usize) -> Vec<(NodeId, i64)> {
        let term = term.trim();
        if term.is_empty() {
            return Vec::new();
        }

        let matcher = SkimMatcherV2::default();
        let mut matches: Vec<(NodeId, i64)> = self
            .nodes
            .iter()
            .filter_map(|n| {
                fuzzy_score(&matcher, &n.node.label, term).map(|score| (n.node.id.clone(), score))
            })
            .collect();
        matches.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        matches.truncate(limit);
        matches
    }

    /// Node set for the layout engine.
    pub fn layout_nodes(&self) -> impl Iterator<Item = LayoutNode> + '_ {
        self.nodes.iter().map(|n| LayoutNode {
            id: n.node.id.clone(),
            is_class: n.node.is_class(),
        })
    }

    /// Link set for the layout engine.
    pub fn layout_links(&self) -> impl Iterator<Item = LayoutLink> + '_ {
        self.links.iter().map(|l| LayoutLink {
            source: l.source.clone(),
            target: l.target.clone(),
            is_ontology_link: l.is_ontology_link,
        })
    }
}

fn fuzzy_score(matcher: &SkimMatcherV2, text: &str, query: &str) -> Option<i64> {
    matcher
        .fuzzy_match(text, query)
        .or_else(|| matcher.fuzzy_match(&text.to_lowercase(), &query.to_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Link, RDF_TYPE};

    fn store() -> EntityStore {
        let mut store = EntityStore::seeded();
        store.merge(
            vec![
                Node::new("ada", "Ada Lovelace", NodeKind::Person),
                Node::new("UN", "United Nations", NodeKind::Organization),
                Node::new("geneva", "Geneva", NodeKind::Location),
            ],
            vec![
                Link::new("ada", "UN", "org:memberOf"),
                Link::new("UN", "geneva", "schema:location"),
            ],
        );
        store
    }

    fn ids(view: &ViewGraph) -> Vec<&str> {
        view.nodes.iter().map(|n| n.node.id.as_str()).collect()
    }

    fn assert_sound(view: &ViewGraph) {
        for link in &view.links {
            assert!(view.contains(&link.source), "dangling source {}", link.source);
            assert!(view.contains(&link.target), "dangling target {}", link.target);
        }
    }

    #[test]
    fn default_filters_show_everything() {
        let store = store();
        let view = view(&store, &Filters::default());
        assert_eq!(view.nodes.len(), store.node_count());
        assert_eq!(view.links.len(), store.link_count());
        assert_sound(&view);
    }

    #[test]
    fn person_filter_keeps_classes_and_drops_cross_kind_links() {
        let store = store();
        let view = view(&store, &Filters::default().with_type(NodeKind::Person));

        let ids = ids(&view);
        assert!(ids.contains(&"ada"));
        assert!(ids.contains(&"Person"));
        assert!(ids.contains(&"Organization"));
        assert!(!ids.contains(&"UN"));
        assert!(!ids.contains(&"geneva"));
        assert!(!view.links.iter().any(|l| l.predicate == "org:memberOf"));
        assert!(view
            .links
            .iter()
            .any(|l| l.source.as_str() == "ada" && l.predicate == RDF_TYPE));
        assert_sound(&view);
    }

    #[test]
    fn hiding_ontology_drops_classes_and_ontology_links() {
        let store = store();
        let view = view(&store, &Filters::default().with_ontology_layer(false));

        assert!(view.nodes.iter().all(|n| !n.node.is_class()));
        assert!(view.links.iter().all(|l| !l.is_ontology_link));
        assert_eq!(ids(&view), vec!["ada", "UN", "geneva"]);
        assert_eq!(view.links.len(), 2);
        assert_sound(&view);
    }

    #[test]
    fn search_highlights_without_removing() {
        let store = store();
        let unfiltered = view(&store, &Filters::default());
        let searched = view(&store, &Filters::default().with_search("  nations "));

        assert_eq!(searched.nodes.len(), unfiltered.nodes.len());
        let highlighted: Vec<_> = searched.highlighted().map(|n| n.id.as_str()).collect();
        assert_eq!(highlighted, vec!["UN"]);
        assert_eq!(searched.counts().highlighted, 1);
    }

    #[test]
    fn blank_search_highlights_nothing() {
        let view = view(&store(), &Filters::default().with_search("   "));
        assert_eq!(view.counts().highlighted, 0);
        assert!(view.ranked_matches("  ", 5).is_empty());
    }

    #[test]
    fn every_filter_combination_is_sound() {
        let store = store();
        let kinds = std::iter::once(None).chain(NodeKind::INSTANCE_KINDS.iter().copied().map(Some));
        for kind in kinds {
            for show in [true, false] {
                let filters = Filters {
                    type_filter: kind,
                    show_ontology_layer: show,
                    search_term: "a".to_string(),
                };
                assert_sound(&view(&store, &filters));
            }
        }
    }

    #[test]
    fn view_leaves_the_store_untouched() {
        let store = store();
        let before = store.clone();
        let _ = view(&store, &Filters::default().with_type(NodeKind::Event).with_search("x"));
        assert_eq!(store.nodes(), before.nodes());
        assert_eq!(store.links(), before.links());
    }

    #[test]
    fn ranked_matches_put_closest_label_first() {
        let view = view(&store(), &Filters::default());
        let ranked = view.ranked_matches("gnv", 3);
        assert_eq!(ranked.first().map(|(id, _)| id.as_str()), Some("geneva"));
        assert!(ranked.len() <= 3);
    }
}
