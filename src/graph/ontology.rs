//! Upper ontology seeded into every new store

use super::link::{Link, RDFS_SUBCLASS_OF};
use super::node::{Node, NodeKind};

/// Id of the root class every kind class specializes.
pub const ROOT_CLASS_ID: &str = "Thing";

/// The fixed set of canonical Class nodes and their subsumption links.
///
/// One Class node per instance kind (id = the kind's name) so typing links
/// synthesized from `node.kind` always resolve, plus a `Thing` root.
pub fn upper_ontology() -> (Vec<Node>, Vec<Link>) {
    let mut nodes = Vec::with_capacity(NodeKind::INSTANCE_KINDS.len() + 1);
    let mut links = Vec::with_capacity(NodeKind::INSTANCE_KINDS.len());

    nodes.push(Node::class(ROOT_CLASS_ID, ROOT_CLASS_ID));
    for kind in NodeKind::INSTANCE_KINDS {
        nodes.push(Node::class(kind.class_id(), kind.as_str()));
        links.push(Link::new(kind.class_id(), ROOT_CLASS_ID, RDFS_SUBCLASS_OF).with_label("subClassOf"));
    }

    (nodes, links)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_class_per_instance_kind_plus_root() {
        let (nodes, links) = upper_ontology();
        assert_eq!(nodes.len(), NodeKind::INSTANCE_KINDS.len() + 1);
        assert!(nodes.iter().all(Node::is_class));
        for kind in NodeKind::INSTANCE_KINDS {
            assert!(nodes.iter().any(|n| n.id == kind.class_id()));
        }
        assert_eq!(links.len(), NodeKind::INSTANCE_KINDS.len());
        assert!(links.iter().all(|l| l.target.as_str() == ROOT_CLASS_ID));
    }
}
