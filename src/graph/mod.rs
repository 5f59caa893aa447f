//! Core graph data structures

mod export;
mod link;
mod node;
mod ontology;
mod store;

#[cfg(test)]
mod tests;

pub use export::{to_json_ld, to_json_ld_string};
pub use link::{
    is_ontology_predicate, normalize_predicate, Link, LinkKey, RDFS_SUBCLASS_OF, RDF_TYPE,
};
pub use node::{Node, NodeId, NodeKind, Properties, PropertyValue, UnknownKind};
pub use ontology::{upper_ontology, ROOT_CLASS_ID};
pub use store::{EntityStore, MergeDelta, Rejection, RejectionReason};
