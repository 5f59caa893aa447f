//! Ontoloom: incremental knowledge-graph merge engine
//!
//! Folds a stream of asynchronously produced entity/relationship fragments
//! into one canonical graph, and keeps a force-directed layout of that graph
//! running without restarting it on every change.
//!
//! # Core Concepts
//!
//! - **EntityStore**: canonical nodes and links; deduplicates, back-fills
//!   `rdf:type` links and enforces referential integrity on merge
//! - **LayoutEngine**: continuous physics over the filtered view, reheated
//!   partially when data arrives
//! - **IngestionQueue**: sequential, paced calls to an enrichment
//!   [`Extractor`], feeding merges through a [`FragmentSink`]
//! - **Session**: one topic's store, layout and filters; reset on topic change
//!
//! # Example
//!
//! ```
//! use ontoloom::{Fragment, Link, Node, NodeKind, Session, SessionConfig};
//!
//! let mut session = Session::new("United Nations", SessionConfig::default());
//! let delta = session.merge_fragment(Fragment::new(
//!     vec![Node::new("UN", "United Nations", NodeKind::Organization)],
//!     vec![Link::new("UN", "NATO", "org:memberOf")],
//! ));
//! // UN is added and typed; the dangling link is dropped.
//! assert_eq!(delta.added_nodes.len(), 1);
//! assert_eq!(delta.synthesized_type_links(), 1);
//! ```

pub mod config;
mod graph;
pub mod ingest;
pub mod layout;
mod session;
pub mod view;

pub use config::{ConfigError, LayoutConfig, PlacementConfig, QueueConfig, SessionConfig};
pub use graph::{
    is_ontology_predicate, normalize_predicate, to_json_ld, to_json_ld_string, upper_ontology,
    EntityStore, Link, LinkKey, MergeDelta, Node, NodeId, NodeKind, Properties, PropertyValue,
    Rejection, RejectionReason, UnknownKind, RDFS_SUBCLASS_OF, RDF_TYPE, ROOT_CLASS_ID,
};
pub use ingest::{
    CommandExtractor, EnrichmentSubject, ExtractError, Extractor, Fragment, FragmentSink,
    IngestionQueue, MergeOutcome, MockExtractor, ParseFailure, PendingItem, PendingRegistry,
    QueueError, ReplayExtractor, SessionToken,
};
pub use layout::{
    LayoutEngine, LayoutError, LayoutState, PositionAllocator, TickFrame, TickObserver, Vec2,
};
pub use session::{AnimationDriver, Session, SessionHandle};
pub use view::{view, Filters, ViewCounts, ViewGraph, ViewNode};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
