//! Shared fixtures for integration tests

#![allow(dead_code)]

use ontoloom::{Link, Node, NodeKind, PlacementConfig, QueueConfig, SessionConfig};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::json;

/// Session config with deterministic placement and fast pacing.
pub fn test_config() -> SessionConfig {
    SessionConfig::default()
        .with_placement(PlacementConfig::default().with_seed(17))
        .with_queue(QueueConfig::default().with_pacing_ms(5).with_call_timeout_ms(2_000))
}

/// Extractor-style response text for a fragment.
pub fn response(nodes: &[(&str, &str, &str)], links: &[(&str, &str, &str)]) -> String {
    let nodes: Vec<_> = nodes
        .iter()
        .map(|(id, label, kind)| json!({ "id": id, "label": label, "type": kind }))
        .collect();
    let links: Vec<_> = links
        .iter()
        .map(|(source, target, predicate)| {
            json!({ "source": source, "target": target, "predicate": predicate })
        })
        .collect();
    json!({ "nodes": nodes, "links": links }).to_string()
}

/// Random candidate batches over a small id space, so batches overlap,
/// re-offer ids with conflicting kinds, and reference missing endpoints.
pub struct FragmentGen {
    rng: StdRng,
    id_space: usize,
}

impl FragmentGen {
    pub fn new(seed: u64, id_space: usize) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            id_space,
        }
    }

    fn id(&mut self) -> String {
        format!("e{}", self.rng.gen_range(0..self.id_space))
    }

    fn kind(&mut self) -> NodeKind {
        let kinds = NodeKind::INSTANCE_KINDS;
        kinds[self.rng.gen_range(0..kinds.len())]
    }

    pub fn batch(&mut self) -> (Vec<Node>, Vec<Link>) {
        let node_count = self.rng.gen_range(0..6);
        let nodes = (0..node_count)
            .map(|_| {
                let id = self.id();
                let kind = self.kind();
                Node::new(id.clone(), id.to_uppercase(), kind)
            })
            .collect();

        let predicates = ["org:memberOf", "schema:location", "rdf:type", "relatedTo"];
        let link_count = self.rng.gen_range(0..8);
        let links = (0..link_count)
            .map(|_| {
                let source = self.id();
                // Sometimes point at a Class node
                let target = if self.rng.gen_bool(0.2) {
                    self.kind().as_str().to_string()
                } else {
                    self.id()
                };
                let predicate = predicates[self.rng.gen_range(0..predicates.len())];
                Link::new(source, target, predicate)
            })
            .collect();

        (nodes, links)
    }
}
