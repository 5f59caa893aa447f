//! Per-node physical state, keyed by node id

use super::vec2::Vec2;
use crate::graph::NodeId;
use std::collections::HashMap;

/// Position, velocity and optional pin of one node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Body {
    pub position: Vec2,
    pub velocity: Vec2,
    /// While set, the body sits at this point and ignores forces
    pub pin: Option<Vec2>,
}

impl Body {
    pub fn at(position: Vec2) -> Self {
        Self {
            position,
            velocity: Vec2::ZERO,
            pin: None,
        }
    }

    pub fn is_pinned(&self) -> bool {
        self.pin.is_some()
    }
}

/// Body records for every node the layout has ever seen this session.
///
/// Records outlive a node's presence in the view so a node that is
/// filtered out and back in resumes where it was.
#[derive(Debug, Clone, Default)]
pub struct Bodies {
    records: HashMap<NodeId, Body>,
}

impl Bodies {
    pub fn get(&self, id: &NodeId) -> Option<&Body> {
        self.records.get(id)
    }

    pub(super) fn get_mut(&mut self, id: &NodeId) -> Option<&mut Body> {
        self.records.get_mut(id)
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.records.contains_key(id)
    }

    /// Insert a resting body. An existing record is left untouched.
    pub fn insert(&mut self, id: NodeId, position: Vec2) {
        self.records.entry(id).or_insert_with(|| Body::at(position));
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
