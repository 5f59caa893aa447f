//! Per-tick output of the layout engine

use super::vec2::Vec2;
use crate::graph::NodeId;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;

/// Position of one node at the end of a tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickNode {
    pub id: NodeId,
    pub position: Vec2,
}

/// Endpoints and midpoint of one link at the end of a tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickLink {
    pub source: NodeId,
    pub target: NodeId,
    pub from: Vec2,
    pub to: Vec2,
    /// Anchor for the link label
    pub midpoint: Vec2,
}

/// Everything a renderer needs to draw one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickFrame {
    pub tick: u64,
    pub alpha: f32,
    pub nodes: Vec<TickNode>,
    pub links: Vec<TickLink>,
}

impl TickFrame {
    pub fn position(&self, id: &NodeId) -> Option<Vec2> {
        self.nodes.iter().find(|n| &n.id == id).map(|n| n.position)
    }
}

/// Receives every emitted frame.
///
/// Called on the ticking thread; implementations must return promptly and
/// hand the frame off rather than render in place.
pub trait TickObserver: Send + Sync {
    fn on_tick(&self, frame: Arc<TickFrame>);
}

/// Latest-frame-wins channel: slow readers skip frames instead of stalling
/// the layout.
impl TickObserver for watch::Sender<Option<Arc<TickFrame>>> {
    fn on_tick(&self, frame: Arc<TickFrame>) {
        self.send_replace(Some(frame));
    }
}
