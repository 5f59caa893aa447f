//! Layout engine: continuous force-directed simulation
//!
//! The engine simulates only the nodes and links it is handed by
//! [`LayoutEngine::sync`] (the filtered view), while body records for every
//! node seen this session live in [`Bodies`]. Energy (`alpha`) decays toward
//! `alpha_target` each tick:
//!
//! - **Idle**: nothing to simulate; `tick` is a no-op
//! - **Running**: forces are integrated and a frame is emitted per tick
//! - **Settled**: alpha fell below `alpha_min`; positions are frozen until a
//!   reheat or drag
//!
//! Data changes reheat partially (`alpha = max(alpha, reheat_alpha)`); the
//! simulation is never restarted and existing bodies are never re-placed.
//! The per-body center pull gives repulsion an equilibrium, so a reheat
//! only lets settled bodies drift rather than spread further.

mod body;
mod forces;
mod frame;
mod placement;
mod quadtree;
mod vec2;

pub use body::{Bodies, Body};
pub use frame::{TickFrame, TickLink, TickNode, TickObserver};
pub use placement::PositionAllocator;
pub use vec2::{vec2, Vec2};

use crate::config::LayoutConfig;
use crate::graph::NodeId;
use forces::{
    accumulate_center_pull, accumulate_collisions, accumulate_repulsion, accumulate_springs,
    centering_shift, Spring,
};
use quadtree::QuadNode;
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tracing::debug;

/// Velocity correction applied per unit of overlap.
const COLLISION_STRENGTH: f32 = 0.7;

/// Errors from drag interaction
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LayoutError {
    #[error("node {0} is not in the layout")]
    NodeNotInLayout(NodeId),

    #[error("node {0} is not being dragged")]
    NotDragging(NodeId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutState {
    Idle,
    Running,
    Settled,
}

/// A node handed to the layout.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutNode {
    pub id: NodeId,
    /// Class nodes get a larger collision radius
    pub is_class: bool,
}

/// A link handed to the layout.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutLink {
    pub source: NodeId,
    pub target: NodeId,
    /// Ontology links rest longer
    pub is_ontology_link: bool,
}

#[derive(Debug)]
struct ActiveNode {
    id: NodeId,
    radius: f32,
}

#[derive(Debug)]
struct ActiveLink {
    source: NodeId,
    target: NodeId,
    spring: Spring,
}

#[derive(Debug)]
pub struct LayoutEngine {
    config: LayoutConfig,
    bodies: Bodies,
    nodes: Vec<ActiveNode>,
    index: HashMap<NodeId, usize>,
    links: Vec<ActiveLink>,
    dragging: HashSet<NodeId>,
    state: LayoutState,
    alpha: f32,
    alpha_target: f32,
    ticks: u64,
}

impl LayoutEngine {
    pub fn new(config: LayoutConfig) -> Self {
        Self {
            config,
            bodies: Bodies::default(),
            nodes: Vec::new(),
            index: HashMap::new(),
            links: Vec::new(),
            dragging: HashSet::new(),
            state: LayoutState::Idle,
            alpha: 0.0,
            alpha_target: 0.0,
            ticks: 0,
        }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    pub fn center(&self) -> Vec2 {
        vec2(self.config.center_x, self.config.center_y)
    }

    pub fn state(&self) -> LayoutState {
        self.state
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn tick_count(&self) -> u64 {
        self.ticks
    }

    pub fn bodies(&self) -> &Bodies {
        &self.bodies
    }

    /// Body table for the position allocator.
    pub fn bodies_mut(&mut self) -> &mut Bodies {
        &mut self.bodies
    }

    pub fn position(&self, id: &NodeId) -> Option<Vec2> {
        self.bodies.get(id).map(|b| b.position)
    }

    /// True when `id` is part of the simulated set.
    pub fn contains(&self, id: &NodeId) -> bool {
        self.index.contains_key(id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    pub fn is_dragging(&self, id: &NodeId) -> bool {
        self.dragging.contains(id)
    }

    /// Replace the simulated node and link set.
    ///
    /// Nodes without a body record are skipped, as are links whose
    /// endpoints are not simulated. Bodies are never moved here. The first
    /// non-empty set starts the simulation at `alpha_start`; an empty set
    /// returns the engine to Idle. Returns whether membership changed.
    pub fn sync(
        &mut self,
        nodes: impl IntoIterator<Item = LayoutNode>,
        links: impl IntoIterator<Item = LayoutLink>,
    ) -> bool {
        let mut active = Vec::new();
        let mut index = HashMap::new();
        for node in nodes {
            if index.contains_key(&node.id) {
                continue;
            }
            if !self.bodies.contains(&node.id) {
                debug!(node = %node.id, "skipping unplaced node");
                continue;
            }
            let radius = if node.is_class {
                self.config.class_collision_radius
            } else {
                self.config.collision_radius
            };
            index.insert(node.id.clone(), active.len());
            active.push(ActiveNode { id: node.id, radius });
        }

        let mut springs = Vec::new();
        for link in links {
            let (Some(&source), Some(&target)) = (index.get(&link.source), index.get(&link.target))
            else {
                continue;
            };
            let rest_length = if link.is_ontology_link {
                self.config.ontology_link_distance
            } else {
                self.config.link_distance
            };
            springs.push(ActiveLink {
                source: link.source,
                target: link.target,
                spring: Spring {
                    source,
                    target,
                    rest_length,
                },
            });
        }

        let changed = !same_members(&self.nodes, &active)
            || self.links.len() != springs.len()
            || self
                .links
                .iter()
                .zip(&springs)
                .any(|(a, b)| a.source != b.source || a.target != b.target);

        // A dragged node that left the view is released.
        let released: Vec<NodeId> = self
            .dragging
            .iter()
            .filter(|id| !index.contains_key(*id))
            .cloned()
            .collect();
        for id in released {
            self.release(&id);
        }

        let was_idle = self.state == LayoutState::Idle;
        self.nodes = active;
        self.index = index;
        self.links = springs;

        if self.nodes.is_empty() {
            self.state = LayoutState::Idle;
            self.alpha = 0.0;
        } else if was_idle {
            self.state = LayoutState::Running;
            self.alpha = self.config.alpha_start;
        }

        changed
    }

    /// Inject bounded energy after a data change.
    pub fn reheat(&mut self) {
        if self.state == LayoutState::Idle {
            return;
        }
        self.alpha = self.alpha.max(self.config.reheat_alpha);
        self.state = LayoutState::Running;
    }

    /// Advance one step. Returns the frame, or `None` unless Running.
    pub fn tick(&mut self) -> Option<TickFrame> {
        if self.state != LayoutState::Running {
            return None;
        }

        self.alpha += (self.alpha_target - self.alpha) * self.config.alpha_decay;
        self.integrate();
        self.ticks += 1;

        if self.alpha < self.config.alpha_min && self.dragging.is_empty() {
            self.state = LayoutState::Settled;
            debug!(ticks = self.ticks, nodes = self.nodes.len(), "layout settled");
        }

        Some(self.frame())
    }

    /// Tick until Settled or `max_ticks`; returns the ticks taken.
    pub fn run_until_settled(&mut self, max_ticks: usize) -> usize {
        let mut taken = 0;
        while taken < max_ticks && self.tick().is_some() {
            taken += 1;
        }
        taken
    }

    fn integrate(&mut self) {
        let count = self.nodes.len();
        let center = self.center();
        let mut positions = Vec::with_capacity(count);
        let mut radii = Vec::with_capacity(count);
        let mut pinned = Vec::with_capacity(count);
        for node in &self.nodes {
            let body = self.bodies.get(&node.id).copied().unwrap_or_else(|| Body::at(center));
            positions.push(body.position);
            radii.push(node.radius);
            pinned.push(body.is_pinned());
        }

        let mut forces = vec![Vec2::ZERO; count];
        let mut collisions = vec![Vec2::ZERO; count];
        if let Some(tree) = QuadNode::build(&positions) {
            for (index, force) in forces.iter_mut().enumerate() {
                accumulate_repulsion(
                    &tree,
                    index,
                    &positions,
                    self.config.repulsion,
                    self.config.theta,
                    force,
                );
            }
            accumulate_collisions(
                &tree,
                &positions,
                &radii,
                COLLISION_STRENGTH,
                &mut collisions,
            );
        }

        let springs: Vec<Spring> = self.links.iter().map(|l| l.spring).collect();
        accumulate_springs(&springs, &positions, self.config.link_strength, &mut forces);
        accumulate_center_pull(
            &positions,
            &pinned,
            center,
            self.config.center_pull,
            &mut forces,
        );

        let shift = centering_shift(
            &positions,
            &pinned,
            center,
            self.config.centering_strength,
        );

        let retain = 1.0 - self.config.velocity_decay.clamp(0.0, 1.0);
        let max_speed = self.config.max_speed;
        for (i, node) in self.nodes.iter().enumerate() {
            let Some(body) = self.bodies.get_mut(&node.id) else {
                continue;
            };
            if let Some(pin) = body.pin {
                body.position = pin;
                body.velocity = Vec2::ZERO;
                continue;
            }

            let velocity = ((body.velocity + forces[i] * self.alpha + collisions[i]) * retain)
                .clamp_length(max_speed);
            let step = (velocity + shift).clamp_length(max_speed);
            if !step.is_finite() {
                body.velocity = Vec2::ZERO;
                continue;
            }
            body.velocity = velocity;
            body.position += step;
        }
    }

    /// Current positions without advancing the simulation.
    pub fn frame(&self) -> TickFrame {
        let center = self.center();
        let position = |id: &NodeId| self.bodies.get(id).map_or(center, |b| b.position);

        TickFrame {
            tick: self.ticks,
            alpha: self.alpha,
            nodes: self
                .nodes
                .iter()
                .map(|n| TickNode {
                    id: n.id.clone(),
                    position: position(&n.id),
                })
                .collect(),
            links: self
                .links
                .iter()
                .map(|l| {
                    let from = position(&l.source);
                    let to = position(&l.target);
                    TickLink {
                        source: l.source.clone(),
                        target: l.target.clone(),
                        from,
                        to,
                        midpoint: from.midpoint(to),
                    }
                })
                .collect(),
        }
    }

    /// Pin a node where it is and keep the simulation warm while held.
    pub fn begin_drag(&mut self, id: &NodeId) -> Result<(), LayoutError> {
        if !self.index.contains_key(id) {
            return Err(LayoutError::NodeNotInLayout(id.clone()));
        }
        let body = self
            .bodies
            .get_mut(id)
            .ok_or_else(|| LayoutError::NodeNotInLayout(id.clone()))?;
        body.pin = Some(body.position);
        body.velocity = Vec2::ZERO;

        self.dragging.insert(id.clone());
        self.alpha_target = self.config.drag_alpha_target;
        self.state = LayoutState::Running;
        Ok(())
    }

    /// Move a dragged node's pin.
    pub fn update_drag(&mut self, id: &NodeId, position: Vec2) -> Result<(), LayoutError> {
        if !self.index.contains_key(id) {
            return Err(LayoutError::NodeNotInLayout(id.clone()));
        }
        if !self.dragging.contains(id) {
            return Err(LayoutError::NotDragging(id.clone()));
        }
        if let Some(body) = self.bodies.get_mut(id) {
            body.pin = Some(position);
            body.position = position;
        }
        Ok(())
    }

    /// Unpin a dragged node and let the simulation cool.
    pub fn end_drag(&mut self, id: &NodeId) -> Result<(), LayoutError> {
        if !self.dragging.contains(id) {
            return Err(if self.index.contains_key(id) {
                LayoutError::NotDragging(id.clone())
            } else {
                LayoutError::NodeNotInLayout(id.clone())
            });
        }
        self.release(id);
        Ok(())
    }

    fn release(&mut self, id: &NodeId) {
        self.dragging.remove(id);
        if let Some(body) = self.bodies.get_mut(id) {
            body.pin = None;
        }
        if self.dragging.is_empty() {
            self.alpha_target = 0.0;
        }
    }
}

fn same_members(old: &[ActiveNode], new: &[ActiveNode]) -> bool {
    old.len() == new.len() && old.iter().zip(new).all(|(a, b)| a.id == b.id)
}
