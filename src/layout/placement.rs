//! PositionAllocator: initial coordinates for newly merged nodes

use super::body::Bodies;
use super::vec2::{vec2, Vec2};
use crate::config::PlacementConfig;
use crate::graph::NodeId;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Places new nodes with uniform jitter around a fixed center.
///
/// Only ids without a body record are placed; existing bodies are never
/// moved, so a settled layout stays put when data arrives.
#[derive(Debug)]
pub struct PositionAllocator {
    center: Vec2,
    jitter: f32,
    rng: StdRng,
}

impl PositionAllocator {
    pub fn new(center: Vec2, config: &PlacementConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            center,
            jitter: config.jitter.abs(),
            rng,
        }
    }

    pub fn center(&self) -> Vec2 {
        self.center
    }

    /// Give each id lacking a body a position near the center.
    ///
    /// Returns the ids that were placed.
    pub fn place<'a>(
        &mut self,
        bodies: &mut Bodies,
        ids: impl IntoIterator<Item = &'a NodeId>,
    ) -> Vec<NodeId> {
        let mut placed = Vec::new();
        for id in ids {
            if bodies.contains(id) {
                continue;
            }
            let position = self.center + self.jitter_offset();
            bodies.insert(id.clone(), position);
            placed.push(id.clone());
        }
        placed
    }

    fn jitter_offset(&mut self) -> Vec2 {
        if self.jitter == 0.0 {
            return Vec2::ZERO;
        }
        vec2(
            self.rng.gen_range(-self.jitter..=self.jitter),
            self.rng.gen_range(-self.jitter..=self.jitter),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allocator(seed: u64) -> PositionAllocator {
        PositionAllocator::new(
            vec2(100.0, 50.0),
            &PlacementConfig::default().with_seed(seed),
        )
    }

    #[test]
    fn new_nodes_land_within_jitter_of_center() {
        let mut bodies = Bodies::default();
        let ids: Vec<NodeId> = (0..50).map(|i| NodeId::from(format!("n{}", i))).collect();
        let placed = allocator(1).place(&mut bodies, &ids);
        assert_eq!(placed.len(), 50);

        for id in &ids {
            let p = bodies.get(id).unwrap().position;
            assert!((p.x - 100.0).abs() <= 25.0);
            assert!((p.y - 50.0).abs() <= 25.0);
        }
    }

    #[test]
    fn existing_bodies_are_never_touched() {
        let mut bodies = Bodies::default();
        let old = NodeId::from("old");
        bodies.insert(old.clone(), vec2(999.0, -999.0));

        let new = NodeId::from("new");
        let placed = allocator(2).place(&mut bodies, [&old, &new]);

        assert_eq!(placed, vec![new]);
        assert_eq!(bodies.get(&old).unwrap().position, vec2(999.0, -999.0));
    }

    #[test]
    fn same_seed_places_identically() {
        let ids = [NodeId::from("a"), NodeId::from("b")];
        let mut first = Bodies::default();
        let mut second = Bodies::default();
        allocator(7).place(&mut first, &ids);
        allocator(7).place(&mut second, &ids);
        for id in &ids {
            assert_eq!(first.get(id).unwrap().position, second.get(id).unwrap().position);
        }
    }
}
