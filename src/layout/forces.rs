//! Force accumulation for one layout tick
//!
//! Every function adds into a caller-owned `forces` slice indexed like
//! `positions`; nothing here touches bodies directly.

use super::quadtree::QuadNode;
use super::vec2::Vec2;

/// Distances below this are treated as coincident.
const MIN_DISTANCE: f32 = 1.0;

fn direction_between(delta: Vec2, distance: f32, seed: usize) -> Vec2 {
    if distance > 1e-4 {
        delta / distance
    } else {
        Vec2::golden_direction(seed)
    }
}

/// Inverse-distance repulsion on body `index`, approximating distant cells
/// by their center of mass when `side / distance < theta`.
pub(super) fn accumulate_repulsion(
    node: &QuadNode,
    index: usize,
    positions: &[Vec2],
    strength: f32,
    theta: f32,
    force: &mut Vec2,
) {
    if node.mass <= 0.0 {
        return;
    }

    let point = positions[index];

    if node.is_leaf() {
        for &other in &node.indices {
            if other == index {
                continue;
            }
            let delta = point - positions[other];
            let distance = delta.length();
            let direction = direction_between(delta, distance, index + other);
            *force += direction * (strength / distance.max(MIN_DISTANCE));
        }
        return;
    }

    let delta = point - node.center_of_mass;
    let distance = delta.length().max(MIN_DISTANCE);
    let far_enough = !node.bounds.contains(point) && node.bounds.side_length() / distance < theta;
    if far_enough {
        *force += (delta / distance) * (strength * node.mass / distance);
        return;
    }

    for child in node.children() {
        accumulate_repulsion(child, index, positions, strength, theta, force);
    }
}

/// Push apart every pair closer than the sum of their radii.
///
/// Walks pairs of cells and prunes any pair whose gap exceeds
/// `max_reach`, twice the largest radius.
pub(super) fn accumulate_collisions(
    root: &QuadNode,
    positions: &[Vec2],
    radii: &[f32],
    strength: f32,
    forces: &mut [Vec2],
) {
    let max_reach = radii.iter().copied().fold(0.0_f32, f32::max) * 2.0;
    if max_reach <= 0.0 {
        return;
    }
    let pass = CollisionPass {
        positions,
        radii,
        strength,
        max_reach_sq: max_reach * max_reach,
    };
    pass.visit(root, root, true, forces);
}

struct CollisionPass<'a> {
    positions: &'a [Vec2],
    radii: &'a [f32],
    strength: f32,
    max_reach_sq: f32,
}

impl CollisionPass<'_> {
    fn visit(&self, a: &QuadNode, b: &QuadNode, same: bool, forces: &mut [Vec2]) {
        if a.bounds.gap_sq(b.bounds) > self.max_reach_sq {
            return;
        }

        if a.is_leaf() && b.is_leaf() {
            if same {
                for (i, &from) in a.indices.iter().enumerate() {
                    for &to in &a.indices[i + 1..] {
                        self.resolve(from, to, forces);
                    }
                }
            } else {
                for &from in &a.indices {
                    for &to in &b.indices {
                        self.resolve(from, to, forces);
                    }
                }
            }
            return;
        }

        if same {
            let children: Vec<&QuadNode> = a.children().collect();
            for (i, first) in children.iter().enumerate() {
                self.visit(first, first, true, forces);
                for second in &children[i + 1..] {
                    self.visit(first, second, false, forces);
                }
            }
            return;
        }

        let split_a = !a.is_leaf() && (b.is_leaf() || a.bounds.half_extent >= b.bounds.half_extent);
        if split_a {
            for child in a.children() {
                self.visit(child, b, false, forces);
            }
        } else {
            for child in b.children() {
                self.visit(a, child, false, forces);
            }
        }
    }

    fn resolve(&self, from: usize, to: usize, forces: &mut [Vec2]) {
        let delta = self.positions[from] - self.positions[to];
        let distance = delta.length();
        let min_distance = self.radii[from] + self.radii[to];
        if distance >= min_distance {
            return;
        }
        let direction = direction_between(delta, distance, from * 31 + to);
        let push = direction * ((min_distance - distance) * 0.5 * self.strength);
        forces[from] += push;
        forces[to] -= push;
    }
}

/// A spring between two bodies, by index.
#[derive(Debug, Clone, Copy)]
pub(super) struct Spring {
    pub(super) source: usize,
    pub(super) target: usize,
    pub(super) rest_length: f32,
}

/// Hooke springs pulling each linked pair toward its rest length.
pub(super) fn accumulate_springs(
    springs: &[Spring],
    positions: &[Vec2],
    strength: f32,
    forces: &mut [Vec2],
) {
    for spring in springs {
        if spring.source == spring.target {
            continue;
        }
        let delta = positions[spring.target] - positions[spring.source];
        let distance = delta.length();
        if distance <= 1e-4 {
            continue;
        }
        let correction = (delta / distance) * ((distance - spring.rest_length) * strength * 0.5);
        forces[spring.source] += correction;
        forces[spring.target] -= correction;
    }
}

/// Pull each free body toward `center` in proportion to its offset.
pub(super) fn accumulate_center_pull(
    positions: &[Vec2],
    pinned: &[bool],
    center: Vec2,
    strength: f32,
    forces: &mut [Vec2],
) {
    for ((force, position), &is_pinned) in forces.iter_mut().zip(positions).zip(pinned) {
        if !is_pinned {
            *force += (center - *position) * strength;
        }
    }
}

/// Shift that moves the centroid of the free bodies toward `center`.
pub(super) fn centering_shift(
    positions: &[Vec2],
    pinned: &[bool],
    center: Vec2,
    strength: f32,
) -> Vec2 {
    let mut sum = Vec2::ZERO;
    let mut count = 0usize;
    for (position, &is_pinned) in positions.iter().zip(pinned) {
        if !is_pinned {
            sum += *position;
            count += 1;
        }
    }
    if count == 0 {
        return Vec2::ZERO;
    }
    (center - sum / count as f32) * strength
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::vec2::vec2;

    #[test]
    fn repulsion_pushes_bodies_apart() {
        let positions = vec![vec2(0.0, 0.0), vec2(10.0, 0.0)];
        let tree = QuadNode::build(&positions).unwrap();
        let mut force = Vec2::ZERO;
        accumulate_repulsion(&tree, 0, &positions, 100.0, 0.9, &mut force);
        assert!(force.x < 0.0);
        assert!((force.x + 10.0).abs() < 1e-3);
    }

    #[test]
    fn approximated_repulsion_is_close_to_exact() {
        let mut positions: Vec<Vec2> = (0..40)
            .map(|i| vec2(500.0 + (i % 7) as f32 * 3.0, (i / 7) as f32 * 3.0))
            .collect();
        positions.push(vec2(0.0, 0.0));
        let outlier = positions.len() - 1;
        let tree = QuadNode::build(&positions).unwrap();

        let mut exact = Vec2::ZERO;
        accumulate_repulsion(&tree, outlier, &positions, 50.0, 0.0, &mut exact);
        let mut approx = Vec2::ZERO;
        accumulate_repulsion(&tree, outlier, &positions, 50.0, 0.9, &mut approx);

        assert!(((approx.x - exact.x) / exact.x).abs() < 0.05);
    }

    #[test]
    fn collisions_only_affect_overlapping_pairs() {
        let positions = vec![vec2(0.0, 0.0), vec2(5.0, 0.0), vec2(200.0, 0.0)];
        let radii = vec![12.0, 12.0, 12.0];
        let tree = QuadNode::build(&positions).unwrap();
        let mut forces = vec![Vec2::ZERO; 3];
        accumulate_collisions(&tree, &positions, &radii, 1.0, &mut forces);
        assert!(forces[0].x < 0.0);
        assert!(forces[1].x > 0.0);
        assert_eq!(forces[2], Vec2::ZERO);
    }

    #[test]
    fn springs_pull_stretched_links_together() {
        let positions = vec![vec2(0.0, 0.0), vec2(100.0, 0.0)];
        let springs = [Spring {
            source: 0,
            target: 1,
            rest_length: 60.0,
        }];
        let mut forces = vec![Vec2::ZERO; 2];
        accumulate_springs(&springs, &positions, 0.1, &mut forces);
        assert!(forces[0].x > 0.0);
        assert!(forces[1].x < 0.0);
    }

    #[test]
    fn center_pull_grows_with_distance() {
        let positions = vec![vec2(10.0, 0.0), vec2(-100.0, 0.0), vec2(500.0, 0.0)];
        let mut forces = vec![Vec2::ZERO; 3];
        accumulate_center_pull(&positions, &[false, false, true], Vec2::ZERO, 0.1, &mut forces);
        assert_eq!(forces[0], vec2(-1.0, 0.0));
        assert_eq!(forces[1], vec2(10.0, 0.0));
        assert_eq!(forces[2], Vec2::ZERO);
    }

    #[test]
    fn centering_ignores_pinned_bodies() {
        let positions = vec![vec2(10.0, 10.0), vec2(1000.0, 1000.0)];
        let shift = centering_shift(&positions, &[false, true], Vec2::ZERO, 1.0);
        assert_eq!(shift, vec2(-10.0, -10.0));
    }
}
