//! # Collision Resolution
//!
//! Moves an actor's box by an intended displacement and pushes it back out of
//! every solid block it would end up inside.
//!
//! Axes are resolved one after another (x, then y, then z). For each axis with
//! non-zero motion the box is first swept along that axis: the motion is clamped
//! at the nearest block face the leading face would cross, so a displacement of
//! any length cannot skip over a block. The box is then moved by the clamped
//! amount, and every candidate block it still overlaps (one it was already
//! inside of) is corrected against in nearest-first order. Each correction is
//! computed from the box position left by the previous one, so a block already
//! cleared by an earlier correction contributes nothing.
//!
//! Candidate order is: squared distance from the actor's starting centre to the
//! block centre, then lattice x, y, z. That makes the result independent of the
//! order the world reports its blocks in.

use std::cmp::Ordering;

use cgmath::{MetricSpace, Point3, Vector3};

use super::bounding_box::BoundingBox;
use crate::engine_state::voxels::{
    chunk::{Chunk, ChunkBlockStore},
    chunk_grid::ChunkGrid,
};

/// Contact skin: faces closer than this are touching, and overlaps thinner than
/// this are not corrected.
const TOUCH_EPSILON: f32 = 1e-4;

/// Read access to the solid blocks of a world.
pub trait SolidBlocks {
    /// Every occupied lattice point in the closed box `[min, max]`, in world
    /// block coordinates.
    fn solid_blocks_in_box(&self, min: Point3<i32>, max: Point3<i32>) -> Vec<Point3<i32>>;
}

/// Correction applied because of one block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockCorrection {
    /// Lattice point of the block.
    pub point: Point3<i32>,
    /// Displacement added to the actor's motion.
    pub correction: Vector3<f32>,
}

/// Outcome of one `CollisionResolver::resolve` call.
#[derive(Debug, Clone, PartialEq)]
pub struct CollisionResult {
    /// Every non-zero correction, in the order it was applied.
    pub corrections: Vec<BlockCorrection>,
    /// The displacement to actually apply: the intended one plus all corrections.
    pub corrected_delta: Vector3<f32>,
    /// Per axis: a correction stopped motion on that axis, or the actor was
    /// already grounded there and is still resting against a block.
    pub grounded: [bool; 3],
    /// The actor's box after the corrected move.
    pub resolved: BoundingBox,
}

impl CollisionResult {
    /// `true` if any block had to be corrected against.
    pub fn collided(&self) -> bool {
        !self.corrections.is_empty()
    }
}

/// Axis-separated AABB collision against solid blocks.
#[derive(Debug, Clone, Copy)]
pub struct CollisionResolver {
    padding: f32,
}

impl Default for CollisionResolver {
    fn default() -> Self {
        Self::new(3.0)
    }
}

impl CollisionResolver {
    /// Creates a resolver whose broad phase grows the swept box by `padding`.
    pub fn new(padding: f32) -> Self {
        CollisionResolver {
            padding: padding.max(0.0),
        }
    }

    /// Broad-phase padding, in blocks.
    pub fn padding(&self) -> f32 {
        self.padding
    }

    /// Resolves `actor` moving by `delta` against `world`.
    ///
    /// # Arguments
    /// * `world` - Source of solid blocks
    /// * `actor` - The actor's box before the move
    /// * `delta` - Intended displacement this tick
    /// * `grounded` - Grounded flags from the previous tick
    pub fn resolve<W: SolidBlocks + ?Sized>(
        &self,
        world: &W,
        actor: BoundingBox,
        delta: Vector3<f32>,
        grounded: [bool; 3],
    ) -> CollisionResult {
        let swept = actor.union(&actor.translated(delta));
        let (lo, hi) = swept.lattice_range(self.padding);
        let start = actor.center();

        let mut candidates: Vec<(Point3<i32>, BoundingBox)> = world
            .solid_blocks_in_box(lo, hi)
            .into_iter()
            .map(|p| (p, BoundingBox::for_block(p)))
            .collect();
        candidates.sort_by(|(pa, a), (pb, b)| {
            start
                .distance2(a.center())
                .partial_cmp(&start.distance2(b.center()))
                .unwrap_or(Ordering::Equal)
                .then_with(|| (pa.x, pa.y, pa.z).cmp(&(pb.x, pb.y, pb.z)))
        });

        let mut current = actor;
        let mut corrected_delta = Vector3::new(0.0, 0.0, 0.0);
        let mut corrections = Vec::new();
        let mut result_grounded = [false; 3];

        for axis in 0..3 {
            let motion = delta[axis];
            if motion == 0.0 {
                continue;
            }
            let (allowed, stopped_by) = Self::sweep_axis(&current, &candidates, axis, motion);
            current.translate_axis(axis, allowed);
            corrected_delta[axis] += allowed;
            if let Some(point) = stopped_by {
                result_grounded[axis] = true;
                let mut vector = Vector3::new(0.0, 0.0, 0.0);
                vector[axis] = allowed - motion;
                corrections.push(BlockCorrection {
                    point,
                    correction: vector,
                });
            }

            for (point, block) in &candidates {
                if !Self::blocks_axis(&current, block, axis) {
                    continue;
                }
                // Only blocks ahead of the motion stop it.
                let ahead = if motion < 0.0 {
                    block.center()[axis] <= current.center()[axis]
                } else {
                    block.center()[axis] >= current.center()[axis]
                };
                if !ahead {
                    continue;
                }

                let correction = if motion < 0.0 {
                    block.max[axis] - current.min[axis]
                } else {
                    block.min[axis] - current.max[axis]
                };
                if correction == 0.0 {
                    continue;
                }
                current.translate_axis(axis, correction);
                corrected_delta[axis] += correction;
                result_grounded[axis] = true;

                let mut vector = Vector3::new(0.0, 0.0, 0.0);
                vector[axis] = correction;
                corrections.push(BlockCorrection {
                    point: *point,
                    correction: vector,
                });
            }
        }

        for axis in 0..3 {
            if grounded[axis] && !result_grounded[axis] {
                result_grounded[axis] = Self::resting_against(&current, &candidates, axis);
            }
        }

        CollisionResult {
            corrections,
            corrected_delta,
            grounded: result_grounded,
            resolved: current,
        }
    }

    /// Clamps `motion` along `axis` at the first block face the box's leading face
    /// would pass through. Blocks the box already overlaps on `axis` are left to
    /// the overlap pass.
    ///
    /// # Returns
    /// The allowed motion, and the block that stopped it if it was clamped.
    fn sweep_axis(
        actor: &BoundingBox,
        candidates: &[(Point3<i32>, BoundingBox)],
        axis: usize,
        motion: f32,
    ) -> (f32, Option<Point3<i32>>) {
        let mut allowed = motion;
        let mut stopped_by = None;
        for (point, block) in candidates {
            if !Self::crosses_axis(actor, block, axis) {
                continue;
            }
            // Faces within the skin count as touching: the box cannot move into them.
            let limit = if motion < 0.0 {
                if block.max[axis] > actor.min[axis] + TOUCH_EPSILON {
                    continue;
                }
                (block.max[axis] - actor.min[axis]).min(0.0)
            } else {
                if block.min[axis] < actor.max[axis] - TOUCH_EPSILON {
                    continue;
                }
                (block.min[axis] - actor.max[axis]).max(0.0)
            };
            if limit.abs() < allowed.abs() {
                allowed = limit;
                stopped_by = Some(*point);
            }
        }
        (allowed, stopped_by)
    }

    /// Length of the overlap of `a` and `b` along `axis`; negative when apart.
    fn depth(a: &BoundingBox, b: &BoundingBox, axis: usize) -> f32 {
        a.max[axis].min(b.max[axis]) - a.min[axis].max(b.min[axis])
    }

    /// `actor` and `block` overlap by more than a hair on the two axes other
    /// than `axis`.
    fn crosses_axis(actor: &BoundingBox, block: &BoundingBox, axis: usize) -> bool {
        [(axis + 1) % 3, (axis + 2) % 3]
            .iter()
            .all(|other| Self::depth(actor, block, *other) > TOUCH_EPSILON)
    }

    /// `actor` is inside `block` by more than a hair on every axis.
    fn blocks_axis(actor: &BoundingBox, block: &BoundingBox, axis: usize) -> bool {
        Self::depth(actor, block, axis) > TOUCH_EPSILON && Self::crosses_axis(actor, block, axis)
    }

    /// Edge check: some block shares a face with `actor` across `axis`.
    fn resting_against(actor: &BoundingBox, candidates: &[(Point3<i32>, BoundingBox)], axis: usize) -> bool {
        let others = [(axis + 1) % 3, (axis + 2) % 3];
        candidates.iter().any(|(_, block)| {
            let face_contact = (block.max[axis] - actor.min[axis]).abs() <= TOUCH_EPSILON
                || (block.min[axis] - actor.max[axis]).abs() <= TOUCH_EPSILON;
            face_contact && others.iter().all(|other| actor.overlaps_axis(block, *other))
        })
    }
}

impl SolidBlocks for ChunkBlockStore {
    fn solid_blocks_in_box(&self, min: Point3<i32>, max: Point3<i32>) -> Vec<Point3<i32>> {
        self.points_in_box(self.to_local(min), self.to_local(max))
            .into_iter()
            .filter(|(_, block)| block.block_type.is_solid())
            .map(|(p, _)| self.to_world(p))
            .collect()
    }
}

/// Queries every loaded chunk of the window that the box reaches. Chunks still
/// waiting for terrain, and space outside the window, count as empty.
impl SolidBlocks for ChunkGrid {
    fn solid_blocks_in_box(&self, min: Point3<i32>, max: Point3<i32>) -> Vec<Point3<i32>> {
        let lo = Chunk::containing(min);
        let hi = Chunk::containing(max);
        let mut points = Vec::new();
        for z in lo.z..=hi.z {
            for y in lo.y..=hi.y {
                for x in lo.x..=hi.x {
                    let Some(id) = self.id_at_position(Point3::new(x, y, z)) else {
                        continue;
                    };
                    let chunk = self.chunk(id).get();
                    if chunk.loaded {
                        points.extend(chunk.store().solid_blocks_in_box(min, max));
                    }
                }
            }
        }
        points
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Blocks(Vec<Point3<i32>>);

    impl SolidBlocks for Blocks {
        fn solid_blocks_in_box(&self, min: Point3<i32>, max: Point3<i32>) -> Vec<Point3<i32>> {
            self.0
                .iter()
                .copied()
                .filter(|p| (0..3).all(|a| min[a] <= p[a] && p[a] <= max[a]))
                .collect()
        }
    }

    fn actor_at(center: Point3<f32>) -> BoundingBox {
        BoundingBox::from_center_size(center, Vector3::new(0.9, 0.9, 2.0))
    }

    #[test]
    fn falling_onto_a_block_grounds_the_vertical_axis() {
        // Block (0, 0, 0) is centred on (0.5, 0.5, 0.5); the actor sits one unit above.
        let world = Blocks(vec![Point3::new(0, 0, 0)]);
        let resolver = CollisionResolver::default();
        let result = resolver.resolve(
            &world,
            actor_at(Point3::new(0.5, 0.5, 1.5)),
            Vector3::new(0.0, 0.0, -0.1),
            [false; 3],
        );

        assert_eq!(result.grounded, [false, false, true]);
        assert_eq!(result.corrections.len(), 1);
        assert!((result.corrections[0].correction.z - 0.6).abs() < 1e-5);
        assert!((result.corrected_delta.z - 0.5).abs() < 1e-5);
        assert_eq!(result.corrected_delta.x, 0.0);
    }

    #[test]
    fn empty_world_never_corrects() {
        let resolver = CollisionResolver::new(3.0);
        let delta = Vector3::new(0.3, -0.2, -5.0);
        let result = resolver.resolve(&Blocks(vec![]), actor_at(Point3::new(0.0, 0.0, 0.0)), delta, [true; 3]);
        assert_eq!(result.corrected_delta, delta);
        assert_eq!(result.grounded, [false; 3]);
        assert!(!result.collided());
    }

    #[test]
    fn sliding_along_the_floor_is_not_blocked() {
        let floor: Vec<_> = (-3..4).flat_map(|x| (-3..4).map(move |y| Point3::new(x, y, 0))).collect();
        let resolver = CollisionResolver::default();
        // Resting exactly on the floor (bottom at z = 1), moving sideways only.
        let result = resolver.resolve(
            &Blocks(floor),
            actor_at(Point3::new(0.5, 0.5, 2.0)),
            Vector3::new(0.4, 0.0, 0.0),
            [false, false, true],
        );
        assert_eq!(result.corrected_delta, Vector3::new(0.4, 0.0, 0.0));
        assert!(!result.collided());
        // The edge check keeps the actor grounded while it rests on the floor.
        assert_eq!(result.grounded, [false, false, true]);
    }

    #[test]
    fn wall_stops_horizontal_motion() {
        let wall = Blocks(vec![Point3::new(2, 0, 1), Point3::new(2, 0, 2)]);
        let resolver = CollisionResolver::default();
        let actor = actor_at(Point3::new(1.5, 0.5, 2.0));
        let result = resolver.resolve(&wall, actor, Vector3::new(0.3, 0.0, 0.0), [false; 3]);
        assert!(result.grounded[0]);
        let moved = actor.translated(result.corrected_delta);
        assert!((moved.max.x - 2.0).abs() < 1e-5);
        // The second wall block is already cleared by the first correction.
        assert_eq!(result.corrections.len(), 1);
    }

    #[test]
    fn candidate_order_does_not_change_the_result() {
        let mut blocks = vec![Point3::new(0, 0, 0), Point3::new(1, 0, 0), Point3::new(0, 1, 0)];
        let resolver = CollisionResolver::default();
        let actor = actor_at(Point3::new(0.6, 0.6, 1.5));
        let delta = Vector3::new(0.0, 0.0, -0.3);
        let first = resolver.resolve(&Blocks(blocks.clone()), actor, delta, [false; 3]);
        blocks.reverse();
        let second = resolver.resolve(&Blocks(blocks), actor, delta, [false; 3]);
        assert_eq!(first, second);
    }

    #[test]
    fn grid_reports_blocks_of_loaded_chunks_only() {
        use crate::engine_state::voxels::block::block_type::BlockType;

        let grid = ChunkGrid::new([2, 1, 1], Point3::new(0, 0, 0));
        let id = grid.id_at_position(Point3::new(1, 0, 0)).unwrap();
        grid.chunk(id).get_mut().place_block(Point3::new(0, 0, 0), BlockType::STONE);

        let (min, max) = (Point3::new(0, 0, 0), Point3::new(31, 15, 15));
        assert!(grid.solid_blocks_in_box(min, max).is_empty());

        grid.chunk(id).get_mut().loaded = true;
        assert_eq!(grid.solid_blocks_in_box(min, max), vec![Point3::new(16, 0, 0)]);
        assert!(grid
            .solid_blocks_in_box(Point3::new(0, 0, 0), Point3::new(15, 15, 15))
            .is_empty());
    }
}
