//! Property-based tests for the sparse chunk block store
//!
//! Critical invariants:
//! - Inserted blocks read back unchanged; removed cells are empty
//! - An occupied cell never accepts a second block
//! - Box queries return exactly the occupied cells inside the box, once each,
//!   whatever order the blocks were inserted in

use std::collections::{BTreeMap, BTreeSet};

use cgmath::Point3;
use proptest::prelude::*;
use voxel_world::engine_state::voxels::{
    block::{block_type::BlockType, Block},
    chunk::{ChunkBlockStore, CHUNK_DIMENSION},
};

fn local_point() -> impl Strategy<Value = Point3<i32>> {
    (0..CHUNK_DIMENSION, 0..CHUNK_DIMENSION, 0..CHUNK_DIMENSION).prop_map(|(x, y, z)| Point3::new(x, y, z))
}

fn solid_type() -> impl Strategy<Value = BlockType> {
    prop::sample::select(BlockType::solid_types().to_vec())
}

fn key(p: Point3<i32>) -> (i32, i32, i32) {
    (p.x, p.y, p.z)
}

proptest! {
    /// Property: insert then lookup returns the block; remove empties the cell
    #[test]
    fn store_round_trip(p in local_point(), block_type in solid_type()) {
        let mut store = ChunkBlockStore::new(Point3::new(0, 0, 0));
        let block = Block::new(block_type);

        prop_assert!(store.insert(p, block));
        prop_assert_eq!(store.get(p), Some(&block));
        prop_assert!(store.contains(p));

        prop_assert_eq!(store.remove(p, true), Some(block));
        prop_assert!(!store.contains(p));
        prop_assert!(store.is_empty());
        // Removing an empty cell is a no-op.
        prop_assert_eq!(store.remove(p, false), None);
    }

    /// Property: a second insert into an occupied cell fails and keeps the first block
    #[test]
    fn no_double_occupy(p in local_point(), first in solid_type(), second in solid_type()) {
        let mut store = ChunkBlockStore::default();
        prop_assert!(store.insert(p, Block::new(first)));
        prop_assert!(!store.insert(p, Block::new(second)));
        prop_assert_eq!(store.get(p).map(|b| b.block_type), Some(first));
        prop_assert_eq!(store.len(), 1);
    }

    /// Property: box queries are exact, ordered and duplicate free
    #[test]
    fn range_completeness(
        points in prop::collection::vec((local_point(), solid_type()), 0..200),
        corner_a in local_point(),
        corner_b in local_point(),
        reverse in any::<bool>(),
    ) {
        let mut entries = points.clone();
        if reverse {
            entries.reverse();
        }

        let mut store = ChunkBlockStore::new(Point3::new(-16, 32, 0));
        let mut expected_all = BTreeMap::new();
        for (p, block_type) in entries {
            if store.insert(p, Block::new(block_type)) {
                expected_all.insert(key(p), block_type);
            }
        }

        let min = Point3::new(corner_a.x.min(corner_b.x), corner_a.y.min(corner_b.y), corner_a.z.min(corner_b.z));
        let max = Point3::new(corner_a.x.max(corner_b.x), corner_a.y.max(corner_b.y), corner_a.z.max(corner_b.z));
        let inside = |p: &(i32, i32, i32)| {
            (min.x..=max.x).contains(&p.0) && (min.y..=max.y).contains(&p.1) && (min.z..=max.z).contains(&p.2)
        };
        let expected: BTreeSet<(i32, i32, i32)> = expected_all.keys().copied().filter(inside).collect();

        let found = store.points_in_box(min, max);
        let found_keys: Vec<(i32, i32, i32)> = found.iter().map(|(p, _)| key(*p)).collect();
        let found_set: BTreeSet<(i32, i32, i32)> = found_keys.iter().copied().collect();

        prop_assert_eq!(found_keys.len(), found_set.len(), "duplicates in query result");
        prop_assert_eq!(&found_set, &expected);
        for (p, block) in &found {
            prop_assert_eq!(Some(&block.block_type), expected_all.get(&key(*p)));
        }
    }

    /// Property: boxes reaching outside the chunk are clamped, not rejected
    #[test]
    fn oversized_boxes_are_clamped(points in prop::collection::vec(local_point(), 1..50)) {
        let mut store = ChunkBlockStore::default();
        for p in &points {
            store.insert(*p, Block::new(BlockType::STONE));
        }
        let everything = store.points_in_box(Point3::new(-100, -100, -100), Point3::new(100, 100, 100));
        prop_assert_eq!(everything.len(), store.len());
    }
}
