//! # Chunk Module
//!
//! This module provides the `Chunk` struct: one 16x16x16 cell of the streaming
//! grid. A chunk owns a sparse `ChunkBlockStore`, the loaded / mesh-dirty /
//! mesh-uploaded state the worker pool polls, and the indices of its six neighbors
//! in the grid's chunk arena.
//!
//! ## Block Data Hand-off
//!
//! Terrain arrives as a dense byte array, one `Block::DATA_SIZE` record per cell,
//! x varying fastest, then y, then z:
//!
//! ```text
//! index = x + CHUNK_DIMENSION * (y + CHUNK_DIMENSION * z)
//! ```
//!
//! `load_blocks` decodes that array into the sparse store and recomputes every
//! block's active sides; `serialize` produces the same layout back.

use cgmath::{Point3, Vector3};
use log::warn;

use super::block::{
    block_side::{BlockSide, BlockSides},
    block_type::BlockType,
    Block,
};
use crate::engine_state::rendering::mesh::{ChunkMeshData, MeshData};

pub mod block_store;

pub use block_store::{ChunkBlockStore, RayHit};

/// The dimension (width, height, depth) of a chunk in blocks.
pub const CHUNK_DIMENSION: i32 = 16;
/// The number of blocks in a single 2D plane of a chunk (CHUNK_DIMENSION²).
pub const CHUNK_PLANE_SIZE: i32 = CHUNK_DIMENSION * CHUNK_DIMENSION;
/// The total number of blocks in a chunk (CHUNK_DIMENSION³).
pub const CHUNK_SIZE: i32 = CHUNK_PLANE_SIZE * CHUNK_DIMENSION;

/// Index of a chunk in the grid's fixed chunk arena.
///
/// Neighbor links are stored as ids rather than references, so moving a chunk
/// to another grid cell never invalidates anything.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkId(pub usize);

/// Represents a 16x16x16 collection of voxel blocks in the world.
#[derive(Debug)]
pub struct Chunk {
    /// The position of this chunk in chunk coordinates (not block coordinates).
    position: Point3<i32>,
    store: ChunkBlockStore,
    /// Terrain has been generated for the current position.
    pub loaded: bool,
    /// Blocks changed since the last mesh build.
    pub mesh_dirty: bool,
    /// The latest mesh build has been handed to the GPU buffers.
    pub mesh_uploaded: bool,
    neighbors: [Option<ChunkId>; 6],
}

impl Chunk {
    /// Creates an empty, unloaded chunk at the given chunk coordinate.
    pub fn new(position: Point3<i32>) -> Self {
        Chunk {
            position,
            store: ChunkBlockStore::new(Self::block_origin(position)),
            loaded: false,
            mesh_dirty: true,
            mesh_uploaded: false,
            neighbors: [None; 6],
        }
    }

    /// World block coordinate of the first block of the chunk at `position`.
    pub fn block_origin(position: Point3<i32>) -> Point3<i32> {
        Point3::new(
            position.x * CHUNK_DIMENSION,
            position.y * CHUNK_DIMENSION,
            position.z * CHUNK_DIMENSION,
        )
    }

    /// Chunk coordinate of the chunk containing world block `world`.
    pub fn containing(world: Point3<i32>) -> Point3<i32> {
        Point3::new(
            world.x.div_euclid(CHUNK_DIMENSION),
            world.y.div_euclid(CHUNK_DIMENSION),
            world.z.div_euclid(CHUNK_DIMENSION),
        )
    }

    /// The chunk coordinate of this chunk.
    pub fn position(&self) -> Point3<i32> {
        self.position
    }

    /// Moves the chunk to a new grid position and marks it for regeneration.
    ///
    /// Blocks of the old position are dropped; the store keeps its capacity for
    /// the next `load_blocks`.
    pub fn reposition(&mut self, position: Point3<i32>) {
        self.position = position;
        self.store.clear(false);
        self.store.set_origin(Self::block_origin(position));
        self.loaded = false;
        self.mesh_dirty = true;
        self.mesh_uploaded = false;
    }

    /// Read access to the block store.
    pub fn store(&self) -> &ChunkBlockStore {
        &self.store
    }

    /// Mutable access to the block store.
    ///
    /// Edits made through this bypass active-side bookkeeping; prefer
    /// `place_block`/`remove_block`.
    pub fn store_mut(&mut self) -> &mut ChunkBlockStore {
        &mut self.store
    }

    /// The neighboring chunk across `side`, or `None` at the grid edge.
    pub fn neighbor(&self, side: BlockSide) -> Option<ChunkId> {
        self.neighbors[side as usize]
    }

    /// Links (or unlinks) the neighbor across `side`.
    pub fn set_neighbor(&mut self, side: BlockSide, neighbor: Option<ChunkId>) {
        self.neighbors[side as usize] = neighbor;
    }

    /// Replaces the stored blocks with a dense serialized array.
    ///
    /// # Arguments
    /// * `data` - `CHUNK_SIZE` records of `Block::DATA_SIZE` bytes
    ///
    /// # Returns
    /// `false`, leaving the chunk untouched, if `data` has the wrong length.
    pub fn load_blocks(&mut self, data: &[u8]) -> bool {
        let expected = CHUNK_SIZE as usize * Block::DATA_SIZE;
        if data.len() != expected {
            warn!(
                "Rejecting block data for chunk {:?}: {} bytes, expected {}",
                self.position,
                data.len(),
                expected
            );
            return false;
        }

        self.store.clear(false);
        for (index, record) in data.chunks_exact(Block::DATA_SIZE).enumerate() {
            let block = Block::from_bytes(record);
            if block.block_type.is_solid() {
                self.store.insert(Self::index_to_point(index), block);
            }
        }
        self.update_active_sides();

        self.loaded = true;
        self.mesh_dirty = true;
        self.mesh_uploaded = false;
        true
    }

    /// Writes every cell into a dense array in the `load_blocks` layout.
    pub fn serialize(&self) -> Vec<u8> {
        let mut data = vec![0u8; CHUNK_SIZE as usize * Block::DATA_SIZE];
        for (p, block) in self.store.iter() {
            let offset = Self::point_to_index(p) * Block::DATA_SIZE;
            block.serialize(&mut data[offset..offset + Block::DATA_SIZE]);
        }
        data
    }

    /// Dense array index of a local point.
    pub fn point_to_index(p: Point3<i32>) -> usize {
        (p.x + CHUNK_DIMENSION * (p.y + CHUNK_DIMENSION * p.z)) as usize
    }

    /// Local point of a dense array index.
    pub fn index_to_point(index: usize) -> Point3<i32> {
        let index = index as i32;
        Point3::new(
            index % CHUNK_DIMENSION,
            (index / CHUNK_DIMENSION) % CHUNK_DIMENSION,
            index / CHUNK_PLANE_SIZE,
        )
    }

    /// Recomputes the active sides of every stored block.
    pub fn update_active_sides(&mut self) {
        let points: Vec<Point3<i32>> = self.store.iter().map(|(p, _)| p).collect();
        for p in points {
            self.update_active_sides_at(p);
        }
    }

    /// Recomputes the active sides of the block at `p`, if there is one.
    ///
    /// A face is active when the adjacent cell is empty. Faces on the chunk
    /// border are always active.
    pub fn update_active_sides_at(&mut self, p: Point3<i32>) {
        let mut sides = BlockSides::empty();
        for side in BlockSide::all() {
            if !self.store.contains(p + side.normal()) {
                sides |= side.flag();
            }
        }
        if let Some(block) = self.store.get_mut(p) {
            block.active_sides = sides;
        }
    }

    fn refresh_around(&mut self, p: Point3<i32>) {
        self.update_active_sides_at(p);
        for side in BlockSide::all() {
            self.update_active_sides_at(p + side.normal());
        }
        self.mesh_dirty = true;
    }

    /// Places a block at local point `p`.
    ///
    /// # Returns
    /// `false` if the cell is occupied or outside the chunk, or `block_type` is `NONE`.
    pub fn place_block(&mut self, p: Point3<i32>, block_type: BlockType) -> bool {
        if !self.store.insert(p, Block::new(block_type)) {
            return false;
        }
        self.refresh_around(p);
        true
    }

    /// Removes the block at local point `p`.
    pub fn remove_block(&mut self, p: Point3<i32>) -> Option<Block> {
        let removed = self.store.remove(p, true)?;
        self.refresh_around(p);
        Some(removed)
    }

    /// `true` if local point `p` lies on the face of the chunk facing `side`.
    pub fn on_border(p: Point3<i32>, side: BlockSide) -> bool {
        let coordinate = p[side.axis()];
        if side.is_positive() {
            coordinate == CHUNK_DIMENSION - 1
        } else {
            coordinate == 0
        }
    }

    /// Builds vertex/index lists for every solid block type.
    ///
    /// Each occupied cell gets a copy of the unit cube, placed at its world block
    /// coordinate. With `cull_faces` set, faces that are not active are skipped.
    /// Clears `mesh_dirty`; the caller sets `mesh_uploaded` once the data has been
    /// handed to the GPU buffers.
    pub fn update_mesh(&mut self, cull_faces: bool) -> ChunkMeshData {
        let mut meshes: ChunkMeshData = std::array::from_fn(|_| MeshData::default());

        // Sorted so rebuilding the same blocks always yields the same buffers.
        let mut blocks: Vec<(Point3<i32>, &Block)> = self.store.iter().collect();
        blocks.sort_unstable_by_key(|(p, _)| Self::point_to_index(*p));

        for (p, block) in blocks {
            let Some(mesh_index) = block.block_type.mesh_index() else {
                continue;
            };
            let world = self.store.to_world(p);
            for side in BlockSide::all() {
                if !cull_faces || block.active_side(side) {
                    meshes[mesh_index].push_face(world, side, mesh_index as u32);
                }
            }
        }

        self.mesh_dirty = false;
        meshes
    }

    /// Offset of world block `world` from this chunk's first block.
    pub fn local_offset(&self, world: Point3<i32>) -> Vector3<i32> {
        self.store.to_local(world) - Point3::new(0, 0, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::rendering::cube::{CUBE_INDEX_COUNT, CUBE_VERTEX_COUNT};

    #[test]
    fn serialized_layout_round_trips() {
        let mut chunk = Chunk::new(Point3::new(1, -1, 0));
        chunk.place_block(Point3::new(3, 0, 0), BlockType::STONE);
        chunk.place_block(Point3::new(0, 15, 2), BlockType::SAND);

        let data = chunk.serialize();
        assert_eq!(data[3], BlockType::STONE as u8);
        assert_eq!(data[Chunk::point_to_index(Point3::new(0, 15, 2))], BlockType::SAND as u8);

        let mut copy = Chunk::new(Point3::new(1, -1, 0));
        assert!(copy.load_blocks(&data));
        assert!(copy.loaded);
        assert_eq!(copy.store().len(), 2);
        assert_eq!(copy.serialize(), data);
    }

    #[test]
    fn load_rejects_wrong_length() {
        let mut chunk = Chunk::new(Point3::new(0, 0, 0));
        assert!(!chunk.load_blocks(&[1, 2, 3]));
        assert!(!chunk.loaded);
    }

    #[test]
    fn active_sides_follow_neighbours() {
        let mut chunk = Chunk::new(Point3::new(0, 0, 0));
        let a = Point3::new(4, 4, 4);
        let b = Point3::new(5, 4, 4);
        chunk.place_block(a, BlockType::DIRT);
        chunk.place_block(b, BlockType::DIRT);

        let block_a = chunk.store().get(a).unwrap();
        assert!(!block_a.active_side(BlockSide::PX));
        assert!(block_a.active_side(BlockSide::NX));
        assert!(!chunk.store().get(b).unwrap().active_side(BlockSide::NX));

        chunk.remove_block(b);
        assert!(chunk.store().get(a).unwrap().active_side(BlockSide::PX));
    }

    #[test]
    fn buried_block_is_inactive() {
        let mut chunk = Chunk::new(Point3::new(0, 0, 0));
        let centre = Point3::new(8, 8, 8);
        chunk.place_block(centre, BlockType::STONE);
        for side in BlockSide::all() {
            chunk.place_block(centre + side.normal(), BlockType::DIRT);
        }
        assert!(!chunk.store().get(centre).unwrap().active());
    }

    #[test]
    fn mesh_emits_one_cube_per_block_without_culling() {
        let mut chunk = Chunk::new(Point3::new(0, 0, 1));
        chunk.place_block(Point3::new(0, 0, 0), BlockType::GRASS);
        chunk.place_block(Point3::new(1, 0, 0), BlockType::GRASS);
        chunk.place_block(Point3::new(9, 9, 9), BlockType::STONE);

        let meshes = chunk.update_mesh(false);
        assert!(!chunk.mesh_dirty);
        let grass = &meshes[BlockType::GRASS.mesh_index().unwrap()];
        assert_eq!(grass.vertices.len(), 2 * CUBE_VERTEX_COUNT);
        assert_eq!(grass.indices.len(), 2 * CUBE_INDEX_COUNT);
        assert_eq!(meshes[BlockType::STONE.mesh_index().unwrap()].indices.len(), CUBE_INDEX_COUNT);
        assert!(meshes[BlockType::DIRT.mesh_index().unwrap()].is_empty());
        // Vertices are in world blocks: chunk z = 1 starts at block z = 16.
        assert!(grass.vertices.iter().all(|v| v.position()[2] >= CHUNK_DIMENSION));
    }

    #[test]
    fn culling_drops_shared_faces() {
        let mut chunk = Chunk::new(Point3::new(0, 0, 0));
        chunk.place_block(Point3::new(0, 0, 0), BlockType::DIRT);
        chunk.place_block(Point3::new(1, 0, 0), BlockType::DIRT);
        let meshes = chunk.update_mesh(true);
        let dirt = &meshes[BlockType::DIRT.mesh_index().unwrap()];
        assert_eq!(dirt.face_count(), 10);
    }

    #[test]
    fn reposition_resets_state() {
        let mut chunk = Chunk::new(Point3::new(0, 0, 0));
        chunk.loaded = true;
        chunk.mesh_dirty = false;
        chunk.mesh_uploaded = true;
        chunk.place_block(Point3::new(1, 1, 1), BlockType::DIRT);
        chunk.reposition(Point3::new(2, 0, 0));
        assert!(chunk.store().is_empty());
        assert!(!chunk.loaded && chunk.mesh_dirty && !chunk.mesh_uploaded);
        assert_eq!(chunk.store().origin(), Point3::new(32, 0, 0));
        assert_eq!(chunk.local_offset(Point3::new(33, 1, 2)), Vector3::new(1, 1, 2));
    }

    #[test]
    fn containing_rounds_towards_negative_infinity() {
        assert_eq!(Chunk::containing(Point3::new(-1, 15, 16)), Point3::new(-1, 0, 1));
        assert!(Chunk::on_border(Point3::new(15, 3, 3), BlockSide::PX));
        assert!(Chunk::on_border(Point3::new(3, 3, 0), BlockSide::NZ));
        assert!(!Chunk::on_border(Point3::new(3, 3, 0), BlockSide::PZ));
    }
}
