//! # Voxel World Data
//!
//! Representation of the world itself, independent of threads and GPUs.
//!
//! ## Architecture
//!
//! * **Block**: a block type plus the set of faces currently exposed
//! * **Chunk**: a sparse 16x16x16 block store with neighbor links and meshing
//! * **Terrain**: seeded generation of a chunk's initial blocks
//! * **ChunkGrid**: the fixed set of chunks streamed around the viewer
//!
//! ## Data Flow
//!
//! 1. The grid hands out chunks that need work
//! 2. `TerrainGenerator` produces dense block bytes for a chunk position
//! 3. `Chunk::load_blocks` fills the sparse store and computes active sides
//! 4. `Chunk::update_mesh` turns the store into per-type geometry

pub mod block;
pub mod chunk;
pub mod chunk_grid;
pub mod terrain;
