//! Rendering system for the voxel engine.
//!
//! This module owns everything between a chunk's block store and a draw call:
//! the vertex format, the canonical cube, CPU-side mesh data, and the
//! double-buffered GPU hand-off. The graphics API itself sits behind the
//! `GpuBackend` / `DrawPass` traits so the rest of the engine can run against
//! `wgpu` or entirely on the CPU.

pub mod backend;
pub mod cube;
pub mod double_buffered_mesh;
pub mod mesh;
mod vertex;
pub mod wgpu_backend;

// Re-export commonly used types
pub use backend::{DrawPass, GpuBackend, HeadlessBackend, RecordingPass};
pub use double_buffered_mesh::{ChunkMeshSet, DoubleBufferedMesh};
pub use mesh::{ChunkMeshData, MeshData};
pub use vertex::Vertex;
pub use wgpu_backend::{ChunkPipeline, WgpuBackend};
