//! Vertex data structures and layouts for voxel rendering.
//!
//! This module defines the vertex format emitted by chunk meshing and the matching
//! `wgpu` vertex buffer layout.

use cgmath::Point3;

use crate::engine_state::voxels::block::block_side::BlockSide;

/// A vertex in the voxel rendering pipeline.
///
/// # Memory Layout
/// - Position: 3x i32 (12 bytes)
/// - Texture Index: u32 (4 bytes)
/// - Texture Coordinates: [f32; 2] (8 bytes)
/// - Side: u32 (4 bytes)
///
/// Total size: 28 bytes
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    /// X coordinate in world blocks
    x: i32,
    /// Y coordinate in world blocks
    y: i32,
    /// Z coordinate in world blocks
    z: i32,
    /// Mesh index of the block type, used to pick the texture layer
    texture_index: u32,
    /// UV texture coordinates (0.0-1.0)
    tex_coords: [f32; 2],
    /// `BlockSide` of the face this vertex belongs to, used for shading
    side: u32,
}

impl Vertex {
    /// Creates a new vertex.
    ///
    /// # Arguments
    /// * `pos` - The position of the vertex in world blocks
    /// * `texture_index` - Mesh index of the block type
    /// * `u`, `v` - Texture coordinates (0 or 1 at cube corners)
    /// * `side` - Face the vertex belongs to
    pub fn new(pos: Point3<i32>, texture_index: u32, u: u8, v: u8, side: BlockSide) -> Self {
        Vertex {
            x: pos.x,
            y: pos.y,
            z: pos.z,
            texture_index,
            tex_coords: [u as f32, v as f32],
            side: side as u32,
        }
    }

    /// Position in world blocks.
    pub fn position(&self) -> [i32; 3] {
        [self.x, self.y, self.z]
    }

    /// Returns the vertex buffer layout description for the shader pipeline.
    ///
    /// # Shader Attributes
    /// - `location = 0`: position (vec3<i32>)
    /// - `location = 1`: texture_index (u32)
    /// - `location = 2`: tex_coords (vec2<f32>)
    /// - `location = 3`: side (u32)
    pub fn desc<'a>() -> wgpu::VertexBufferLayout<'a> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Sint32x3,
                },
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[u32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Uint32,
                },
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[u32; 4]>() as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x2,
                },
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[u32; 6]>() as wgpu::BufferAddress,
                    shader_location: 3,
                    format: wgpu::VertexFormat::Uint32,
                },
            ],
        }
    }
}
