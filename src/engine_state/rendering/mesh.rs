//! Mesh data produced by chunk meshing.
//!
//! A `MeshData` is CPU-side geometry for one block type of one chunk. It is built
//! on a worker thread and handed to a `DoubleBufferedMesh` for upload.

use cgmath::Point3;

use crate::engine_state::voxels::block::{block_side::BlockSide, block_type::MESHED_BLOCK_TYPE_COUNT};

use super::{
    cube::{self, FACE_INDICES, FACE_UVS},
    Vertex,
};

/// Vertex and index lists for one block type.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshData {
    /// Vertices in world blocks.
    pub vertices: Vec<Vertex>,
    /// Triangle list indices into `vertices`.
    pub indices: Vec<u32>,
}

/// One mesh per solid block type, indexed by `BlockType::mesh_index`.
pub type ChunkMeshData = [MeshData; MESHED_BLOCK_TYPE_COUNT];

impl MeshData {
    /// `true` if there is nothing to draw.
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Number of indices an indexed draw of this mesh issues.
    pub fn draw_count(&self) -> u32 {
        self.indices.len() as u32
    }

    /// Number of quads in the mesh.
    pub fn face_count(&self) -> usize {
        self.indices.len() / FACE_INDICES.len()
    }

    /// Appends one face of the unit cube at world block `origin`.
    pub fn push_face(&mut self, origin: Point3<i32>, side: BlockSide, texture_index: u32) {
        let base = self.vertices.len() as u32;
        for (corner, (u, v)) in cube::face_at(origin, side).into_iter().zip(FACE_UVS) {
            self.vertices
                .push(Vertex::new(corner, texture_index, u, v, side));
        }
        self.indices.extend(FACE_INDICES.iter().map(|i| base + i));
    }

    /// Raw vertex bytes, ready for upload.
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// Raw index bytes, ready for upload.
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_face_offsets_indices() {
        let mut mesh = MeshData::default();
        mesh.push_face(Point3::new(0, 0, 0), BlockSide::PZ, 0);
        mesh.push_face(Point3::new(3, 0, 0), BlockSide::NZ, 0);
        assert_eq!(mesh.face_count(), 2);
        assert_eq!(mesh.draw_count(), 12);
        assert_eq!(&mesh.indices[6..], &[4, 5, 6, 4, 6, 7]);
        assert_eq!(mesh.vertex_bytes().len(), 8 * std::mem::size_of::<Vertex>());
        assert_eq!(mesh.index_bytes().len(), 12 * 4);
    }
}
