//! Canonical unit-cube geometry instanced by chunk meshing.
//!
//! Every face is a quad of four corners, wound counter-clockwise when seen from
//! outside the cube, and drawn as two triangles.

use cgmath::{Point3, Vector3};

use crate::engine_state::voxels::block::block_side::BlockSide;

/// Vertices emitted per face.
pub const FACE_VERTEX_COUNT: usize = 4;
/// Indices emitted per face.
pub const FACE_INDEX_COUNT: usize = 6;
/// Vertices of a full cube.
pub const CUBE_VERTEX_COUNT: usize = 6 * FACE_VERTEX_COUNT;
/// Indices of a full cube.
pub const CUBE_INDEX_COUNT: usize = 6 * FACE_INDEX_COUNT;

/// Triangle indices of one quad, relative to its first vertex.
pub const FACE_INDICES: [u32; FACE_INDEX_COUNT] = [0, 1, 2, 0, 2, 3];

/// Texture coordinates matching the corner order of `face_corners`.
pub const FACE_UVS: [(u8, u8); FACE_VERTEX_COUNT] = [(0, 0), (1, 0), (1, 1), (0, 1)];

/// Corners of one face of the unit cube at the origin.
pub fn face_corners(side: BlockSide) -> [Vector3<i32>; FACE_VERTEX_COUNT] {
    let v = Vector3::new;
    match side {
        BlockSide::PX => [v(1, 0, 0), v(1, 1, 0), v(1, 1, 1), v(1, 0, 1)],
        BlockSide::NX => [v(0, 0, 0), v(0, 0, 1), v(0, 1, 1), v(0, 1, 0)],
        BlockSide::PY => [v(0, 1, 0), v(0, 1, 1), v(1, 1, 1), v(1, 1, 0)],
        BlockSide::NY => [v(0, 0, 0), v(1, 0, 0), v(1, 0, 1), v(0, 0, 1)],
        BlockSide::PZ => [v(0, 0, 1), v(1, 0, 1), v(1, 1, 1), v(0, 1, 1)],
        BlockSide::NZ => [v(0, 0, 0), v(0, 1, 0), v(1, 1, 0), v(1, 0, 0)],
    }
}

/// Corners of one face of the unit cube whose minimum corner is `origin`.
pub fn face_at(origin: Point3<i32>, side: BlockSide) -> [Point3<i32>; FACE_VERTEX_COUNT] {
    face_corners(side).map(|corner| origin + corner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn faces_wind_outwards() {
        for side in BlockSide::all() {
            let [a, b, c, _] = face_corners(side);
            assert_eq!((b - a).cross(c - a), side.normal(), "{side:?}");
        }
    }

    #[test]
    fn faces_lie_on_their_plane() {
        for side in BlockSide::all() {
            let expected = i32::from(side.is_positive());
            assert!(face_corners(side)
                .iter()
                .all(|corner| corner[side.axis()] == expected));
        }
    }
}
