//! # Block Type Module
//!
//! This module defines the different types of blocks in the voxel world and the
//! mapping between block types and per-type mesh slots.

use num_derive::FromPrimitive;

use super::BlockTypeSize;

/// Enumerates all possible block types in the voxel world.
///
/// `NONE` is the empty sentinel: it is never stored in a `ChunkBlockStore`, never
/// meshed, and never collides. The `FromPrimitive` derive allows conversion from
/// the one-byte serialized form.
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, FromPrimitive)]
pub enum BlockType {
    /// Empty space.
    NONE = 0,

    /// Plain dirt, found just under the surface.
    DIRT,

    /// Grass, the topmost band of the noise surface.
    GRASS,

    /// Stone, the deep band of the noise surface.
    STONE,

    /// Sand, mixed into the upper bands.
    SAND,
}

/// Number of block types, `NONE` included.
pub const BLOCK_TYPE_COUNT: usize = 5;

/// Number of block types that own a mesh (`NONE` excluded).
pub const MESHED_BLOCK_TYPE_COUNT: usize = BLOCK_TYPE_COUNT - 1;

impl BlockType {
    /// Converts a serialized `BlockTypeSize` to a `BlockType`.
    ///
    /// # Returns
    /// `None` if the value does not name a block type.
    pub fn from_int(btype: BlockTypeSize) -> Option<Self> {
        num::FromPrimitive::from_u8(btype)
    }

    /// Every block type that is meshed, in mesh-slot order.
    pub fn solid_types() -> [BlockType; MESHED_BLOCK_TYPE_COUNT] {
        [
            BlockType::DIRT,
            BlockType::GRASS,
            BlockType::STONE,
            BlockType::SAND,
        ]
    }

    /// `true` for every type except `NONE`.
    pub fn is_solid(self) -> bool {
        self != BlockType::NONE
    }

    /// Index of this type's mesh within a chunk's mesh set.
    ///
    /// # Returns
    /// `None` for `NONE`, which has no mesh.
    pub fn mesh_index(self) -> Option<usize> {
        match self {
            BlockType::NONE => None,
            other => Some(other as usize - 1),
        }
    }

    /// Inverse of `mesh_index`.
    pub fn from_mesh_index(index: usize) -> Option<Self> {
        Self::solid_types().get(index).copied()
    }

    /// Generates a random solid block type.
    ///
    /// Used by the demo binary to vary what the player places.
    pub fn get_random_type() -> Self {
        Self::solid_types()[fastrand::usize(0..MESHED_BLOCK_TYPE_COUNT)]
    }
}
