//! # Block Side Module
//!
//! This module defines the six faces of a voxel block and the bitset used to
//! track which of them are exposed.
//!
//! Axis 2 (Z) points up. Faces are ordered so that `opposite` is `(i + 3) % 6`.

use cgmath::Vector3;

/// Represents the six possible faces of a voxel block (or of a chunk, when used
/// as a neighbor direction).
///
/// The order is: [PX, PY, PZ, NX, NY, NZ]
#[derive(PartialEq, Eq, Hash, Copy, Clone, Debug)]
pub enum BlockSide {
    /// The face pointing towards positive X
    PX = 0,

    /// The face pointing towards positive Y
    PY = 1,

    /// The top face (positive Z)
    PZ = 2,

    /// The face pointing towards negative X
    NX = 3,

    /// The face pointing towards negative Y
    NY = 4,

    /// The bottom face (negative Z)
    NZ = 5,
}

bitflags::bitflags! {
    /// Set of block faces, used for a block's active (exposed) sides.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct BlockSides: u8 {
        const PX = 0x01;
        const PY = 0x02;
        const PZ = 0x04;
        const NX = 0x08;
        const NY = 0x10;
        const NZ = 0x20;
    }
}

impl Default for BlockSides {
    fn default() -> Self {
        BlockSides::empty()
    }
}

impl BlockSide {
    /// Returns an array containing all six block faces in a consistent order.
    pub fn all() -> [BlockSide; 6] {
        [
            BlockSide::PX,
            BlockSide::PY,
            BlockSide::PZ,
            BlockSide::NX,
            BlockSide::NY,
            BlockSide::NZ,
        ]
    }

    /// Converts an index in `all()` order back to a side.
    pub fn from_index(index: usize) -> Option<BlockSide> {
        Self::all().get(index).copied()
    }

    /// The face on the other side of the block.
    pub fn opposite(self) -> BlockSide {
        Self::all()[(self as usize + 3) % 6]
    }

    /// The axis (0, 1 or 2) this face is perpendicular to.
    pub fn axis(self) -> usize {
        self as usize % 3
    }

    /// `true` for the PX, PY and PZ faces.
    pub fn is_positive(self) -> bool {
        (self as usize) < 3
    }

    /// Outward unit normal of the face.
    pub fn normal(self) -> Vector3<i32> {
        let mut normal = Vector3::new(0, 0, 0);
        normal[self.axis()] = if self.is_positive() { 1 } else { -1 };
        normal
    }

    /// Finds the face whose normal is `normal`.
    ///
    /// # Returns
    /// `None` unless `normal` is an axis-aligned unit vector.
    pub fn from_normal(normal: Vector3<i32>) -> Option<BlockSide> {
        Self::all().into_iter().find(|side| side.normal() == normal)
    }

    /// The single-face flag for this side.
    pub fn flag(self) -> BlockSides {
        match self {
            BlockSide::PX => BlockSides::PX,
            BlockSide::PY => BlockSides::PY,
            BlockSide::PZ => BlockSides::PZ,
            BlockSide::NX => BlockSides::NX,
            BlockSide::NY => BlockSides::NY,
            BlockSide::NZ => BlockSides::NZ,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opposite_flips_the_normal() {
        for side in BlockSide::all() {
            assert_eq!(side.opposite().normal(), -side.normal());
            assert_eq!(side.opposite().opposite(), side);
            assert_eq!(BlockSide::from_normal(side.normal()), Some(side));
        }
        assert_eq!(BlockSide::from_normal(Vector3::new(1, 1, 0)), None);
    }

    #[test]
    fn flags_cover_all_sides() {
        let all = BlockSide::all()
            .into_iter()
            .fold(BlockSides::empty(), |acc, side| acc | side.flag());
        assert_eq!(all, BlockSides::all());
    }
}
