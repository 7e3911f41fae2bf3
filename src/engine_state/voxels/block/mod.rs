//! # Block Module
//!
//! This module provides the core block-related functionality for the voxel engine.
//! It includes block type definitions, block face handling, and the block value
//! stored in a chunk's sparse block store.

use block_side::{BlockSide, BlockSides};
use block_type::BlockType;

pub mod block_side;
pub mod block_type;

/// The underlying integer type used to represent block types in memory.
/// This is the serialized form of a block.
pub type BlockTypeSize = u8;

/// Represents a single voxel block in the world.
///
/// A block is its type plus the set of faces currently exposed. Occlusion is
/// derived from the type, so a `NONE` block is never active whatever its flags say.
///
/// # Serialization
/// Only the type is serialized (`DATA_SIZE` bytes). Active sides are a cache and
/// are reset to empty on deserialization until the owning chunk recomputes them.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Block {
    /// The type of this block.
    pub block_type: BlockType,
    /// Faces of this block that are not covered by a neighbor.
    pub active_sides: BlockSides,
}

impl Default for Block {
    fn default() -> Self {
        Block::new(BlockType::NONE)
    }
}

impl Block {
    /// Number of bytes a block occupies in serialized form.
    pub const DATA_SIZE: usize = 1;

    /// Creates a new block of the specified type with every face active.
    ///
    /// # Arguments
    /// * `block_type` - The type of block to create
    pub fn new(block_type: BlockType) -> Self {
        Block {
            block_type,
            active_sides: BlockSides::all(),
        }
    }

    /// Occlusion value derived from the type: 0 for `NONE`, 1 otherwise.
    pub fn occlusion(&self) -> u8 {
        u8::from(self.block_type.is_solid())
    }

    /// `true` if the block is solid and at least one face is exposed.
    pub fn active(&self) -> bool {
        self.block_type.is_solid() && !self.active_sides.is_empty()
    }

    /// `true` if the block is solid and the given face is exposed.
    pub fn active_side(&self, side: BlockSide) -> bool {
        self.block_type.is_solid() && self.active_sides.contains(side.flag())
    }

    /// Writes the block into `data_out`.
    ///
    /// # Returns
    /// The number of bytes written (`DATA_SIZE`).
    ///
    /// # Panics
    /// Panics if `data_out` is shorter than `DATA_SIZE`.
    pub fn serialize(&self, data_out: &mut [u8]) -> usize {
        data_out[0] = self.block_type as BlockTypeSize;
        Self::DATA_SIZE
    }

    /// Overwrites this block from `data_in`.
    ///
    /// Unknown type bytes decode to `NONE`. Active sides are cleared.
    ///
    /// # Panics
    /// Panics if `data_in` is shorter than `DATA_SIZE`.
    pub fn deserialize(&mut self, data_in: &[u8]) {
        self.block_type = BlockType::from_int(data_in[0]).unwrap_or(BlockType::NONE);
        self.active_sides = BlockSides::empty();
    }

    /// Decodes a block from its serialized form.
    pub fn from_bytes(data_in: &[u8]) -> Self {
        let mut block = Block::default();
        block.deserialize(data_in);
        block
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_is_never_active() {
        let block = Block::new(BlockType::NONE);
        assert_eq!(block.active_sides, BlockSides::all());
        assert!(!block.active());
        assert!(!block.active_side(BlockSide::PZ));
        assert_eq!(block.occlusion(), 0);
        assert_eq!(Block::new(BlockType::SAND).occlusion(), 1);
    }

    #[test]
    fn deserialize_resets_active_sides() {
        let block = Block::new(BlockType::GRASS);
        let mut bytes = [0u8; Block::DATA_SIZE];
        assert_eq!(block.serialize(&mut bytes), Block::DATA_SIZE);

        let loaded = Block::from_bytes(&bytes);
        assert_eq!(loaded.block_type, BlockType::GRASS);
        assert!(loaded.active_sides.is_empty());
        assert!(!loaded.active());
    }

    #[test]
    fn unknown_byte_decodes_to_none() {
        assert_eq!(Block::from_bytes(&[200]).block_type, BlockType::NONE);
    }
}
