//! # Terrain Generation
//!
//! Seeded, deterministic block generation for one chunk at a time.
//!
//! The generator is a pure function of `(seed, chunk position, mode)`: it holds no
//! mutable state, so a single instance is shared by every worker thread. Output is
//! the dense byte layout `Chunk::load_blocks` consumes.
//!
//! ## Modes
//! - `FlatGround`: dirt everywhere below world z = 4
//! - `NoiseSurface`: a height field carved from 3-D noise, banded grass or sand on
//!   top, then dirt, then stone
//! - `NoiseVolume`: three octaves of 3-D noise combined into overhangs and caves

use cgmath::Point3;
use noise::{NoiseFn, Perlin};
use serde::{Deserialize, Serialize};

use super::{
    block::{block_type::BlockType, Block, BlockTypeSize},
    chunk::{Chunk, CHUNK_DIMENSION, CHUNK_SIZE},
};

/// World z below which `FlatGround` places dirt.
pub const FLAT_GROUND_HEIGHT: i32 = 4;

/// Density thresholds shared by the noise modes: below 0 is empty, then the top,
/// middle and bottom bands.
const TOP_BAND: f64 = 75.0;
const MIDDLE_BAND: f64 = 150.0;

/// Amplitude of the surface noise, in blocks.
const SURFACE_AMPLITUDE: f64 = 1000.0;

/// Selects how `TerrainGenerator::generate` fills a chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerrainMode {
    /// Solid dirt below `FLAT_GROUND_HEIGHT`.
    FlatGround,
    /// Noise height field.
    NoiseSurface,
    /// Volumetric noise with caves.
    NoiseVolume,
}

/// Generates block data for chunks from a seed.
#[derive(Clone, Debug)]
pub struct TerrainGenerator {
    seed: u32,
    noise: Perlin,
}

impl TerrainGenerator {
    /// Creates a generator for the given seed.
    pub fn new(seed: u32) -> Self {
        TerrainGenerator {
            seed,
            noise: Perlin::new(seed),
        }
    }

    /// The seed this generator was built with.
    pub fn seed(&self) -> u32 {
        self.seed
    }

    /// Generates the dense block array for the chunk at `chunk_pos`.
    ///
    /// # Arguments
    /// * `chunk_pos` - Chunk coordinate (not block coordinate)
    /// * `mode` - Generation mode
    ///
    /// # Returns
    /// `CHUNK_SIZE * Block::DATA_SIZE` bytes in `Chunk::load_blocks` layout.
    pub fn generate(&self, chunk_pos: Point3<i32>, mode: TerrainMode) -> Vec<u8> {
        let mut data = Vec::new();
        self.generate_into(chunk_pos, mode, &mut data);
        data
    }

    /// Like `generate`, reusing `data_out`'s allocation.
    pub fn generate_into(&self, chunk_pos: Point3<i32>, mode: TerrainMode, data_out: &mut Vec<u8>) {
        data_out.clear();
        data_out.resize(CHUNK_SIZE as usize * Block::DATA_SIZE, 0);

        let origin = Chunk::block_origin(chunk_pos);
        for (index, record) in data_out.chunks_exact_mut(Block::DATA_SIZE).enumerate() {
            let local = Chunk::index_to_point(index);
            let world = Point3::new(origin.x + local.x, origin.y + local.y, origin.z + local.z);
            Block::new(self.block_at(world, mode)).serialize(record);
        }
    }

    /// The block type `mode` places at world block `world`.
    pub fn block_at(&self, world: Point3<i32>, mode: TerrainMode) -> BlockType {
        match mode {
            TerrainMode::FlatGround => {
                if world.z < FLAT_GROUND_HEIGHT {
                    BlockType::DIRT
                } else {
                    BlockType::NONE
                }
            }
            TerrainMode::NoiseSurface => self.surface_block(world),
            TerrainMode::NoiseVolume => self.volume_block(world),
        }
    }

    /// The first empty z above the highest solid block of column `(x, y)`,
    /// searching down from `top` to `bottom` inclusive.
    ///
    /// # Returns
    /// `None` if the whole searched column is empty.
    pub fn surface_height(&self, x: i32, y: i32, mode: TerrainMode, top: i32, bottom: i32) -> Option<i32> {
        (bottom..=top)
            .rev()
            .find(|z| self.block_at(Point3::new(x, y, *z), mode).is_solid())
            .map(|z| z + 1)
    }

    fn sample(&self, world: Point3<i32>, scale: [f64; 3]) -> f64 {
        let d = CHUNK_DIMENSION as f64;
        self.noise.get([
            world.x as f64 / d / scale[0],
            world.y as f64 / d / scale[1],
            world.z as f64 / d / scale[2],
        ])
    }

    fn surface_block(&self, world: Point3<i32>) -> BlockType {
        let n0 = self.sample(world, [1.0, 1.0, 1.0]);
        let n1 = self.sample(world, [8.0, 8.0, 8.0]);
        let density = SURFACE_AMPLITUDE * n0 - world.z as f64;

        if density < 0.0 {
            BlockType::NONE
        } else if density < TOP_BAND {
            if n1 > 0.0 {
                BlockType::GRASS
            } else {
                BlockType::SAND
            }
        } else if density < MIDDLE_BAND {
            BlockType::DIRT
        } else {
            BlockType::STONE
        }
    }

    fn volume_block(&self, world: Point3<i32>) -> BlockType {
        // Stretched lattice: 4x horizontally, 12x vertically.
        let stretched = Point3::new(world.x * 4, world.y * 4, world.z * 12);
        let n0 = self.sample(stretched, [1.0, 1.0, 1.0]);
        let n1 = self.sample(stretched, [8.0, 8.0, 8.0]);
        let n2 = self.sample(stretched, [16.0, 16.0, 8.0]);

        let density = 100.0 * n0 - 3.0 * stretched.z as f64 - 1000.0 * n2.abs() * (0.5 + n1);
        if density < 0.0 {
            BlockType::NONE
        } else if density < TOP_BAND {
            BlockType::GRASS
        } else if density < MIDDLE_BAND {
            if n1 > 0.0 {
                BlockType::DIRT
            } else {
                BlockType::SAND
            }
        } else {
            BlockType::STONE
        }
    }
}

/// Number of non-empty records in a generated array.
pub fn solid_count(data: &[u8]) -> usize {
    data.chunks_exact(Block::DATA_SIZE)
        .filter(|record| record[0] != BlockType::NONE as BlockTypeSize)
        .count()
}
