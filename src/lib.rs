#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![warn(rustdoc::invalid_rust_codeblocks)]

//! # Voxel World
//!
//! A concurrent chunk subsystem for a voxel world: sparse block storage, seeded
//! terrain, a streaming grid of chunks that slides with the viewer, background
//! generation and meshing on a polling worker pool, double-buffered GPU mesh
//! hand-off, and box collision against the blocks.
//!
//! ## Key Modules
//!
//! * `core` - Shared resource wrapper, configuration and error types
//! * `engine_state` - The engine itself: voxels, rendering, physics and task management
//!
//! ## Architecture
//!
//! The engine keeps a clear split between:
//! * World data (blocks, chunks, terrain), which knows nothing about threads or GPUs
//! * Streaming (the chunk grid), which reuses a fixed set of chunks
//! * Background work (the thread pool), partitioned by chunk id
//! * GPU hand-off (double-buffered meshes), behind a small backend trait
//!
//! ## Usage
//!
//! ```no_run
//! use cgmath::Point3;
//! use voxel_world::{core::EngineConfig, engine_state::{rendering::HeadlessBackend, EngineState}};
//!
//! voxel_world::init_logger();
//! let config = EngineConfig::load("world.json").unwrap_or_default();
//! let mut engine = EngineState::new(config, HeadlessBackend::new(), Point3::new(0.0, 0.0, 8.0)).unwrap();
//! engine.start();
//! ```

use log::info;

pub mod core;
pub mod engine_state;

/// Initializes `env_logger` on stdout, filtered by `RUST_LOG`.
///
/// Safe to call more than once; only the first call installs the logger.
pub fn init_logger() {
    let mut log_builder = env_logger::Builder::new();
    let installed = log_builder
        .target(env_logger::Target::Stdout)
        .parse_env("RUST_LOG")
        .try_init();

    if installed.is_ok() {
        info!("Logger initialized");
    }
}
