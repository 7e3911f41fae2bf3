//! # Core Module
//!
//! Fundamental building blocks shared by every engine subsystem.
//!
//! ## Key Components
//! - `MtResource`: Thread-safe reference-counted resource with read-write locking
//! - `EngineConfig`: JSON-backed runtime settings
//! - `error`: Error types for configuration and GPU backends
//!
//! ## Usage
//! ```
//! use voxel_world::core::MtResource;
//!
//! let counter = MtResource::new(0);
//! *counter.get_mut() += 1;
//! assert_eq!(*counter.get(), 1);
//! ```

pub mod config;
pub mod error;
pub mod mt_resource;

pub use config::EngineConfig;
pub use error::{ConfigError, EngineError, GpuError};
pub use mt_resource::MtResource;
