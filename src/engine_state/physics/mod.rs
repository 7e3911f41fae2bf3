//! # Physics
//!
//! Axis-aligned box collision against the block world, and the fixed-step actor
//! integrator built on it. Axis 2 (z) points up.

pub mod actor;
pub mod bounding_box;
pub mod collision;

pub use actor::Actor;
pub use bounding_box::BoundingBox;
pub use collision::{BlockCorrection, CollisionResolver, CollisionResult, SolidBlocks};
