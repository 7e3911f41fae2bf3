//! # Engine Configuration
//!
//! Runtime settings for the chunk subsystem, loaded from JSON. Every field has a
//! default so a config file only needs to name what it changes:
//!
//! ```json
//! { "grid_dimensions": [6, 6, 3], "seed": 42, "terrain_mode": "noise_volume" }
//! ```

use std::{fs, path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{core::error::ConfigError, engine_state::voxels::terrain::TerrainMode};

/// Settings consumed by `EngineState::new`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Number of chunks kept around the viewer on each axis.
    pub grid_dimensions: [i32; 3],
    /// Number of background worker threads generating and meshing chunks.
    pub worker_count: usize,
    /// Pause between two polls of the same worker, in microseconds.
    pub worker_sleep_us: u64,
    /// Terrain seed.
    pub seed: u32,
    /// Terrain generation mode.
    pub terrain_mode: TerrainMode,
    /// Skip faces hidden by an occupied neighbor in the same chunk.
    pub cull_faces: bool,
    /// Margin, in blocks, added around an actor's box for the collision broad phase.
    pub collision_padding: f32,
    /// Maximum distance for block picking.
    pub touch_radius: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            grid_dimensions: [8, 8, 4],
            worker_count: 4,
            worker_sleep_us: 1000,
            seed: 0,
            terrain_mode: TerrainMode::NoiseSurface,
            cull_faces: false,
            collision_padding: 3.0,
            touch_radius: 4.0,
        }
    }
}

impl EngineConfig {
    /// Reads and validates a config file.
    ///
    /// # Arguments
    /// * `path` - Path to a JSON file
    ///
    /// # Errors
    /// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Parses and validates a config from a JSON string.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the values that would make the grid or the pool unusable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.grid_dimensions.iter().any(|d| *d < 1) {
            return Err(ConfigError::Invalid {
                field: "grid_dimensions",
                reason: format!("{:?} must be at least 1 on every axis", self.grid_dimensions),
            });
        }
        if self.worker_count == 0 {
            return Err(ConfigError::Invalid {
                field: "worker_count",
                reason: "at least one worker is required".to_string(),
            });
        }
        if !(self.collision_padding >= 0.0) {
            return Err(ConfigError::Invalid {
                field: "collision_padding",
                reason: format!("{} must be non-negative", self.collision_padding),
            });
        }
        if !(self.touch_radius > 0.0) {
            return Err(ConfigError::Invalid {
                field: "touch_radius",
                reason: format!("{} must be positive", self.touch_radius),
            });
        }
        Ok(())
    }

    /// The worker poll interval as a `Duration`.
    pub fn worker_sleep(&self) -> Duration {
        Duration::from_micros(self.worker_sleep_us)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config = EngineConfig::from_json(r#"{ "seed": 7, "terrain_mode": "flat_ground" }"#)
            .unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.terrain_mode, TerrainMode::FlatGround);
        assert_eq!(config.grid_dimensions, [8, 8, 4]);
        assert_eq!(config.worker_sleep(), Duration::from_millis(1));
    }

    #[test]
    fn rejects_empty_grid() {
        let err = EngineConfig::from_json(r#"{ "grid_dimensions": [4, 0, 4] }"#).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "grid_dimensions",
                ..
            }
        ));
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(matches!(
            EngineConfig::from_json("{ seed: }"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = EngineConfig::load("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
