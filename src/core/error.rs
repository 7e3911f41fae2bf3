//! # Error Types
//!
//! Errors that cross module boundaries. Everything that the engine treats as a
//! recoverable "no" (occupied cell, empty ray query) stays a `bool` or `Option`;
//! these types cover the cases a caller has to decide about.

use std::path::PathBuf;

/// Failure reported by a GPU upload backend.
#[derive(Debug, thiserror::Error)]
pub enum GpuError {
    /// The backend could not create a vertex or index buffer.
    #[error("buffer creation failed for '{label}': {message}")]
    BufferCreation {
        /// Label of the buffer.
        label: String,
        /// Backend's description of the failure.
        message: String,
    },

    /// The backend rejected an upload into an existing buffer.
    #[error("upload of {bytes} bytes into '{label}' failed: {message}")]
    Upload {
        /// Label of the buffer.
        label: String,
        /// Size of the rejected upload.
        bytes: usize,
        /// Backend's description of the failure.
        message: String,
    },

    /// No adapter or device could be obtained.
    #[error("no usable GPU device: {0}")]
    Device(String),

    /// A mesh was used before `init` succeeded.
    #[error("mesh buffer '{label}' used before initialization")]
    NotInitialized {
        /// Label of the mesh.
        label: String,
    },
}

/// Failure while loading or validating an `EngineConfig`.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("could not read config file {path}: {source}")]
    Io {
        /// Path that was read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid config JSON.
    #[error("could not parse config: {0}")]
    Parse(#[from] serde_json::Error),

    /// A value parsed but is out of range.
    #[error("invalid config value for '{field}': {reason}")]
    Invalid {
        /// Name of the offending field.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

/// Top-level error returned by engine construction.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The configuration was rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// GPU resources could not be created.
    #[error(transparent)]
    Gpu(#[from] GpuError),
}
