//! GPU capability seams.
//!
//! Chunk meshes only need two things from a graphics API: somewhere to put vertex
//! and index bytes, and a way to issue an indexed draw over them. `GpuBackend`
//! covers the first, `DrawPass` the second. `HeadlessBackend` keeps the bytes in
//! memory and records draws, which is what tests and the demo binary use.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::core::GpuError;
use crate::engine_state::voxels::block::block_type::BlockType;

/// Creates and fills geometry buffers.
///
/// A backend is shared between worker threads (uploads) and the render thread,
/// so it must be `Send + Sync`. Buffers are owned by `DoubleBufferedMesh`.
pub trait GpuBackend: Send + Sync + 'static {
    /// One vertex + index buffer pair.
    type Buffer: Send + Sync;

    /// Allocates an empty buffer pair.
    ///
    /// # Errors
    /// `GpuError::BufferCreation` if the device refuses the allocation.
    fn create_buffer(&self, label: &str) -> Result<Self::Buffer, GpuError>;

    /// Replaces the contents of `buffer`.
    ///
    /// # Errors
    /// `GpuError::Upload` if the data cannot be written.
    fn allocate(&self, buffer: &mut Self::Buffer, vertices: &[u8], indices: &[u8]) -> Result<(), GpuError>;
}

/// Something an indexed draw can be recorded into.
pub trait DrawPass<B: GpuBackend> {
    /// Binds `buffer` and draws its first `index_count` indices.
    fn draw_indexed(&mut self, block_type: BlockType, buffer: &B::Buffer, index_count: u32);
}

/// CPU-only backend. Buffers are byte vectors.
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    bytes_uploaded: AtomicU64,
    /// Reject every upload larger than this many bytes, if set.
    upload_limit: Option<usize>,
}

/// Buffer pair of the headless backend.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HeadlessBuffer {
    /// Name given at creation.
    pub label: String,
    /// Last uploaded vertex bytes.
    pub vertices: Vec<u8>,
    /// Last uploaded index bytes.
    pub indices: Vec<u8>,
    /// Number of uploads into this buffer.
    pub times_written: u64,
}

impl HeadlessBackend {
    /// Creates a backend that accepts every upload.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a backend that fails uploads larger than `limit` bytes.
    pub fn with_upload_limit(limit: usize) -> Self {
        HeadlessBackend {
            upload_limit: Some(limit),
            ..Self::default()
        }
    }

    /// Total bytes accepted so far.
    pub fn bytes_uploaded(&self) -> u64 {
        self.bytes_uploaded.load(Ordering::Relaxed)
    }
}

impl GpuBackend for HeadlessBackend {
    type Buffer = HeadlessBuffer;

    fn create_buffer(&self, label: &str) -> Result<HeadlessBuffer, GpuError> {
        Ok(HeadlessBuffer {
            label: label.to_string(),
            ..HeadlessBuffer::default()
        })
    }

    fn allocate(&self, buffer: &mut HeadlessBuffer, vertices: &[u8], indices: &[u8]) -> Result<(), GpuError> {
        let bytes = vertices.len() + indices.len();
        if let Some(limit) = self.upload_limit {
            if bytes > limit {
                return Err(GpuError::Upload {
                    label: buffer.label.clone(),
                    bytes,
                    message: format!("exceeds the {limit} byte upload limit"),
                });
            }
        }
        buffer.vertices.clear();
        buffer.vertices.extend_from_slice(vertices);
        buffer.indices.clear();
        buffer.indices.extend_from_slice(indices);
        buffer.times_written += 1;
        self.bytes_uploaded.fetch_add(bytes as u64, Ordering::Relaxed);
        Ok(())
    }
}

/// A single recorded draw.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordedDraw {
    /// Material of the mesh.
    pub block_type: BlockType,
    /// Label of the buffer that was bound.
    pub label: String,
    /// Indices drawn.
    pub index_count: u32,
    /// Indices stored in the bound buffer when the draw was issued.
    pub indices_in_buffer: usize,
    /// Vertices stored in the bound buffer when the draw was issued.
    pub vertex_bytes_in_buffer: usize,
}

/// Draw pass of the headless backend: records every draw.
#[derive(Debug, Default)]
pub struct RecordingPass {
    /// Draws issued, in order.
    pub draws: Vec<RecordedDraw>,
}

impl DrawPass<HeadlessBackend> for RecordingPass {
    fn draw_indexed(&mut self, block_type: BlockType, buffer: &HeadlessBuffer, index_count: u32) {
        self.draws.push(RecordedDraw {
            block_type,
            label: buffer.label.clone(),
            index_count,
            indices_in_buffer: buffer.indices.len() / std::mem::size_of::<u32>(),
            vertex_bytes_in_buffer: buffer.vertices.len(),
        });
    }
}
