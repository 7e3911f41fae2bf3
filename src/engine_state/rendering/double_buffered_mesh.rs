//! # Double-Buffered Mesh
//!
//! Hand-off of chunk geometry from worker threads to the render thread.
//!
//! Each mesh owns two buffer slots and an atomic index naming the active one.
//! Uploads always write the inactive slot and then flip the index; `render` reads
//! the index fresh on every call and only touches the slot it names. The render
//! thread therefore sees either the geometry from before an upload or the whole
//! new upload, never a mix.
//!
//! ```text
//!  worker                         render thread
//!  ------                         -------------
//!  write slot[1 - active]
//!  active = 1 - active  ───────►  slot[active].draw()
//! ```
//!
//! Each slot sits behind its own `MtResource`. The render path only ever
//! `try_get`s a slot: if a writer has already started on the slot it just read
//! as active, the index is re-read once, and if that slot is busy too the draw is
//! skipped for this frame. Writers are serialized, so at most one slot is held.

use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Mutex, RwLockReadGuard,
};

use log::{debug, error};

use crate::{
    core::{GpuError, MtResource},
    engine_state::voxels::block::block_type::{BlockType, MESHED_BLOCK_TYPE_COUNT},
};

use super::{
    backend::{DrawPass, GpuBackend},
    mesh::{ChunkMeshData, MeshData},
};

struct MeshSlot<T> {
    buffer: Option<T>,
    draw_count: u32,
}

/// Two geometry buffers for one block type of one chunk.
pub struct DoubleBufferedMesh<B: GpuBackend> {
    label: String,
    block_type: BlockType,
    slots: [MtResource<MeshSlot<B::Buffer>>; 2],
    active: AtomicUsize,
    /// Serializes writers; the render path never takes it.
    upload_lock: Mutex<()>,
}

impl<B: GpuBackend> DoubleBufferedMesh<B> {
    /// Creates a mesh with no GPU buffers yet. Call `init` before uploading.
    pub fn new(label: impl Into<String>, block_type: BlockType) -> Self {
        DoubleBufferedMesh {
            label: label.into(),
            block_type,
            slots: [
                MtResource::new(MeshSlot {
                    buffer: None,
                    draw_count: 0,
                }),
                MtResource::new(MeshSlot {
                    buffer: None,
                    draw_count: 0,
                }),
            ],
            active: AtomicUsize::new(0),
            upload_lock: Mutex::new(()),
        }
    }

    /// Creates both GPU buffers.
    ///
    /// Already-created buffers are kept, so a failed `init` can simply be retried.
    ///
    /// # Errors
    /// Returns the backend's error if a buffer cannot be created. The mesh stays
    /// unusable (uploads fail with `NotInitialized`) until `init` succeeds.
    pub fn init(&self, backend: &B) -> Result<(), GpuError> {
        for (index, slot) in self.slots.iter().enumerate() {
            let mut slot = slot.get_mut();
            if slot.buffer.is_none() {
                let buffer = backend
                    .create_buffer(&format!("{} [{}]", self.label, index))
                    .inspect_err(|e| error!("Could not create mesh buffer: {e}"))?;
                slot.buffer = Some(buffer);
            }
        }
        Ok(())
    }

    /// `true` once both buffers exist.
    pub fn is_initialized(&self) -> bool {
        self.slots.iter().all(|slot| slot.get().buffer.is_some())
    }

    /// Block type this mesh draws.
    pub fn block_type(&self) -> BlockType {
        self.block_type
    }

    /// Writes `mesh` into the inactive buffer, then makes it the active one.
    ///
    /// # Errors
    /// `NotInitialized` before a successful `init`, or the backend's upload error.
    /// On error the active buffer is unchanged.
    pub fn upload_data(&self, backend: &B, mesh: &MeshData) -> Result<(), GpuError> {
        let _writer = self.upload_lock.lock().unwrap_or_else(|e| e.into_inner());

        let target = 1 - self.active.load(Ordering::Acquire);
        {
            let mut slot = self.slots[target].get_mut();
            let MeshSlot { buffer, draw_count } = &mut *slot;
            let Some(buffer) = buffer.as_mut() else {
                return Err(GpuError::NotInitialized {
                    label: self.label.clone(),
                });
            };
            *draw_count = 0;
            backend.allocate(buffer, mesh.vertex_bytes(), mesh.index_bytes())?;
            *draw_count = mesh.draw_count();
        }

        self.active.store(target, Ordering::Release);
        debug!(
            "Swapped '{}' to buffer {} ({} indices)",
            self.label,
            target,
            mesh.draw_count()
        );
        Ok(())
    }

    /// Read guard on the active slot, without blocking.
    ///
    /// Returns `None` if a writer holds the slot named by the index on both reads.
    fn try_active_slot(&self) -> Option<RwLockReadGuard<'_, MeshSlot<B::Buffer>>> {
        for _ in 0..2 {
            if let Some(slot) = self.slots[self.active.load(Ordering::Acquire)].try_get() {
                return Some(slot);
            }
        }
        None
    }

    /// Index count of the active buffer.
    pub fn draw_count(&self) -> u32 {
        loop {
            if let Some(slot) = self.try_active_slot() {
                return slot.draw_count;
            }
            std::thread::yield_now();
        }
    }

    /// Issues one indexed draw over the active buffer.
    ///
    /// # Returns
    /// `false` if there was nothing to draw, or the active buffer was being
    /// rewritten and the draw was skipped.
    pub fn render<P: DrawPass<B>>(&self, pass: &mut P) -> bool {
        let Some(slot) = self.try_active_slot() else {
            return false;
        };
        match &slot.buffer {
            Some(buffer) if slot.draw_count > 0 => {
                pass.draw_indexed(self.block_type, buffer, slot.draw_count);
                true
            }
            _ => false,
        }
    }
}

/// The per-block-type meshes of one chunk slot.
///
/// `visible` is cleared when the owning chunk is moved by the grid, so geometry
/// for the old position is not drawn while the new one is being built.
pub struct ChunkMeshSet<B: GpuBackend> {
    meshes: [DoubleBufferedMesh<B>; MESHED_BLOCK_TYPE_COUNT],
    visible: AtomicBool,
}

impl<B: GpuBackend> ChunkMeshSet<B> {
    /// Creates one mesh per solid block type, labelled `"{label}/{type:?}"`.
    pub fn new(label: &str) -> Self {
        ChunkMeshSet {
            meshes: BlockType::solid_types()
                .map(|block_type| DoubleBufferedMesh::new(format!("{label}/{block_type:?}"), block_type)),
            visible: AtomicBool::new(false),
        }
    }

    /// Creates the GPU buffers of every mesh.
    pub fn init(&self, backend: &B) -> Result<(), GpuError> {
        self.meshes.iter().try_for_each(|mesh| mesh.init(backend))
    }

    /// Uploads a freshly built mesh set and makes it visible.
    ///
    /// Every type is attempted even if an earlier one fails; the first error is
    /// returned and the set stays hidden.
    pub fn upload(&self, backend: &B, data: &ChunkMeshData) -> Result<(), GpuError> {
        let mut result = Ok(());
        for (mesh, mesh_data) in self.meshes.iter().zip(data.iter()) {
            if let Err(e) = mesh.upload_data(backend, mesh_data) {
                if result.is_ok() {
                    result = Err(e);
                }
            }
        }
        self.visible.store(result.is_ok(), Ordering::Release);
        result
    }

    /// Draws every non-empty mesh if the set is visible.
    ///
    /// # Returns
    /// The number of draw calls issued.
    pub fn render<P: DrawPass<B>>(&self, pass: &mut P) -> usize {
        if !self.is_visible() {
            return 0;
        }
        self.meshes.iter().filter(|mesh| mesh.render(pass)).count()
    }

    /// `true` if the set currently holds geometry for its chunk's position.
    pub fn is_visible(&self) -> bool {
        self.visible.load(Ordering::Acquire)
    }

    /// Stops drawing the set until the next successful upload.
    pub fn hide(&self) {
        self.visible.store(false, Ordering::Release);
    }

    /// The mesh for `block_type`, if it is meshed.
    pub fn mesh(&self, block_type: BlockType) -> Option<&DoubleBufferedMesh<B>> {
        block_type.mesh_index().map(|index| &self.meshes[index])
    }
}

#[cfg(test)]
mod tests {
    use cgmath::Point3;

    use super::*;
    use crate::engine_state::{
        rendering::backend::{HeadlessBackend, RecordingPass},
        voxels::block::block_side::BlockSide,
    };

    fn quad_mesh(faces: usize) -> MeshData {
        let mut mesh = MeshData::default();
        for i in 0..faces {
            mesh.push_face(Point3::new(i as i32, 0, 0), BlockSide::PZ, 0);
        }
        mesh
    }

    #[test]
    fn upload_before_init_fails() {
        let backend = HeadlessBackend::new();
        let mesh = DoubleBufferedMesh::<HeadlessBackend>::new("m", BlockType::DIRT);
        let err = mesh.upload_data(&backend, &quad_mesh(1)).unwrap_err();
        assert!(matches!(err, GpuError::NotInitialized { .. }));
        assert!(!mesh.is_initialized());
    }

    #[test]
    fn upload_swaps_active_buffer() {
        let backend = HeadlessBackend::new();
        let mesh = DoubleBufferedMesh::new("m", BlockType::DIRT);
        mesh.init(&backend).unwrap();

        let mut pass = RecordingPass::default();
        assert!(!mesh.render(&mut pass));

        mesh.upload_data(&backend, &quad_mesh(2)).unwrap();
        assert!(mesh.render(&mut pass));
        mesh.upload_data(&backend, &quad_mesh(1)).unwrap();
        assert!(mesh.render(&mut pass));

        assert_eq!(pass.draws.len(), 2);
        assert_eq!(pass.draws[0].index_count, 12);
        assert_eq!(pass.draws[0].label, "m [1]");
        assert_eq!(pass.draws[1].index_count, 6);
        assert_eq!(pass.draws[1].label, "m [0]");
    }

    #[test]
    fn failed_upload_keeps_previous_geometry() {
        let one_face = quad_mesh(1);
        let limit = one_face.vertex_bytes().len() + one_face.index_bytes().len();
        let backend = HeadlessBackend::with_upload_limit(limit);
        let mesh = DoubleBufferedMesh::new("m", BlockType::SAND);
        mesh.init(&backend).unwrap();

        mesh.upload_data(&backend, &one_face).unwrap();
        assert!(mesh.upload_data(&backend, &quad_mesh(3)).is_err());
        assert_eq!(mesh.draw_count(), 6);
    }

    #[test]
    fn render_skips_instead_of_waiting_for_a_writer() {
        let backend = HeadlessBackend::new();
        let mesh = DoubleBufferedMesh::new("m", BlockType::DIRT);
        mesh.init(&backend).unwrap();
        mesh.upload_data(&backend, &quad_mesh(1)).unwrap();
        mesh.upload_data(&backend, &quad_mesh(2)).unwrap();

        let active = mesh.active.load(Ordering::Acquire);
        let mut pass = RecordingPass::default();
        {
            let _writer = mesh.slots[active].get_mut();
            assert!(!mesh.render(&mut pass));
        }
        {
            let _writer = mesh.slots[1 - active].get_mut();
            assert!(mesh.render(&mut pass));
            assert_eq!(mesh.draw_count(), 12);
        }
        assert_eq!(pass.draws.len(), 1);
        assert_eq!(pass.draws[0].index_count, 12);
    }

    #[test]
    fn mesh_set_hides_until_uploaded() {
        let backend = HeadlessBackend::new();
        let set = ChunkMeshSet::new("chunk 0");
        set.init(&backend).unwrap();

        let mut data: ChunkMeshData = Default::default();
        data[BlockType::STONE.mesh_index().unwrap()] = quad_mesh(1);

        let mut pass = RecordingPass::default();
        assert_eq!(set.render(&mut pass), 0);
        set.upload(&backend, &data).unwrap();
        assert_eq!(set.render(&mut pass), 1);
        assert_eq!(pass.draws[0].block_type, BlockType::STONE);

        set.hide();
        assert_eq!(set.render(&mut pass), 0);
    }
}
