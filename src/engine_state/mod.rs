//! # Engine State Module
//!
//! The coordinator that ties the voxel subsystems together.
//!
//! ## Key Components
//!
//! * `EngineState` - owns the grid, the worker pool, the chunk meshes and the player
//! * `physics` - bounding boxes, collision resolution and the actor integrator
//! * `rendering` - vertex format, mesh data and the double-buffered GPU hand-off
//! * `task_management` - the polling worker pool and its chunk partitioning
//! * `voxels` - blocks, chunks, terrain generation and the streaming grid
//!
//! ## Architecture
//!
//! ```text
//!  render / physics thread                  worker i (of N)
//!  -----------------------                  ---------------
//!  update_viewer ── grid.write ──► rotate   for id in partition(len, N, i):
//!  step_physics  ── grid.read  ──► collide     grid.read
//!  set_block     ── grid.read  ──► edit        generate if !loaded (unlocked)
//!  render        ── meshes only                chunk[id].write: load, then
//!                                              mesh + upload if mesh_dirty
//! ```
//!
//! Locks are always taken grid first, then at most one chunk at a time. Workers
//! hold the grid read lock for the whole of one chunk's work, so a rotation can
//! never slip in between building a mesh and uploading it.
//!
//! Chunks that have not been generated yet are treated as empty space by
//! collision and picking.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use cgmath::{InnerSpace, Point3, Vector3};
use log::{debug, error, info, warn};

use crate::core::{EngineConfig, EngineError, MtResource};

use physics::{Actor, BoundingBox, CollisionResolver, CollisionResult};
use rendering::{ChunkMeshSet, DrawPass, GpuBackend};
use task_management::{partition, ThreadPool};
use voxels::{
    block::{block_side::BlockSide, block_type::BlockType},
    chunk::{Chunk, ChunkId, RayHit, CHUNK_DIMENSION},
    chunk_grid::ChunkGrid,
    terrain::{TerrainGenerator, TerrainMode},
};

pub mod physics;
pub mod rendering;
pub mod task_management;
pub mod voxels;

/// Counters describing the current state of the engine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EngineStats {
    /// Chunks in the grid.
    pub chunks: usize,
    /// Chunks whose terrain has been generated for their current position.
    pub chunks_loaded: usize,
    /// Chunks whose latest mesh is on the GPU.
    pub meshes_uploaded: usize,
    /// Draw calls issued by the last `render`.
    pub draw_calls: usize,
}

impl EngineStats {
    /// `true` once every chunk is generated and its current mesh uploaded.
    pub fn settled(&self) -> bool {
        self.chunks_loaded == self.chunks && self.meshes_uploaded == self.chunks
    }
}

/// State shared by every worker invocation.
struct WorkerContext<B: GpuBackend> {
    grid: MtResource<ChunkGrid>,
    meshes: Arc<Vec<ChunkMeshSet<B>>>,
    generator: Arc<TerrainGenerator>,
    backend: Arc<B>,
    terrain_mode: TerrainMode,
    cull_faces: bool,
    num_workers: usize,
}

impl<B: GpuBackend> WorkerContext<B> {
    /// One poll of worker `worker_id`: bring every chunk it owns up to date.
    fn poll(&self, worker_id: usize) {
        let chunk_count = self.meshes.len();
        for index in partition(chunk_count, self.num_workers, worker_id) {
            self.process_chunk(ChunkId(index));
        }
    }

    fn process_chunk(&self, id: ChunkId) {
        let grid = self.grid.get();
        let slot = grid.chunk(id);

        // Generation runs without the chunk lock so edits and picks are not held up.
        let pending = {
            let chunk = slot.get();
            (!chunk.loaded).then(|| chunk.position())
        };
        if let Some(position) = pending {
            let data = self.generator.generate(position, self.terrain_mode);
            let mut chunk = slot.get_mut();
            if !chunk.loaded && chunk.position() == position && chunk.load_blocks(&data) {
                debug!(
                    "Generated chunk {:?} at {:?}: {} blocks",
                    id,
                    position,
                    chunk.store().len()
                );
            }
        }

        let mut chunk = slot.get_mut();
        if chunk.loaded && chunk.mesh_dirty {
            let mesh_data = chunk.update_mesh(self.cull_faces);
            match self.meshes[id.0].upload(&self.backend, &mesh_data) {
                Ok(()) => {
                    chunk.mesh_uploaded = true;
                    debug!("Uploaded mesh of chunk {:?} at {:?}", id, chunk.position());
                }
                Err(e) => {
                    chunk.mesh_uploaded = false;
                    error!("Mesh upload for chunk {:?} failed: {e}", id);
                }
            }
        }
    }
}

/// The main state container of the chunk subsystem.
///
/// Generic over the GPU backend so the same engine runs against `wgpu` or the
/// in-memory `HeadlessBackend`.
///
/// # Examples
///
/// ```
/// use cgmath::Point3;
/// use voxel_world::core::EngineConfig;
/// use voxel_world::engine_state::{rendering::{HeadlessBackend, RecordingPass}, EngineState};
///
/// let config = EngineConfig {
///     grid_dimensions: [2, 2, 1],
///     worker_count: 2,
///     ..EngineConfig::default()
/// };
/// let mut engine = EngineState::new(config, HeadlessBackend::new(), Point3::new(0.0, 0.0, 8.0)).unwrap();
/// engine.start();
/// while !engine.stats().settled() {
///     std::thread::yield_now();
/// }
/// engine.stop();
///
/// let mut pass = RecordingPass::default();
/// engine.render(&mut pass);
/// ```
pub struct EngineState<B: GpuBackend> {
    config: EngineConfig,
    grid: MtResource<ChunkGrid>,
    meshes: Arc<Vec<ChunkMeshSet<B>>>,
    generator: Arc<TerrainGenerator>,
    backend: Arc<B>,
    pool: ThreadPool,
    player: Actor,
    resolver: CollisionResolver,
    last_draw_calls: AtomicUsize,
}

impl<B: GpuBackend> EngineState<B> {
    /// Builds the grid around `spawn`, creates every chunk's GPU buffers and
    /// prepares (but does not start) the worker pool.
    ///
    /// # Arguments
    /// * `config` - Engine settings; validated here
    /// * `backend` - GPU backend meshes are uploaded to
    /// * `spawn` - World position of the player's feet
    ///
    /// # Errors
    /// `EngineError::Config` for an invalid config, `EngineError::Gpu` if a mesh
    /// buffer cannot be created.
    pub fn new(config: EngineConfig, backend: B, spawn: Point3<f32>) -> Result<Self, EngineError> {
        config.validate()?;

        let dimensions = Vector3::from(config.grid_dimensions);
        let center = Chunk::containing(Self::block_of(spawn));
        let grid = ChunkGrid::new(config.grid_dimensions, center - dimensions / 2);

        let backend = Arc::new(backend);
        let meshes: Vec<ChunkMeshSet<B>> = grid
            .ids()
            .map(|id| ChunkMeshSet::new(&format!("chunk {}", id.0)))
            .collect();
        for mesh_set in &meshes {
            mesh_set.init(&backend)?;
        }

        let grid = MtResource::new(grid);
        let meshes = Arc::new(meshes);
        let generator = Arc::new(TerrainGenerator::new(config.seed));

        let context = WorkerContext {
            grid: grid.clone(),
            meshes: meshes.clone(),
            generator: generator.clone(),
            backend: backend.clone(),
            terrain_mode: config.terrain_mode,
            cull_faces: config.cull_faces,
            num_workers: config.worker_count,
        };
        let pool = ThreadPool::new(
            config.worker_count,
            Arc::new(move |worker_id| context.poll(worker_id)),
            config.worker_sleep(),
        );

        info!(
            "Engine created: seed {}, {:?} terrain, {} chunk meshes",
            config.seed,
            config.terrain_mode,
            meshes.len()
        );

        Ok(EngineState {
            resolver: CollisionResolver::new(config.collision_padding),
            config,
            grid,
            meshes,
            generator,
            backend,
            pool,
            player: Actor::new(spawn),
            last_draw_calls: AtomicUsize::new(0),
        })
    }

    fn block_of(position: Point3<f32>) -> Point3<i32> {
        position.map(|c| c.floor() as i32)
    }

    /// Starts the background workers.
    pub fn start(&mut self) {
        self.pool.start();
    }

    /// Stops the background workers and waits for them.
    pub fn stop(&mut self) {
        self.pool.stop(true);
    }

    /// The validated configuration the engine was built with.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The streaming grid.
    pub fn grid(&self) -> &MtResource<ChunkGrid> {
        &self.grid
    }

    /// The GPU backend meshes are uploaded to.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The terrain generator workers use.
    pub fn generator(&self) -> &TerrainGenerator {
        &self.generator
    }

    /// The player actor.
    pub fn player(&self) -> &Actor {
        &self.player
    }

    /// Mutable access to the player, e.g. to teleport it or set its walk input.
    pub fn player_mut(&mut self) -> &mut Actor {
        &mut self.player
    }

    /// Recentres the grid on the chunk containing `position`.
    ///
    /// Chunks that move are hidden until their new mesh is uploaded.
    ///
    /// # Returns
    /// The ids of the moved chunks.
    pub fn update_viewer(&self, position: Point3<f32>) -> Vec<ChunkId> {
        let center = Chunk::containing(Self::block_of(position));
        let mut grid = self.grid.get_mut();
        let moved = grid.recenter(center);
        // Still under the write lock: no worker can upload the new position first.
        for id in &moved {
            self.meshes[id.0].hide();
        }
        moved
    }

    /// Advances the player by one tick and recentres the grid on it.
    pub fn step_physics(&mut self, dt: f32) -> CollisionResult {
        let result = {
            let grid = self.grid.get();
            self.player.step(dt, &*grid, &self.resolver)
        };
        self.update_viewer(self.player.bounds().center());
        result
    }

    /// Draws every visible chunk mesh.
    ///
    /// # Returns
    /// The number of draw calls issued.
    pub fn render<P: DrawPass<B>>(&self, pass: &mut P) -> usize {
        let draw_calls: usize = self.meshes.iter().map(|mesh_set| mesh_set.render(pass)).sum();
        self.last_draw_calls.store(draw_calls, Ordering::Relaxed);
        draw_calls
    }

    /// Places a block at world block coordinate `world`.
    ///
    /// # Returns
    /// `false` if the cell is occupied, `block_type` is `NONE`, or the cell lies
    /// in a chunk that is outside the grid or not generated yet.
    pub fn set_block(&self, world: Point3<i32>, block_type: BlockType) -> bool {
        self.edit(world, |chunk, local| chunk.place_block(local, block_type))
            .unwrap_or(false)
    }

    /// Removes the block at world block coordinate `world`.
    ///
    /// # Returns
    /// The type of the removed block.
    pub fn remove_block(&self, world: Point3<i32>) -> Option<BlockType> {
        self.edit(world, |chunk, local| {
            chunk.remove_block(local).map(|block| block.block_type)
        })
        .flatten()
    }

    /// Runs `apply` on the chunk holding `world`. A change on the chunk border
    /// also marks the chunks across that border for remeshing.
    fn edit<R: EditOutcome>(
        &self,
        world: Point3<i32>,
        apply: impl FnOnce(&mut Chunk, Point3<i32>) -> R,
    ) -> Option<R> {
        let grid = self.grid.get();
        let Some(id) = grid.id_at_position(Chunk::containing(world)) else {
            warn!("Ignoring edit at {world:?}: outside the loaded grid");
            return None;
        };

        let (outcome, touched) = {
            let mut chunk = grid.chunk(id).get_mut();
            if !chunk.loaded {
                warn!("Ignoring edit at {world:?}: chunk not generated yet");
                return None;
            }
            let local = chunk.store().to_local(world);
            let outcome = apply(&mut *chunk, local);
            let touched: Vec<ChunkId> = if outcome.changed() {
                BlockSide::all()
                    .into_iter()
                    .filter(|side| Chunk::on_border(local, *side))
                    .filter_map(|side| chunk.neighbor(side))
                    .collect()
            } else {
                Vec::new()
            };
            (outcome, touched)
        };

        for neighbor in touched {
            grid.chunk(neighbor).get_mut().mesh_dirty = true;
        }
        Some(outcome)
    }

    /// Casts a ray through every generated chunk it can reach.
    ///
    /// # Arguments
    /// * `origin` - Ray start in world block units
    /// * `direction` - Ray direction, any non-zero length
    /// * `max_distance` - Maximum distance along the ray
    ///
    /// # Returns
    /// The nearest hit, with `point` in world block coordinates.
    pub fn pick_block(
        &self,
        origin: Point3<f32>,
        direction: Vector3<f32>,
        max_distance: f32,
    ) -> Option<RayHit> {
        if direction.magnitude2() == 0.0 {
            return None;
        }
        let direction = direction.normalize();
        let end = origin + direction * max_distance;
        let grid = self.grid.get();
        let last = grid.origin() + grid.dimensions() - Vector3::new(1, 1, 1);
        let lo = Chunk::containing(Self::block_of(Point3::new(
            origin.x.min(end.x),
            origin.y.min(end.y),
            origin.z.min(end.z),
        )));
        let hi = Chunk::containing(Self::block_of(Point3::new(
            origin.x.max(end.x),
            origin.y.max(end.y),
            origin.z.max(end.z),
        )));
        let lo = Point3::new(lo.x.max(grid.origin().x), lo.y.max(grid.origin().y), lo.z.max(grid.origin().z));
        let hi = Point3::new(hi.x.min(last.x), hi.y.min(last.y), hi.z.min(last.z));

        let mut nearest: Option<RayHit> = None;
        for z in lo.z..=hi.z {
            for y in lo.y..=hi.y {
                for x in lo.x..=hi.x {
                    let Some(id) = grid.id_at_position(Point3::new(x, y, z)) else {
                        continue;
                    };
                    let chunk = grid.chunk(id).get();
                    if !chunk.loaded {
                        continue;
                    }
                    let store = chunk.store();
                    let o = store.origin().map(|c| c as f32);
                    let extent = CHUNK_DIMENSION as f32;
                    let bounds = BoundingBox::new(o, o + Vector3::new(extent, extent, extent));
                    let Some(entry) = bounds.ray_entry(origin, direction) else {
                        continue;
                    };
                    let best = nearest.map_or(max_distance, |best| best.distance);
                    if entry > best {
                        continue;
                    }
                    // Start the walk one cell short of the chunk so the entry face is reported.
                    let skip = (entry - 1.0).max(0.0);
                    let start = origin + direction * skip;
                    let local_origin = Point3::new(start.x - o.x, start.y - o.y, start.z - o.z);
                    let Some(mut hit) = store.closest_block(local_origin, direction, max_distance - skip) else {
                        continue;
                    };
                    hit.distance += skip;
                    if nearest.is_some_and(|best| best.distance <= hit.distance) {
                        continue;
                    }
                    hit.point = store.to_world(hit.point);
                    nearest = Some(hit);
                }
            }
        }
        nearest
    }

    /// Picks along the player's line of sight, limited to the configured touch radius.
    pub fn pick_from_player(&self, direction: Vector3<f32>) -> Option<RayHit> {
        let bounds = self.player.bounds();
        let eye = Point3::new(bounds.center().x, bounds.center().y, bounds.max.z - 0.4);
        self.pick_block(eye, direction, self.config.touch_radius)
    }

    /// Places a block against the face a pick entered through.
    ///
    /// # Returns
    /// `false` if the hit has no entry face, the target cell would overlap the
    /// player, or `set_block` refuses the placement.
    pub fn place_against(&self, hit: &RayHit, block_type: BlockType) -> bool {
        let Some(face) = hit.face else {
            return false;
        };
        let target = hit.point + face.normal();
        if self.player.bounds().intersects(&BoundingBox::for_block(target)) {
            debug!("Not placing {block_type:?} at {target:?}: occupied by the player");
            return false;
        }
        self.set_block(target, block_type)
    }

    /// Current counters.
    pub fn stats(&self) -> EngineStats {
        let grid = self.grid.get();
        let mut stats = EngineStats {
            chunks: grid.len(),
            draw_calls: self.last_draw_calls.load(Ordering::Relaxed),
            ..EngineStats::default()
        };
        for id in grid.ids() {
            let chunk = grid.chunk(id).get();
            stats.chunks_loaded += chunk.loaded as usize;
            stats.meshes_uploaded += (chunk.mesh_uploaded && !chunk.mesh_dirty) as usize;
        }
        stats
    }
}

/// Whether an edit actually changed the world.
trait EditOutcome {
    fn changed(&self) -> bool;
}

impl EditOutcome for bool {
    fn changed(&self) -> bool {
        *self
    }
}

impl EditOutcome for Option<BlockType> {
    fn changed(&self) -> bool {
        self.is_some()
    }
}
