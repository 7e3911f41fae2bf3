//! # Voxel World Demo
//!
//! Runs the chunk subsystem without a window: streams terrain around a player,
//! lets it walk and fall for a while, edits a block, and renders frames either
//! into a recording pass or, with `--gpu`, offscreen through `wgpu`.
//!
//! ## Usage
//!
//! ```bash
//! RUST_LOG=info cargo run --release -- [config.json] [--gpu]
//! ```

use std::{env, process::ExitCode, thread, time::Duration};

use cgmath::{Point3, Vector2, Vector3};
use log::{error, info, warn};
use web_time::Instant;

use voxel_world::{
    core::{EngineConfig, EngineError},
    engine_state::{
        rendering::{
            wgpu_backend::view_projection, ChunkPipeline, GpuBackend, HeadlessBackend, RecordingPass,
            WgpuBackend,
        },
        voxels::{block::block_type::BlockType, terrain::TerrainGenerator},
        EngineState, EngineStats,
    },
};

const TICK: f32 = 1.0 / 60.0;
const PHYSICS_TICKS: usize = 600;
const LOAD_TIMEOUT: Duration = Duration::from_secs(30);
const FRAME_SIZE: (u32, u32) = (640, 480);
const SPAWN_SEARCH_TOP: i32 = 128;
const SPAWN_SEARCH_BOTTOM: i32 = -128;

fn main() -> ExitCode {
    voxel_world::init_logger();

    let mut config_path = None;
    let mut use_gpu = false;
    for arg in env::args().skip(1) {
        if arg == "--gpu" {
            use_gpu = true;
        } else {
            config_path = Some(arg);
        }
    }

    let config = match config_path {
        Some(path) => match EngineConfig::load(&path) {
            Ok(config) => config,
            Err(e) => {
                error!("Could not load config {path}: {e}");
                return ExitCode::FAILURE;
            }
        },
        None => EngineConfig::default(),
    };

    let result = if use_gpu {
        run_gpu(config)
    } else {
        run_headless(config)
    };

    match result {
        Ok(stats) => {
            info!("Finished: {stats:?}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run_headless(config: EngineConfig) -> Result<EngineStats, EngineError> {
    run(config, HeadlessBackend::new(), |engine| {
        let mut pass = RecordingPass::default();
        engine.render(&mut pass)
    })
}

fn run_gpu(config: EngineConfig) -> Result<EngineStats, EngineError> {
    let backend = match pollster::block_on(WgpuBackend::request_headless()) {
        Ok(backend) => backend,
        Err(e) => {
            warn!("{e}; falling back to the headless backend");
            return run_headless(config);
        }
    };
    let pipeline = ChunkPipeline::new(backend.device());
    let aspect = FRAME_SIZE.0 as f32 / FRAME_SIZE.1 as f32;

    run(config, backend, move |engine| {
        let bounds = engine.player().bounds();
        let eye = Point3::new(bounds.center().x, bounds.center().y, bounds.max.z);
        pipeline.set_camera(
            engine.backend().queue(),
            view_projection(eye, Vector3::new(1.0, 0.3, -0.4), aspect),
        );
        engine
            .backend()
            .render_offscreen(&pipeline, FRAME_SIZE, |pass| engine.render(pass))
    })
}

/// Drives one engine through loading, a physics run and a few edits.
fn run<B: GpuBackend>(
    config: EngineConfig,
    backend: B,
    mut render: impl FnMut(&EngineState<B>) -> usize,
) -> Result<EngineStats, EngineError> {
    let surface = TerrainGenerator::new(config.seed)
        .surface_height(0, 0, config.terrain_mode, SPAWN_SEARCH_TOP, SPAWN_SEARCH_BOTTOM)
        .unwrap_or(0);
    let spawn = Point3::new(0.5, 0.5, surface as f32 + 2.0);
    info!("Spawning at {spawn:?}");
    let mut engine = EngineState::new(config, backend, spawn)?;
    engine.start();

    let started = Instant::now();
    if !wait_until_settled(&engine) {
        warn!("Chunks still loading after {:?}", LOAD_TIMEOUT);
    }
    info!(
        "Initial load took {:?}: {:?}",
        started.elapsed(),
        engine.stats()
    );

    engine.player_mut().set_walk(Vector2::new(6.0, 2.0));
    let simulated = Instant::now();
    for tick in 0..PHYSICS_TICKS {
        let result = engine.step_physics(TICK);
        if tick % 60 == 0 {
            info!(
                "tick {tick}: feet {:?}, grounded {:?}",
                engine.player().feet(),
                result.grounded
            );
            let draws = render(&engine);
            info!("Rendered {draws} draw calls");
        }
        if tick % 120 == 119 && engine.player().on_ground() {
            engine.player_mut().jump();
        }
    }
    info!("Simulated {PHYSICS_TICKS} ticks in {:?}", simulated.elapsed());

    let down = Vector3::new(0.3, 0.2, -1.0);
    match engine.pick_from_player(down) {
        Some(hit) => {
            info!("Looking at {:?} ({:?} face)", hit.point, hit.face);
            if let Some(removed) = engine.remove_block(hit.point) {
                info!("Removed {removed:?} at {:?}", hit.point);
                let replacement = BlockType::get_random_type();
                if engine.set_block(hit.point, replacement) {
                    info!("Placed {replacement:?} at {:?}", hit.point);
                }
            }
        }
        None => info!("Nothing within reach below the player"),
    }

    wait_until_settled(&engine);
    render(&engine);
    engine.stop();
    Ok(engine.stats())
}

fn wait_until_settled<B: GpuBackend>(engine: &EngineState<B>) -> bool {
    let deadline = Instant::now() + LOAD_TIMEOUT;
    while !engine.stats().settled() {
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(Duration::from_millis(5));
    }
    true
}
