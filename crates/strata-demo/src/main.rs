//! Headless Strata demo.
//!
//! Streams a world around a camera flying over the terrain for a fixed
//! number of frames, rendering through the CPU-side backend, and prints
//! what the pipeline did.
//!
//! Run with `cargo run -p strata-demo -- --frames 600 --seed 7`.

mod flight;

use std::path::PathBuf;
use std::process::ExitCode;
use std::thread;
use std::time::{Duration, Instant};

use clap::Parser;
use glam::Vec3;
use strata_config::{CliArgs, Config};
use strata_render::{ChunkRenderer, HeadlessBackend};
use strata_world::World;
use tracing::{error, info};

use crate::flight::{FlightPath, FrameTotals};

/// Frames run when `--frames` is not given.
const DEFAULT_FRAMES: u32 = 300;
/// Simulated frame time.
const FRAME_TIME: Duration = Duration::from_millis(16);
/// Camera speed in blocks per second.
const FLIGHT_SPEED: f32 = 12.0;

fn config_dir(args: &CliArgs) -> PathBuf {
    args.config
        .clone()
        .or_else(Config::default_dir)
        .unwrap_or_else(|| PathBuf::from(".strata"))
}

fn main() -> ExitCode {
    let args = CliArgs::parse();
    let config_dir = config_dir(&args);

    let mut config = Config::load_or_create(&config_dir).unwrap_or_else(|e| {
        eprintln!("Failed to load config: {e}, using defaults");
        Config::default()
    });
    config.apply_cli_overrides(&args);
    if let Err(e) = config.validate() {
        eprintln!("{e}");
        return ExitCode::FAILURE;
    }

    let log_dir = config_dir.join("logs");
    strata_log::init_logging(Some(&log_dir), cfg!(debug_assertions), Some(&config));

    match run(&config, args.frames.unwrap_or(DEFAULT_FRAMES)) {
        Ok(totals) => {
            println!("Strata headless run");
            println!("  frames:          {}", totals.frames);
            println!("  mesh uploads:    {}", totals.uploads);
            println!("  stale uploads:   {}", totals.stale_uploads);
            println!("  failed uploads:  {}", totals.failed_uploads);
            println!("  pruned meshes:   {}", totals.pruned);
            println!("  draw calls/frame {:.1}", totals.average_draw_calls());
            println!("  triangles drawn: {}", totals.triangles);
            println!("  peak visible:    {} chunks", totals.peak_visible_chunks);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("demo failed: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(config: &Config, frames: u32) -> Result<FrameTotals, Box<dyn std::error::Error>> {
    let mut world = World::new(config)?;
    let mut renderer = ChunkRenderer::new(HeadlessBackend::new(), world.render_config().clone())?;

    let cruise_height = config.terrain.base_height as f32 + config.terrain.amplitude as f32 + 16.0;
    let path = FlightPath::new(
        Vec3::new(0.0, cruise_height, 0.0),
        Vec3::new(FLIGHT_SPEED, 0.0, FLIGHT_SPEED * 0.5),
    );

    let mut totals = FrameTotals::default();
    let started = Instant::now();
    for frame in 0..frames {
        let seconds = frame as f32 * FRAME_TIME.as_secs_f32();
        let camera = path.camera_at(seconds, config.render.fov);

        let tick = world.tick(camera.position);
        let stats = world.render(&mut renderer, &camera.view());
        totals.add(&stats);

        if frame % 60 == 0 {
            info!(
                "frame {frame}: column {:?}, loaded {} (+{} -{}), {} meshes, {} draws, {} triangles",
                tick.focus,
                world.manager().loaded_count(),
                tick.loaded.len(),
                tick.unloaded.len(),
                renderer.mesh_count(),
                stats.draw_calls,
                stats.triangles
            );
        }
        thread::sleep(FRAME_TIME);
    }

    let generation = world.generation_stats();
    let meshing = world.meshing().stats();
    info!(
        "ran {frames} frames in {:?}: generated {} (failed {}), meshed {} (failed {}), {} bytes resident",
        started.elapsed(),
        generation.generated(),
        generation.failed(),
        meshing.meshed(),
        meshing.failed(),
        renderer.backend().resident_bytes()
    );

    renderer.release_all();
    world.shutdown();
    Ok(totals)
}
