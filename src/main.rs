//! Headless terrain streaming driver.
//!
//! Walks a viewer across the world and runs the chunk scheduler once per
//! frame, logging what gets built and dropped.
//!
//! Usage: cargo run --release -- [OPTIONS]
//!
//! Options:
//!   --config <PATH>   World config JSON (default: built-in defaults)
//!   --frames <N>      Frames to simulate (default: 600)
//!   --speed <U>       Viewer speed in world units per frame (default: 0.5)
//!   --seed <SEED>     Override the world seed
//!   --dump-config     Print the effective config as JSON and exit

use std::time::{Duration, Instant};

use glam::Vec3;

use marchland::core::{logging, Result, WorldConfig};
use marchland::pipeline::ChunkPipeline;
use marchland::streaming::{ChunkEvent, ChunkStreamingScheduler};

const FRAME_TIME: Duration = Duration::from_millis(16);

fn main() {
    logging::init();

    if let Err(e) = run() {
        log::error!("{e}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let frames = parse_u64_arg(&args, "--frames").unwrap_or(600);
    let speed = parse_f32_arg(&args, "--speed").unwrap_or(0.5);

    let mut config = match parse_str_arg(&args, "--config") {
        Some(path) => WorldConfig::load(path)?,
        None => WorldConfig::default(),
    };
    if let Some(seed) = parse_u32_arg(&args, "--seed") {
        config.seed = seed;
    }
    config.validate()?;

    if args.iter().any(|a| a == "--dump-config") {
        println!("{}", config.to_json_string()?);
        return Ok(());
    }

    log::info!(
        "Streaming seed {} with near radius {}, far radius {}, {} workers",
        config.seed,
        config.streaming.near_radius,
        config.streaming.far_radius,
        config.streaming.worker_threads
    );

    let pipeline = ChunkPipeline::from_config(&config)?;
    let chunk_world_size = config.layout.chunk_world_size();
    let mut scheduler = ChunkStreamingScheduler::new(config.streaming.clone(), chunk_world_size, pipeline)?;

    let ground = config.density.ground_height;
    let mut viewer = Vec3::new(0.0, ground, 0.0);
    let heading = Vec3::new(1.0, 0.0, 0.35).normalize();

    let start = Instant::now();
    let (mut ready, mut removed, mut triangles) = (0usize, 0usize, 0usize);

    for frame in 0..frames {
        let frame_start = Instant::now();

        for event in scheduler.update(viewer) {
            match event {
                ChunkEvent::Ready { mesh, .. } => {
                    ready += 1;
                    triangles += mesh.buffers.triangle_count();
                }
                ChunkEvent::Removed { .. } => removed += 1,
            }
        }

        if frame % 60 == 0 {
            let stats = scheduler.stats();
            log::info!(
                "Frame {:>5} viewer {:?}: {} ready, {} loading, {} queued, {} pending removal",
                frame,
                stats.viewer_chunk,
                stats.ready,
                stats.loading,
                stats.queued,
                stats.pending_removal
            );
        }

        viewer += heading * speed;
        if let Some(rest) = FRAME_TIME.checked_sub(frame_start.elapsed()) {
            std::thread::sleep(rest);
        }
    }

    let stats = scheduler.stats();
    log::info!(
        "Done in {:.1}s: {} chunks ready ({} triangles), {} removed, {} discarded, {} failed",
        start.elapsed().as_secs_f32(),
        ready,
        triangles,
        removed,
        stats.discarded_total,
        stats.failed
    );

    let leftover = scheduler.clear();
    log::debug!("Teardown released {} chunks", leftover.len());
    Ok(())
}

fn parse_f32_arg(args: &[String], flag: &str) -> Option<f32> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}

fn parse_u32_arg(args: &[String], flag: &str) -> Option<u32> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}

fn parse_u64_arg(args: &[String], flag: &str) -> Option<u64> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}

fn parse_str_arg(args: &[String], flag: &str) -> Option<String> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}
