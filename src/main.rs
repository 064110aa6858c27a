//! Headless streaming demo.
//!
//! Flies a viewer along a straight line over the terrain and logs how the
//! chunk set follows it.
//!
//! Usage: cargo run --release -- [OPTIONS]
//!
//! Options:
//!   --config <PATH>   Terrain config JSON (default: built-in defaults)
//!   --ticks <N>       Number of ticks to run (default: 200)
//!   --speed <UNITS>   Viewer movement per tick (default: 8.0)
//!   --heading <DEG>   Direction of travel in degrees (default: 30.0)

use std::time::{Duration, Instant};

use terrastream::core::logging;
use terrastream::core::types::Vec2;
use terrastream::core::Result;
use terrastream::generation::TerrainConfig;
use terrastream::streaming::ChunkManager;

fn main() {
    logging::init();

    if let Err(e) = run() {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let ticks = parse_arg::<u32>(&args, "--ticks").unwrap_or(200);
    let speed = parse_arg::<f32>(&args, "--speed").unwrap_or(8.0);
    let heading = parse_arg::<f32>(&args, "--heading").unwrap_or(30.0).to_radians();

    let config = match parse_arg::<String>(&args, "--config") {
        Some(path) => TerrainConfig::load(path)?,
        None => TerrainConfig::default(),
    };

    let mut manager = ChunkManager::new(config)?;
    let direction = Vec2::new(heading.cos(), heading.sin());
    let start = Instant::now();

    for tick in 0..ticks {
        let viewer = direction * speed * tick as f32;
        let visible = manager.advance(viewer).len();

        if tick % 25 == 0 {
            let stats = manager.stats();
            log::info!(
                "tick {:>4} viewer ({:>8.1}, {:>8.1}) chunk ({}, {}): {} visible / {} loaded, {} in flight, {} completed, {} failed",
                tick,
                viewer.x,
                viewer.y,
                manager.viewer_chunk().x,
                manager.viewer_chunk().y,
                visible,
                manager.chunk_count(),
                manager.pipeline().in_flight(),
                stats.completed,
                stats.failed
            );
        }
        std::thread::sleep(Duration::from_millis(16));
    }

    if !manager.wait_idle(Duration::from_secs(30)) {
        log::warn!("Workers still busy at shutdown");
    }
    let final_viewer = direction * speed * ticks as f32;
    manager.advance(final_viewer);

    let stats = manager.stats();
    let meshed = manager.chunks().filter(|c| c.displayed_mesh().is_some()).count();
    log::info!(
        "Done in {:.2}s: {} chunks, {} meshed, {} height requests, {} mesh requests, {} failed",
        start.elapsed().as_secs_f32(),
        manager.chunk_count(),
        meshed,
        stats.height_requests,
        stats.mesh_requests,
        stats.failed
    );
    Ok(())
}

fn parse_arg<T: std::str::FromStr>(args: &[String], flag: &str) -> Option<T> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}
