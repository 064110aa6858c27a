//! Preview generator binary: renders one chunk to disk.
//!
//! Usage: cargo run --release --bin generate_preview -- [OPTIONS]
//!
//! Options:
//!   --config <PATH>   Terrain config JSON (default: built-in defaults)
//!   --mode <MODE>     noise | color | mesh | falloff (default: color)
//!   --lod <N>         Mesh LOD for --mode mesh (default: 0)
//!   --seed <SEED>     Override the noise seed
//!   --out <STEM>      Output path without extension (default: "preview")
//!
//! Writes `<STEM>.png`, plus `<STEM>.obj` in mesh mode.

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::time::Instant;

use terrastream::core::logging;
use terrastream::core::{Error, Result};
use terrastream::generation::{DrawMode, MapGenerator, Preview, TerrainConfig};

fn main() {
    logging::init();

    if let Err(e) = run() {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let lod = parse_arg::<u32>(&args, "--lod").unwrap_or(0);
    let mode = match parse_arg::<String>(&args, "--mode").as_deref().unwrap_or("color") {
        "noise" => DrawMode::NoiseMap,
        "color" => DrawMode::ColorMap,
        "mesh" => DrawMode::Mesh { lod },
        "falloff" => DrawMode::FalloffMap,
        other => return Err(Error::Config(format!("unknown draw mode '{}'", other))),
    };
    let out = PathBuf::from(parse_arg::<String>(&args, "--out").unwrap_or_else(|| "preview".to_string()));

    let mut config = match parse_arg::<String>(&args, "--config") {
        Some(path) => TerrainConfig::load(path)?,
        None => TerrainConfig::default(),
    };
    if let Some(seed) = parse_arg::<u32>(&args, "--seed") {
        config.noise.seed = seed;
    }
    let config = config.validated()?;

    println!("=== Terrain Preview ===");
    println!("Mode:  {:?}", mode);
    println!("Chunk: {} samples", config.chunk_size);
    println!("Seed:  {}", config.noise.seed);
    println!("Output: {}", out.display());
    println!();

    let start = Instant::now();
    let generator = MapGenerator::new(config);
    let preview = generator.generate_preview(mode)?;

    preview.texture().save_png(out.with_extension("png"))?;
    if let Preview::Mesh { mesh, .. } = &preview {
        let path = out.with_extension("obj");
        mesh.write_obj(BufWriter::new(File::create(&path)?))?;
        println!(
            "Mesh: {} vertices, {} triangles -> {}",
            mesh.vertex_count(),
            mesh.triangle_count(),
            path.display()
        );
    }

    println!("Done in {:.2}s", start.elapsed().as_secs_f32());
    Ok(())
}

fn parse_arg<T: std::str::FromStr>(args: &[String], flag: &str) -> Option<T> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}
