//! Terrain configuration: noise, regions, meshing, LOD and streaming.
//!
//! Loaded from JSON with serde. [`TerrainConfig::validated`] clamps range
//! violations silently and rejects structural problems (unsorted tables,
//! LOD increments that do not divide the chunk size) with a config error.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::types::{deserialize_count_u32, deserialize_count_usize, deserialize_opt_count_u32};
use crate::core::{Error, Result};
use crate::streaming::lod::LodTable;
use crate::terrain::{Color, HeightCurve, NoiseParams, RegionBound, RegionTable, TerrainRegion};

/// Vertices per chunk side. 240 is divisible by every LOD increment 1..=12.
pub const MAP_CHUNK_SIZE: usize = 241;

/// Mesh displacement settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshSettings {
    /// Vertical scale applied after the height curve
    pub height_multiplier: f32,
    /// Remap applied to noise heights before scaling
    pub height_curve: HeightCurve,
}

impl Default for MeshSettings {
    fn default() -> Self {
        Self {
            height_multiplier: 10.0,
            height_curve: HeightCurve::linear(),
        }
    }
}

/// Chunk streaming settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingSettings {
    /// Chunk radius around the viewer. Derived from the LOD table when unset.
    #[serde(deserialize_with = "deserialize_opt_count_u32")]
    pub view_radius_chunks: Option<u32>,
    /// Viewer world positions are divided by this before use
    pub world_scale: f32,
    /// Generation worker count. Defaults to available hardware concurrency.
    pub worker_threads: Option<usize>,
    /// Failed requests per chunk/LOD before giving up
    #[serde(deserialize_with = "deserialize_count_u32")]
    pub max_retries: u32,
}

impl Default for StreamingSettings {
    fn default() -> Self {
        Self {
            view_radius_chunks: None,
            world_scale: 1.0,
            worker_threads: None,
            max_retries: 3,
        }
    }
}

/// Full terrain configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    /// Samples per chunk side
    #[serde(deserialize_with = "deserialize_count_usize")]
    pub chunk_size: usize,
    pub noise: NoiseParams,
    /// Subtract an edge falloff mask for island-shaped terrain
    pub use_falloff: bool,
    pub regions: RegionTable,
    pub mesh: MeshSettings,
    pub lods: LodTable,
    pub streaming: StreamingSettings,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            chunk_size: MAP_CHUNK_SIZE,
            noise: NoiseParams::default(),
            use_falloff: false,
            regions: default_regions(),
            mesh: MeshSettings::default(),
            lods: LodTable::default(),
            streaming: StreamingSettings::default(),
        }
    }
}

fn default_regions() -> RegionTable {
    let regions = vec![
        TerrainRegion::new("deep water", 0.0, Color::rgb(0.12, 0.25, 0.62)),
        TerrainRegion::new("shallow water", 0.3, Color::rgb(0.21, 0.39, 0.76)),
        TerrainRegion::new("sand", 0.4, Color::rgb(0.82, 0.82, 0.50)),
        TerrainRegion::new("grass", 0.45, Color::rgb(0.34, 0.60, 0.10)),
        TerrainRegion::new("forest", 0.55, Color::rgb(0.24, 0.42, 0.08)),
        TerrainRegion::new("rock", 0.7, Color::rgb(0.35, 0.27, 0.24)),
        TerrainRegion::new("high rock", 0.8, Color::rgb(0.29, 0.24, 0.23)),
        TerrainRegion::new("snow", 0.9, Color::WHITE),
    ];
    RegionTable::new(regions, RegionBound::Floor).unwrap_or_default()
}

impl TerrainConfig {
    /// Load a configuration from a JSON file and validate it
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config: TerrainConfig = serde_json::from_str(&text)?;
        log::info!("Loaded terrain config from {}", path.display());
        config.validated()
    }

    /// Write the configuration as pretty JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text)?;
        Ok(())
    }

    /// World-space size of one chunk
    pub fn chunk_world_size(&self) -> f32 {
        self.chunk_size.saturating_sub(1).max(1) as f32
    }

    /// Chunk radius scanned around the viewer
    pub fn view_radius_chunks(&self) -> i32 {
        match self.streaming.view_radius_chunks {
            Some(r) => i32::try_from(r).unwrap_or(i32::MAX),
            None => (self.lods.max_view_distance() / self.chunk_world_size()).round() as i32,
        }
    }

    /// Clamp range violations and reject structural ones
    pub fn validated(mut self) -> Result<Self> {
        if self.chunk_size < 1 {
            log::debug!("chunk_size {} clamped to 1", self.chunk_size);
            self.chunk_size = 1;
        }
        self.noise = self.noise.clamped();

        if !self.mesh.height_multiplier.is_finite() {
            self.mesh.height_multiplier = MeshSettings::default().height_multiplier;
        }
        if !(self.streaming.world_scale.is_finite() && self.streaming.world_scale > 0.0) {
            log::debug!("world_scale {} reset to 1", self.streaming.world_scale);
            self.streaming.world_scale = 1.0;
        }
        if self.streaming.worker_threads == Some(0) {
            self.streaming.worker_threads = Some(1);
        }

        self.regions.validate()?;
        self.lods.validate_for_chunk_size(self.chunk_size).map_err(|e| {
            Error::Config(format!("chunk_size {} incompatible with LOD table: {}", self.chunk_size, e))
        })?;

        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::streaming::lod::LodInfo;
    use std::io::Write;

    #[test]
    fn test_default_is_valid() {
        let config = TerrainConfig::default().validated().unwrap();
        assert_eq!(config.chunk_size, 241);
        assert_eq!(config.chunk_world_size(), 240.0);
        assert_eq!(config.view_radius_chunks(), 3); // round(600 / 240)
        assert!(!config.regions.is_empty());
    }

    #[test]
    fn test_range_violations_are_clamped() {
        let mut config = TerrainConfig::default();
        config.chunk_size = 0;
        config.noise.lacunarity = 0.2;
        config.noise.scale = -5.0;
        config.streaming.world_scale = 0.0;
        config.lods = LodTable::new(vec![LodInfo::new(0, 10.0)]).unwrap();

        let config = config.validated().unwrap();
        assert_eq!(config.chunk_size, 1);
        assert_eq!(config.noise.lacunarity, 1.0);
        assert!(config.noise.scale > 0.0);
        assert_eq!(config.streaming.world_scale, 1.0);
    }

    #[test]
    fn test_lod_divisibility_is_rejected() {
        let config = TerrainConfig {
            chunk_size: 100,
            ..Default::default()
        };
        assert!(matches!(config.validated(), Err(Error::Config(_))));
    }

    #[test]
    fn test_explicit_view_radius() {
        let mut config = TerrainConfig::default();
        config.streaming.view_radius_chunks = Some(5);
        assert_eq!(config.view_radius_chunks(), 5);

        config.streaming.view_radius_chunks = Some(u32::MAX);
        assert_eq!(config.view_radius_chunks(), i32::MAX);
    }

    #[test]
    fn test_load_clamps_negative_counts() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "chunk_size": -5,
                "noise": {{ "octaves": -2, "lacunarity": 0.1 }},
                "lods": [ {{ "lod": 0, "visible_distance_threshold": 50 }} ],
                "streaming": {{ "view_radius_chunks": -3, "max_retries": -1 }}
            }}"#
        )
        .unwrap();

        let config = TerrainConfig::load(file.path()).unwrap();
        assert_eq!(config.chunk_size, 1);
        assert_eq!(config.noise.octaves, 0);
        assert_eq!(config.noise.lacunarity, 1.0);
        assert_eq!(config.streaming.view_radius_chunks, Some(0));
        assert_eq!(config.streaming.max_retries, 0);
    }

    #[test]
    fn test_load_partial_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "noise": {{ "seed": 42, "octaves": 3, "normalize_mode": "global" }},
                "use_falloff": true,
                "lods": [
                    {{ "lod": 0, "visible_distance_threshold": 100 }},
                    {{ "lod": 2, "visible_distance_threshold": 300 }}
                ]
            }}"#
        )
        .unwrap();

        let config = TerrainConfig::load(file.path()).unwrap();
        assert_eq!(config.noise.seed, 42);
        assert_eq!(config.noise.octaves, 3);
        assert_eq!(config.noise.normalize_mode, crate::terrain::NormalizeMode::Global);
        assert_eq!(config.noise.persistence, 0.5);
        assert!(config.use_falloff);
        assert_eq!(config.lods.max_view_distance(), 300.0);
        assert_eq!(config.chunk_size, MAP_CHUNK_SIZE);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("terrain.json");

        let mut config = TerrainConfig::default();
        config.noise.seed = 7;
        config.mesh.height_multiplier = 32.0;
        config.save(&path).unwrap();

        let loaded = TerrainConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_missing_file() {
        let err = TerrainConfig::load("/nonexistent/terrain.json");
        assert!(matches!(err, Err(Error::Io(_))));
    }

    #[test]
    fn test_load_rejects_bad_lod_table() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "lods": [] }}"#).unwrap();
        assert!(matches!(TerrainConfig::load(file.path()), Err(Error::Json(_))));
    }
}
