//! Pure per-chunk computations shared by the async pipeline and previews

use crate::core::types::Vec2;
use crate::core::Result;
use crate::generation::config::TerrainConfig;
use crate::mesh::{MeshData, build_terrain_mesh};
use crate::terrain::{ColorMap, HeightField, NoiseParams, TextureBuffer, falloff, noise_field, region, texture};

/// Height field, its classified colors and their texture for one chunk
#[derive(Clone, Debug, PartialEq)]
pub struct MapData {
    pub height_map: HeightField,
    pub color_map: ColorMap,
    /// `color_map` rendered with the region table's unset color
    pub texture: TextureBuffer,
}

/// Stateless terrain generator. Cheap to share between threads.
pub struct MapGenerator {
    config: TerrainConfig,
    falloff_map: Option<HeightField>,
}

impl MapGenerator {
    /// Create a generator from an already validated configuration
    pub fn new(config: TerrainConfig) -> Self {
        let falloff_map = config
            .use_falloff
            .then(|| falloff::generate(config.chunk_size));
        Self { config, falloff_map }
    }

    pub fn config(&self) -> &TerrainConfig {
        &self.config
    }

    /// Noise parameters for a chunk centered at `center`
    pub fn noise_params_at(&self, center: Vec2) -> NoiseParams {
        NoiseParams {
            offset: self.config.noise.offset + center,
            ..self.config.noise.clone()
        }
    }

    /// Generate the height and color maps for the chunk centered at `center`
    pub fn generate_map_data(&self, center: Vec2) -> MapData {
        let size = self.config.chunk_size;
        let mut height_map = noise_field::generate(size, size, &self.noise_params_at(center));

        if let Some(mask) = &self.falloff_map {
            falloff::apply(&mut height_map, mask);
        }

        let color_map = region::classify(&height_map, &self.config.regions);
        let texture = texture::color_map_rgba(&color_map, self.config.regions.unset_color());
        MapData { height_map, color_map, texture }
    }

    /// Build the mesh for `height_map` at `lod`
    pub fn generate_mesh_data(&self, height_map: &HeightField, lod: u32) -> Result<MeshData> {
        build_terrain_mesh(
            height_map,
            &self.config.mesh.height_curve,
            self.config.mesh.height_multiplier,
            lod,
        )
    }

    /// Precomputed falloff mask, if falloff is enabled
    pub fn falloff_map(&self) -> Option<&HeightField> {
        self.falloff_map.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::NormalizeMode;

    fn small_config() -> TerrainConfig {
        let mut config = TerrainConfig {
            chunk_size: 25,
            ..Default::default()
        };
        config.noise.normalize_mode = NormalizeMode::Global;
        config.validated().unwrap()
    }

    #[test]
    fn test_map_data_dimensions() {
        let generator = MapGenerator::new(small_config());
        let data = generator.generate_map_data(Vec2::ZERO);
        assert_eq!(data.height_map.width(), 25);
        assert_eq!(data.color_map.width(), 25);
        assert_eq!(data.color_map.height(), 25);
        assert_eq!((data.texture.width, data.texture.height), (25, 25));
        assert_eq!(data.texture.rgba.len(), 25 * 25 * 4);
    }

    #[test]
    fn test_map_data_deterministic() {
        let generator = MapGenerator::new(small_config());
        let a = generator.generate_map_data(Vec2::new(24.0, -48.0));
        let b = generator.generate_map_data(Vec2::new(24.0, -48.0));
        assert_eq!(a, b);
    }

    #[test]
    fn test_neighbouring_chunks_share_border() {
        let generator = MapGenerator::new(small_config());
        let a = generator.generate_map_data(Vec2::ZERO);
        let b = generator.generate_map_data(Vec2::new(24.0, 0.0));
        for y in 0..25 {
            assert!((a.height_map[(24, y)] - b.height_map[(0, y)]).abs() < 1e-6);
        }
    }

    #[test]
    fn test_falloff_lowers_edges() {
        let mut config = small_config();
        config.use_falloff = true;
        let generator = MapGenerator::new(config);
        assert!(generator.falloff_map().is_some());

        let data = generator.generate_map_data(Vec2::ZERO);
        assert_eq!(data.height_map[(0, 0)], 0.0);
        assert_eq!(data.height_map[(24, 12)], 0.0);
    }

    #[test]
    fn test_mesh_data() {
        let generator = MapGenerator::new(small_config());
        let data = generator.generate_map_data(Vec2::ZERO);
        let mesh = generator.generate_mesh_data(&data.height_map, 1).unwrap();
        assert_eq!(mesh.width, 13);
    }
}
