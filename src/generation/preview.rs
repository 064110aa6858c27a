//! Synchronous preview generation for tooling.
//!
//! Runs the same computations as the async pipeline, inline, for a single
//! chunk at the origin. Each [`DrawMode`] has its own handler.

use serde::{Deserialize, Serialize};

use crate::core::types::Vec2;
use crate::core::Result;
use crate::generation::map::MapGenerator;
use crate::mesh::MeshData;
use crate::render::TerrainDisplay;
use crate::terrain::{TextureBuffer, falloff, texture};

/// What a preview should show
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrawMode {
    /// Grayscale height field
    #[default]
    NoiseMap,
    /// Region-classified colors
    ColorMap,
    /// Mesh at the given LOD, textured with region colors
    Mesh { lod: u32 },
    /// The falloff mask alone
    FalloffMap,
}

/// Result of a preview
#[derive(Clone, Debug, PartialEq)]
pub enum Preview {
    Texture(TextureBuffer),
    Mesh { mesh: MeshData, texture: TextureBuffer },
}

impl Preview {
    /// Forward the preview to a display adapter
    pub fn show(&self, display: &mut dyn TerrainDisplay) {
        match self {
            Preview::Texture(texture) => display.display_texture(texture),
            Preview::Mesh { mesh, texture } => display.display_mesh(mesh, texture),
        }
    }

    /// The texture part of the preview
    pub fn texture(&self) -> &TextureBuffer {
        match self {
            Preview::Texture(texture) => texture,
            Preview::Mesh { texture, .. } => texture,
        }
    }
}

impl MapGenerator {
    /// Generate a preview of the chunk at the origin
    pub fn generate_preview(&self, mode: DrawMode) -> Result<Preview> {
        log::debug!("Generating {:?} preview", mode);
        match mode {
            DrawMode::NoiseMap => Ok(self.preview_noise_map()),
            DrawMode::ColorMap => Ok(self.preview_color_map()),
            DrawMode::Mesh { lod } => self.preview_mesh(lod),
            DrawMode::FalloffMap => Ok(self.preview_falloff_map()),
        }
    }

    fn preview_noise_map(&self) -> Preview {
        let data = self.generate_map_data(Vec2::ZERO);
        Preview::Texture(texture::height_map_rgba(&data.height_map))
    }

    fn preview_color_map(&self) -> Preview {
        Preview::Texture(self.generate_map_data(Vec2::ZERO).texture)
    }

    fn preview_mesh(&self, lod: u32) -> Result<Preview> {
        let data = self.generate_map_data(Vec2::ZERO);
        let mesh = self.generate_mesh_data(&data.height_map, lod)?;
        Ok(Preview::Mesh { mesh, texture: data.texture })
    }

    fn preview_falloff_map(&self) -> Preview {
        let mask = match self.falloff_map() {
            Some(mask) => texture::height_map_rgba(mask),
            None => texture::height_map_rgba(&falloff::generate(self.config().chunk_size)),
        };
        Preview::Texture(mask)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::config::TerrainConfig;
    use crate::render::RecordingDisplay;

    fn generator() -> MapGenerator {
        let config = TerrainConfig {
            chunk_size: 49,
            ..Default::default()
        };
        MapGenerator::new(config.validated().unwrap())
    }

    #[test]
    fn test_texture_modes() {
        let generator = generator();
        for mode in [DrawMode::NoiseMap, DrawMode::ColorMap, DrawMode::FalloffMap] {
            let preview = generator.generate_preview(mode).unwrap();
            let texture = preview.texture();
            assert_eq!((texture.width, texture.height), (49, 49));
            assert_eq!(texture.rgba.len(), 49 * 49 * 4);
            assert!(matches!(preview, Preview::Texture(_)));
        }
    }

    #[test]
    fn test_mesh_mode() {
        let preview = generator().generate_preview(DrawMode::Mesh { lod: 2 }).unwrap();
        match &preview {
            Preview::Mesh { mesh, texture } => {
                assert_eq!(mesh.width, 13);
                assert_eq!(texture.width, 49);
            }
            other => panic!("expected mesh preview, got {:?}", other),
        }
    }

    #[test]
    fn test_mesh_mode_bad_lod() {
        // 48 is not divisible by 10
        assert!(generator().generate_preview(DrawMode::Mesh { lod: 5 }).is_err());
    }

    #[test]
    fn test_noise_preview_matches_async_computation() {
        let generator = generator();
        let data = generator.generate_map_data(Vec2::ZERO);
        let preview = generator.generate_preview(DrawMode::NoiseMap).unwrap();
        assert_eq!(preview.texture(), &texture::height_map_rgba(&data.height_map));
    }

    #[test]
    fn test_show_forwards_to_display() {
        let generator = generator();
        let mut display = RecordingDisplay::default();

        generator.generate_preview(DrawMode::ColorMap).unwrap().show(&mut display);
        assert!(display.last_texture.is_some());
        assert!(display.last_mesh.is_none());

        generator.generate_preview(DrawMode::Mesh { lod: 0 }).unwrap().show(&mut display);
        assert_eq!(display.last_mesh.as_ref().map(|m| m.width), Some(49));
        assert_eq!(display.frames, 2);
    }
}
