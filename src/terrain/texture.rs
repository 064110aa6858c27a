//! RGBA8 texture buffers for height and color maps

use std::path::Path;

use crate::core::{Error, Result};

use super::noise_field::HeightField;
use super::region::{Color, ColorMap};

/// Raw texture ready for upload: tightly packed RGBA8 rows
#[derive(Clone, Debug, PartialEq)]
pub struct TextureBuffer {
    pub width: usize,
    pub height: usize,
    pub rgba: Vec<u8>,
}

impl TextureBuffer {
    /// Pixel at `(x, y)`
    pub fn pixel(&self, x: usize, y: usize) -> [u8; 4] {
        let i = (y * self.width + x) * 4;
        [self.rgba[i], self.rgba[i + 1], self.rgba[i + 2], self.rgba[i + 3]]
    }

    /// Encode as PNG at `path`
    pub fn save_png(&self, path: impl AsRef<Path>) -> Result<()> {
        let image = image::RgbaImage::from_raw(self.width as u32, self.height as u32, self.rgba.clone())
            .ok_or_else(|| {
                Error::Generation(format!(
                    "texture buffer of {} bytes does not match {}x{}",
                    self.rgba.len(),
                    self.width,
                    self.height
                ))
            })?;
        image.save(path.as_ref())?;
        log::info!("Wrote {}x{} texture to {}", self.width, self.height, path.as_ref().display());
        Ok(())
    }
}

/// Grayscale texture: 0 maps to black, 1 to white
pub fn height_map_rgba(heights: &HeightField) -> TextureBuffer {
    let rgba = heights
        .iter()
        .flat_map(|&h| Color::BLACK.lerp(Color::WHITE, h.clamp(0.0, 1.0)).to_rgba8())
        .collect();
    TextureBuffer {
        width: heights.width(),
        height: heights.height(),
        rgba,
    }
}

/// Region color texture. Unset cells are painted with `unset`.
pub fn color_map_rgba(colors: &ColorMap, unset: Color) -> TextureBuffer {
    let rgba = colors
        .iter()
        .flat_map(|c| c.unwrap_or(unset).to_rgba8())
        .collect();
    TextureBuffer {
        width: colors.width(),
        height: colors.height(),
        rgba,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_height_map_grayscale() {
        let heights = HeightField::from_vec(3, 1, vec![0.0, 0.5, 1.0]).unwrap();
        let texture = height_map_rgba(&heights);
        assert_eq!(texture.rgba.len(), 12);
        assert_eq!(texture.pixel(0, 0), [0, 0, 0, 255]);
        assert_eq!(texture.pixel(1, 0), [128, 128, 128, 255]);
        assert_eq!(texture.pixel(2, 0), [255, 255, 255, 255]);
    }

    #[test]
    fn test_color_map_unset() {
        let colors = ColorMap::from_vec(2, 1, vec![Some(Color::WHITE), None]).unwrap();
        let texture = color_map_rgba(&colors, Color::BLACK);
        assert_eq!(texture.pixel(0, 0), [255, 255, 255, 255]);
        assert_eq!(texture.pixel(1, 0), [0, 0, 0, 255]);
    }

    #[test]
    fn test_save_png() {
        let heights = HeightField::from_fn(4, 3, |x, y| (x + y) as f32 / 5.0);
        let texture = height_map_rgba(&heights);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("height.png");
        texture.save_png(&path).unwrap();

        let decoded = image::open(&path).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (4, 3));
        assert_eq!(decoded.into_raw(), texture.rgba);
    }

    #[test]
    fn test_save_png_size_mismatch() {
        let texture = TextureBuffer { width: 2, height: 2, rgba: vec![0; 4] };
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(texture.save_png(dir.path().join("bad.png")), Err(Error::Generation(_))));
    }
}
