//! Height-threshold region classification

use serde::{Deserialize, Serialize};

use super::noise_field::HeightField;
use crate::core::{Error, Result};
use crate::math::Grid;

/// Linear RGBA color, components in `[0, 1]`
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    #[serde(default = "opaque")]
    pub a: f32,
}

fn opaque() -> f32 {
    1.0
}

impl Color {
    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);
    pub const MAGENTA: Color = Color::rgb(1.0, 0.0, 1.0);

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Linear interpolation between two colors
    pub fn lerp(self, other: Color, t: f32) -> Color {
        Color {
            r: self.r + (other.r - self.r) * t,
            g: self.g + (other.g - self.g) * t,
            b: self.b + (other.b - self.b) * t,
            a: self.a + (other.a - self.a) * t,
        }
    }

    /// Quantize to 8-bit RGBA
    pub fn to_rgba8(self) -> [u8; 4] {
        let q = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        [q(self.r), q(self.g), q(self.b), q(self.a)]
    }
}

/// A named band of terrain heights
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TerrainRegion {
    pub name: String,
    pub height_threshold: f32,
    pub color: Color,
}

impl TerrainRegion {
    pub fn new(name: impl Into<String>, height_threshold: f32, color: Color) -> Self {
        Self {
            name: name.into(),
            height_threshold,
            color,
        }
    }
}

/// How a region's threshold bounds its band.
///
/// Tables written for first-match lookups, where each threshold is the top
/// of its band (water up to 0.3, land up to 0.6), need [`RegionBound::Ceiling`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionBound {
    /// Threshold is the band's lower bound: the last region with
    /// `height >= threshold` wins. Heights below the first threshold are unset.
    #[default]
    Floor,
    /// Threshold is the band's upper bound: the first region with
    /// `height <= threshold` wins. Heights above the last threshold are unset.
    Ceiling,
}

/// Per-cell classification result. `None` means no region matched.
pub type ColorMap = Grid<Option<Color>>;

/// Ordered region table, ascending by threshold
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegionTable {
    regions: Vec<TerrainRegion>,
    #[serde(default)]
    bound: RegionBound,
    /// Color used for unset cells when rendering
    #[serde(default = "default_unset_color")]
    unset_color: Color,
}

fn default_unset_color() -> Color {
    Color::MAGENTA
}

impl Default for RegionTable {
    fn default() -> Self {
        Self {
            regions: Vec::new(),
            bound: RegionBound::default(),
            unset_color: default_unset_color(),
        }
    }
}

impl RegionTable {
    /// Create a table, rejecting thresholds that are not ascending
    pub fn new(regions: Vec<TerrainRegion>, bound: RegionBound) -> Result<Self> {
        let table = Self {
            regions,
            bound,
            unset_color: default_unset_color(),
        };
        table.validate()?;
        Ok(table)
    }

    pub fn with_unset_color(mut self, color: Color) -> Self {
        self.unset_color = color;
        self
    }

    /// Check that thresholds are finite and ascending
    pub fn validate(&self) -> Result<()> {
        for (i, region) in self.regions.iter().enumerate() {
            if !region.height_threshold.is_finite() {
                return Err(Error::Config(format!(
                    "region '{}' has a non-finite height threshold",
                    region.name
                )));
            }
            if i > 0 && region.height_threshold < self.regions[i - 1].height_threshold {
                return Err(Error::Config(format!(
                    "region '{}' threshold {} is below the previous region's {}",
                    region.name,
                    region.height_threshold,
                    self.regions[i - 1].height_threshold
                )));
            }
        }
        Ok(())
    }

    pub fn regions(&self) -> &[TerrainRegion] {
        &self.regions
    }

    pub fn bound(&self) -> RegionBound {
        self.bound
    }

    pub fn unset_color(&self) -> Color {
        self.unset_color
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Index of the region a height falls into
    pub fn classify_height(&self, height: f32) -> Option<usize> {
        match self.bound {
            RegionBound::Floor => {
                let mut selected = None;
                for (i, region) in self.regions.iter().enumerate() {
                    if height >= region.height_threshold {
                        selected = Some(i);
                    } else {
                        break;
                    }
                }
                selected
            }
            RegionBound::Ceiling => self
                .regions
                .iter()
                .position(|region| height <= region.height_threshold),
        }
    }

    /// Region a height falls into
    pub fn region_for(&self, height: f32) -> Option<&TerrainRegion> {
        self.classify_height(height).map(|i| &self.regions[i])
    }
}

/// Classify every cell of `heights` against `table`
pub fn classify(heights: &HeightField, table: &RegionTable) -> ColorMap {
    heights.map(|&h| table.region_for(h).map(|region| region.color))
}
