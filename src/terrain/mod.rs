//! Procedural height fields and their classification

pub mod noise_field;
pub mod falloff;
pub mod region;
pub mod curve;
pub mod texture;

pub use noise_field::{HeightField, NoiseParams, NormalizeMode};
pub use region::{Color, ColorMap, RegionBound, RegionTable, TerrainRegion};
pub use curve::HeightCurve;
pub use texture::TextureBuffer;
