//! Terrastream - procedural height-field terrain with LOD meshing and chunk streaming

pub mod core;
pub mod math;
pub mod terrain;
pub mod mesh;
pub mod generation;
pub mod streaming;
pub mod render;
