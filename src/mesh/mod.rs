//! Triangulated terrain meshes at discrete levels of detail

pub mod builder;

pub use builder::{MeshData, build_terrain_mesh, lod_increment, validate_lod, vertices_per_line};
