//! Adapter between generated terrain and whatever draws it

use crate::mesh::MeshData;
use crate::streaming::ChunkCoord;
use crate::terrain::TextureBuffer;

/// Sink for generated textures and meshes.
///
/// Implemented by the host engine; the crate itself never touches a GPU.
pub trait TerrainDisplay {
    /// Show a flat texture (height, color or falloff map)
    fn display_texture(&mut self, texture: &TextureBuffer);

    /// Show a mesh with its texture
    fn display_mesh(&mut self, mesh: &MeshData, texture: &TextureBuffer);

    /// Replace the mesh shown for a streamed chunk
    fn display_chunk(&mut self, coord: ChunkCoord, mesh: &MeshData, texture: &TextureBuffer) {
        let _ = coord;
        self.display_mesh(mesh, texture);
    }
}

/// Display that only records what it was last given
#[derive(Debug, Default)]
pub struct RecordingDisplay {
    pub last_texture: Option<TextureBuffer>,
    pub last_mesh: Option<MeshData>,
    /// Streamed chunk updates in arrival order, with the mesh width shown
    pub chunk_updates: Vec<(ChunkCoord, usize)>,
    pub frames: usize,
}

impl TerrainDisplay for RecordingDisplay {
    fn display_texture(&mut self, texture: &TextureBuffer) {
        self.last_texture = Some(texture.clone());
        self.last_mesh = None;
        self.frames += 1;
    }

    fn display_mesh(&mut self, mesh: &MeshData, texture: &TextureBuffer) {
        self.last_texture = Some(texture.clone());
        self.last_mesh = Some(mesh.clone());
        self.frames += 1;
    }

    fn display_chunk(&mut self, coord: ChunkCoord, mesh: &MeshData, texture: &TextureBuffer) {
        self.chunk_updates.push((coord, mesh.width));
        self.display_mesh(mesh, texture);
    }
}
