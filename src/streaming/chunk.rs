//! Terrain chunks and their per-LOD mesh slots

use std::sync::Arc;

use crate::core::types::Vec2;
use crate::math::Rect;
use crate::mesh::MeshData;
use crate::streaming::lod::LodTable;
use crate::terrain::{ColorMap, HeightField, TextureBuffer};

/// Integer chunk address on the horizontal grid
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkCoord {
    pub x: i32,
    pub y: i32,
}

impl ChunkCoord {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Chunk containing `position`, for chunks `chunk_world_size` wide
    /// centered on multiples of that size. Positions beyond the `i32` range
    /// saturate to the outermost chunk.
    pub fn from_position(position: Vec2, chunk_world_size: f32) -> Self {
        Self {
            x: (position.x / chunk_world_size).round() as i32,
            y: (position.y / chunk_world_size).round() as i32,
        }
    }

    /// Neighbor at `(dx, dy)`, or `None` past the edge of the coordinate space
    pub fn checked_offset(self, dx: i32, dy: i32) -> Option<Self> {
        Some(Self::new(self.x.checked_add(dx)?, self.y.checked_add(dy)?))
    }

    /// Chebyshev distance in chunks
    pub fn chebyshev_distance(self, other: ChunkCoord) -> u64 {
        let dx = (self.x as i64 - other.x as i64).unsigned_abs();
        let dy = (self.y as i64 - other.y as i64).unsigned_abs();
        dx.max(dy)
    }

    /// World position of the chunk center
    pub fn world_center(self, chunk_world_size: f32) -> Vec2 {
        Vec2::new(self.x as f32, self.y as f32) * chunk_world_size
    }
}

/// Height data lifecycle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChunkState {
    Uninitialized,
    AwaitingHeightData,
    Ready,
    /// Height generation failed `attempts` times
    Failed { attempts: u32 },
}

/// Mesh lifecycle for one LOD
#[derive(Clone, Debug, PartialEq)]
pub enum LodMeshState {
    NotRequested,
    Requested,
    Cached(Arc<MeshData>),
    /// Gave up after repeated failures
    Failed,
}

/// Mesh slot for one entry of the LOD table
#[derive(Clone, Debug)]
pub struct LodMesh {
    pub lod: u32,
    pub state: LodMeshState,
    pub(crate) failures: u32,
}

impl LodMesh {
    fn new(lod: u32) -> Self {
        Self {
            lod,
            state: LodMeshState::NotRequested,
            failures: 0,
        }
    }

    pub fn mesh(&self) -> Option<&Arc<MeshData>> {
        match &self.state {
            LodMeshState::Cached(mesh) => Some(mesh),
            _ => None,
        }
    }
}

/// One streamed terrain tile
#[derive(Clone, Debug)]
pub struct TerrainChunk {
    coord: ChunkCoord,
    position: Vec2,
    bounds: Rect,
    /// Distinguishes this chunk from an evicted one at the same coord
    pub(crate) epoch: u64,
    pub(crate) state: ChunkState,
    pub(crate) height_map: Option<Arc<HeightField>>,
    pub(crate) color_map: Option<ColorMap>,
    pub(crate) texture: Option<TextureBuffer>,
    pub(crate) lod_meshes: Vec<LodMesh>,
    pub(crate) displayed_lod: Option<usize>,
    pub(crate) visible: bool,
    pub(crate) height_failures: u32,
}

impl TerrainChunk {
    pub fn new(coord: ChunkCoord, chunk_world_size: f32, lods: &LodTable, epoch: u64) -> Self {
        let position = coord.world_center(chunk_world_size);
        Self {
            coord,
            position,
            bounds: Rect::from_center_size(position, Vec2::splat(chunk_world_size)),
            epoch,
            state: ChunkState::Uninitialized,
            height_map: None,
            color_map: None,
            texture: None,
            lod_meshes: lods.levels().iter().map(|l| LodMesh::new(l.lod)).collect(),
            displayed_lod: None,
            visible: false,
            height_failures: 0,
        }
    }

    pub fn coord(&self) -> ChunkCoord {
        self.coord
    }

    /// World position of the chunk center
    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    pub fn state(&self) -> ChunkState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == ChunkState::Ready
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn height_map(&self) -> Option<&HeightField> {
        self.height_map.as_deref()
    }

    pub fn color_map(&self) -> Option<&ColorMap> {
        self.color_map.as_ref()
    }

    /// Region color texture, available once height data has arrived
    pub fn texture(&self) -> Option<&TextureBuffer> {
        self.texture.as_ref()
    }

    pub fn lod_meshes(&self) -> &[LodMesh] {
        &self.lod_meshes
    }

    /// Index into the LOD table of the mesh being shown
    pub fn displayed_lod(&self) -> Option<usize> {
        self.displayed_lod
    }

    /// Mesh being shown, if any
    pub fn displayed_mesh(&self) -> Option<&Arc<MeshData>> {
        self.displayed_lod.and_then(|i| self.lod_meshes[i].mesh())
    }

    /// Squared distance from `viewer` to the chunk bounds
    pub fn sqr_distance(&self, viewer: Vec2) -> f32 {
        self.bounds.sqr_distance(viewer)
    }
}
