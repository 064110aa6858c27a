//! Chunk streaming and LOD management

pub mod lod;
pub mod chunk;
pub mod eviction;
pub mod manager;

pub use lod::{LodInfo, LodTable};
pub use chunk::{ChunkCoord, ChunkState, LodMesh, LodMeshState, TerrainChunk};
pub use eviction::{EvictBeyond, EvictionPolicy, RetainAll};
pub use manager::{ChunkManager, StreamingState};
