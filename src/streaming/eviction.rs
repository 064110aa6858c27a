//! Chunk eviction policies
//!
//! Chunks are kept for the whole session unless a policy says otherwise.
//! Only chunks that are currently hidden are ever offered for eviction.

use crate::streaming::chunk::{ChunkCoord, TerrainChunk};

/// Decides whether a hidden chunk should be dropped
pub trait EvictionPolicy: Send {
    fn should_evict(&self, chunk: &TerrainChunk, viewer_chunk: ChunkCoord) -> bool;
}

/// Never evict
#[derive(Clone, Copy, Debug, Default)]
pub struct RetainAll;

impl EvictionPolicy for RetainAll {
    fn should_evict(&self, _chunk: &TerrainChunk, _viewer_chunk: ChunkCoord) -> bool {
        false
    }
}

/// Evict chunks more than `radius` chunks (Chebyshev) from the viewer
#[derive(Clone, Copy, Debug)]
pub struct EvictBeyond {
    pub radius: u32,
}

impl EvictionPolicy for EvictBeyond {
    fn should_evict(&self, chunk: &TerrainChunk, viewer_chunk: ChunkCoord) -> bool {
        chunk.coord().chebyshev_distance(viewer_chunk) > u64::from(self.radius)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::streaming::lod::LodTable;

    #[test]
    fn test_retain_all() {
        let chunk = TerrainChunk::new(ChunkCoord::new(100, 100), 240.0, &LodTable::default(), 0);
        assert!(!RetainAll.should_evict(&chunk, ChunkCoord::new(0, 0)));
    }

    #[test]
    fn test_evict_beyond() {
        let policy = EvictBeyond { radius: 2 };
        let near = TerrainChunk::new(ChunkCoord::new(2, -2), 240.0, &LodTable::default(), 0);
        let far = TerrainChunk::new(ChunkCoord::new(3, 0), 240.0, &LodTable::default(), 0);
        assert!(!policy.should_evict(&near, ChunkCoord::new(0, 0)));
        assert!(policy.should_evict(&far, ChunkCoord::new(0, 0)));
    }
}
