//! Viewer-relative chunk streaming and LOD selection.
//!
//! Every tick, [`ChunkManager::advance`] hides last tick's visible chunks,
//! walks the square window of chunk coordinates around the viewer, creates
//! missing chunks and re-evaluates each ready chunk's LOD, then drains the
//! generation pipeline. All chunk mutation happens on the thread calling
//! `advance`; workers only ever compute. Chunks whose displayed mesh changed
//! are handed to a [`TerrainDisplay`] by [`ChunkManager::present`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::core::types::Vec2;
use crate::core::Result;
use crate::generation::config::TerrainConfig;
use crate::generation::map::MapData;
use crate::generation::pipeline::{GenerationPipeline, PipelineStats};
use crate::mesh::MeshData;
use crate::render::TerrainDisplay;
use crate::streaming::chunk::{ChunkCoord, ChunkState, LodMeshState, TerrainChunk};
use crate::streaming::eviction::{EvictionPolicy, RetainAll};
use crate::streaming::lod::LodTable;

/// Chunk state mutated by pipeline callbacks.
///
/// Owned by [`ChunkManager`] and only touched from its thread.
pub struct StreamingState {
    chunks: HashMap<ChunkCoord, TerrainChunk>,
    visible: Vec<ChunkCoord>,
    /// Viewer position in terrain units
    viewer: Vec2,
    lods: LodTable,
    chunk_world_size: f32,
    max_retries: u32,
    next_epoch: u64,
    /// Chunks whose displayed mesh changed since the last present
    swapped: Vec<ChunkCoord>,
    pipeline: GenerationPipeline<StreamingState>,
}

impl StreamingState {
    pub fn viewer(&self) -> Vec2 {
        self.viewer
    }

    pub fn chunk(&self, coord: ChunkCoord) -> Option<&TerrainChunk> {
        self.chunks.get(&coord)
    }

    fn create_chunk(&mut self, coord: ChunkCoord) {
        let chunk = TerrainChunk::new(coord, self.chunk_world_size, &self.lods, self.next_epoch);
        self.next_epoch += 1;
        log::debug!("Created chunk ({}, {})", coord.x, coord.y);
        self.chunks.insert(coord, chunk);
        self.request_height_data(coord);
    }

    fn request_height_data(&mut self, coord: ChunkCoord) {
        let Some(chunk) = self.chunks.get_mut(&coord) else {
            return;
        };
        if let ChunkState::Failed { attempts } = chunk.state {
            log::debug!("Retrying height data for ({}, {}) after {} failures", coord.x, coord.y, attempts);
        }
        chunk.state = ChunkState::AwaitingHeightData;

        let epoch = chunk.epoch;
        self.pipeline.request_height_data(chunk.position(), move |state: &mut StreamingState, result| {
            state.on_height_data(coord, epoch, result);
        });
    }

    /// Look up a chunk only if it is still the one that made the request
    fn live_chunk(&mut self, coord: ChunkCoord, epoch: u64) -> Option<&mut TerrainChunk> {
        match self.chunks.get_mut(&coord) {
            Some(chunk) if chunk.epoch == epoch => Some(chunk),
            _ => {
                log::debug!("Dropping result for evicted chunk ({}, {})", coord.x, coord.y);
                None
            }
        }
    }

    fn on_height_data(&mut self, coord: ChunkCoord, epoch: u64, result: Result<MapData>) {
        let max_retries = self.max_retries;
        let Some(chunk) = self.live_chunk(coord, epoch) else {
            return;
        };

        match result {
            Ok(data) => {
                chunk.height_map = Some(Arc::new(data.height_map));
                chunk.color_map = Some(data.color_map);
                chunk.texture = Some(data.texture);
                chunk.state = ChunkState::Ready;
                self.update_chunk(coord);
            }
            Err(e) => {
                chunk.height_failures += 1;
                let attempts = chunk.height_failures;
                chunk.state = ChunkState::Failed { attempts };
                if attempts >= max_retries {
                    log::error!(
                        "Chunk ({}, {}) height data failed {} times, giving up: {}",
                        coord.x, coord.y, attempts, e
                    );
                } else {
                    log::warn!("Chunk ({}, {}) height data failed, will retry: {}", coord.x, coord.y, e);
                }
            }
        }
    }

    fn on_mesh_data(&mut self, coord: ChunkCoord, epoch: u64, lod_index: usize, result: Result<MeshData>) {
        let max_retries = self.max_retries;
        let Some(chunk) = self.live_chunk(coord, epoch) else {
            return;
        };
        let slot = &mut chunk.lod_meshes[lod_index];

        match result {
            Ok(mesh) => {
                slot.state = LodMeshState::Cached(Arc::new(mesh));
                self.update_chunk(coord);
            }
            Err(e) => {
                slot.failures += 1;
                if slot.failures >= max_retries {
                    log::error!(
                        "Chunk ({}, {}) LOD {} mesh failed {} times, giving up: {}",
                        coord.x, coord.y, slot.lod, slot.failures, e
                    );
                    slot.state = LodMeshState::Failed;
                } else {
                    slot.state = LodMeshState::NotRequested;
                }
            }
        }
    }

    /// Re-evaluate visibility and LOD of one chunk against the viewer
    fn update_chunk(&mut self, coord: ChunkCoord) {
        let Some(chunk) = self.chunks.get_mut(&coord) else {
            return;
        };
        if chunk.state != ChunkState::Ready {
            return;
        }

        let sqr_distance = chunk.sqr_distance(self.viewer);
        let Some(lod_index) = self.lods.select(sqr_distance) else {
            if chunk.visible {
                chunk.visible = false;
                self.visible.retain(|c| *c != coord);
            }
            return;
        };

        if chunk.displayed_lod != Some(lod_index) {
            let slot = &mut chunk.lod_meshes[lod_index];
            match slot.state {
                LodMeshState::Cached(_) => {
                    log::trace!("Chunk ({}, {}) now showing LOD index {}", coord.x, coord.y, lod_index);
                    chunk.displayed_lod = Some(lod_index);
                    if !self.swapped.contains(&coord) {
                        self.swapped.push(coord);
                    }
                }
                LodMeshState::NotRequested => {
                    slot.state = LodMeshState::Requested;
                    let (lod, epoch) = (slot.lod, chunk.epoch);
                    if let Some(height_map) = &chunk.height_map {
                        self.pipeline.request_mesh_data(
                            Arc::clone(height_map),
                            lod,
                            move |state: &mut StreamingState, result| {
                                state.on_mesh_data(coord, epoch, lod_index, result);
                            },
                        );
                    }
                }
                LodMeshState::Requested | LodMeshState::Failed => {}
            }
        }

        if !chunk.visible {
            chunk.visible = true;
            self.visible.push(coord);
        }
    }

    fn update_visible_chunks(&mut self, view_radius: i32) {
        for coord in std::mem::take(&mut self.visible) {
            if let Some(chunk) = self.chunks.get_mut(&coord) {
                chunk.visible = false;
            }
        }

        let current = ChunkCoord::from_position(self.viewer, self.chunk_world_size);
        for dy in -view_radius..=view_radius {
            for dx in -view_radius..=view_radius {
                let Some(coord) = current.checked_offset(dx, dy) else {
                    continue;
                };
                match self.chunks.get(&coord).map(|c| c.state) {
                    None => self.create_chunk(coord),
                    Some(ChunkState::Uninitialized) => self.request_height_data(coord),
                    Some(ChunkState::Failed { attempts }) if attempts < self.max_retries => {
                        self.request_height_data(coord)
                    }
                    Some(_) => self.update_chunk(coord),
                }
            }
        }
    }
}

/// Owns the live chunk set and drives it from the viewer position
pub struct ChunkManager {
    state: StreamingState,
    pipeline: GenerationPipeline<StreamingState>,
    eviction: Box<dyn EvictionPolicy>,
    view_radius: i32,
    world_scale: f32,
}

impl ChunkManager {
    /// Create a manager that never evicts chunks
    pub fn new(config: TerrainConfig) -> Result<Self> {
        Self::with_eviction_policy(config, Box::new(RetainAll))
    }

    /// Create a manager with an explicit eviction policy
    pub fn with_eviction_policy(config: TerrainConfig, eviction: Box<dyn EvictionPolicy>) -> Result<Self> {
        let config = config.validated()?;
        let view_radius = config.view_radius_chunks();
        let world_scale = config.streaming.world_scale;
        let lods = config.lods.clone();
        let chunk_world_size = config.chunk_world_size();
        let max_retries = config.streaming.max_retries;

        let pipeline = GenerationPipeline::from_config(config)?;
        log::info!(
            "Chunk manager ready: chunk size {}, view radius {} chunks, max view distance {}",
            chunk_world_size,
            view_radius,
            lods.max_view_distance()
        );

        Ok(Self {
            state: StreamingState {
                chunks: HashMap::new(),
                visible: Vec::new(),
                viewer: Vec2::ZERO,
                lods,
                chunk_world_size,
                max_retries,
                next_epoch: 0,
                swapped: Vec::new(),
                pipeline: pipeline.clone(),
            },
            pipeline,
            eviction,
            view_radius,
            world_scale,
        })
    }

    /// Run one tick for a viewer at `viewer_position` (world units).
    ///
    /// Returns the chunks visible after this tick.
    pub fn advance(&mut self, viewer_position: Vec2) -> &[ChunkCoord] {
        self.state.viewer = viewer_position / self.world_scale;
        let created_before = self.state.chunks.len();

        self.state.update_visible_chunks(self.view_radius);
        let delivered = self.pipeline.drain(&mut self.state);
        self.evict();

        let created = self.state.chunks.len().saturating_sub(created_before);
        if created > 0 || delivered > 0 {
            log::debug!(
                "Tick: {} chunks created, {} completions, {} visible",
                created,
                delivered,
                self.state.visible.len()
            );
        }
        &self.state.visible
    }

    fn evict(&mut self) {
        let viewer_chunk = self.viewer_chunk();
        let eviction = &self.eviction;
        let before = self.state.chunks.len();
        self.state
            .chunks
            .retain(|_, chunk| chunk.visible || !eviction.should_evict(chunk, viewer_chunk));
        let evicted = before - self.state.chunks.len();
        if evicted > 0 {
            log::debug!("Evicted {} chunks", evicted);
        }
    }

    /// Hand every chunk whose displayed mesh changed since the last call to
    /// `display`. Returns how many chunks were updated.
    pub fn present(&mut self, display: &mut dyn TerrainDisplay) -> usize {
        let mut presented = 0;
        for coord in std::mem::take(&mut self.state.swapped) {
            let Some(chunk) = self.state.chunks.get(&coord) else {
                continue;
            };
            if let (Some(mesh), Some(texture)) = (chunk.displayed_mesh(), chunk.texture()) {
                display.display_chunk(coord, mesh, texture);
                presented += 1;
            }
        }
        presented
    }

    /// Chunk the viewer currently stands in
    pub fn viewer_chunk(&self) -> ChunkCoord {
        ChunkCoord::from_position(self.state.viewer, self.state.chunk_world_size)
    }

    pub fn chunk(&self, coord: ChunkCoord) -> Option<&TerrainChunk> {
        self.state.chunk(coord)
    }

    pub fn chunks(&self) -> impl Iterator<Item = &TerrainChunk> {
        self.state.chunks.values()
    }

    pub fn chunk_count(&self) -> usize {
        self.state.chunks.len()
    }

    pub fn visible_chunks(&self) -> &[ChunkCoord] {
        &self.state.visible
    }

    pub fn view_radius(&self) -> i32 {
        self.view_radius
    }

    pub fn lods(&self) -> &LodTable {
        &self.state.lods
    }

    pub fn pipeline(&self) -> &GenerationPipeline<StreamingState> {
        &self.pipeline
    }

    pub fn stats(&self) -> PipelineStats {
        self.pipeline.stats()
    }

    /// Block until all dispatched generation work has been queued
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        self.pipeline.wait_idle(timeout)
    }
}
