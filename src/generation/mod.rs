//! Terrain generation: configuration, pure per-chunk computation, previews
//! and the asynchronous worker pipeline.
//!
//! Data flows `noise -> falloff -> classification` for height data and
//! `height field -> mesh` for each requested LOD.

pub mod config;
pub mod map;
pub mod preview;
pub mod pipeline;

pub use config::{MAP_CHUNK_SIZE, MeshSettings, StreamingSettings, TerrainConfig};
pub use map::{MapData, MapGenerator};
pub use preview::{DrawMode, Preview};
pub use pipeline::{GenerationPipeline, PipelineStats, TaskKind};
