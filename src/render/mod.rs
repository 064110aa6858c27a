//! Rendering interfaces

pub mod display;

pub use display::{RecordingDisplay, TerrainDisplay};
