//! Mathematical utilities and data structures

pub mod grid;
pub mod rect;

pub use grid::Grid;
pub use rect::Rect;
