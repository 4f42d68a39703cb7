//! Mathematical utilities: output grids and population statistics.

pub mod grid;
pub mod stats;

pub use grid::*;
pub use stats::*;
