//! Interval segmentation and piecewise model composition.

pub mod intervals;
pub mod segmented;

pub use intervals::*;
pub use segmented::*;
