//! Input/output helpers.
//!
//! - observation CSV ingest + validation (`ingest`)
//! - interval boundary JSON (`intervals`)
//! - prediction CSV export (`export`)
//! - segmented model JSON read/write (`model_file`)

pub mod export;
pub mod ingest;
pub mod intervals;
pub mod model_file;

pub use export::*;
pub use ingest::*;
pub use intervals::*;
pub use model_file::*;
