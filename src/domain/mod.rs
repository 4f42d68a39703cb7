//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the closed set of release models (`ReleaseModel`)
//! - parameter vectors and search bounds (`ParameterVector`, `Bounds`)
//! - observed/predicted curves (`TimeSeries`)
//! - fit outputs (`FitResult`) and interval bookkeeping (`Interval`, `TimeOrigin`)

pub mod types;

pub use types::*;
