//! Parameter estimation.
//!
//! Responsibilities:
//!
//! - bounded global minimization (differential evolution, parallel scoring)
//! - the RSS objective and input validation for a single model fit

pub mod fitter;
pub mod optimizer;

pub use fitter::*;
pub use optimizer::*;
