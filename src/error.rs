//! Error types.
//!
//! - [`FitError`] is the library error: every fallible operation in `models`,
//!   `fit`, `segment` and `io` returns it.
//! - [`AppError`] is what the `dfit` binary reports: a message plus a process
//!   exit code. `FitError` converts into it so front-end code can use `?`.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FitError {
    /// Malformed or mismatched data/parameter arrays.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Inverted or non-finite search bounds.
    #[error("invalid bounds for '{name}': min={min}, max={max}")]
    InvalidBounds { name: String, min: f64, max: f64 },

    /// Interval boundaries are not a strictly increasing finite sequence.
    #[error("invalid interval boundaries: {0}")]
    InvalidBoundaries(String),

    /// A time sample lies outside the declared interval coverage.
    #[error("sample {index} (t={time}) lies outside interval coverage [{start}, {end}]")]
    UncoveredSample {
        index: usize,
        time: f64,
        start: f64,
        end: f64,
    },

    /// The optimizer exhausted its generation budget without meeting its
    /// convergence tolerance. Only raised when strict convergence is requested.
    #[error("optimizer did not converge within {generations} generations")]
    NonConvergence { generations: usize },

    /// File, CSV or JSON failure.
    #[error("{0}")]
    Io(String),
}

impl FitError {
    /// Process exit code used by the CLI.
    pub fn exit_code(&self) -> u8 {
        match self {
            FitError::InvalidInput(_)
            | FitError::InvalidBounds { .. }
            | FitError::InvalidBoundaries(_)
            | FitError::Io(_) => 2,
            FitError::UncoveredSample { .. } => 3,
            FitError::NonConvergence { .. } => 4,
        }
    }
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<FitError> for AppError {
    fn from(err: FitError) -> Self {
        AppError::new(err.exit_code(), err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
