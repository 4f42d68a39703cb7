//! Evenly spaced time grids for exported prediction curves.

use crate::error::FitError;

/// Generate `steps` evenly spaced points between `start` and `end` (inclusive).
pub fn linspace(start: f64, end: f64, steps: usize) -> Result<Vec<f64>, FitError> {
    if !(start.is_finite() && end.is_finite() && end > start) {
        return Err(FitError::InvalidInput(format!(
            "invalid grid range: start={start}, end={end} (must be finite and end>start)"
        )));
    }
    if steps < 2 {
        return Err(FitError::InvalidInput("grid needs at least 2 points".into()));
    }

    let step = (end - start) / (steps as f64 - 1.0);
    let mut out: Vec<f64> = (0..steps).map(|i| start + step * i as f64).collect();
    // Pin the last point so the closed right end of the final interval is hit exactly.
    out[steps - 1] = end;
    Ok(out)
}
