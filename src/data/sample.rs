//! Synthetic dissolution profiles drawn from a release model.
//!
//! Noise is additive Gaussian with a fixed standard deviation. A fixed seed
//! gives the same series on every run.

use log::debug;
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::{ParameterVector, ReleaseModel, TimeSeries};
use crate::error::FitError;
use crate::models::predict_with;

/// Sample `model` at `times` and add `N(0, noise_sd²)` noise.
///
/// Non-finite predictions (e.g. `exp` overflow far before a first-order
/// lag) are rejected rather than written out.
pub fn simulate(
    model: ReleaseModel,
    params: &ParameterVector,
    times: &[f64],
    noise_sd: f64,
    seed: u64,
) -> Result<TimeSeries, FitError> {
    if !params.matches(model) {
        return Err(FitError::InvalidInput(format!(
            "parameters {:?} do not match {} {:?}",
            params.names(),
            model.display_name(),
            model.param_names()
        )));
    }
    if !(noise_sd.is_finite() && noise_sd >= 0.0) {
        return Err(FitError::InvalidInput(format!(
            "noise standard deviation must be finite and >= 0, got {noise_sd}"
        )));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let normal = Normal::new(0.0, noise_sd)
        .map_err(|e| FitError::InvalidInput(format!("noise distribution error: {e}")))?;

    let mut values = Vec::with_capacity(times.len());
    for &t in times {
        let clean = predict_with(model, t, params);
        if !clean.is_finite() {
            return Err(FitError::InvalidInput(format!(
                "{} is not defined at t={t} for {:?}",
                model.display_name(),
                params.values()
            )));
        }
        values.push(clean + normal.sample(&mut rng));
    }

    debug!(
        "simulated {} sample(s) from {} (sd={noise_sd}, seed={seed})",
        times.len(),
        model.display_name()
    );
    TimeSeries::new(times.to_vec(), values)
}
