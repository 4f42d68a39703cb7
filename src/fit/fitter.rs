//! Least-squares fitting of a single release model.
//!
//! Given:
//! - sample times `t_i`
//! - observed values `C_i`
//! - a search box for the model parameters
//!
//! we minimize `RSS(p) = Σ (C_i − model(p, t_i))²` with a bounded global
//! optimizer and return the best candidate together with its RSS and the
//! optimizer's convergence flag. The objective is unweighted and unregularized.

use log::{debug, warn};

use crate::domain::{Bounds, FitResult, ParameterVector, ReleaseModel, TimeSeries};
use crate::error::FitError;
use crate::fit::optimizer::{BoundedOptimizer, DifferentialEvolution, OptimizerConfig};
use crate::math::rss;
use crate::models::predict;

/// Residual sum of squares of `model` at `params` against observations.
///
/// Non-finite predictions (e.g. `exp` overflow far before `T_lag`) make the
/// result non-finite; the optimizer scores those candidates as `+∞`.
pub fn residual_sum_of_squares(model: ReleaseModel, params: &[f64], times: &[f64], values: &[f64]) -> f64 {
    let predicted: Vec<f64> = times.iter().map(|&t| predict(model, t, params)).collect();
    rss(values, &predicted)
}

/// Check fit inputs before any optimizer work.
pub fn validate_fit_inputs(
    model: ReleaseModel,
    times: &[f64],
    values: &[f64],
    bounds: &Bounds,
) -> Result<(), FitError> {
    let p = model.param_count();
    if times.len() != values.len() {
        return Err(FitError::InvalidInput(format!(
            "time/value length mismatch: {} vs {}",
            times.len(),
            values.len()
        )));
    }
    if times.len() < p + 1 {
        return Err(FitError::InvalidInput(format!(
            "{} has {p} parameter(s) and needs at least {} samples, got {}",
            model.display_name(),
            p + 1,
            times.len()
        )));
    }
    if let Some(i) = times.iter().zip(values).position(|(t, v)| !(t.is_finite() && v.is_finite())) {
        return Err(FitError::InvalidInput(format!(
            "sample {i} is not finite (t={}, C={})",
            times[i], values[i]
        )));
    }
    if bounds.len() != p {
        return Err(FitError::InvalidInput(format!(
            "{} needs {p} bound(s), got {}",
            model.display_name(),
            bounds.len()
        )));
    }
    bounds.validate()
}

/// Fit `model` with differential evolution configured by `config`.
pub fn fit(
    model: ReleaseModel,
    times: &[f64],
    values: &[f64],
    bounds: &Bounds,
    config: &OptimizerConfig,
) -> Result<FitResult, FitError> {
    fit_with(&DifferentialEvolution::new(config.clone()), model, times, values, bounds)
}

/// Fit `model` to an observed series.
pub fn fit_series(
    model: ReleaseModel,
    observed: &TimeSeries,
    bounds: &Bounds,
    config: &OptimizerConfig,
) -> Result<FitResult, FitError> {
    fit(model, &observed.times, &observed.values, bounds, config)
}

/// Fit `model` with any bounded optimizer.
pub fn fit_with<O: BoundedOptimizer>(
    optimizer: &O,
    model: ReleaseModel,
    times: &[f64],
    values: &[f64],
    bounds: &Bounds,
) -> Result<FitResult, FitError> {
    validate_fit_inputs(model, times, values, bounds)?;
    debug!(
        "fitting {} to {} sample(s) over {:?}",
        model.display_name(),
        times.len(),
        bounds.entries()
    );

    let outcome = optimizer.minimize(
        |params: &[f64]| residual_sum_of_squares(model, params, times, values),
        bounds,
    )?;

    if !bounds.contains(&outcome.x) {
        // Contract violation by the optimizer implementation.
        return Err(FitError::InvalidInput(format!(
            "optimizer returned {:?} outside the search bounds",
            outcome.x
        )));
    }
    if !outcome.fun.is_finite() {
        // Still the best candidate seen; report it as unconverged.
        warn!(
            "{} produced no finite prediction anywhere in the search bounds",
            model.display_name()
        );
    }
    let converged = outcome.converged && outcome.fun.is_finite();

    let rmse = (outcome.fun / times.len() as f64).sqrt();
    let params = ParameterVector::new(model, outcome.x)?;
    debug!(
        "{}: rss={:.6e} converged={} after {} generation(s)",
        model.display_name(),
        outcome.fun,
        outcome.converged,
        outcome.generations
    );

    Ok(FitResult {
        model,
        params,
        rss: outcome.fun,
        rmse,
        converged,
        generations: outcome.generations,
        evaluations: outcome.evaluations,
    })
}

/// Turn a non-converged fit into [`FitError::NonConvergence`].
pub fn ensure_converged(fit: FitResult) -> Result<FitResult, FitError> {
    if fit.converged {
        Ok(fit)
    } else {
        Err(FitError::NonConvergence {
            generations: fit.generations,
        })
    }
}
