//! Shared fit pipeline used by the `fit` and `segment` commands.
//!
//! ingest -> bounds -> fit (single or per interval) -> residuals -> grid
//!
//! A single-model fit is represented as a one-interval [`SegmentedModel`]
//! spanning the observed time range, so both commands export the same model
//! file format and `eval` does not care which one produced it.

use log::info;

use crate::domain::{Bounds, FitConfig, FitResult, ReleaseModel, TimeOrigin, TimeSeries};
use crate::error::FitError;
use crate::fit::{ensure_converged, fit_series};
use crate::io::{read_boundaries, read_observations};
use crate::math::linspace;
use crate::models::default_bounds;
use crate::report::{Residual, compute_residuals};
use crate::segment::{IntervalBoundaries, SegmentedModel, fit_segmented};

/// All computed outputs of one run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub observed: TimeSeries,
    pub model: SegmentedModel,
    pub fits: Vec<FitResult>,
    pub residuals: Vec<Residual>,
    /// Model prediction on the output grid.
    pub curve: TimeSeries,
}

/// Execute the pipeline described by `config`.
pub fn run_fit(config: &FitConfig) -> Result<RunOutput, FitError> {
    let observed = read_observations(&config.data_path, config.delimiter)?;
    info!(
        "read {} observation(s) from {}",
        observed.len(),
        config.data_path.display()
    );
    run_fit_on(config, observed)
}

/// Same as [`run_fit`] with observations already in memory.
pub fn run_fit_on(config: &FitConfig, observed: TimeSeries) -> Result<RunOutput, FitError> {
    let (model, fits) = match &config.intervals_path {
        None => fit_single(config, &observed)?,
        Some(path) => {
            let boundaries = read_boundaries(path)?;
            fit_piecewise(config, &observed, boundaries)?
        }
    };

    if config.require_convergence {
        for fit in &fits {
            ensure_converged(fit.clone())?;
        }
    }

    let residuals = compute_residuals(&observed, &model)?;
    let grid = linspace(
        model.boundaries().start(),
        model.boundaries().end(),
        config.grid_points,
    )?;
    let curve = model.evaluate(&grid)?;

    Ok(RunOutput {
        observed,
        model,
        fits,
        residuals,
        curve,
    })
}

fn fit_single(config: &FitConfig, observed: &TimeSeries) -> Result<(SegmentedModel, Vec<FitResult>), FitError> {
    let &[model] = config.models.as_slice() else {
        return Err(FitError::InvalidInput(format!(
            "a single fit takes exactly one model, got {}",
            config.models.len()
        )));
    };
    let bounds = resolve_bounds(&[model], &config.bound_overrides)?.remove(0);
    let fit = fit_series(model, observed, &bounds, &config.optimizer)?;
    info!(
        "{}: rss={:.6e} converged={}",
        model.display_name(),
        fit.rss,
        fit.converged
    );

    // Non-empty, strictly increasing and at least p + 1 >= 2 samples by now.
    let span = IntervalBoundaries::new(vec![observed.times[0], observed.times[observed.len() - 1]])?;
    let segmented = SegmentedModel::from_fits(span, std::slice::from_ref(&fit), TimeOrigin::Absolute)?;
    Ok((segmented, vec![fit]))
}

fn fit_piecewise(
    config: &FitConfig,
    observed: &TimeSeries,
    boundaries: IntervalBoundaries,
) -> Result<(SegmentedModel, Vec<FitResult>), FitError> {
    let models = expand_models(&config.models, boundaries.interval_count())?;
    let bounds = resolve_bounds(&models, &config.bound_overrides)?;
    let out = fit_segmented(
        &observed.times,
        &observed.values,
        &boundaries,
        &models,
        &bounds,
        &config.optimizer,
        config.time_origin,
    )?;
    Ok((out.model, out.fits))
}

/// One model per interval; a single model is reused for all of them.
pub fn expand_models(models: &[ReleaseModel], intervals: usize) -> Result<Vec<ReleaseModel>, FitError> {
    match models {
        [only] => Ok(vec![*only; intervals]),
        _ if models.len() == intervals => Ok(models.to_vec()),
        _ => Err(FitError::InvalidInput(format!(
            "{intervals} interval(s) but {} model(s) given",
            models.len()
        ))),
    }
}

/// Default bounds per model with `(name, min, max)` overrides applied.
///
/// An override is applied to every model that has the parameter; one that no
/// model has is an error.
pub fn resolve_bounds(models: &[ReleaseModel], overrides: &[(String, f64, f64)]) -> Result<Vec<Bounds>, FitError> {
    let mut out: Vec<Bounds> = models.iter().map(|&m| default_bounds(m)).collect();
    for (name, min, max) in overrides {
        let mut used = false;
        for (model, bounds) in models.iter().zip(out.iter_mut()) {
            if model.param_index(name).is_some() {
                *bounds = bounds.clone().with_override(name, *min, *max)?;
                used = true;
            }
        }
        if !used {
            return Err(FitError::InvalidInput(format!(
                "bound override '{name}' matches no parameter of {:?}",
                models.iter().map(|m| m.display_name()).collect::<Vec<_>>()
            )));
        }
    }
    Ok(out)
}
