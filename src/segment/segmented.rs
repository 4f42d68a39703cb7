//! Piecewise release curves assembled from per-interval models.
//!
//! Each interval carries its own model and parameters. A sample is routed to
//! its interval by [`classify`] and evaluated by that interval's model only.
//! Which clock the model sees is fixed by [`TimeOrigin`]:
//!
//! - `Absolute`: `model(params, t)` on elapsed experiment time
//! - `IntervalStart`: `model(params, t − start)` so kinetics restart per interval
//!
//! Continuity across boundaries is not enforced; [`SegmentedModel::boundary_jumps`]
//! reports the mismatch for callers that want to inspect it.

use log::info;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::domain::{Bounds, FitResult, Interval, ParameterVector, ReleaseModel, TimeOrigin, TimeSeries};
use crate::error::FitError;
use crate::fit::{OptimizerConfig, fit, validate_fit_inputs};
use crate::models::predict_with;
use crate::segment::intervals::{IntervalBoundaries, classify, partition};

/// One interval with its model and parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub interval: Interval,
    pub model: ReleaseModel,
    pub params: ParameterVector,
}

impl Segment {
    fn predict(&self, t: f64, origin: TimeOrigin) -> f64 {
        predict_with(self.model, self.interval.local_time(t, origin), &self.params)
    }
}

/// Predicted values on both sides of one interior boundary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundaryJump {
    pub boundary: f64,
    /// Preceding interval's model evaluated at the boundary.
    pub left: f64,
    /// Following interval's model evaluated at the boundary.
    pub right: f64,
}

impl BoundaryJump {
    pub fn jump(&self) -> f64 {
        self.right - self.left
    }
}

/// Ordered segments covering `[b0, bN]` without gaps or overlaps.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentedModel {
    boundaries: IntervalBoundaries,
    segments: Vec<Segment>,
    origin: TimeOrigin,
}

impl SegmentedModel {
    /// Pair each interval with one `(model, params)` entry, in order.
    pub fn new(
        boundaries: IntervalBoundaries,
        parts: Vec<(ReleaseModel, ParameterVector)>,
        origin: TimeOrigin,
    ) -> Result<Self, FitError> {
        if parts.len() != boundaries.interval_count() {
            return Err(FitError::InvalidInput(format!(
                "{} interval(s) but {} model(s)",
                boundaries.interval_count(),
                parts.len()
            )));
        }
        let segments = boundaries
            .intervals()
            .zip(parts)
            .map(|(interval, (model, params))| {
                if !params.matches(model) {
                    return Err(FitError::InvalidInput(format!(
                        "interval {}: parameters {:?} do not match {} {:?}",
                        interval.index,
                        params.names(),
                        model.display_name(),
                        model.param_names()
                    )));
                }
                Ok(Segment {
                    interval,
                    model,
                    params,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            boundaries,
            segments,
            origin,
        })
    }

    /// Assemble from one fit per interval.
    pub fn from_fits(
        boundaries: IntervalBoundaries,
        fits: &[FitResult],
        origin: TimeOrigin,
    ) -> Result<Self, FitError> {
        let parts = fits.iter().map(|f| (f.model, f.params.clone())).collect();
        Self::new(boundaries, parts, origin)
    }

    pub fn boundaries(&self) -> &IntervalBoundaries {
        &self.boundaries
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn origin(&self) -> TimeOrigin {
        self.origin
    }

    /// Predict one time point.
    pub fn predict(&self, t: f64) -> Result<f64, FitError> {
        let labels = classify(&[t], &self.boundaries)?;
        Ok(self.segments[labels[0]].predict(t, self.origin))
    }

    /// Predict every sample in input order. Any uncovered sample aborts the call.
    pub fn evaluate(&self, times: &[f64]) -> Result<TimeSeries, FitError> {
        let labels = classify(times, &self.boundaries)?;
        let values = times
            .iter()
            .zip(labels)
            .map(|(&t, i)| self.segments[i].predict(t, self.origin))
            .collect();
        Ok(TimeSeries {
            times: times.to_vec(),
            values,
        })
    }

    /// Left/right predictions at every interior boundary.
    pub fn boundary_jumps(&self) -> Vec<BoundaryJump> {
        self.segments
            .windows(2)
            .map(|pair| {
                let boundary = pair[1].interval.start;
                BoundaryJump {
                    boundary,
                    left: pair[0].predict(boundary, self.origin),
                    right: pair[1].predict(boundary, self.origin),
                }
            })
            .collect()
    }
}

/// Evaluate `model` at `times`.
pub fn evaluate(model: &SegmentedModel, times: &[f64]) -> Result<TimeSeries, FitError> {
    model.evaluate(times)
}

/// Segmented model plus the fit that produced each segment.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentedFit {
    pub model: SegmentedModel,
    pub fits: Vec<FitResult>,
}

impl SegmentedFit {
    pub fn all_converged(&self) -> bool {
        self.fits.iter().all(|f| f.converged)
    }

    pub fn total_rss(&self) -> f64 {
        self.fits.iter().map(|f| f.rss).sum()
    }
}

/// Fit one model per interval on that interval's samples and assemble the
/// piecewise model.
///
/// All shape, bounds and coverage checks run before the first fit starts.
/// Intervals are fitted in parallel; with a seeded config, interval `i` uses
/// `seed + i` so results do not depend on scheduling.
pub fn fit_segmented(
    times: &[f64],
    values: &[f64],
    boundaries: &IntervalBoundaries,
    models: &[ReleaseModel],
    bounds: &[Bounds],
    config: &OptimizerConfig,
    origin: TimeOrigin,
) -> Result<SegmentedFit, FitError> {
    let n = boundaries.interval_count();
    if times.len() != values.len() {
        return Err(FitError::InvalidInput(format!(
            "time/value length mismatch: {} vs {}",
            times.len(),
            values.len()
        )));
    }
    if models.len() != n || bounds.len() != n {
        return Err(FitError::InvalidInput(format!(
            "{n} interval(s) need {n} model(s) and bound set(s), got {} and {}",
            models.len(),
            bounds.len()
        )));
    }

    let groups = partition(times, boundaries)?;
    let mut jobs = Vec::with_capacity(n);
    for (interval, members) in boundaries.intervals().zip(&groups) {
        let i = interval.index;
        let local_t: Vec<f64> = members
            .iter()
            .map(|&s| interval.local_time(times[s], origin))
            .collect();
        let local_c: Vec<f64> = members.iter().map(|&s| values[s]).collect();
        validate_fit_inputs(models[i], &local_t, &local_c, &bounds[i]).map_err(|e| match e {
            FitError::InvalidInput(msg) => FitError::InvalidInput(format!(
                "interval {i} [{}, {}]: {msg}",
                interval.start, interval.end
            )),
            other => other,
        })?;
        jobs.push((i, local_t, local_c));
    }

    let fits = jobs
        .par_iter()
        .map(|(i, t, c)| {
            let cfg = OptimizerConfig {
                seed: config.seed.map(|s| s.wrapping_add(*i as u64)),
                ..config.clone()
            };
            fit(models[*i], t, c, &bounds[*i], &cfg)
        })
        .collect::<Result<Vec<_>, _>>()?;

    for (interval, f) in boundaries.intervals().zip(&fits) {
        info!(
            "interval {} [{}, {}]: {} rss={:.6e} converged={}",
            interval.index,
            interval.start,
            interval.end,
            f.model.display_name(),
            f.rss,
            f.converged
        );
    }

    let model = SegmentedModel::from_fits(boundaries.clone(), &fits, origin)?;
    Ok(SegmentedFit { model, fits })
}
