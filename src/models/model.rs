//! Closed-form release laws.
//!
//! Every model is a pure function of `(params, t)`. The fitter only needs
//! two operations:
//! - predict `C(t)` for one time point (segment evaluation, grids)
//! - evaluate a whole time vector (objective function)
//!
//! Pre-lag times: zero/first-order variants extrapolate the formula for
//! `t < T_lag`. The Higuchi lag variant releases nothing before `T_lag`
//! (the radicand is floored at zero), so it stays finite on data starting at
//! `t = 0` for any lag in the search box.

use crate::domain::{Bounds, ParameterVector, ReleaseModel};

/// First-order variants without `F_max` release towards 100%.
pub const FIRST_ORDER_FULL_RELEASE: f64 = 100.0;

/// Predict `C(t)` for a positional parameter slice.
///
/// # Panics
/// Panics if `params` is shorter than `model.param_count()`. Callers that
/// hold a [`ParameterVector`] should prefer [`predict_with`].
pub fn predict(model: ReleaseModel, t: f64, params: &[f64]) -> f64 {
    match model {
        ReleaseModel::ZeroOrder => params[0] * t,
        ReleaseModel::ZeroOrderLag => params[0] * (t - params[1]),
        ReleaseModel::ZeroOrderOffset => params[1] + params[0] * t,
        ReleaseModel::FirstOrder => first_order(FIRST_ORDER_FULL_RELEASE, params[0], t),
        ReleaseModel::FirstOrderLag => first_order(FIRST_ORDER_FULL_RELEASE, params[0], t - params[1]),
        ReleaseModel::FirstOrderPlateau => first_order(params[1], params[0], t),
        ReleaseModel::FirstOrderPlateauLag => first_order(params[1], params[0], t - params[2]),
        ReleaseModel::Higuchi => params[0] * t.sqrt(),
        ReleaseModel::HiguchiLag => params[0] * (t - params[1]).max(0.0).sqrt(),
        ReleaseModel::HiguchiOffset => params[1] + params[0] * t.sqrt(),
    }
}

/// Predict `C(t)` from a parameter vector built for `model`.
pub fn predict_with(model: ReleaseModel, t: f64, params: &ParameterVector) -> f64 {
    predict(model, t, params.values())
}

/// Evaluate the model elementwise over `times`.
pub fn evaluate(model: ReleaseModel, params: &[f64], times: &[f64]) -> Vec<f64> {
    times.iter().map(|&t| predict(model, t, params)).collect()
}

/// Search bounds used when the caller does not supply any.
///
/// Ranges are wide enough for release data expressed in percent over hours.
pub fn default_ranges(model: ReleaseModel) -> &'static [(f64, f64)] {
    match model {
        ReleaseModel::ZeroOrder => &[(0.0, 100.0)],
        ReleaseModel::ZeroOrderLag => &[(0.0, 10.0), (-10.0, 100.0)],
        ReleaseModel::ZeroOrderOffset => &[(0.0, 10.0), (0.0, 100.0)],
        ReleaseModel::FirstOrder => &[(0.0, 100.0)],
        ReleaseModel::FirstOrderLag => &[(0.0, 100.0), (0.0, 50.0)],
        ReleaseModel::FirstOrderPlateau => &[(0.0, 100.0), (0.0, 1000.0)],
        ReleaseModel::FirstOrderPlateauLag => &[(0.0, 100.0), (0.0, 1000.0), (0.0, 50.0)],
        ReleaseModel::Higuchi => &[(0.0, 150.0)],
        ReleaseModel::HiguchiLag => &[(0.0, 150.0), (0.0, 24.0)],
        ReleaseModel::HiguchiOffset => &[(0.0, 150.0), (0.0, 24.0)],
    }
}

/// Default [`Bounds`] for a model.
pub fn default_bounds(model: ReleaseModel) -> Bounds {
    Bounds::named(model.param_names(), default_ranges(model))
}

impl ReleaseModel {
    pub fn predict(self, t: f64, params: &[f64]) -> f64 {
        predict(self, t, params)
    }

    pub fn evaluate(self, params: &[f64], times: &[f64]) -> Vec<f64> {
        evaluate(self, params, times)
    }

    pub fn default_bounds(self) -> Bounds {
        default_bounds(self)
    }
}

impl Bounds {
    /// Default search box for `model`.
    pub fn for_model(model: ReleaseModel) -> Self {
        default_bounds(model)
    }
}

/// `f_max·(1 − e^(−k·t))`, with `-expm1` to keep precision for small `k·t`.
fn first_order(f_max: f64, k: f64, t: f64) -> f64 {
    f_max * -(-k * t).exp_m1()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn formulas_match_closed_forms() {
        let t = 4.0;
        assert_relative_eq!(predict(ReleaseModel::ZeroOrder, t, &[2.0]), 8.0);
        assert_relative_eq!(predict(ReleaseModel::ZeroOrderLag, t, &[2.0, 1.0]), 6.0);
        assert_relative_eq!(predict(ReleaseModel::ZeroOrderOffset, t, &[2.0, 5.0]), 13.0);
        assert_relative_eq!(
            predict(ReleaseModel::FirstOrder, t, &[0.5]),
            100.0 * (1.0 - (-2.0f64).exp()),
            max_relative = 1e-12
        );
        assert_relative_eq!(
            predict(ReleaseModel::FirstOrderLag, t, &[0.5, 2.0]),
            100.0 * (1.0 - (-1.0f64).exp()),
            max_relative = 1e-12
        );
        assert_relative_eq!(
            predict(ReleaseModel::FirstOrderPlateau, t, &[0.5, 80.0]),
            80.0 * (1.0 - (-2.0f64).exp()),
            max_relative = 1e-12
        );
        assert_relative_eq!(
            predict(ReleaseModel::FirstOrderPlateauLag, t, &[0.5, 80.0, 2.0]),
            80.0 * (1.0 - (-1.0f64).exp()),
            max_relative = 1e-12
        );
        assert_relative_eq!(predict(ReleaseModel::Higuchi, t, &[3.0]), 6.0);
        assert_relative_eq!(predict(ReleaseModel::HiguchiLag, t, &[3.0, 3.0]), 3.0);
        assert_relative_eq!(predict(ReleaseModel::HiguchiOffset, t, &[3.0, 1.5]), 7.5);
    }

    #[test]
    fn pre_lag_does_not_panic() {
        // Extrapolated, not clamped.
        assert_relative_eq!(predict(ReleaseModel::ZeroOrderLag, 0.0, &[2.0, 1.0]), -2.0);
        assert!(predict(ReleaseModel::FirstOrderLag, 0.0, &[0.5, 2.0]) < 0.0);
        // No release before the lag.
        assert_eq!(predict(ReleaseModel::HiguchiLag, 0.0, &[3.0, 1.0]), 0.0);
        assert_eq!(predict(ReleaseModel::HiguchiLag, 1.0, &[3.0, 1.0]), 0.0);
        assert_relative_eq!(predict(ReleaseModel::HiguchiLag, 5.0, &[3.0, 1.0]), 6.0);
    }

    #[test]
    fn evaluate_is_elementwise() {
        let times = [0.0, 1.0, 2.0, 3.0];
        let out = evaluate(ReleaseModel::ZeroOrder, &[2.0], &times);
        assert_eq!(out, vec![0.0, 2.0, 4.0, 6.0]);
    }

    #[test]
    fn default_bounds_cover_every_model() {
        for model in ReleaseModel::ALL {
            let b = default_bounds(model);
            assert_eq!(b.len(), model.param_count());
            assert!(b.validate().is_ok());
            for (entry, name) in b.entries().iter().zip(model.param_names()) {
                assert_eq!(entry.name, *name);
            }
        }
    }
}
