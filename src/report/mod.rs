//! Reporting utilities: residuals and formatted terminal output.

pub mod format;

pub use format::*;

use crate::domain::TimeSeries;
use crate::error::FitError;
use crate::segment::SegmentedModel;

/// One observation next to its prediction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Residual {
    pub time: f64,
    pub observed: f64,
    pub predicted: f64,
    pub residual: f64,
}

/// Predict every observation with `model` and pair it with the data.
pub fn compute_residuals(observed: &TimeSeries, model: &SegmentedModel) -> Result<Vec<Residual>, FitError> {
    let predicted = model.evaluate(&observed.times)?;
    Ok(observed
        .iter()
        .zip(predicted.values)
        .map(|((time, observed), predicted)| Residual {
            time,
            observed,
            predicted,
            residual: observed - predicted,
        })
        .collect())
}

/// Largest `|residual|`, ignoring non-finite entries.
pub fn max_abs_residual(residuals: &[Residual]) -> Option<&Residual> {
    residuals
        .iter()
        .filter(|r| r.residual.is_finite())
        .max_by(|a, b| a.residual.abs().total_cmp(&b.residual.abs()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ParameterVector, ReleaseModel, TimeOrigin};
    use crate::segment::IntervalBoundaries;

    #[test]
    fn compute_residuals_basic() {
        let model = SegmentedModel::new(
            IntervalBoundaries::new(vec![0.0, 10.0]).unwrap(),
            vec![(
                ReleaseModel::ZeroOrder,
                ParameterVector::new(ReleaseModel::ZeroOrder, vec![1.0]).unwrap(),
            )],
            TimeOrigin::Absolute,
        )
        .unwrap();
        let observed = TimeSeries::new(vec![1.0, 2.0, 3.0], vec![1.0, 2.5, 2.0]).unwrap();

        let residuals = compute_residuals(&observed, &model).unwrap();
        assert_eq!(residuals.len(), 3);
        assert!((residuals[1].residual - 0.5).abs() < 1e-12);
        assert_eq!(max_abs_residual(&residuals).unwrap().time, 3.0);
    }
}
