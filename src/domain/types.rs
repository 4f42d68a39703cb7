//! Shared domain types.
//!
//! These types are kept small and serializable so they can be:
//!
//! - used in-memory during fitting and segment evaluation
//! - exported to JSON/CSV
//! - reloaded later for re-evaluation on a new time grid

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use clap::ValueEnum;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::FitError;

/// Kinetic law family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModelFamily {
    ZeroOrder,
    FirstOrder,
    Higuchi,
}

/// One closed-form release model (family + variant).
///
/// The set is closed: adding a variant forces every `match` over it to be
/// updated, so dispatch errors surface at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ReleaseModel {
    /// `C = k_0·t`
    ZeroOrder,
    /// `C = k_0·(t − T_lag)`
    ZeroOrderLag,
    /// `C = F0 + k_0·t`
    ZeroOrderOffset,
    /// `C = 100·(1 − e^(−k_1·t))`
    FirstOrder,
    /// `C = 100·(1 − e^(−k_1·(t − T_lag)))`
    FirstOrderLag,
    /// `C = F_max·(1 − e^(−k_1·t))`
    FirstOrderPlateau,
    /// `C = F_max·(1 − e^(−k_1·(t − T_lag)))`
    FirstOrderPlateauLag,
    /// `C = k_H·√t`
    Higuchi,
    /// `C = k_H·√(t − T_lag)`
    HiguchiLag,
    /// `C = F0 + k_H·√t`
    HiguchiOffset,
}

impl ReleaseModel {
    pub const ALL: [ReleaseModel; 10] = [
        ReleaseModel::ZeroOrder,
        ReleaseModel::ZeroOrderLag,
        ReleaseModel::ZeroOrderOffset,
        ReleaseModel::FirstOrder,
        ReleaseModel::FirstOrderLag,
        ReleaseModel::FirstOrderPlateau,
        ReleaseModel::FirstOrderPlateauLag,
        ReleaseModel::Higuchi,
        ReleaseModel::HiguchiLag,
        ReleaseModel::HiguchiOffset,
    ];

    pub fn family(self) -> ModelFamily {
        match self {
            ReleaseModel::ZeroOrder | ReleaseModel::ZeroOrderLag | ReleaseModel::ZeroOrderOffset => {
                ModelFamily::ZeroOrder
            }
            ReleaseModel::FirstOrder
            | ReleaseModel::FirstOrderLag
            | ReleaseModel::FirstOrderPlateau
            | ReleaseModel::FirstOrderPlateauLag => ModelFamily::FirstOrder,
            ReleaseModel::Higuchi | ReleaseModel::HiguchiLag | ReleaseModel::HiguchiOffset => {
                ModelFamily::Higuchi
            }
        }
    }

    /// Human-readable label for terminal output.
    pub fn display_name(self) -> &'static str {
        match self {
            ReleaseModel::ZeroOrder => "zero-order",
            ReleaseModel::ZeroOrderLag => "zero-order + T_lag",
            ReleaseModel::ZeroOrderOffset => "zero-order + F0",
            ReleaseModel::FirstOrder => "first-order",
            ReleaseModel::FirstOrderLag => "first-order + T_lag",
            ReleaseModel::FirstOrderPlateau => "first-order + F_max",
            ReleaseModel::FirstOrderPlateauLag => "first-order + F_max + T_lag",
            ReleaseModel::Higuchi => "Higuchi",
            ReleaseModel::HiguchiLag => "Higuchi + T_lag",
            ReleaseModel::HiguchiOffset => "Higuchi + F0",
        }
    }

    /// Parameter names in the order `predict` expects them.
    pub fn param_names(self) -> &'static [&'static str] {
        match self {
            ReleaseModel::ZeroOrder => &["k_0"],
            ReleaseModel::ZeroOrderLag => &["k_0", "T_lag"],
            ReleaseModel::ZeroOrderOffset => &["k_0", "F0"],
            ReleaseModel::FirstOrder => &["k_1"],
            ReleaseModel::FirstOrderLag => &["k_1", "T_lag"],
            ReleaseModel::FirstOrderPlateau => &["k_1", "F_max"],
            ReleaseModel::FirstOrderPlateauLag => &["k_1", "F_max", "T_lag"],
            ReleaseModel::Higuchi => &["k_H"],
            ReleaseModel::HiguchiLag => &["k_H", "T_lag"],
            ReleaseModel::HiguchiOffset => &["k_H", "F0"],
        }
    }

    pub fn param_count(self) -> usize {
        self.param_names().len()
    }

    /// Position of a named parameter, if the model has it.
    pub fn param_index(self, name: &str) -> Option<usize> {
        self.param_names().iter().position(|n| *n == name)
    }
}

impl fmt::Display for ReleaseModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for ReleaseModel {
    type Err = FitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        <ReleaseModel as ValueEnum>::from_str(s.trim(), true)
            .map_err(|_| FitError::InvalidInput(format!("unknown model '{s}'")))
    }
}

/// Ordered parameter values for one model.
///
/// Names always mirror `ReleaseModel::param_names` for the model the vector
/// was built for. Serializes as a JSON object in parameter order.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterVector {
    names: Vec<String>,
    values: Vec<f64>,
}

impl ParameterVector {
    /// Build a parameter vector for `model` from positional values.
    pub fn new(model: ReleaseModel, values: Vec<f64>) -> Result<Self, FitError> {
        if values.len() != model.param_count() {
            return Err(FitError::InvalidInput(format!(
                "{} takes {} parameter(s), got {}",
                model.display_name(),
                model.param_count(),
                values.len()
            )));
        }
        if let Some(i) = values.iter().position(|v| !v.is_finite()) {
            return Err(FitError::InvalidInput(format!(
                "parameter '{}' is not finite ({})",
                model.param_names()[i],
                values[i]
            )));
        }
        Ok(Self {
            names: model.param_names().iter().map(|n| n.to_string()).collect(),
            values,
        })
    }

    /// Build a parameter vector from `(name, value)` pairs in any order.
    ///
    /// Every model parameter must be given exactly once.
    pub fn from_named(model: ReleaseModel, pairs: &[(String, f64)]) -> Result<Self, FitError> {
        let mut values = vec![None; model.param_count()];
        for (name, value) in pairs {
            let idx = model.param_index(name).ok_or_else(|| {
                FitError::InvalidInput(format!(
                    "{} has no parameter '{name}' (expected {:?})",
                    model.display_name(),
                    model.param_names()
                ))
            })?;
            if values[idx].replace(*value).is_some() {
                return Err(FitError::InvalidInput(format!("parameter '{name}' given twice")));
            }
        }
        let values = values
            .into_iter()
            .zip(model.param_names())
            .map(|(v, name)| {
                v.ok_or_else(|| FitError::InvalidInput(format!("missing parameter '{name}'")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(model, values)
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| self.values[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.names
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().copied())
    }

    /// True when names line up with `model`'s parameter list.
    pub fn matches(&self, model: ReleaseModel) -> bool {
        self.names.len() == model.param_count()
            && self
                .names
                .iter()
                .zip(model.param_names())
                .all(|(a, b)| a == b)
    }
}

impl Serialize for ParameterVector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (name, value) in self.iter() {
            map.serialize_entry(name, &value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ParameterVector {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct OrderedParams;

        impl<'de> Visitor<'de> for OrderedParams {
            type Value = ParameterVector;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of parameter name to value")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut names = Vec::new();
                let mut values = Vec::new();
                while let Some((name, value)) = access.next_entry::<String, f64>()? {
                    names.push(name);
                    values.push(value);
                }
                Ok(ParameterVector { names, values })
            }
        }

        deserializer.deserialize_map(OrderedParams)
    }
}

/// Closed search interval for one parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamBound {
    pub name: String,
    pub min: f64,
    pub max: f64,
}

impl ParamBound {
    pub fn width(&self) -> f64 {
        self.max - self.min
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Axis-aligned search box, one entry per model parameter (same order).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    entries: Vec<ParamBound>,
}

impl Bounds {
    /// Bounds from positional `(min, max)` pairs.
    ///
    /// Names come from the model. Ordering is validated separately by
    /// [`Bounds::validate`] so that callers can construct first and fail fast
    /// right before fitting.
    pub fn new(model: ReleaseModel, ranges: &[(f64, f64)]) -> Result<Self, FitError> {
        if ranges.len() != model.param_count() {
            return Err(FitError::InvalidInput(format!(
                "{} takes {} bound(s), got {}",
                model.display_name(),
                model.param_count(),
                ranges.len()
            )));
        }
        Ok(Self::named(model.param_names(), ranges))
    }

    /// Zip names with ranges; extra entries on either side are dropped.
    pub(crate) fn named(names: &[&str], ranges: &[(f64, f64)]) -> Self {
        Self {
            entries: names
                .iter()
                .zip(ranges)
                .map(|(name, &(min, max))| ParamBound {
                    name: name.to_string(),
                    min,
                    max,
                })
                .collect(),
        }
    }

    /// Unnamed bounds (used by the optimizer tests and generic callers).
    pub fn from_ranges(ranges: &[(f64, f64)]) -> Self {
        Self {
            entries: ranges
                .iter()
                .enumerate()
                .map(|(i, &(min, max))| ParamBound {
                    name: format!("x{i}"),
                    min,
                    max,
                })
                .collect(),
        }
    }

    /// Replace the bound for one named parameter.
    pub fn with_override(mut self, name: &str, min: f64, max: f64) -> Result<Self, FitError> {
        let entry = self
            .entries
            .iter_mut()
            .find(|b| b.name == name)
            .ok_or_else(|| FitError::InvalidInput(format!("no bound named '{name}' to override")))?;
        entry.min = min;
        entry.max = max;
        Ok(self)
    }

    pub fn entries(&self) -> &[ParamBound] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Reject non-finite ends and `min > max`. `min == max` pins the parameter.
    pub fn validate(&self) -> Result<(), FitError> {
        for b in &self.entries {
            if !(b.min.is_finite() && b.max.is_finite()) || b.min > b.max {
                return Err(FitError::InvalidBounds {
                    name: b.name.clone(),
                    min: b.min,
                    max: b.max,
                });
            }
        }
        Ok(())
    }

    pub fn contains(&self, x: &[f64]) -> bool {
        x.len() == self.entries.len() && self.entries.iter().zip(x).all(|(b, &v)| b.contains(v))
    }

    /// Clamp each component of `x` into its bound.
    ///
    /// Never panics. On unvalidated bounds with `min > max` the component
    /// ends up at `max`, so call [`Bounds::validate`] first.
    pub(crate) fn clamp(&self, x: &mut [f64]) {
        for (v, b) in x.iter_mut().zip(&self.entries) {
            *v = v.max(b.min).min(b.max);
        }
    }
}

/// Ordered `(time, value)` samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    pub times: Vec<f64>,
    pub values: Vec<f64>,
}

impl TimeSeries {
    /// Build a series and check it: equal lengths, finite values, times
    /// non-negative and strictly increasing.
    pub fn new(times: Vec<f64>, values: Vec<f64>) -> Result<Self, FitError> {
        if times.len() != values.len() {
            return Err(FitError::InvalidInput(format!(
                "time/value length mismatch: {} vs {}",
                times.len(),
                values.len()
            )));
        }
        for (i, (&t, &v)) in times.iter().zip(&values).enumerate() {
            if !t.is_finite() || t < 0.0 {
                return Err(FitError::InvalidInput(format!(
                    "row {i}: time must be finite and non-negative, got {t}"
                )));
            }
            if !v.is_finite() {
                return Err(FitError::InvalidInput(format!("row {i}: value is not finite ({v})")));
            }
            if i > 0 && t <= times[i - 1] {
                return Err(FitError::InvalidInput(format!(
                    "row {i}: times must be strictly increasing ({} then {t})",
                    times[i - 1]
                )));
            }
        }
        Ok(Self { times, values })
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.times.iter().copied().zip(self.values.iter().copied())
    }
}

/// Fit output for a single model over one set of observations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitResult {
    pub model: ReleaseModel,
    pub params: ParameterVector,
    /// Residual sum of squares at `params`.
    pub rss: f64,
    /// `sqrt(rss / n)`.
    pub rmse: f64,
    /// Whether the optimizer met its convergence tolerance before the cap.
    pub converged: bool,
    pub generations: usize,
    pub evaluations: usize,
}

/// Which clock a segment's model sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum TimeOrigin {
    /// Evaluate every segment on elapsed time since the experiment started.
    #[default]
    Absolute,
    /// Re-zero each segment's clock at its interval start (`t − start`).
    IntervalStart,
}

/// Half-open `[start, end)` time range; the last interval is `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub index: usize,
    pub start: f64,
    pub end: f64,
    pub closed_right: bool,
}

impl Interval {
    pub fn contains(&self, t: f64) -> bool {
        t >= self.start && (t < self.end || (self.closed_right && t == self.end))
    }

    /// Time the segment's model sees for absolute time `t`.
    pub fn local_time(&self, t: f64, origin: TimeOrigin) -> f64 {
        match origin {
            TimeOrigin::Absolute => t,
            TimeOrigin::IntervalStart => t - self.start,
        }
    }
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct FitConfig {
    pub data_path: PathBuf,
    pub delimiter: u8,

    /// Models to fit. One entry for a single fit; one per interval otherwise.
    pub models: Vec<ReleaseModel>,
    /// `(name, min, max)` overrides applied on top of model defaults.
    pub bound_overrides: Vec<(String, f64, f64)>,

    pub intervals_path: Option<PathBuf>,
    pub time_origin: TimeOrigin,

    pub optimizer: crate::fit::OptimizerConfig,
    /// Turn non-convergence into an error instead of a flag.
    pub require_convergence: bool,

    /// Number of points in the exported prediction grid.
    pub grid_points: usize,
    pub precision: usize,
    pub export_curve: Option<PathBuf>,
    pub export_model: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parameter_vector_from_named_reorders() {
        let p = ParameterVector::from_named(
            ReleaseModel::FirstOrderPlateauLag,
            &[
                ("T_lag".into(), 0.5),
                ("k_1".into(), 0.2),
                ("F_max".into(), 90.0),
            ],
        )
        .unwrap();
        assert_eq!(p.values(), &[0.2, 90.0, 0.5]);
        assert_eq!(p.get("F_max"), Some(90.0));
        assert!(p.matches(ReleaseModel::FirstOrderPlateauLag));
        assert!(!p.matches(ReleaseModel::FirstOrderPlateau));
    }

    #[test]
    fn parameter_vector_serializes_as_ordered_map() {
        let p = ParameterVector::new(ReleaseModel::FirstOrderPlateauLag, vec![0.2, 90.0, 0.5]).unwrap();
        let json = serde_json::to_string(&p).unwrap();
        assert_eq!(json, r#"{"k_1":0.2,"F_max":90.0,"T_lag":0.5}"#);
        let back: ParameterVector = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
    }

    #[test]
    fn parameter_vector_rejects_unknown_and_missing_names() {
        let err = ParameterVector::from_named(ReleaseModel::ZeroOrder, &[("k_1".into(), 1.0)]);
        assert!(matches!(err, Err(FitError::InvalidInput(_))));

        let err = ParameterVector::from_named(ReleaseModel::ZeroOrderLag, &[("k_0".into(), 1.0)]);
        assert!(matches!(err, Err(FitError::InvalidInput(_))));
    }

    #[test]
    fn inverted_bounds_are_rejected() {
        let b = Bounds::new(ReleaseModel::ZeroOrder, &[(5.0, 1.0)]).unwrap();
        assert_eq!(
            b.validate(),
            Err(FitError::InvalidBounds {
                name: "k_0".into(),
                min: 5.0,
                max: 1.0
            })
        );
    }

    #[test]
    fn clamp_pulls_components_into_the_box() {
        let b = Bounds::from_ranges(&[(0.0, 1.0), (-2.0, 2.0), (3.0, 3.0)]);
        let mut x = [1.5, -7.0, 0.0];
        b.clamp(&mut x);
        assert_eq!(x, [1.0, -2.0, 3.0]);
        assert!(b.contains(&x));
    }

    #[test]
    fn clamp_on_inverted_bounds_does_not_panic() {
        let b = Bounds::from_ranges(&[(5.0, 1.0)]);
        assert!(b.validate().is_err());
        let mut x = [3.0];
        b.clamp(&mut x);
        assert_eq!(x, [1.0]);
    }

    #[test]
    fn pinned_bounds_are_valid() {
        let b = Bounds::new(ReleaseModel::ZeroOrderLag, &[(0.0, 10.0), (2.0, 2.0)]).unwrap();
        assert!(b.validate().is_ok());
        assert!(b.contains(&[3.0, 2.0]));
        assert!(!b.contains(&[3.0, 2.5]));
    }

    #[test]
    fn time_series_requires_strictly_increasing_times() {
        assert!(TimeSeries::new(vec![0.0, 1.0, 1.0], vec![0.0, 1.0, 2.0]).is_err());
        assert!(TimeSeries::new(vec![0.0, 1.0], vec![0.0]).is_err());
        assert!(TimeSeries::new(vec![-1.0, 1.0], vec![0.0, 1.0]).is_err());
        assert!(TimeSeries::new(vec![0.0, 1.0], vec![0.0, 1.0]).is_ok());
    }

    #[test]
    fn model_names_parse_case_insensitively() {
        assert_eq!(
            "First-Order-Plateau-Lag".parse::<ReleaseModel>().unwrap(),
            ReleaseModel::FirstOrderPlateauLag
        );
        assert!("second-order".parse::<ReleaseModel>().is_err());
    }

    #[test]
    fn interval_local_time() {
        let iv = Interval {
            index: 1,
            start: 5.0,
            end: 10.0,
            closed_right: false,
        };
        assert!(iv.contains(5.0));
        assert!(!iv.contains(10.0));
        assert_eq!(iv.local_time(7.0, TimeOrigin::Absolute), 7.0);
        assert_eq!(iv.local_time(7.0, TimeOrigin::IntervalStart), 2.0);
    }
}
