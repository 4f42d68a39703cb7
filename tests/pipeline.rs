use std::path::Path;

use approx::assert_relative_eq;
use dissolution_fit::app::pipeline::run_fit;
use dissolution_fit::data::simulate;
use dissolution_fit::domain::{FitConfig, ParameterVector, ReleaseModel, TimeOrigin, TimeSeries};
use dissolution_fit::error::FitError;
use dissolution_fit::fit::OptimizerConfig;
use dissolution_fit::io::{read_model_json, read_observations, write_curve_csv, write_model_json};
use dissolution_fit::math::linspace;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn config(data: &Path, models: Vec<ReleaseModel>) -> FitConfig {
    FitConfig {
        data_path: data.to_path_buf(),
        delimiter: b';',
        models,
        bound_overrides: Vec::new(),
        intervals_path: None,
        time_origin: TimeOrigin::Absolute,
        optimizer: OptimizerConfig {
            seed: Some(11),
            ..OptimizerConfig::default()
        },
        require_convergence: true,
        grid_points: 49,
        precision: 8,
        export_curve: None,
        export_model: None,
    }
}

/// Zero-order release whose rate changes at every boundary.
fn piecewise_zero_order(times: &[f64], boundaries: &[f64], rates: &[f64]) -> Vec<f64> {
    times
        .iter()
        .map(|&t| {
            let i = boundaries[1..boundaries.len() - 1]
                .iter()
                .filter(|&&b| b <= t)
                .count();
            rates[i] * t
        })
        .collect()
}

#[test]
fn segmented_fit_round_trips_through_files() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("obs.csv");
    let intervals = dir.path().join("intervals.json");
    let model_path = dir.path().join("model.json");
    let curve_path = dir.path().join("curve.csv");

    let boundaries = [0.0, 5.0, 10.0, 15.0, 20.0, 48.0];
    let rates = [1.0, 3.0, 2.0, 5.0, 4.0];
    let times = linspace(0.0, 48.0, 97).unwrap();
    let values = piecewise_zero_order(&times, &boundaries, &rates);
    write_curve_csv(&data, &TimeSeries::new(times.clone(), values.clone()).unwrap(), 10, b';').unwrap();
    std::fs::write(
        &intervals,
        r#"{"end": 48, "start": 0, "s1": 5, "s2": 10, "s3": 15, "s4": 20}"#,
    )
    .unwrap();

    let mut cfg = config(&data, vec![ReleaseModel::ZeroOrder]);
    cfg.intervals_path = Some(intervals);
    cfg.bound_overrides = vec![("k_0".into(), 0.0, 10.0)];

    let run = run_fit(&cfg).unwrap();
    assert_eq!(run.fits.len(), 5);
    for (fit, want) in run.fits.iter().zip(rates) {
        assert_relative_eq!(fit.params.values()[0], want, max_relative = 1e-6);
    }
    for r in &run.residuals {
        assert!(r.residual.abs() < 1e-4, "t={} residual={}", r.time, r.residual);
    }

    write_curve_csv(&curve_path, &run.curve, cfg.precision, cfg.delimiter).unwrap();
    write_model_json(&model_path, &run.model, &run.fits).unwrap();

    let (loaded, file) = read_model_json(&model_path).unwrap();
    assert_eq!(file.fits.len(), 5);
    assert_eq!(loaded.boundaries().points(), &boundaries);
    assert_relative_eq!(loaded.predict(5.0).unwrap(), 15.0, max_relative = 1e-6);

    let curve = read_observations(&curve_path, b';').unwrap();
    assert_eq!(curve.len(), 49);
    assert_eq!(curve.times[48], 48.0);
}

#[test]
fn interval_start_origin_changes_predictions_not_classification() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("obs.csv");
    let intervals = dir.path().join("intervals.json");

    // Each phase restarts at zero: C = k_i * (t - b_i).
    let boundaries = [0.0, 4.0, 8.0];
    let rates = [2.0, 0.5];
    let times = linspace(0.0, 8.0, 17).unwrap();
    let values: Vec<f64> = times
        .iter()
        .map(|&t| if t < 4.0 { 2.0 * t } else { 0.5 * (t - 4.0) })
        .collect();
    write_curve_csv(&data, &TimeSeries::new(times, values).unwrap(), 10, b';').unwrap();
    std::fs::write(&intervals, "[0, 4, 8]").unwrap();

    let mut cfg = config(&data, vec![ReleaseModel::ZeroOrder]);
    cfg.intervals_path = Some(intervals);
    cfg.time_origin = TimeOrigin::IntervalStart;
    cfg.bound_overrides = vec![("k_0".into(), 0.0, 10.0)];

    let run = run_fit(&cfg).unwrap();
    for (fit, want) in run.fits.iter().zip(rates) {
        assert_relative_eq!(fit.params.values()[0], want, max_relative = 1e-6);
    }
    assert_eq!(run.model.boundaries().points(), &boundaries);
    assert_relative_eq!(run.model.predict(4.0).unwrap(), 0.0, epsilon = 1e-9);
}

#[test]
fn noisy_first_order_plateau_fit_is_close() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("obs.csv");

    let truth = ParameterVector::new(ReleaseModel::FirstOrderPlateau, vec![0.25, 80.0]).unwrap();
    let times = linspace(0.0, 24.0, 49).unwrap();
    let series = simulate(ReleaseModel::FirstOrderPlateau, &truth, &times, 0.5, 17).unwrap();
    write_curve_csv(&data, &series, 10, b';').unwrap();

    let mut cfg = config(&data, vec![ReleaseModel::FirstOrderPlateau]);
    cfg.bound_overrides = vec![("k_1".into(), 0.0, 5.0), ("F_max".into(), 0.0, 200.0)];
    let run = run_fit(&cfg).unwrap();

    let fit = &run.fits[0];
    assert!(fit.converged);
    assert_relative_eq!(fit.params.get("k_1").unwrap(), 0.25, max_relative = 0.05);
    assert_relative_eq!(fit.params.get("F_max").unwrap(), 80.0, max_relative = 0.02);
    // RMSE should sit near the injected noise level.
    assert!(fit.rmse < 1.0, "rmse={}", fit.rmse);
}

#[test]
fn data_outside_intervals_is_a_coverage_error() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("obs.csv");
    let intervals = dir.path().join("intervals.json");

    let times = linspace(0.0, 12.0, 13).unwrap();
    let values = times.clone();
    write_curve_csv(&data, &TimeSeries::new(times, values).unwrap(), 6, b';').unwrap();
    std::fs::write(&intervals, r#"{"a": 0, "b": 5, "c": 10}"#).unwrap();

    let mut cfg = config(&data, vec![ReleaseModel::ZeroOrder]);
    cfg.intervals_path = Some(intervals);

    let err = run_fit(&cfg).unwrap_err();
    assert!(matches!(err, FitError::UncoveredSample { time, .. } if time == 11.0));
    assert_eq!(err.exit_code(), 3);
}
