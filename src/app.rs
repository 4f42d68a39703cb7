//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and sets up logging
//! - runs single or piecewise fits
//! - prints reports
//! - writes optional exports

use std::io::Write;

use clap::Parser;
use log::{LevelFilter, info};

use crate::cli::{Cli, Command, EvalArgs, FitArgs, SegmentArgs, SimulateArgs};
use crate::domain::{FitConfig, ParameterVector, TimeOrigin};
use crate::error::AppError;
use crate::io::{read_model_json, write_curve_csv, write_model_json};
use crate::math::linspace;

pub mod pipeline;

/// Entry point for the `dfit` binary.
pub fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Fit(args) => handle_fit(args),
        Command::Segment(args) => handle_segment(args),
        Command::Eval(args) => handle_eval(args),
        Command::Simulate(args) => handle_simulate(args),
    }
}

/// Warnings by default; each `-v` raises the level. `RUST_LOG` wins when set.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    let _ = env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .try_init();
}

fn handle_fit(args: FitArgs) -> Result<(), AppError> {
    let config = fit_config_from_args(&args);
    let run = pipeline::run_fit(&config)?;

    if let Some(fit) = run.fits.first() {
        print!("{}", crate::report::format_fit_summary(fit, run.observed.len()));
    }
    print!("{}", crate::report::format_worst_residual(&run.residuals));

    write_exports(&config, &run)
}

fn handle_segment(args: SegmentArgs) -> Result<(), AppError> {
    let config = segment_config_from_args(&args);
    let run = pipeline::run_fit(&config)?;

    let summary = crate::segment::SegmentedFit {
        model: run.model.clone(),
        fits: run.fits.clone(),
    };
    print!("{}", crate::report::format_segmented_summary(&summary));
    print!("{}", crate::report::format_worst_residual(&run.residuals));

    write_exports(&config, &run)
}

fn write_exports(config: &FitConfig, run: &pipeline::RunOutput) -> Result<(), AppError> {
    let delimiter = config.delimiter;
    if let Some(path) = &config.export_curve {
        write_curve_csv(path, &run.curve, config.precision, delimiter)?;
        info!("wrote predicted curve to {}", path.display());
    }
    if let Some(path) = &config.export_model {
        write_model_json(path, &run.model, &run.fits)?;
        info!("wrote model to {}", path.display());
    }
    Ok(())
}

fn handle_eval(args: EvalArgs) -> Result<(), AppError> {
    let (model, _) = read_model_json(&args.model_file)?;
    let start = args.start.unwrap_or(model.boundaries().start());
    let end = args.end.unwrap_or(model.boundaries().end());
    let grid = linspace(start, end, args.grid_points)?;
    let curve = model.evaluate(&grid)?;

    match &args.export {
        Some(path) => {
            write_curve_csv(path, &curve, args.precision, args.delimiter as u8)?;
            println!("{}", crate::report::format_model_summary(&model).trim_end());
            println!("Wrote {} point(s) to {}", curve.len(), path.display());
        }
        None => {
            let precision = args.precision;
            let mut stdout = std::io::stdout().lock();
            for (t, v) in curve.iter() {
                writeln!(stdout, "{t:.precision$}{}{v:.precision$}", args.delimiter)
                    .map_err(|e| AppError::new(2, format!("Failed to write output: {e}")))?;
            }
        }
    }
    Ok(())
}

fn handle_simulate(args: SimulateArgs) -> Result<(), AppError> {
    let params = ParameterVector::from_named(args.model, &args.params)?;
    let times = linspace(args.start, args.end, args.points)?;
    let series = crate::data::simulate(args.model, &params, &times, args.noise, args.seed)?;
    write_curve_csv(&args.export, &series, args.precision, args.delimiter as u8)?;
    println!(
        "Wrote {} simulated point(s) from {} to {}",
        series.len(),
        args.model,
        args.export.display()
    );
    Ok(())
}

pub fn fit_config_from_args(args: &FitArgs) -> FitConfig {
    FitConfig {
        data_path: args.data.data.clone(),
        delimiter: args.data.delimiter as u8,
        models: vec![args.model],
        bound_overrides: args.bounds.clone(),
        intervals_path: None,
        time_origin: TimeOrigin::Absolute,
        optimizer: args.optimizer.to_config(),
        require_convergence: args.optimizer.require_convergence,
        grid_points: args.output.grid_points,
        precision: args.output.precision,
        export_curve: args.output.export.clone(),
        export_model: args.output.export_model.clone(),
    }
}

pub fn segment_config_from_args(args: &SegmentArgs) -> FitConfig {
    FitConfig {
        data_path: args.data.data.clone(),
        delimiter: args.data.delimiter as u8,
        models: args.models.clone(),
        bound_overrides: args.bounds.clone(),
        intervals_path: Some(args.intervals.clone()),
        time_origin: args.time_origin,
        optimizer: args.optimizer.to_config(),
        require_convergence: args.optimizer.require_convergence,
        grid_points: args.output.grid_points,
        precision: args.output.precision,
        export_curve: args.output.export.clone(),
        export_model: args.output.export_model.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ReleaseModel;

    #[test]
    fn segment_args_map_onto_config() {
        let cli = Cli::try_parse_from([
            "dfit",
            "segment",
            "--data",
            "obs.csv",
            "--delimiter",
            ";",
            "--intervals",
            "iv.json",
            "--models",
            "higuchi",
            "--bound",
            "k_H=0:50",
            "--seed",
            "7",
            "--grid",
            "25",
        ])
        .unwrap();
        let Command::Segment(args) = cli.command else {
            panic!("expected segment");
        };
        let config = segment_config_from_args(&args);
        assert_eq!(config.delimiter, b';');
        assert_eq!(config.models, vec![ReleaseModel::Higuchi]);
        assert_eq!(config.bound_overrides, vec![("k_H".to_string(), 0.0, 50.0)]);
        assert_eq!(config.optimizer.seed, Some(7));
        assert_eq!(config.grid_points, 25);
        assert_eq!(config.time_origin, TimeOrigin::Absolute);
        assert!(config.intervals_path.is_some());
    }
}
