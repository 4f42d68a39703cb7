//! Command-line parsing for `dfit`.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! fitting code: everything here turns flags into domain values and nothing
//! else.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

use crate::domain::{ReleaseModel, TimeOrigin};
use crate::fit::{OptimizerConfig, Strategy};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "dfit", version, about = "Dissolution curve fitting (single and piecewise models)")]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace). `RUST_LOG` overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit one model to all observations.
    Fit(FitArgs),
    /// Fit one model per time interval and assemble a piecewise curve.
    Segment(SegmentArgs),
    /// Evaluate a saved model file on a time grid.
    Eval(EvalArgs),
    /// Write synthetic observations drawn from a model.
    Simulate(SimulateArgs),
}

/// Observation input shared by `fit` and `segment`.
#[derive(Debug, Args, Clone)]
pub struct DataArgs {
    /// Observation CSV: two columns, time and released amount.
    #[arg(long, value_name = "CSV")]
    pub data: PathBuf,

    /// Field delimiter for CSV input and output.
    #[arg(long, default_value_t = ',', value_parser = parse_delimiter)]
    pub delimiter: char,
}

/// Differential evolution settings.
#[derive(Debug, Args, Clone)]
pub struct OptimizerArgs {
    /// Generation cap.
    #[arg(long, default_value_t = 1000)]
    pub max_iterations: usize,

    /// Population size (at least 5).
    #[arg(long, default_value_t = 40)]
    pub population_size: usize,

    #[arg(long, value_enum, default_value_t = Strategy::Best1Bin)]
    pub strategy: Strategy,

    /// Lower end of the dithered mutation scale.
    #[arg(long, default_value_t = 0.5)]
    pub mutation_min: f64,

    /// Upper end of the dithered mutation scale (below 2).
    #[arg(long, default_value_t = 1.0)]
    pub mutation_max: f64,

    /// Crossover probability.
    #[arg(long, default_value_t = 0.7)]
    pub recombination: f64,

    /// Relative convergence tolerance.
    #[arg(long, default_value_t = 1e-8)]
    pub tol: f64,

    /// RNG seed for reproducible fits.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Exit with an error when the optimizer hits the generation cap.
    #[arg(long)]
    pub require_convergence: bool,
}

impl OptimizerArgs {
    pub fn to_config(&self) -> OptimizerConfig {
        OptimizerConfig {
            max_iterations: self.max_iterations,
            population_size: self.population_size,
            strategy: self.strategy,
            mutation: (self.mutation_min, self.mutation_max),
            recombination: self.recombination,
            tol: self.tol,
            seed: self.seed,
            ..OptimizerConfig::default()
        }
    }
}

/// Prediction grid and export options.
#[derive(Debug, Args, Clone)]
pub struct OutputArgs {
    /// Points in the exported prediction grid.
    #[arg(long = "grid", default_value_t = 100)]
    pub grid_points: usize,

    /// Decimal places in exported CSV values.
    #[arg(long, default_value_t = 6)]
    pub precision: usize,

    /// Export the predicted curve on the grid to CSV.
    #[arg(long, value_name = "CSV")]
    pub export: Option<PathBuf>,

    /// Export the fitted model (plus diagnostics) to JSON.
    #[arg(long = "export-model", value_name = "JSON")]
    pub export_model: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct FitArgs {
    #[command(flatten)]
    pub data: DataArgs,

    #[arg(long, value_enum)]
    pub model: ReleaseModel,

    /// Override one parameter's search range, e.g. `F_max=0:120`. Repeatable.
    #[arg(long = "bound", value_name = "NAME=MIN:MAX", value_parser = parse_bound)]
    pub bounds: Vec<(String, f64, f64)>,

    #[command(flatten)]
    pub optimizer: OptimizerArgs,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Debug, Args, Clone)]
pub struct SegmentArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// Interval boundary JSON (label -> time).
    #[arg(long, value_name = "JSON")]
    pub intervals: PathBuf,

    /// One model per interval, comma separated. A single model is reused for
    /// every interval.
    #[arg(long, value_enum, value_delimiter = ',', required = true)]
    pub models: Vec<ReleaseModel>,

    /// Override a search range for every interval whose model has the parameter.
    #[arg(long = "bound", value_name = "NAME=MIN:MAX", value_parser = parse_bound)]
    pub bounds: Vec<(String, f64, f64)>,

    /// Clock each segment's model sees.
    #[arg(long, value_enum, default_value_t = TimeOrigin::Absolute)]
    pub time_origin: TimeOrigin,

    #[command(flatten)]
    pub optimizer: OptimizerArgs,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Debug, Args, Clone)]
pub struct EvalArgs {
    /// Model JSON produced by `--export-model`.
    #[arg(long, value_name = "JSON")]
    pub model_file: PathBuf,

    /// Grid start; defaults to the first boundary.
    #[arg(long)]
    pub start: Option<f64>,

    /// Grid end; defaults to the last boundary.
    #[arg(long)]
    pub end: Option<f64>,

    #[arg(long = "grid", default_value_t = 100)]
    pub grid_points: usize,

    #[arg(long, default_value_t = 6)]
    pub precision: usize,

    #[arg(long, default_value_t = ',', value_parser = parse_delimiter)]
    pub delimiter: char,

    /// Write the evaluated curve here instead of printing it.
    #[arg(long, value_name = "CSV")]
    pub export: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct SimulateArgs {
    #[arg(long, value_enum)]
    pub model: ReleaseModel,

    /// Parameter value, e.g. `k_0=2`. Every model parameter is required.
    #[arg(long = "param", value_name = "NAME=VALUE", value_parser = parse_param, required = true)]
    pub params: Vec<(String, f64)>,

    #[arg(long, default_value_t = 0.0)]
    pub start: f64,

    #[arg(long)]
    pub end: f64,

    #[arg(long, default_value_t = 25)]
    pub points: usize,

    /// Standard deviation of the additive Gaussian noise.
    #[arg(long, default_value_t = 0.0)]
    pub noise: f64,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    #[arg(long, default_value_t = 6)]
    pub precision: usize,

    #[arg(long, default_value_t = ',', value_parser = parse_delimiter)]
    pub delimiter: char,

    #[arg(long, value_name = "CSV")]
    pub export: PathBuf,
}

/// Parse `NAME=MIN:MAX`.
pub fn parse_bound(s: &str) -> Result<(String, f64, f64), String> {
    let (name, range) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=MIN:MAX, got '{s}'"))?;
    let (min, max) = range
        .split_once(':')
        .ok_or_else(|| format!("expected MIN:MAX after '{name}=', got '{range}'"))?;
    let min = parse_number(min)?;
    let max = parse_number(max)?;
    Ok((name.trim().to_string(), min, max))
}

/// Parse `NAME=VALUE`.
pub fn parse_param(s: &str) -> Result<(String, f64), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{s}'"))?;
    Ok((name.trim().to_string(), parse_number(value)?))
}

fn parse_number(s: &str) -> Result<f64, String> {
    s.trim()
        .parse::<f64>()
        .map_err(|_| format!("invalid number '{}'", s.trim()))
}

fn parse_delimiter(s: &str) -> Result<char, String> {
    let s = if s == "\\t" || s.eq_ignore_ascii_case("tab") { "\t" } else { s };
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii() => Ok(c),
        _ => Err(format!("delimiter must be a single ASCII character, got '{s}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bound_and_param_flags() {
        assert_eq!(parse_bound("F_max=0:120"), Ok(("F_max".to_string(), 0.0, 120.0)));
        assert_eq!(parse_bound("T_lag=-2:2.5"), Ok(("T_lag".to_string(), -2.0, 2.5)));
        assert!(parse_bound("F_max=0").is_err());
        assert!(parse_bound("F_max").is_err());
        assert_eq!(parse_param("k_0=2"), Ok(("k_0".to_string(), 2.0)));
        assert!(parse_param("k_0=x").is_err());
    }

    #[test]
    fn parses_delimiters() {
        assert_eq!(parse_delimiter(";"), Ok(';'));
        assert_eq!(parse_delimiter("tab"), Ok('\t'));
        assert!(parse_delimiter(";;").is_err());
    }

    #[test]
    fn segment_command_parses_model_list() {
        let cli = Cli::try_parse_from([
            "dfit",
            "segment",
            "--data",
            "obs.csv",
            "--intervals",
            "iv.json",
            "--models",
            "zero-order,first-order-plateau",
            "--time-origin",
            "interval-start",
            "--strategy",
            "rand1bin",
            "-vv",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        let Command::Segment(args) = cli.command else {
            panic!("expected segment");
        };
        assert_eq!(
            args.models,
            vec![ReleaseModel::ZeroOrder, ReleaseModel::FirstOrderPlateau]
        );
        assert_eq!(args.time_origin, TimeOrigin::IntervalStart);
        assert_eq!(args.optimizer.strategy, Strategy::Rand1Bin);
    }

    #[test]
    fn mutation_range_flags_reach_the_optimizer() {
        let cli = Cli::try_parse_from([
            "dfit",
            "fit",
            "--data",
            "x.csv",
            "--model",
            "zero-order-lag",
            "--population-size",
            "50",
            "--mutation-min",
            "0.9",
            "--mutation-max",
            "1.8",
        ])
        .unwrap();
        let Command::Fit(args) = cli.command else {
            panic!("expected fit");
        };
        let config = args.optimizer.to_config();
        assert_eq!(config.population_size, 50);
        assert_eq!(config.mutation, (0.9, 1.8));
    }

    #[test]
    fn unknown_model_is_rejected_at_parse_time() {
        let res = Cli::try_parse_from(["dfit", "fit", "--data", "x.csv", "--model", "second-order"]);
        assert!(res.is_err());
    }
}
