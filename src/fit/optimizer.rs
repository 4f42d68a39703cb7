//! Bounded global minimization by differential evolution.
//!
//! The fitter only relies on the [`BoundedOptimizer`] contract: minimize an
//! objective over an axis-aligned box and return a candidate inside it.
//! [`DifferentialEvolution`] is the implementation we ship.
//!
//! Algorithm outline (per generation):
//! - one mutation scale `F` is drawn from the dither range
//! - each member gets a mutant (`best1`, `rand1` or `currenttobest1`) and a
//!   binomial crossover with at least one component from the mutant
//! - trial components that leave the box are redrawn uniformly inside it
//! - all trials are scored in parallel, then each replaces its parent when it
//!   is no worse (deferred updating)
//!
//! The population lives in unit space `[0, 1]^d` and is mapped onto the box
//! only for scoring, so a pinned parameter (`min == max`) never moves.
//!
//! Trials are generated sequentially from one seeded RNG and selection happens
//! after the parallel scoring, so a fixed seed gives a fixed result no matter
//! how many threads rayon uses.

use clap::ValueEnum;
use log::{debug, warn};
use rand::prelude::*;
use rand::rngs::StdRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::domain::Bounds;
use crate::error::FitError;
use crate::math::mean_std;

/// Smallest population that still leaves three distinct donors per member.
pub const MIN_POPULATION: usize = 5;

/// Mutation strategy (all with binomial crossover).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// `v = best + F·(r0 − r1)`
    #[default]
    #[value(name = "best1bin")]
    Best1Bin,
    /// `v = r0 + F·(r1 − r2)`
    #[value(name = "rand1bin")]
    Rand1Bin,
    /// `v = x + F·(best − x) + F·(r0 − r1)`
    #[value(name = "currenttobest1bin")]
    CurrentToBest1Bin,
}

/// Optimizer knobs. None of them affect correctness, only search effort.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizerConfig {
    /// Generation cap.
    pub max_iterations: usize,
    /// Number of population members (not a per-dimension multiplier).
    pub population_size: usize,
    pub strategy: Strategy,
    /// Dither range for the mutation scale `F`; equal ends disable dithering.
    pub mutation: (f64, f64),
    /// Crossover probability `CR`.
    pub recombination: f64,
    /// Relative convergence tolerance on the spread of population energies.
    pub tol: f64,
    /// Absolute convergence tolerance on the spread of population energies.
    pub atol: f64,
    /// RNG seed; `None` seeds from OS entropy.
    pub seed: Option<u64>,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            population_size: 40,
            strategy: Strategy::Best1Bin,
            mutation: (0.5, 1.0),
            recombination: 0.7,
            tol: 1e-8,
            atol: 1e-12,
            seed: None,
        }
    }
}

impl OptimizerConfig {
    pub fn validate(&self) -> Result<(), FitError> {
        if self.population_size < MIN_POPULATION {
            return Err(FitError::InvalidInput(format!(
                "population size must be >= {MIN_POPULATION}, got {}",
                self.population_size
            )));
        }
        if self.max_iterations == 0 {
            return Err(FitError::InvalidInput("max iterations must be >= 1".into()));
        }
        let (lo, hi) = self.mutation;
        if !(lo.is_finite() && hi.is_finite() && 0.0 <= lo && lo <= hi && hi < 2.0) {
            return Err(FitError::InvalidInput(format!(
                "mutation range must satisfy 0 <= lo <= hi < 2, got ({lo}, {hi})"
            )));
        }
        if !(0.0..=1.0).contains(&self.recombination) {
            return Err(FitError::InvalidInput(format!(
                "recombination must be in [0, 1], got {}",
                self.recombination
            )));
        }
        if !(self.tol >= 0.0 && self.atol >= 0.0) {
            return Err(FitError::InvalidInput("tolerances must be >= 0".into()));
        }
        Ok(())
    }
}

/// What a bounded minimization returns.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizeOutcome {
    /// Best candidate found, inside the bounds.
    pub x: Vec<f64>,
    /// Objective value at `x` (`+∞` if no finite value was ever seen).
    pub fun: f64,
    /// Whether the convergence tolerance was met before the generation cap.
    pub converged: bool,
    pub generations: usize,
    pub evaluations: usize,
}

/// Minimize an objective over an axis-aligned box.
///
/// Implementations must return `x` componentwise within `bounds`.
pub trait BoundedOptimizer {
    fn minimize<F>(&self, objective: F, bounds: &Bounds) -> Result<OptimizeOutcome, FitError>
    where
        F: Fn(&[f64]) -> f64 + Sync;
}

/// Differential evolution over a [`Bounds`] box.
#[derive(Debug, Clone, Default)]
pub struct DifferentialEvolution {
    pub config: OptimizerConfig,
}

impl DifferentialEvolution {
    pub fn new(config: OptimizerConfig) -> Self {
        Self { config }
    }
}

impl BoundedOptimizer for DifferentialEvolution {
    fn minimize<F>(&self, objective: F, bounds: &Bounds) -> Result<OptimizeOutcome, FitError>
    where
        F: Fn(&[f64]) -> f64 + Sync,
    {
        let cfg = &self.config;
        cfg.validate()?;
        bounds.validate()?;
        let dim = bounds.len();
        if dim == 0 {
            return Err(FitError::InvalidInput("nothing to optimize: bounds are empty".into()));
        }

        let lower: Vec<f64> = bounds.entries().iter().map(|b| b.min).collect();
        let width: Vec<f64> = bounds.entries().iter().map(|b| b.width()).collect();
        let to_box = |u: &[f64]| -> Vec<f64> {
            let mut x: Vec<f64> = u
                .iter()
                .zip(lower.iter().zip(&width))
                .map(|(&u, (&lo, &w))| lo + u * w)
                .collect();
            // Rounding in `lo + u·w` can land one ulp outside the box.
            bounds.clamp(&mut x);
            x
        };
        let score = |u: &[f64]| -> f64 {
            let e = objective(&to_box(u));
            if e.is_finite() { e } else { f64::INFINITY }
        };

        let mut rng = match cfg.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let np = cfg.population_size;

        let mut population = latin_hypercube(np, dim, &mut rng);
        let mut energies: Vec<f64> = population.par_iter().map(|u| score(u.as_slice())).collect();
        let mut evaluations = np;
        let mut best = argmin(&energies);

        let mut converged = has_converged(&energies, cfg.tol, cfg.atol);
        let mut generations = 0usize;

        while !converged && generations < cfg.max_iterations {
            generations += 1;

            let (lo, hi) = cfg.mutation;
            let f = if hi > lo { rng.gen_range(lo..hi) } else { lo };

            let trials: Vec<Vec<f64>> = (0..np)
                .map(|i| {
                    let [r0, r1, r2] = pick_donors(np, i, &mut rng);
                    let (x, b) = (&population[i], &population[best]);
                    let mutant: Vec<f64> = (0..dim)
                        .map(|j| match cfg.strategy {
                            Strategy::Best1Bin => b[j] + f * (population[r0][j] - population[r1][j]),
                            Strategy::Rand1Bin => {
                                population[r0][j] + f * (population[r1][j] - population[r2][j])
                            }
                            Strategy::CurrentToBest1Bin => {
                                x[j] + f * (b[j] - x[j]) + f * (population[r0][j] - population[r1][j])
                            }
                        })
                        .collect();

                    let forced = rng.gen_range(0..dim);
                    (0..dim)
                        .map(|j| {
                            let v = if j == forced || rng.gen_bool(cfg.recombination) {
                                mutant[j]
                            } else {
                                x[j]
                            };
                            if (0.0..=1.0).contains(&v) { v } else { rng.r#gen::<f64>() }
                        })
                        .collect()
                })
                .collect();

            let trial_energies: Vec<f64> = trials.par_iter().map(|u| score(u.as_slice())).collect();
            evaluations += np;

            for (i, (trial, e)) in trials.into_iter().zip(trial_energies).enumerate() {
                if e <= energies[i] {
                    population[i] = trial;
                    energies[i] = e;
                }
            }
            best = argmin(&energies);
            converged = has_converged(&energies, cfg.tol, cfg.atol);
        }

        let x = to_box(population[best].as_slice());
        let fun = energies[best];
        if converged {
            debug!(
                "differential evolution converged after {generations} generation(s), f={fun:.6e}"
            );
        } else {
            warn!(
                "differential evolution hit the cap of {} generation(s) without converging, f={fun:.6e}",
                cfg.max_iterations
            );
        }

        Ok(OptimizeOutcome {
            x,
            fun,
            converged,
            generations,
            evaluations,
        })
    }
}

/// Stratified initial population: each dimension is cut into `n` equal
/// strata and every stratum receives exactly one member.
fn latin_hypercube(n: usize, dim: usize, rng: &mut StdRng) -> Vec<Vec<f64>> {
    let mut pop = vec![vec![0.0; dim]; n];
    let mut strata: Vec<usize> = (0..n).collect();
    for j in 0..dim {
        strata.shuffle(rng);
        for (member, &s) in pop.iter_mut().zip(&strata) {
            member[j] = (s as f64 + rng.r#gen::<f64>()) / n as f64;
        }
    }
    pop
}

/// Three distinct population indices, all different from `exclude`.
fn pick_donors(n: usize, exclude: usize, rng: &mut StdRng) -> [usize; 3] {
    let mut out = [0usize; 3];
    let mut k = 0;
    while k < 3 {
        let r = rng.gen_range(0..n);
        if r != exclude && !out[..k].contains(&r) {
            out[k] = r;
            k += 1;
        }
    }
    out
}

fn argmin(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate().skip(1) {
        if v < values[best] {
            best = i;
        }
    }
    best
}

/// `std(E) <= atol + tol·|mean(E)|`, over a fully finite population.
fn has_converged(energies: &[f64], tol: f64, atol: f64) -> bool {
    if energies.iter().any(|e| !e.is_finite()) {
        return false;
    }
    match mean_std(energies) {
        Some((mean, std)) => std <= atol + tol * mean.abs(),
        None => false,
    }
}
