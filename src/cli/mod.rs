//! Command-line parsing for the `ndfit` demo binary.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! search and reporting code. Engine flags are optional so that a `--config`
//! file can supply them and explicit flags still win.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::data::NoiseKind;
use crate::domain::{CostAggregate, SearchStrategy};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "ndfit", version, about = "N-dimensional derivative-free curve fitter")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit the Lorentzian dip model to a synthetic data set and print a summary.
    Fit(FitArgs),
    /// Run many jittered starts in parallel and report the ranked results.
    Multi(MultiArgs),
    /// Differentiate x^3 numerically and report the worst interior error.
    Derivative(DerivativeArgs),
}

/// Options shared by `fit` and `multi`.
#[derive(Debug, Args, Clone)]
pub struct FitArgs {
    /// Engine configuration JSON (keys of `FitConfig`); flags below override it.
    #[arg(long, value_name = "JSON")]
    pub config: Option<PathBuf>,

    /// Number of synthetic samples.
    #[arg(short = 'n', long, default_value_t = 1000)]
    pub points: usize,

    /// Lower end of the sample grid.
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub x_min: f64,

    /// Upper end of the sample grid.
    #[arg(long, default_value_t = 10.0, allow_negative_numbers = true)]
    pub x_max: f64,

    /// Noise added to the synthetic observations.
    #[arg(long, value_enum, default_value_t = NoiseKind::Uniform)]
    pub noise: NoiseKind,

    /// Noise half-width (uniform) or standard deviation (gaussian).
    #[arg(long, default_value_t = 0.1)]
    pub noise_amplitude: f64,

    /// Random seed for the synthetic data.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// True parameters used to generate the data (width, centre, baseline).
    #[arg(long, value_delimiter = ',', default_values_t = [2.0, 5.0, 6.0], allow_negative_numbers = true)]
    pub truth: Vec<f64>,

    /// Model constants (baseline scale, dip scale).
    #[arg(long, value_delimiter = ',', default_values_t = [1.0, 1.0], allow_negative_numbers = true)]
    pub constants: Vec<f64>,

    /// Initial parameter guess.
    #[arg(long, value_delimiter = ',', default_values_t = [4.0, 5.0, 4.0], allow_negative_numbers = true)]
    pub guess: Vec<f64>,

    /// Step size per parameter; a single value applies to every parameter.
    #[arg(long, value_delimiter = ',', default_values_t = [0.01])]
    pub step: Vec<f64>,

    /// Stop when one iteration improves the cost by less than this.
    #[arg(long)]
    pub convergence: Option<f64>,

    /// Maximum number of iterations.
    #[arg(long)]
    pub max_depth: Option<usize>,

    /// Enable or disable step throttling.
    #[arg(long)]
    pub throttle: Option<bool>,

    /// Throttle strength; a stalled step is divided by 1 + 0.01 * factor.
    #[arg(long)]
    pub throttle_factor: Option<f64>,

    /// Cost aggregate.
    #[arg(long, value_enum)]
    pub aggregate: Option<CostAggregate>,

    /// Move set used by each iteration.
    #[arg(long, value_enum)]
    pub strategy: Option<SearchStrategy>,

    /// Do not keep the per-iteration trace.
    #[arg(long)]
    pub no_trace: bool,

    /// Show the N data points with the largest residuals.
    #[arg(long, default_value_t = 5)]
    pub top: usize,

    /// Export the fit report to JSON.
    #[arg(long, value_name = "JSON")]
    pub export: Option<PathBuf>,

    /// Export observed vs fitted values to CSV.
    #[arg(long = "export-curve", value_name = "CSV")]
    pub export_curve: Option<PathBuf>,
}

/// Options for `multi`.
#[derive(Debug, Args, Clone)]
pub struct MultiArgs {
    #[command(flatten)]
    pub fit: FitArgs,

    /// Number of independent starts.
    #[arg(long, default_value_t = 16)]
    pub starts: usize,

    /// Half-width of the uniform jitter around `--guess`; a single value
    /// applies to every parameter.
    #[arg(long, value_delimiter = ',', default_values_t = [0.2])]
    pub spread: Vec<f64>,

    /// Random seed for the jittered guesses.
    #[arg(long, default_value_t = 7)]
    pub jitter_seed: u64,
}

/// Options for `derivative`.
#[derive(Debug, Args, Clone)]
pub struct DerivativeArgs {
    /// Number of grid points.
    #[arg(short = 'n', long, default_value_t = 2001)]
    pub points: usize,

    #[arg(long, default_value_t = -10.0, allow_negative_numbers = true)]
    pub x_min: f64,

    #[arg(long, default_value_t = 10.0, allow_negative_numbers = true)]
    pub x_max: f64,
}
