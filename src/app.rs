//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - initialises logging
//! - parses CLI arguments
//! - resolves the run configuration (config file + flags)
//! - runs the fit(s) and prints reports
//! - writes optional exports

use std::fs::File;
use std::path::Path;

use clap::Parser;
use env_logger::{Builder, Env};
use log::info;

use crate::cli::{Command, DerivativeArgs, FitArgs, MultiArgs};
use crate::data::{Noise, NoiseKind, linspace};
use crate::error::AppError;
use crate::fit::FitConfig;

pub mod pipeline;

pub use pipeline::RunConfig;

/// Environment variable holding the log filter (`env_logger` syntax).
pub const NDFIT_LOG: &str = "NDFIT_LOG";

/// Entry point for the `ndfit` binary.
pub fn run() -> Result<(), AppError> {
    init_logging();
    let cli = crate::cli::Cli::parse();

    match cli.command {
        Command::Fit(args) => handle_fit(args),
        Command::Multi(args) => handle_multi(args),
        Command::Derivative(args) => handle_derivative(args),
    }
}

fn init_logging() {
    let env = Env::new().filter_or(NDFIT_LOG, "info");
    let mut builder = Builder::from_env(env);
    let builder = builder.target(env_logger::Target::Stderr);
    builder.try_init().ok();
}

fn handle_fit(args: FitArgs) -> Result<(), AppError> {
    let config = fit_config_from_args(&args)?;
    let run = pipeline::run_fit(&config)?;

    println!("{}", crate::report::format_fit_summary(&run.result, Some(config.truth.as_slice())));
    if !run.worst.is_empty() {
        println!("Largest residuals:");
        println!("{}", crate::report::format_residual_table(&run.worst));
    }

    if let Some(path) = &config.export {
        crate::io::export::write_report_json(path, &run.result.to_report())?;
        info!("wrote report to {}", path.display());
    }
    if let Some(path) = &config.export_curve {
        crate::io::curve::write_curve_csv(path, &run.data, &run.fitted)?;
        info!("wrote curve to {}", path.display());
    }

    Ok(())
}

fn handle_multi(args: MultiArgs) -> Result<(), AppError> {
    let config = fit_config_from_args(&args.fit)?;
    let spread = broadcast("spread", &args.spread, config.guess.len())?;
    let out = pipeline::run_multi(&config, args.starts, &spread, args.jitter_seed)?;

    println!("{}", crate::report::format_multistart_table(&out.outcomes));

    let best = out
        .best()
        .ok_or_else(|| AppError::new(4, "Every start failed; no fit to report."))?;
    println!("Best start:");
    println!("{}", crate::report::format_fit_summary(best, Some(config.truth.as_slice())));

    if let Some(path) = &config.export {
        crate::io::export::write_report_json(path, &best.to_report())?;
        info!("wrote report to {}", path.display());
    }
    if let Some(path) = &config.export_curve {
        let fitted = best.build_curve(&out.data.samples())?;
        crate::io::curve::write_curve_csv(path, &out.data, &fitted)?;
        info!("wrote curve to {}", path.display());
    }

    Ok(())
}

fn handle_derivative(args: DerivativeArgs) -> Result<(), AppError> {
    if !(args.x_min.is_finite() && args.x_max.is_finite() && args.x_max > args.x_min) {
        return Err(AppError::new(2, "Invalid grid range (need finite x_min < x_max)."));
    }
    let xs = linspace(args.x_min, args.x_max, args.points);
    let ys: Vec<f64> = xs.iter().map(|x| x * x * x).collect();
    let d = crate::math::derivative(&ys, &xs)?;

    let interior = 1..xs.len().saturating_sub(1);
    let (worst_i, worst_err) = interior
        .map(|i| (i, (d[i] - 3.0 * xs[i] * xs[i]).abs()))
        .fold((0, 0.0_f64), |acc, cur| if cur.1 > acc.1 { cur } else { acc });

    println!("d/dx x^3 on [{}, {}] with {} points", args.x_min, args.x_max, xs.len());
    println!("max interior |error| = {worst_err:.3e} at x = {:.6}", xs[worst_i]);
    Ok(())
}

/// Resolve CLI arguments (and an optional engine config file) into a run config.
///
/// Without `--config` the engine starts from the demo settings
/// (convergence 0.04, depth 1000, throttling on with factor 60).
pub fn fit_config_from_args(args: &FitArgs) -> Result<RunConfig, AppError> {
    let mut engine = match &args.config {
        Some(path) => read_fit_config(path)?,
        None => FitConfig::new(0.04, 1000, 60.0)?.with_throttle(true),
    };

    if let Some(v) = args.convergence {
        engine = engine.with_convergence_threshold(v)?;
    }
    if let Some(v) = args.max_depth {
        engine = engine.with_max_depth(v)?;
    }
    if let Some(v) = args.throttle_factor {
        engine = engine.with_throttle_factor(v)?;
    }
    if let Some(v) = args.throttle {
        engine = engine.with_throttle(v);
    }
    if let Some(v) = args.aggregate {
        engine = engine.with_aggregate(v);
    }
    if let Some(v) = args.strategy {
        engine = engine.with_strategy(v);
    }
    if args.no_trace {
        engine = engine.with_retain_trace(false);
    }

    let noise = match args.noise {
        NoiseKind::None => Noise::none(),
        NoiseKind::Uniform => Noise::uniform(args.noise_amplitude),
        NoiseKind::Gaussian => Noise::gaussian(args.noise_amplitude),
    };

    Ok(RunConfig {
        engine,
        points: args.points,
        x_min: args.x_min,
        x_max: args.x_max,
        noise,
        seed: args.seed,
        truth: args.truth.clone(),
        constants: args.constants.clone(),
        guess: args.guess.clone(),
        steps: broadcast("step", &args.step, args.guess.len())?,
        top_n: args.top,
        export: args.export.clone(),
        export_curve: args.export_curve.clone(),
    })
}

/// Load an engine config from JSON; missing keys take their defaults.
pub fn read_fit_config(path: &Path) -> Result<FitConfig, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open config JSON '{}': {e}", path.display())))?;
    serde_json::from_reader(file).map_err(|e| AppError::new(2, format!("Invalid config JSON: {e}")))
}

/// Repeat a single value `n` times; otherwise require exactly `n` values.
fn broadcast(name: &str, values: &[f64], n: usize) -> Result<Vec<f64>, AppError> {
    match values {
        [v] => Ok(vec![*v; n]),
        _ if values.len() == n => Ok(values.to_vec()),
        _ => Err(AppError::new(
            3,
            format!("Expected 1 or {n} {name} values, got {}.", values.len()),
        )),
    }
}
