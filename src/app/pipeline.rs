//! Shared "fit pipeline" logic used by the `fit` and `multi` commands.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! synthetic data -> search -> curve -> residuals
//!
//! The command handlers can then focus on presentation and exports.

use std::path::PathBuf;

use crate::data::{Noise, generate_dataset, linspace};
use crate::domain::DataSet;
use crate::error::AppError;
use crate::fit::{FitConfig, FitResult, StartOutcome, best_of, jitter_guesses, run_many};
use crate::models::{LorentzianDip, ModelResidual};
use crate::report::{PointResidual, compute_residuals, largest_residuals};

/// The model every demo command fits.
pub static MODEL: LorentzianDip = LorentzianDip;

/// Fully resolved settings for one `ndfit fit` / `ndfit multi` invocation.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub engine: FitConfig,
    pub points: usize,
    pub x_min: f64,
    pub x_max: f64,
    pub noise: Noise,
    pub seed: u64,
    pub truth: Vec<f64>,
    pub constants: Vec<f64>,
    pub guess: Vec<f64>,
    /// One step per parameter (already broadcast).
    pub steps: Vec<f64>,
    pub top_n: usize,
    pub export: Option<PathBuf>,
    pub export_curve: Option<PathBuf>,
}

/// Outputs of a single fit.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub data: DataSet,
    pub result: FitResult<'static, LorentzianDip>,
    pub fitted: Vec<f64>,
    pub worst: Vec<PointResidual>,
}

/// Outputs of a multi-start batch.
#[derive(Debug)]
pub struct MultiOutput {
    pub data: DataSet,
    pub outcomes: Vec<StartOutcome<'static, LorentzianDip>>,
}

impl MultiOutput {
    pub fn best(&self) -> Option<&FitResult<'static, LorentzianDip>> {
        best_of(&self.outcomes).and_then(|o| o.result.as_ref().ok())
    }
}

/// Sample the demo model at the true parameters, with seeded noise.
pub fn demo_dataset(config: &RunConfig) -> Result<DataSet, AppError> {
    if !(config.x_min.is_finite() && config.x_max.is_finite() && config.x_max > config.x_min) {
        return Err(AppError::new(2, "Invalid sample range (need finite x_min < x_max)."));
    }
    let xs = linspace(config.x_min, config.x_max, config.points);
    Ok(generate_dataset(
        &MODEL,
        &config.truth,
        &config.constants,
        &xs,
        config.noise,
        config.seed,
    )?)
}

/// Generate data, run one fit and compute residuals.
pub fn run_fit(config: &RunConfig) -> Result<RunOutput, AppError> {
    let data = demo_dataset(config)?;
    let metric = ModelResidual::new(&MODEL);

    let result = crate::fit::run(
        &MODEL,
        &metric,
        &data,
        &config.guess,
        &config.constants,
        &config.steps,
        &config.engine,
    )?;

    let fitted = result.build_curve(&data.samples())?;
    let residuals = compute_residuals(&data, &fitted)?;
    let worst = largest_residuals(&residuals, config.top_n);

    Ok(RunOutput {
        data,
        result,
        fitted,
        worst,
    })
}

/// Generate data once and fit it from `starts` jittered guesses in parallel.
pub fn run_multi(
    config: &RunConfig,
    starts: usize,
    spread: &[f64],
    jitter_seed: u64,
) -> Result<MultiOutput, AppError> {
    if starts == 0 {
        return Err(AppError::new(2, "Need at least one start."));
    }
    let data = demo_dataset(config)?;
    let metric = ModelResidual::new(&MODEL);
    let guesses = jitter_guesses(&config.guess, spread, starts, jitter_seed)?;

    let outcomes = run_many(
        &MODEL,
        &metric,
        &data,
        &guesses,
        &config.constants,
        &config.steps,
        &config.engine,
    );

    Ok(MultiOutput { data, outcomes })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> RunConfig {
        RunConfig {
            engine: FitConfig::new(0.04, 1000, 60.0).unwrap().with_throttle(true),
            points: 200,
            x_min: 0.0,
            x_max: 10.0,
            noise: Noise::uniform(0.1),
            seed: 42,
            truth: vec![2.0, 5.0, 6.0],
            constants: vec![1.0, 1.0],
            guess: vec![4.0, 5.0, 4.0],
            steps: vec![0.01; 3],
            top_n: 3,
            export: None,
            export_curve: None,
        }
    }

    #[test]
    fn run_fit_produces_consistent_outputs() {
        let out = run_fit(&small_config()).unwrap();
        assert_eq!(out.fitted.len(), out.data.len());
        assert_eq!(out.worst.len(), 3);
        assert!(out.result.final_entropy() < out.result.initial_entropy());
    }

    #[test]
    fn bad_range_is_a_config_error() {
        let mut config = small_config();
        config.x_max = config.x_min;
        assert_eq!(run_fit(&config).unwrap_err().exit_code(), 2);
    }

    #[test]
    fn dimension_errors_surface_with_their_exit_code() {
        let mut config = small_config();
        config.steps = vec![0.01; 2];
        assert_eq!(run_fit(&config).unwrap_err().exit_code(), 3);
    }

    #[test]
    fn run_multi_keeps_start_order() {
        let out = run_multi(&small_config(), 4, &[0.2, 0.2, 0.2], 7).unwrap();
        assert_eq!(out.outcomes.len(), 4);
        for (i, o) in out.outcomes.iter().enumerate() {
            assert_eq!(o.index, i);
        }
        assert!(out.best().is_some());
        assert_eq!(run_multi(&small_config(), 0, &[0.2; 3], 7).unwrap_err().exit_code(), 2);
    }
}
