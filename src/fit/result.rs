//! Outcome of one fitting run.

use chrono::Local;

use crate::domain::{FitReport, Termination};
use crate::error::FitError;
use crate::fit::FitConfig;
use crate::models::{Model, build_curve};

/// Final state of a run: parameters, cost and (optionally) its history.
///
/// A `FitResult` is created once when the run stops and is read-only after
/// that. It borrows the model so that curves can be rebuilt from the fitted
/// parameters without the original data.
pub struct FitResult<'m, M: ?Sized> {
    model: &'m M,
    constants: Vec<f64>,
    config: FitConfig,
    parameters: Vec<f64>,
    initial_entropy: f64,
    final_entropy: f64,
    termination: Termination,
    iterations: usize,
    evaluations: usize,
    trace: Option<Vec<f64>>,
    parameter_trace: Option<Vec<Vec<f64>>>,
}

/// Everything the engine hands over when a run stops.
pub(crate) struct FinalState {
    pub parameters: Vec<f64>,
    pub initial_entropy: f64,
    pub final_entropy: f64,
    pub termination: Termination,
    pub iterations: usize,
    pub evaluations: usize,
    pub trace: Option<Vec<f64>>,
    pub parameter_trace: Option<Vec<Vec<f64>>>,
}

impl<'m, M: ?Sized> FitResult<'m, M> {
    pub(crate) fn new(model: &'m M, constants: &[f64], config: FitConfig, state: FinalState) -> Self {
        Self {
            model,
            constants: constants.to_vec(),
            config,
            parameters: state.parameters,
            initial_entropy: state.initial_entropy,
            final_entropy: state.final_entropy,
            termination: state.termination,
            iterations: state.iterations,
            evaluations: state.evaluations,
            trace: state.trace,
            parameter_trace: state.parameter_trace,
        }
    }

    /// `(final_entropy, final_parameters)`.
    pub fn result(&self) -> (f64, &[f64]) {
        (self.final_entropy, &self.parameters)
    }

    pub fn final_entropy(&self) -> f64 {
        self.final_entropy
    }

    pub fn parameters(&self) -> &[f64] {
        &self.parameters
    }

    /// Cost at the initial guess (iteration 0).
    pub fn initial_entropy(&self) -> f64 {
        self.initial_entropy
    }

    pub fn constants(&self) -> &[f64] {
        &self.constants
    }

    pub fn config(&self) -> &FitConfig {
        &self.config
    }

    pub fn termination(&self) -> Termination {
        self.termination
    }

    pub fn is_converged(&self) -> bool {
        self.termination == Termination::Converged
    }

    /// Completed iterations; never more than `config().max_depth()`.
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Number of cost evaluations, including the initial one.
    pub fn evaluations(&self) -> usize {
        self.evaluations
    }

    /// Entropy after each iteration, or `None` if the run did not retain it.
    pub fn entropy_trace(&self) -> Option<&[f64]> {
        self.trace.as_deref()
    }

    /// Like [`entropy_trace`](Self::entropy_trace), but a missing trace is an
    /// error.
    ///
    /// # Errors
    ///
    /// Returns [`FitError::State`] if the run used `retain_trace = false`.
    pub fn require_entropy_trace(&self) -> Result<&[f64], FitError> {
        self.entropy_trace().ok_or(FitError::State)
    }

    /// Accepted parameter vector after each iteration (retained runs only).
    pub fn parameter_trace(&self) -> Option<&[Vec<f64>]> {
        self.parameter_trace.as_deref()
    }

    pub fn into_parameters(self) -> Vec<f64> {
        self.parameters
    }

    /// Serializable summary of this result.
    pub fn to_report(&self) -> FitReport {
        FitReport {
            tool: "ndfit".to_string(),
            generated: Local::now(),
            termination: self.termination,
            iterations: self.iterations,
            initial_entropy: self.initial_entropy,
            final_entropy: self.final_entropy,
            parameters: self.parameters.clone(),
            constants: self.constants.clone(),
            config: self.config,
            entropy_trace: self.trace.clone(),
        }
    }
}

impl<M: Model + ?Sized> FitResult<'_, M> {
    /// Evaluate the fitted model at each sample.
    ///
    /// `build_curve(&[s])[0]` equals `model(s, parameters, constants)` exactly.
    pub fn build_curve<S: AsRef<[f64]>>(&self, samples: &[S]) -> Result<Vec<f64>, FitError> {
        build_curve(self.model, &self.parameters, &self.constants, samples)
    }

    /// Convenience for one-dimensional models.
    pub fn build_curve_1d(&self, xs: &[f64]) -> Result<Vec<f64>, FitError> {
        let samples: Vec<[f64; 1]> = xs.iter().map(|&x| [x]).collect();
        self.build_curve(&samples)
    }
}

impl<M: ?Sized> Clone for FitResult<'_, M> {
    fn clone(&self) -> Self {
        Self {
            model: self.model,
            constants: self.constants.clone(),
            config: self.config,
            parameters: self.parameters.clone(),
            initial_entropy: self.initial_entropy,
            final_entropy: self.final_entropy,
            termination: self.termination,
            iterations: self.iterations,
            evaluations: self.evaluations,
            trace: self.trace.clone(),
            parameter_trace: self.parameter_trace.clone(),
        }
    }
}

impl<M: ?Sized> std::fmt::Debug for FitResult<'_, M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FitResult")
            .field("termination", &self.termination)
            .field("iterations", &self.iterations)
            .field("final_entropy", &self.final_entropy)
            .field("parameters", &self.parameters)
            .field("trace_len", &self.trace.as_ref().map(Vec::len))
            .finish_non_exhaustive()
    }
}
