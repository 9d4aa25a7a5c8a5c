//! Error types.
//!
//! - `FitError`, `DomainError`, `MathError`: typed library errors
//! - `AppError`: what the `ndfit` binary reports (message + process exit code)

use thiserror::Error;

use crate::data::SampleError;
use crate::fit::ConfigError;

/// Failure raised by a caller-supplied model or error function.
///
/// Closures that return a plain `f64` never construct this directly; a
/// non-finite value is converted into a `DomainError` by the cost evaluator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct DomainError {
    message: String,
}

impl DomainError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The function produced NaN or an infinity (division by zero, `ln(-1)`, ...).
    pub fn non_finite(value: f64) -> Self {
        Self::new(format!("function returned a non-finite value ({value})"))
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Errors produced while setting up or running a fit.
///
/// All of these are local to one run: nothing here affects sibling runs of a
/// multi-start batch.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FitError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Inconsistent vector lengths or unusable inputs, detected before the
    /// first iteration.
    #[error("dimension error: {0}")]
    Dimension(String),

    /// The model or error function failed while the search was running.
    #[error("evaluation failed at iteration {iteration} (data point {point}): {source}")]
    Evaluation {
        iteration: usize,
        point: usize,
        #[source]
        source: DomainError,
    },

    /// The model failed while rebuilding a curve from fitted parameters.
    #[error("curve evaluation failed at sample {sample}: {source}")]
    Curve {
        sample: usize,
        #[source]
        source: DomainError,
    },

    /// The entropy trace was requested from a run that did not retain it.
    #[error("entropy trace was not retained (run used retain_trace = false)")]
    State,
}

impl FitError {
    pub(crate) fn dimension(message: impl Into<String>) -> Self {
        FitError::Dimension(message.into())
    }
}

/// Errors from the standalone numeric helpers in `crate::math`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MathError {
    #[error("sequences must have the same length (left={left}, right={right})")]
    LengthMismatch { left: usize, right: usize },

    #[error("at least {min} samples are required, got {len}")]
    TooShort { len: usize, min: usize },

    #[error("zero x-spacing in the difference stencil at index {index}")]
    ZeroSpacing { index: usize },
}

impl MathError {
    /// `true` for the length-related variants (the "dimension" errors).
    pub fn is_dimension(&self) -> bool {
        matches!(self, MathError::LengthMismatch { .. } | MathError::TooShort { .. })
    }
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::new(2, format!("Invalid fit configuration: {err}"))
    }
}

impl From<FitError> for AppError {
    fn from(err: FitError) -> Self {
        let exit_code = match &err {
            FitError::Config(_) => 2,
            FitError::Dimension(_) => 3,
            FitError::Evaluation { .. } | FitError::Curve { .. } => 4,
            FitError::State => 5,
        };
        AppError::new(exit_code, err.to_string())
    }
}

impl From<MathError> for AppError {
    fn from(err: MathError) -> Self {
        AppError::new(3, err.to_string())
    }
}

impl From<SampleError> for AppError {
    fn from(err: SampleError) -> Self {
        match err {
            SampleError::Fit(inner) => inner.into(),
            SampleError::NonFinite { .. } => AppError::new(4, err.to_string()),
            SampleError::Amplitude(_) | SampleError::EmptyGrid => {
                AppError::new(2, format!("Invalid sample settings: {err}"))
            }
        }
    }
}
