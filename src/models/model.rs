//! Model and error-function abstractions.
//!
//! The engine relies on two primitive operations:
//! - evaluate the model at one sample for a parameter vector (curves)
//! - compute the residual of one data point (cost)
//!
//! Plain closures implement both traits; types implementing them by hand can
//! additionally report a `DomainError` instead of returning a value.

use crate::domain::DataPoint;
use crate::error::{DomainError, FitError};

/// A parametric model `f(sample, params, constants)`.
pub trait Model {
    fn evaluate(&self, sample: &[f64], params: &[f64], constants: &[f64]) -> Result<f64, DomainError>;

    /// Number of parameters the model expects, when it is fixed.
    ///
    /// Runs check the initial guess against this before iterating.
    fn param_count(&self) -> Option<usize> {
        None
    }
}

impl<F> Model for F
where
    F: Fn(&[f64], &[f64], &[f64]) -> f64,
{
    fn evaluate(&self, sample: &[f64], params: &[f64], constants: &[f64]) -> Result<f64, DomainError> {
        Ok(self(sample, params, constants))
    }
}

/// Per-point error function whose aggregate the engine minimizes.
pub trait ErrorMetric {
    fn residual(&self, point: &DataPoint, params: &[f64], constants: &[f64]) -> Result<f64, DomainError>;
}

impl<F> ErrorMetric for F
where
    F: Fn(&DataPoint, &[f64], &[f64]) -> f64,
{
    fn residual(&self, point: &DataPoint, params: &[f64], constants: &[f64]) -> Result<f64, DomainError> {
        Ok(self(point, params, constants))
    }
}

/// The usual error function: `model(point.inputs) - point.observed`.
#[derive(Debug, Clone, Copy)]
pub struct ModelResidual<'m, M: ?Sized> {
    model: &'m M,
}

impl<'m, M: Model + ?Sized> ModelResidual<'m, M> {
    pub fn new(model: &'m M) -> Self {
        Self { model }
    }
}

impl<M: Model + ?Sized> ErrorMetric for ModelResidual<'_, M> {
    fn residual(&self, point: &DataPoint, params: &[f64], constants: &[f64]) -> Result<f64, DomainError> {
        Ok(self.model.evaluate(&point.inputs, params, constants)? - point.observed)
    }
}

/// Lorentzian dip on a constant baseline:
///
/// ```text
/// f(x) = c0·p2 − c1·p0² / (p0² + (x − p1)²)
/// ```
///
/// `p0` is the half width, `p1` the centre, `p2` the baseline. Missing
/// constants default to `1.0`. The value is undefined (0/0) when `p0 = 0` and
/// `x = p1`; that case is reported as a `DomainError`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LorentzianDip;

impl Model for LorentzianDip {
    fn evaluate(&self, sample: &[f64], params: &[f64], constants: &[f64]) -> Result<f64, DomainError> {
        let (Some(&x), [p0, p1, p2]) = (sample.first(), params) else {
            return Err(DomainError::new(format!(
                "Lorentzian dip expects 1 input and 3 parameters, got {} and {}",
                sample.len(),
                params.len()
            )));
        };
        let c0 = constants.first().copied().unwrap_or(1.0);
        let c1 = constants.get(1).copied().unwrap_or(1.0);

        let width2 = p0 * p0;
        let denom = width2 + (x - p1) * (x - p1);
        if denom == 0.0 {
            return Err(DomainError::new(format!(
                "Lorentzian dip is undefined at x={x} for zero width"
            )));
        }
        Ok(c0 * p2 - c1 * width2 / denom)
    }

    fn param_count(&self) -> Option<usize> {
        Some(3)
    }
}

/// Re-evaluate `model` at `params` for each sample.
///
/// The output has one value per sample, in order. Values are returned as the
/// model produced them; only an explicit `DomainError` fails the call.
pub fn build_curve<M, S>(
    model: &M,
    params: &[f64],
    constants: &[f64],
    samples: &[S],
) -> Result<Vec<f64>, FitError>
where
    M: Model + ?Sized,
    S: AsRef<[f64]>,
{
    samples
        .iter()
        .enumerate()
        .map(|(sample, xs)| {
            model
                .evaluate(xs.as_ref(), params, constants)
                .map_err(|source| FitError::Curve { sample, source })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closures_act_as_models_and_metrics() {
        let line = |x: &[f64], p: &[f64], _c: &[f64]| p[0] + p[1] * x[0];
        assert_eq!(line.evaluate(&[2.0], &[1.0, 3.0], &[]).unwrap(), 7.0);

        let metric = |pt: &DataPoint, p: &[f64], _c: &[f64]| p[0] - pt.observed;
        let point = DataPoint::scalar(0.0, 4.0);
        assert_eq!(metric.residual(&point, &[5.0], &[]).unwrap(), 1.0);
    }

    #[test]
    fn model_residual_subtracts_observation() {
        let metric = ModelResidual::new(&LorentzianDip);
        let point = DataPoint::scalar(5.0, 4.0);
        // At the centre the dip is exactly c1, so f = p2 - 1.
        let r = metric.residual(&point, &[2.0, 5.0, 6.0], &[]).unwrap();
        assert!((r - 1.0).abs() < 1e-12);
    }

    #[test]
    fn lorentzian_uses_constants_and_reports_singularity() {
        let v = LorentzianDip.evaluate(&[5.0], &[2.0, 5.0, 6.0], &[2.0, 3.0]).unwrap();
        assert!((v - 9.0).abs() < 1e-12);

        let err = LorentzianDip.evaluate(&[5.0], &[0.0, 5.0, 6.0], &[]).unwrap_err();
        assert!(err.message().contains("undefined"));

        assert!(LorentzianDip.evaluate(&[5.0], &[1.0, 2.0], &[]).is_err());
    }

    #[test]
    fn build_curve_is_pointwise_reevaluation() {
        let samples = vec![vec![0.0], vec![2.5], vec![5.0]];
        let params = [2.0, 5.0, 6.0];
        let curve = build_curve(&LorentzianDip, &params, &[], &samples).unwrap();

        assert_eq!(curve.len(), samples.len());
        for (s, y) in samples.iter().zip(curve.iter()) {
            assert_eq!(*y, LorentzianDip.evaluate(s, &params, &[]).unwrap());
        }
    }

    #[test]
    fn build_curve_reports_failing_sample_index() {
        let samples = [[1.0], [5.0]];
        let err = build_curve(&LorentzianDip, &[0.0, 5.0, 6.0], &[], &samples).unwrap_err();
        assert!(matches!(err, FitError::Curve { sample: 1, .. }));
    }
}
