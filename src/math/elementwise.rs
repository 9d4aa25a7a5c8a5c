//! Element-wise arithmetic on equal-length sequences.
//!
//! Handy for building residual vectors and composite curves out of
//! `build_curve` outputs. Inputs are lifted into `nalgebra::DVector` so the
//! arithmetic uses nalgebra's component-wise operations.

use nalgebra::DVector;

use crate::error::MathError;

pub fn product(a: &[f64], b: &[f64]) -> Result<Vec<f64>, MathError> {
    let (a, b) = lift(a, b)?;
    Ok(a.component_mul(&b).as_slice().to_vec())
}

/// `a[i] / b[i]`. Division by zero follows IEEE rules (`inf` or `NaN`).
pub fn quotient(a: &[f64], b: &[f64]) -> Result<Vec<f64>, MathError> {
    let (a, b) = lift(a, b)?;
    Ok(a.component_div(&b).as_slice().to_vec())
}

pub fn sum(a: &[f64], b: &[f64]) -> Result<Vec<f64>, MathError> {
    let (a, b) = lift(a, b)?;
    Ok((a + b).as_slice().to_vec())
}

pub fn difference(a: &[f64], b: &[f64]) -> Result<Vec<f64>, MathError> {
    let (a, b) = lift(a, b)?;
    Ok((a - b).as_slice().to_vec())
}

fn lift(a: &[f64], b: &[f64]) -> Result<(DVector<f64>, DVector<f64>), MathError> {
    if a.len() != b.len() {
        return Err(MathError::LengthMismatch {
            left: a.len(),
            right: b.len(),
        });
    }
    Ok((DVector::from_column_slice(a), DVector::from_column_slice(b)))
}
