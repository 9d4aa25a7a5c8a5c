//! Reporting utilities: residuals and rankings.

use crate::domain::{DataPoint, DataSet};
use crate::error::AppError;

pub mod format;

pub use format::*;

/// Observed vs fitted value at one data point.
#[derive(Debug, Clone, PartialEq)]
pub struct PointResidual {
    pub index: usize,
    pub point: DataPoint,
    pub y_fit: f64,
    pub residual: f64,
}

/// Pair each data point with its fitted value (`residual = observed - fitted`).
pub fn compute_residuals(data: &DataSet, fitted: &[f64]) -> Result<Vec<PointResidual>, AppError> {
    if fitted.len() != data.len() {
        return Err(AppError::new(
            3,
            format!("Fitted curve has {} values for {} data points.", fitted.len(), data.len()),
        ));
    }

    let mut out = Vec::with_capacity(data.len());
    for (index, (p, &y_fit)) in data.iter().zip(fitted).enumerate() {
        if !y_fit.is_finite() {
            return Err(AppError::new(4, "Non-finite model prediction during residual computation."));
        }
        out.push(PointResidual {
            index,
            point: p.clone(),
            y_fit,
            residual: p.observed - y_fit,
        });
    }
    Ok(out)
}

/// The `top_n` points with the largest absolute residual, largest first.
///
/// Equal magnitudes keep data order.
pub fn largest_residuals(residuals: &[PointResidual], top_n: usize) -> Vec<PointResidual> {
    let mut sorted = residuals.to_vec();
    sorted.sort_by(|a, b| {
        b.residual
            .abs()
            .partial_cmp(&a.residual.abs())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    sorted.truncate(top_n);
    sorted
}
