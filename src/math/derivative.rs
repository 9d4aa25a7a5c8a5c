//! Finite-difference derivative of a sampled sequence.
//!
//! For samples `(x_i, y_i)`:
//!
//! ```text
//! d_0     = (y_1 - y_0) / (x_1 - x_0)                 forward
//! d_i     = (y_{i+1} - y_{i-1}) / (x_{i+1} - x_{i-1})  central
//! d_{n-1} = (y_{n-1} - y_{n-2}) / (x_{n-1} - x_{n-2})  backward
//! ```
//!
//! The central stencil is exact for quadratics on a uniform grid; its error is
//! `O(h^2)` for smooth data.

use crate::error::MathError;

/// Derivative of `y` with respect to `x`, same length and order as the input.
pub fn derivative(y: &[f64], x: &[f64]) -> Result<Vec<f64>, MathError> {
    if y.len() != x.len() {
        return Err(MathError::LengthMismatch {
            left: y.len(),
            right: x.len(),
        });
    }
    let n = y.len();
    if n < 2 {
        return Err(MathError::TooShort { len: n, min: 2 });
    }

    let mut out = Vec::with_capacity(n);
    out.push(slope(y, x, 0, 1)?);
    for i in 1..n - 1 {
        out.push(slope(y, x, i - 1, i + 1)?);
    }
    out.push(slope(y, x, n - 2, n - 1)?);
    Ok(out)
}

fn slope(y: &[f64], x: &[f64], lo: usize, hi: usize) -> Result<f64, MathError> {
    let dx = x[hi] - x[lo];
    if dx == 0.0 {
        return Err(MathError::ZeroSpacing { index: lo });
    }
    Ok((y[hi] - y[lo]) / dx)
}
