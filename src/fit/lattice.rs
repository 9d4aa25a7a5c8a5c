//! Lattice of candidate moves for `SearchStrategy::Lattice`.
//!
//! For `N` parameters with steps `s_j` the lattice holds:
//! - the `2^N` hypercube corners `(±s_0, ..., ±s_{N-1}) / √N`
//! - the `2N` axis moves `+s_j e_j` then `-s_j e_j`
//!
//! Corners are scaled by `1/√N` so their length matches the axis moves when
//! all steps are equal. Rows are generated in a fixed order, which keeps the
//! first-wins tie breaking in the engine deterministic.

use nalgebra::DMatrix;

use crate::error::FitError;

/// Largest dimension the lattice strategy accepts (`2^16` corners per move).
pub const MAX_LATTICE_DIM: usize = 16;

/// Build the move lattice for `steps`, one candidate offset per row.
pub fn lattice_offsets(steps: &[f64]) -> Result<DMatrix<f64>, FitError> {
    let n = steps.len();
    if n == 0 {
        return Err(FitError::dimension("lattice needs at least one parameter"));
    }
    if n > MAX_LATTICE_DIM {
        return Err(FitError::dimension(format!(
            "lattice search supports at most {MAX_LATTICE_DIM} parameters, got {n}"
        )));
    }

    let corners = 1usize << n;
    let scale = 1.0 / (n as f64).sqrt();
    let mut out = DMatrix::<f64>::zeros(corners + 2 * n, n);

    // Corner order matches a cartesian product over (+, -) with the last
    // dimension varying fastest: +++, ++-, +-+, ...
    for mask in 0..corners {
        for j in 0..n {
            let bit = (mask >> (n - 1 - j)) & 1;
            let sign = if bit == 0 { 1.0 } else { -1.0 };
            out[(mask, j)] = sign * steps[j] * scale;
        }
    }

    for j in 0..n {
        out[(corners + j, j)] = steps[j];
        out[(corners + n + j, j)] = -steps[j];
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lattice_has_corners_then_axis_moves() {
        let m = lattice_offsets(&[1.0, 2.0]).unwrap();
        assert_eq!(m.nrows(), 4 + 4);
        assert_eq!(m.ncols(), 2);

        let s = 1.0 / 2.0_f64.sqrt();
        // First corner is all-plus, last corner all-minus.
        assert!((m[(0, 0)] - s).abs() < 1e-12);
        assert!((m[(0, 1)] - 2.0 * s).abs() < 1e-12);
        assert!((m[(1, 1)] + 2.0 * s).abs() < 1e-12);
        assert!((m[(3, 0)] + s).abs() < 1e-12);
        assert!((m[(3, 1)] + 2.0 * s).abs() < 1e-12);

        // Axis moves.
        assert_eq!((m[(4, 0)], m[(4, 1)]), (1.0, 0.0));
        assert_eq!((m[(5, 0)], m[(5, 1)]), (0.0, 2.0));
        assert_eq!((m[(6, 0)], m[(6, 1)]), (-1.0, 0.0));
        assert_eq!((m[(7, 0)], m[(7, 1)]), (0.0, -2.0));
    }

    #[test]
    fn corners_are_distinct() {
        let m = lattice_offsets(&[1.0, 1.0, 1.0]).unwrap();
        let mut rows: Vec<Vec<i8>> = (0..8)
            .map(|r| (0..3).map(|c| m[(r, c)].signum() as i8).collect())
            .collect();
        rows.sort();
        rows.dedup();
        assert_eq!(rows.len(), 8);
    }

    #[test]
    fn rejects_empty_and_oversized_dimensions() {
        assert!(lattice_offsets(&[]).is_err());
        assert!(lattice_offsets(&vec![0.1; MAX_LATTICE_DIM + 1]).is_err());
        assert!(lattice_offsets(&vec![0.1; 4]).is_ok());
    }
}
