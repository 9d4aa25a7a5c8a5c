//! Export observed vs fitted values to CSV.
//!
//! One row per data point: the independent variables, the observed value and
//! the fitted model value. Single-input data uses an `x` column; otherwise the
//! inputs are `x0, x1, ...`.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::domain::DataSet;
use crate::error::AppError;

/// Write `data` alongside `fitted` (one value per point) to a CSV file.
pub fn write_curve_csv(path: &Path, data: &DataSet, fitted: &[f64]) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create curve CSV '{}': {e}", path.display())))?;
    write_curve(BufWriter::new(file), data, fitted)
}

fn write_curve<W: Write>(mut out: W, data: &DataSet, fitted: &[f64]) -> Result<(), AppError> {
    if fitted.len() != data.len() {
        return Err(AppError::new(
            3,
            format!(
                "Curve has {} values for {} data points.",
                fitted.len(),
                data.len()
            ),
        ));
    }
    let arity = data
        .input_arity()
        .ok_or_else(|| AppError::new(3, "Cannot export data with ragged inputs."))?;

    let header = match arity {
        1 => "x".to_string(),
        n => (0..n).map(|i| format!("x{i}")).collect::<Vec<_>>().join(","),
    };
    writeln!(out, "{header},observed,fitted")
        .map_err(|e| AppError::new(2, format!("Failed to write curve CSV header: {e}")))?;

    for (point, y_fit) in data.iter().zip(fitted) {
        let inputs = point
            .inputs
            .iter()
            .map(|v| format!("{v:.10}"))
            .collect::<Vec<_>>()
            .join(",");
        writeln!(out, "{inputs},{:.10},{:.10}", point.observed, y_fit)
            .map_err(|e| AppError::new(2, format!("Failed to write curve CSV row: {e}")))?;
    }

    out.flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush curve CSV: {e}")))?;
    Ok(())
}
