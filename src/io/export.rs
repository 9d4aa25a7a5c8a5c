//! Read/write fit reports as JSON.
//!
//! A report is the portable record of one run: termination, iteration count,
//! entropies, parameters, the engine config and (if retained) the trace. The
//! schema is `domain::FitReport`.

use std::fs::File;
use std::path::Path;

use crate::domain::FitReport;
use crate::error::AppError;

/// Write a fit report as pretty-printed JSON.
pub fn write_report_json(path: &Path, report: &FitReport) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create report JSON '{}': {e}", path.display())))?;

    serde_json::to_writer_pretty(file, report)
        .map_err(|e| AppError::new(2, format!("Failed to write report JSON: {e}")))?;

    Ok(())
}

/// Read a fit report written by [`write_report_json`].
pub fn read_report_json(path: &Path) -> Result<FitReport, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open report JSON '{}': {e}", path.display())))?;
    let report: FitReport =
        serde_json::from_reader(file).map_err(|e| AppError::new(2, format!("Invalid report JSON: {e}")))?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;

    use crate::domain::Termination;
    use crate::fit::FitConfig;

    #[test]
    fn report_round_trips_through_a_file() {
        let report = FitReport {
            tool: "ndfit".to_string(),
            generated: Local::now(),
            termination: Termination::DepthExhausted,
            iterations: 12,
            initial_entropy: 40.0,
            final_entropy: 2.5,
            parameters: vec![2.0, 5.0, 6.0],
            constants: vec![],
            config: FitConfig::new(0.04, 12, 60.0).unwrap().with_throttle(true),
            entropy_trace: None,
        };

        let path = std::env::temp_dir().join(format!("ndfit-report-{}.json", std::process::id()));
        write_report_json(&path, &report).unwrap();
        let back = read_report_json(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(back.termination, Termination::DepthExhausted);
        assert_eq!(back.parameters, report.parameters);
        assert_eq!(back.config, report.config);
        assert!(back.entropy_trace.is_none());
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = read_report_json(Path::new("/nonexistent/ndfit/report.json")).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
