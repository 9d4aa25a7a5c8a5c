//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the fitting code stays free of presentation concerns
//! - output changes are localized

use crate::fit::{FitResult, StartOutcome};
use crate::report::PointResidual;

/// Format a single-run summary: config, outcome, entropies and parameters.
///
/// With `truth`, the known parameters and the largest absolute deviation are
/// printed as well (synthetic data sets).
pub fn format_fit_summary<M: ?Sized>(result: &FitResult<'_, M>, truth: Option<&[f64]>) -> String {
    let config = result.config();
    let mut out = String::new();

    out.push_str("=== ndfit - derivative-free curve fit ===\n");
    out.push_str(&format!(
        "Search: {} | cost: {}\n",
        config.strategy().display_name(),
        config.aggregate().display_name(),
    ));
    let throttle = if config.throttle() {
        format!("on (factor {})", config.throttle_factor())
    } else {
        "off".to_string()
    };
    out.push_str(&format!(
        "Config: convergence={} max_depth={} throttle={throttle}\n",
        config.convergence_threshold(),
        config.max_depth(),
    ));

    out.push_str(&format!(
        "Outcome: {} after {} iterations ({} evaluations)\n",
        result.termination().display_name(),
        result.iterations(),
        result.evaluations(),
    ));
    out.push_str(&format!(
        "Entropy: {:.6} -> {:.6}\n",
        result.initial_entropy(),
        result.final_entropy()
    ));

    out.push_str(&format!("Parameters: {}\n", fmt_vec(result.parameters())));
    if let Some(truth) = truth {
        out.push_str(&format!("Truth     : {}\n", fmt_vec(truth)));
        let max_dev = result
            .parameters()
            .iter()
            .zip(truth)
            .map(|(p, t)| (p - t).abs())
            .fold(0.0_f64, f64::max);
        out.push_str(&format!("Max |param - truth|: {max_dev:.6}\n"));
    }

    out
}

/// Format a multi-start batch: successful starts ranked by final entropy
/// (ties by start index), then failed starts in start order.
pub fn format_multistart_table<M: ?Sized>(outcomes: &[StartOutcome<'_, M>]) -> String {
    let mut ok: Vec<(&StartOutcome<'_, M>, &FitResult<'_, M>)> = outcomes
        .iter()
        .filter_map(|o| o.result.as_ref().ok().map(|r| (o, r)))
        .collect();
    ok.sort_by(|(oa, a), (ob, b)| {
        a.final_entropy()
            .partial_cmp(&b.final_entropy())
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(oa.index.cmp(&ob.index))
    });

    let mut out = String::new();
    out.push_str(&format!(
        "Starts: {} | ok: {} | failed: {}\n",
        outcomes.len(),
        ok.len(),
        outcomes.len() - ok.len()
    ));

    out.push_str(
        format!(
            "{:>4} {:>5} {:>14} {:>6} {:<16} {}\n",
            "rank", "start", "entropy", "iters", "outcome", "parameters"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(
        format!("{:-<4} {:-<5} {:-<14} {:-<6} {:-<16} {:-<10}\n", "", "", "", "", "", "").trim_end(),
    );
    out.push('\n');

    for (rank, (outcome, result)) in ok.iter().enumerate() {
        out.push_str(&format!(
            "{:>4} {:>5} {:>14.6} {:>6} {:<16} {}\n",
            rank + 1,
            outcome.index,
            result.final_entropy(),
            result.iterations(),
            result.termination().display_name(),
            fmt_vec(result.parameters()),
        ));
    }

    for outcome in outcomes {
        if let Err(e) = &outcome.result {
            out.push_str(&format!("   - {:>5} failed: {e}\n", outcome.index));
        }
    }

    out
}

/// Format the residual rows (typically the largest few).
pub fn format_residual_table(rows: &[PointResidual]) -> String {
    let mut out = String::new();
    out.push_str(
        format!(
            "{:>6} {:<24} {:>12} {:>12} {:>12}\n",
            "index", "inputs", "observed", "fitted", "residual"
        )
        .trim_end(),
    );
    out.push('\n');

    for r in rows {
        out.push_str(&format!(
            "{:>6} {:<24} {:>12.6} {:>12.6} {:>12.6}\n",
            r.index,
            fmt_vec_short(&r.point.inputs),
            r.point.observed,
            r.y_fit,
            r.residual,
        ));
    }

    out
}

fn fmt_vec(v: &[f64]) -> String {
    let parts: Vec<String> = v.iter().map(|x| format!("{x:.6}")).collect();
    format!("[{}]", parts.join(", "))
}

fn fmt_vec_short(v: &[f64]) -> String {
    let parts: Vec<String> = v.iter().map(|x| format!("{x:.3}")).collect();
    parts.join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DataSet;
    use crate::fit::{FitConfig, run_many};
    use crate::models::ModelResidual;
    use crate::report::compute_residuals;

    fn constant(_x: &[f64], p: &[f64], _c: &[f64]) -> f64 {
        p[0]
    }

    #[test]
    fn fit_summary_mentions_outcome_and_truth() {
        let data = DataSet::from_xy(&[0.0, 1.0, 2.0], &[3.0, 3.0, 3.0]).unwrap();
        let metric = ModelResidual::new(&constant);
        let config = FitConfig::new(1e-6, 100, 1.0).unwrap();
        let fit = crate::fit::run(&constant, &metric, &data, &[2.0], &[], &[0.25], &config).unwrap();

        let text = format_fit_summary(&fit, Some(&[3.0][..]));
        assert!(text.contains("Outcome: converged"));
        assert!(text.contains("Parameters: [3.000000]"));
        assert!(text.contains("Max |param - truth|: 0.000000"));
        assert!(!format_fit_summary(&fit, None).contains("Truth"));
    }

    #[test]
    fn multistart_table_ranks_by_entropy() {
        let data = DataSet::from_xy(&[0.0, 1.0], &[3.0, 3.0]).unwrap();
        let metric = ModelResidual::new(&constant);
        // Step 1.0 from 0.5 can only reach 2.5/3.5; from 3.0 the fit is exact.
        let config = FitConfig::new(1e-6, 100, 1.0).unwrap();
        let guesses = vec![vec![0.5], vec![3.0]];
        let outcomes = run_many(&constant, &metric, &data, &guesses, &[], &[1.0], &config);

        let text = format_multistart_table(&outcomes);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Starts: 2 | ok: 2 | failed: 0");
        assert!(lines[3].trim_start().starts_with("1     1"));
        assert!(lines[4].trim_start().starts_with("2     0"));
    }

    #[test]
    fn residual_table_has_one_row_per_residual() {
        let data = DataSet::from_xy(&[0.0, 1.0], &[1.0, 2.0]).unwrap();
        let rows = compute_residuals(&data, &[1.5, 1.5]).unwrap();
        let text = format_residual_table(&rows);
        assert_eq!(text.lines().count(), 3);
        assert!(text.contains("-0.500000"));
    }
}
