//! Derivative-free search over a parameter vector.
//!
//! Given:
//! - a model and an error function
//! - a data set (and optional constants)
//! - an initial guess and one step size per parameter
//!
//! the engine repeatedly perturbs the parameters, keeps only moves that
//! strictly lower the aggregate cost, and stops when one iteration improves
//! the cost by less than the convergence threshold or when `max_depth`
//! iterations have run.
//!
//! Each iteration (coordinate strategy):
//! 1. for each dimension `i`, evaluate `params[i] ± step[i]` with the others fixed
//! 2. accept the better of the two if it beats the running best (immediately)
//! 3. record the new best in the trace
//! 4. stop as converged if `previous - best < threshold`
//! 5. with throttling, shrink the step of every dimension that did not improve
//!
//! The lattice strategy replaces steps 1-2 by a single move to the best point
//! of the lattice built in `fit::lattice`.
//!
//! A run owns its parameter, step and trace vectors and only reads the data,
//! so independent runs can execute concurrently without coordination.

use log::{debug, info, warn};
use nalgebra::DMatrix;

use crate::domain::{DataSet, SearchStrategy, Termination};
use crate::error::FitError;
use crate::fit::config::FitConfig;
use crate::fit::cost::{CostEvaluator, EvalFailure};
use crate::fit::lattice::lattice_offsets;
use crate::fit::result::{FinalState, FitResult};
use crate::models::{ErrorMetric, Model};

/// Run one fit.
///
/// This is the main entry point: it validates the inputs, runs the search and
/// returns the final parameters. `DepthExhausted` is reported through
/// [`FitResult::termination`], not as an error.
///
/// # Errors
///
/// - [`FitError::Dimension`] if the inputs are inconsistent (checked before
///   the first iteration)
/// - [`FitError::Evaluation`] if the model or error function fails
pub fn run<'m, M, E>(
    model: &'m M,
    metric: &E,
    data: &DataSet,
    initial_guess: &[f64],
    constants: &[f64],
    step_sizes: &[f64],
    config: &FitConfig,
) -> Result<FitResult<'m, M>, FitError>
where
    M: Model + ?Sized,
    E: ErrorMetric + ?Sized,
{
    SearchEngine::new(model, metric, data, constants, *config).run(initial_guess, step_sizes)
}

/// A model, error function, data set and config bound together.
///
/// The engine itself is immutable; every call to [`run`](Self::run) works on
/// its own copies of the parameter and step vectors.
pub struct SearchEngine<'m, 'a, M: ?Sized, E: ?Sized> {
    model: &'m M,
    cost: CostEvaluator<'a, E>,
    config: FitConfig,
}

impl<'m, 'a, M, E> SearchEngine<'m, 'a, M, E>
where
    M: Model + ?Sized,
    E: ErrorMetric + ?Sized,
{
    pub fn new(
        model: &'m M,
        metric: &'a E,
        data: &'a DataSet,
        constants: &'a [f64],
        config: FitConfig,
    ) -> Self {
        Self {
            model,
            cost: CostEvaluator::new(metric, data, constants, config.aggregate()),
            config,
        }
    }

    pub fn config(&self) -> &FitConfig {
        &self.config
    }

    pub fn cost(&self) -> &CostEvaluator<'a, E> {
        &self.cost
    }

    /// Search from `initial_guess` with per-parameter `step_sizes`.
    pub fn run(&self, initial_guess: &[f64], step_sizes: &[f64]) -> Result<FitResult<'m, M>, FitError> {
        self.validate(initial_guess, step_sizes)?;

        // Preflight: make sure the error function accepts the data and
        // parameter shapes before paying for a full evaluation.
        self.cost
            .probe(initial_guess)
            .map_err(|failure| evaluation_error(0, failure))?;
        let initial = self
            .cost
            .evaluate(initial_guess)
            .map_err(|failure| evaluation_error(0, failure))?;

        let mut state = SearchState::new(initial_guess, step_sizes, initial, self.config.retain_trace());
        let mut lattice = match self.config.strategy() {
            SearchStrategy::Coordinate => None,
            SearchStrategy::Lattice => Some(lattice_offsets(&state.steps)?),
        };

        let threshold = self.config.convergence_threshold();
        let max_depth = self.config.max_depth();

        for depth in 1..=max_depth {
            let previous = state.best;

            let step = match &lattice {
                None => self.coordinate_sweep(&mut state),
                Some(offsets) => self.lattice_move(&mut state, offsets),
            };
            let improved = match step {
                Ok(improved) => improved,
                Err(failure) => {
                    warn!(
                        "fit aborted at depth {depth}: point {} failed: {}",
                        failure.point, failure.source
                    );
                    return Err(evaluation_error(depth, failure));
                }
            };

            state.record();
            let improvement = previous - state.best;
            debug!(
                "depth {depth}: entropy={:.6e} improvement={:.3e} steps={:?}",
                state.best, improvement, state.steps
            );

            if improvement < threshold {
                return Ok(self.finish(state, Termination::Converged, depth));
            }

            if self.config.throttle() && state.throttle(&improved, self.config.shrink_divisor()) {
                if let Some(offsets) = lattice.as_mut() {
                    *offsets = lattice_offsets(&state.steps)?;
                }
            }
        }

        Ok(self.finish(state, Termination::DepthExhausted, max_depth))
    }

    fn validate(&self, initial_guess: &[f64], step_sizes: &[f64]) -> Result<(), FitError> {
        let n = initial_guess.len();
        if n == 0 {
            return Err(FitError::dimension("initial guess is empty"));
        }
        if step_sizes.len() != n {
            return Err(FitError::dimension(format!(
                "step sizes must match the initial guess (guess={n}, steps={})",
                step_sizes.len()
            )));
        }
        if let Some(expected) = self.model.param_count() {
            if expected != n {
                return Err(FitError::dimension(format!(
                    "model expects {expected} parameters, initial guess has {n}"
                )));
            }
        }
        if let Some(i) = initial_guess.iter().position(|v| !v.is_finite()) {
            return Err(FitError::dimension(format!(
                "initial guess entry {i} is not finite"
            )));
        }
        if let Some(i) = step_sizes.iter().position(|s| !(s.is_finite() && *s >= 0.0)) {
            return Err(FitError::dimension(format!(
                "step size {i} must be finite and non-negative (got {})",
                step_sizes[i]
            )));
        }

        let data = self.cost.data();
        if data.is_empty() {
            return Err(FitError::dimension("data set is empty"));
        }
        if data.input_arity().is_none() {
            return Err(FitError::dimension(
                "data points have different numbers of independent variables",
            ));
        }
        Ok(())
    }

    /// One Gauss-Seidel sweep over the dimensions.
    ///
    /// Returns which dimensions improved.
    fn coordinate_sweep(&self, state: &mut SearchState) -> Result<Vec<bool>, EvalFailure> {
        let n = state.params.len();
        let mut improved = vec![false; n];

        for i in 0..n {
            let step = state.steps[i];
            if step == 0.0 {
                continue;
            }
            let base = state.params[i];

            state.params[i] = base + step;
            let up = self.cost.evaluate(&state.params)?;
            state.params[i] = base - step;
            let down = self.cost.evaluate(&state.params)?;
            state.evaluations += 2;

            // Ties favour the positive move.
            let (cost, value) = if up <= down {
                (up, base + step)
            } else {
                (down, base - step)
            };

            if cost < state.best {
                state.params[i] = value;
                state.best = cost;
                improved[i] = true;
            } else {
                state.params[i] = base;
            }
        }

        Ok(improved)
    }

    /// Move to the best lattice point if it beats the current cost.
    ///
    /// Returns which coordinates changed.
    fn lattice_move(
        &self,
        state: &mut SearchState,
        offsets: &DMatrix<f64>,
    ) -> Result<Vec<bool>, EvalFailure> {
        let n = state.params.len();
        let mut candidate = vec![0.0; n];
        let mut best: Option<(usize, f64)> = None;

        for row in 0..offsets.nrows() {
            for (j, c) in candidate.iter_mut().enumerate() {
                *c = state.params[j] + offsets[(row, j)];
            }
            let cost = self.cost.evaluate(&candidate)?;
            state.evaluations += 1;

            // Strict comparison: the first row wins ties.
            if best.is_none_or(|(_, b)| cost < b) {
                best = Some((row, cost));
            }
        }

        let mut improved = vec![false; n];
        if let Some((row, cost)) = best {
            if cost < state.best {
                for j in 0..n {
                    let delta = offsets[(row, j)];
                    if delta != 0.0 {
                        state.params[j] += delta;
                        improved[j] = true;
                    }
                }
                state.best = cost;
            }
        }
        Ok(improved)
    }

    fn finish(&self, state: SearchState, termination: Termination, iterations: usize) -> FitResult<'m, M> {
        match termination {
            Termination::Converged => info!(
                "fit converged at depth {iterations}: entropy {:.6e}",
                state.best
            ),
            Termination::DepthExhausted => warn!(
                "fit exceeded max depth {iterations} without converging: entropy {:.6e}",
                state.best
            ),
        }

        FitResult::new(
            self.model,
            self.cost.constants(),
            self.config,
            FinalState {
                parameters: state.params,
                initial_entropy: state.initial,
                final_entropy: state.best,
                termination,
                iterations,
                evaluations: state.evaluations,
                trace: state.trace,
                parameter_trace: state.parameter_trace,
            },
        )
    }
}

/// Mutable working set of one run.
struct SearchState {
    params: Vec<f64>,
    steps: Vec<f64>,
    initial: f64,
    best: f64,
    evaluations: usize,
    trace: Option<Vec<f64>>,
    parameter_trace: Option<Vec<Vec<f64>>>,
}

impl SearchState {
    fn new(initial_guess: &[f64], step_sizes: &[f64], initial: f64, retain_trace: bool) -> Self {
        Self {
            params: initial_guess.to_vec(),
            steps: step_sizes.to_vec(),
            initial,
            best: initial,
            evaluations: 1,
            trace: retain_trace.then(Vec::new),
            parameter_trace: retain_trace.then(Vec::new),
        }
    }

    fn record(&mut self) {
        if let Some(trace) = self.trace.as_mut() {
            trace.push(self.best);
        }
        if let Some(history) = self.parameter_trace.as_mut() {
            history.push(self.params.clone());
        }
    }

    /// Shrink the step of every dimension that did not improve.
    ///
    /// Returns `true` if any step changed.
    fn throttle(&mut self, improved: &[bool], divisor: f64) -> bool {
        let mut changed = false;
        for (step, &ok) in self.steps.iter_mut().zip(improved) {
            if !ok && *step > 0.0 {
                *step /= divisor;
                changed = true;
            }
        }
        changed
    }
}

fn evaluation_error(iteration: usize, failure: EvalFailure) -> FitError {
    FitError::Evaluation {
        iteration,
        point: failure.point,
        source: failure.source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CostAggregate, DataPoint};
    use crate::error::DomainError;
    use crate::models::ModelResidual;

    fn parabola() -> impl Fn(&[f64], &[f64], &[f64]) -> f64 {
        |x: &[f64], p: &[f64], _c: &[f64]| p[0] * x[0] * x[0] + p[1]
    }

    fn parabola_data() -> DataSet {
        let xs: Vec<f64> = (0..21).map(|i| -1.0 + i as f64 * 0.1).collect();
        let ys: Vec<f64> = xs.iter().map(|x| 3.0 * x * x + 0.5).collect();
        DataSet::from_xy(&xs, &ys).unwrap()
    }

    #[test]
    fn coordinate_search_recovers_parabola() {
        let model = parabola();
        let metric = ModelResidual::new(&model);
        let data = parabola_data();
        let config = FitConfig::new(1e-12, 5000, 1.0).unwrap();

        let fit = run(&model, &metric, &data, &[1.0, 0.0], &[], &[0.01, 0.01], &config).unwrap();
        let p = fit.parameters();
        // A fixed step can stall a few steps away from the optimum along the valley.
        assert!((p[0] - 3.0).abs() < 0.05, "a={}", p[0]);
        assert!((p[1] - 0.5).abs() < 0.05, "c={}", p[1]);
        assert!(fit.final_entropy() < fit.initial_entropy());
    }

    #[test]
    fn trace_is_monotone_and_bounded_by_depth() {
        let model = parabola();
        let metric = ModelResidual::new(&model);
        let data = parabola_data();
        let config = FitConfig::new(1e-9, 25, 1.0).unwrap();

        let fit = run(&model, &metric, &data, &[0.0, 0.0], &[], &[0.05, 0.05], &config).unwrap();
        let trace = fit.entropy_trace().unwrap();

        assert_eq!(fit.termination(), Termination::DepthExhausted);
        assert_eq!(fit.iterations(), 25);
        assert_eq!(trace.len(), 25);
        assert!(trace[0] <= fit.initial_entropy());
        for w in trace.windows(2) {
            assert!(w[1] <= w[0]);
        }
        assert_eq!(*trace.last().unwrap(), fit.final_entropy());
        assert_eq!(fit.parameter_trace().unwrap().last().unwrap(), fit.parameters());
    }

    #[test]
    fn stall_converges_immediately_at_optimum() {
        let model = parabola();
        let metric = ModelResidual::new(&model);
        let data = parabola_data();
        let config = FitConfig::default();

        let fit = run(&model, &metric, &data, &[3.0, 0.5], &[], &[0.1, 0.1], &config).unwrap();
        assert_eq!(fit.termination(), Termination::Converged);
        assert_eq!(fit.iterations(), 1);
        assert_eq!(fit.parameters(), &[3.0, 0.5]);
        assert_eq!(fit.final_entropy(), 0.0);
    }

    #[test]
    fn short_mode_keeps_no_trace() {
        let model = parabola();
        let metric = ModelResidual::new(&model);
        let data = parabola_data();
        let config = FitConfig::new(1e-6, 100, 1.0).unwrap().with_retain_trace(false);

        let fit = run(&model, &metric, &data, &[1.0, 0.0], &[], &[0.1, 0.1], &config).unwrap();
        assert!(fit.entropy_trace().is_none());
        assert!(fit.parameter_trace().is_none());
        assert!(matches!(fit.require_entropy_trace(), Err(FitError::State)));
    }

    #[test]
    fn throttle_shrinks_only_stalled_dimensions() {
        let mut state = SearchState::new(&[0.0, 0.0, 0.0], &[1.0, 1.0, 0.0], 1.0, false);
        assert!(state.throttle(&[true, false, false], 4.0));
        assert_eq!(state.steps, vec![1.0, 0.25, 0.0]);
        assert!(!state.throttle(&[true, true, false], 4.0));
    }

    #[test]
    fn throttling_lets_a_stalled_dimension_refine() {
        // Cost is (p0 - 10)^2 + p1^2: p0 keeps improving while p1 stalls at 0.1.
        let data = DataSet::from_xy(&[0.0, 1.0], &[0.0, 1.0]).unwrap();
        let metric = |pt: &DataPoint, p: &[f64], _c: &[f64]| {
            if pt.observed == 0.0 { p[0] - 10.0 } else { p[1] }
        };
        let model = |_x: &[f64], _p: &[f64], _c: &[f64]| 0.0;
        let plain = FitConfig::new(1e-9, 100, 50.0).unwrap();
        let throttled = plain.with_throttle(true);

        let a = run(&model, &metric, &data, &[0.0, 0.3], &[], &[1.0, 0.2], &plain).unwrap();
        let b = run(&model, &metric, &data, &[0.0, 0.3], &[], &[1.0, 0.2], &throttled).unwrap();

        assert!((a.parameters()[1] - 0.1).abs() < 1e-9);
        assert!(b.parameters()[1].abs() < 0.05, "p1={}", b.parameters()[1]);
        assert!(b.final_entropy() < a.final_entropy());
        for w in b.entropy_trace().unwrap().windows(2) {
            assert!(w[1] <= w[0]);
        }
    }

    #[test]
    fn lattice_strategy_descends() {
        let model = parabola();
        let metric = ModelResidual::new(&model);
        let data = parabola_data();
        let config = FitConfig::new(1e-10, 2000, 1.0)
            .unwrap()
            .with_strategy(SearchStrategy::Lattice);

        let fit = run(&model, &metric, &data, &[1.0, 0.0], &[], &[0.01, 0.01], &config).unwrap();
        let p = fit.parameters();
        assert!((p[0] - 3.0).abs() < 0.05, "a={}", p[0]);
        assert!((p[1] - 0.5).abs() < 0.05, "c={}", p[1]);
        // 4 corners + 4 axis moves per iteration, plus the initial evaluation.
        assert_eq!(fit.evaluations(), 1 + 8 * fit.iterations());
    }

    #[test]
    fn aggregate_choice_is_respected() {
        let model = parabola();
        let metric = ModelResidual::new(&model);
        let data = parabola_data();
        let config = FitConfig::new(1e-9, 1, 1.0)
            .unwrap()
            .with_aggregate(CostAggregate::MeanAbsolute);

        let fit = run(&model, &metric, &data, &[3.0, 0.0], &[], &[0.0, 0.0], &config).unwrap();
        // Every residual is exactly -0.5 and no step can move.
        assert!((fit.final_entropy() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn dimension_errors_are_raised_before_iterating() {
        let model = parabola();
        let metric = ModelResidual::new(&model);
        let data = parabola_data();
        let config = FitConfig::default();

        let cases: Vec<(Vec<f64>, Vec<f64>)> = vec![
            (vec![], vec![]),
            (vec![1.0, 0.0], vec![0.1]),
            (vec![f64::NAN, 0.0], vec![0.1, 0.1]),
            (vec![1.0, 0.0], vec![0.1, -0.1]),
        ];
        for (guess, steps) in cases {
            let err = run(&model, &metric, &data, &guess, &[], &steps, &config).unwrap_err();
            assert!(matches!(err, FitError::Dimension(_)), "{guess:?} {steps:?}: {err}");
        }

        let empty = DataSet::default();
        let err = run(&model, &metric, &empty, &[1.0, 0.0], &[], &[0.1, 0.1], &config).unwrap_err();
        assert!(matches!(err, FitError::Dimension(_)));

        let lorentz = crate::models::LorentzianDip;
        let lmetric = ModelResidual::new(&lorentz);
        let err = run(&lorentz, &lmetric, &data, &[1.0, 0.0], &[], &[0.1, 0.1], &config).unwrap_err();
        assert!(matches!(err, FitError::Dimension(_)));
    }

    /// Model that fails once its parameter crosses a limit.
    struct Guarded;

    impl Model for Guarded {
        fn evaluate(&self, x: &[f64], p: &[f64], _c: &[f64]) -> Result<f64, DomainError> {
            if p[0] > 1.25 {
                return Err(DomainError::new("parameter out of domain"));
            }
            Ok(p[0] * x[0])
        }
    }

    #[test]
    fn evaluation_failure_reports_iteration() {
        let data: DataSet = (1..=5).map(|i| DataPoint::scalar(i as f64, 10.0 * i as f64)).collect();
        let metric = ModelResidual::new(&Guarded);
        let config = FitConfig::new(1e-9, 100, 1.0).unwrap();

        // Each iteration moves p0 up by 0.1; the sweep at p0 = 1.2 probes 1.3.
        let err = run(&Guarded, &metric, &data, &[0.5], &[], &[0.1], &config).unwrap_err();
        match err {
            FitError::Evaluation { iteration, point, .. } => {
                assert_eq!(iteration, 8);
                assert_eq!(point, 0);
            }
            other => panic!("unexpected error: {other}"),
        }

        // The preflight catches a bad initial guess at iteration 0.
        let err = run(&Guarded, &metric, &data, &[2.0], &[], &[0.1], &config).unwrap_err();
        assert!(matches!(err, FitError::Evaluation { iteration: 0, .. }));
    }

    #[test]
    fn engine_is_reusable_and_deterministic() {
        let model = parabola();
        let metric = ModelResidual::new(&model);
        let data = parabola_data();
        let engine = SearchEngine::new(&model, &metric, &data, &[], FitConfig::new(1e-8, 300, 1.0).unwrap());

        let a = engine.run(&[0.0, 0.0], &[0.02, 0.02]).unwrap();
        let b = engine.run(&[0.0, 0.0], &[0.02, 0.02]).unwrap();
        assert_eq!(a.parameters(), b.parameters());
        assert_eq!(a.final_entropy().to_bits(), b.final_entropy().to_bits());
        assert_eq!(a.entropy_trace(), b.entropy_trace());
    }
}
