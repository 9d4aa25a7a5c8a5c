//! Independent runs from many starting points.
//!
//! Each start gets its own parameter, step and trace vectors; the model, error
//! function, data and constants are shared read-only. Runs execute in parallel
//! and results come back in start order, so the outcome does not depend on
//! scheduling.

use log::{info, warn};
use rand::prelude::*;
use rand::rngs::StdRng;
use rayon::prelude::*;

use crate::domain::DataSet;
use crate::error::FitError;
use crate::fit::config::FitConfig;
use crate::fit::engine::SearchEngine;
use crate::fit::result::FitResult;
use crate::models::{ErrorMetric, Model};

/// One start of a multi-start batch.
pub struct StartOutcome<'m, M: ?Sized> {
    pub index: usize,
    pub initial_guess: Vec<f64>,
    pub result: Result<FitResult<'m, M>, FitError>,
}

impl<M: ?Sized> std::fmt::Debug for StartOutcome<'_, M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StartOutcome")
            .field("index", &self.index)
            .field("initial_guess", &self.initial_guess)
            .field("result", &self.result)
            .finish()
    }
}

impl<M: ?Sized> StartOutcome<'_, M> {
    pub fn final_entropy(&self) -> Option<f64> {
        self.result.as_ref().ok().map(FitResult::final_entropy)
    }
}

/// `count` guesses drawn uniformly from `base[i] ± spread[i]`.
///
/// A single seeded generator produces all guesses in order, so the same seed
/// always yields the same batch.
pub fn jitter_guesses(
    base: &[f64],
    spread: &[f64],
    count: usize,
    seed: u64,
) -> Result<Vec<Vec<f64>>, FitError> {
    if base.len() != spread.len() {
        return Err(FitError::dimension(format!(
            "spread must match the base guess (base={}, spread={})",
            base.len(),
            spread.len()
        )));
    }
    if let Some(i) = spread.iter().position(|s| !(s.is_finite() && *s >= 0.0)) {
        return Err(FitError::dimension(format!(
            "spread {i} must be finite and non-negative (got {})",
            spread[i]
        )));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let guesses = (0..count)
        .map(|_| {
            base.iter()
                .zip(spread)
                .map(|(&b, &s)| if s > 0.0 { b + rng.gen_range(-s..=s) } else { b })
                .collect()
        })
        .collect();
    Ok(guesses)
}

/// Run one fit per initial guess, in parallel.
///
/// A failing start is reported in its own outcome and does not affect the
/// others. Outcomes are ordered by start index.
pub fn run_many<'m, M, E>(
    model: &'m M,
    metric: &E,
    data: &DataSet,
    initial_guesses: &[Vec<f64>],
    constants: &[f64],
    step_sizes: &[f64],
    config: &FitConfig,
) -> Vec<StartOutcome<'m, M>>
where
    M: Model + Sync + ?Sized,
    E: ErrorMetric + Sync + ?Sized,
{
    let engine = SearchEngine::new(model, metric, data, constants, *config);

    let outcomes: Vec<StartOutcome<'m, M>> = initial_guesses
        .par_iter()
        .enumerate()
        .map(|(index, guess)| {
            let result = engine.run(guess, step_sizes);
            if let Err(e) = &result {
                warn!("start {index} failed: {e}");
            }
            StartOutcome {
                index,
                initial_guess: guess.clone(),
                result,
            }
        })
        .collect();

    let ok = outcomes.iter().filter(|o| o.result.is_ok()).count();
    info!("multi-start finished: {ok}/{} starts succeeded", outcomes.len());
    outcomes
}

/// Successful outcome with the lowest final entropy.
///
/// Ties are broken by the lower start index.
pub fn best_of<'a, 'm, M: ?Sized>(outcomes: &'a [StartOutcome<'m, M>]) -> Option<&'a StartOutcome<'m, M>> {
    let mut best: Option<(&StartOutcome<'m, M>, f64)> = None;
    for outcome in outcomes {
        let Some(entropy) = outcome.final_entropy() else {
            continue;
        };
        let better = match best {
            None => true,
            Some((b, e)) => entropy < e || (entropy == e && outcome.index < b.index),
        };
        if better {
            best = Some((outcome, entropy));
        }
    }
    best.map(|(o, _)| o)
}
