//! Fitting engine.
//!
//! Responsibilities:
//!
//! - validate per-run configuration
//! - aggregate residuals into a scalar cost
//! - run the coordinate or lattice search until convergence or max depth
//! - run independent starts in parallel and pick the best

pub mod config;
pub mod cost;
pub mod engine;
pub mod lattice;
pub mod multistart;
pub mod result;

pub use config::{ConfigError, FitConfig, THROTTLE_RATE};
pub use cost::{CostEvaluator, EvalFailure};
pub use engine::{SearchEngine, run};
pub use lattice::{MAX_LATTICE_DIM, lattice_offsets};
pub use multistart::{StartOutcome, best_of, jitter_guesses, run_many};
pub use result::FitResult;
