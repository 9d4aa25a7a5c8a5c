//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during fitting
//! - exported to JSON/CSV
//! - reloaded later for comparisons

use chrono::{DateTime, Local};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::FitError;
use crate::fit::FitConfig;

/// One observation: the independent variables and the observed value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    pub inputs: Vec<f64>,
    pub observed: f64,
}

impl DataPoint {
    pub fn new(inputs: Vec<f64>, observed: f64) -> Self {
        Self { inputs, observed }
    }

    /// Point with a single independent variable.
    pub fn scalar(x: f64, observed: f64) -> Self {
        Self::new(vec![x], observed)
    }
}

/// Ordered observations used by one or more runs.
///
/// A data set is never mutated by the engine, so one instance can be borrowed
/// by any number of concurrent runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataSet {
    points: Vec<DataPoint>,
}

impl DataSet {
    pub fn new(points: Vec<DataPoint>) -> Self {
        Self { points }
    }

    /// Zip one-dimensional samples `xs` with observations `ys`.
    pub fn from_xy(xs: &[f64], ys: &[f64]) -> Result<Self, FitError> {
        if xs.len() != ys.len() {
            return Err(FitError::dimension(format!(
                "x and y must have the same length (x={}, y={})",
                xs.len(),
                ys.len()
            )));
        }
        Ok(xs
            .iter()
            .zip(ys.iter())
            .map(|(&x, &y)| DataPoint::scalar(x, y))
            .collect())
    }

    pub fn points(&self) -> &[DataPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DataPoint> {
        self.points.iter()
    }

    /// Number of independent variables per point, if all points agree.
    pub fn input_arity(&self) -> Option<usize> {
        let first = self.points.first()?.inputs.len();
        if self.points.iter().all(|p| p.inputs.len() == first) {
            Some(first)
        } else {
            None
        }
    }

    /// First independent variable of each point.
    pub fn xs(&self) -> Vec<f64> {
        self.points
            .iter()
            .map(|p| p.inputs.first().copied().unwrap_or(f64::NAN))
            .collect()
    }

    pub fn observed(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.observed).collect()
    }

    /// Independent-variable samples in the shape `build_curve` expects.
    pub fn samples(&self) -> Vec<Vec<f64>> {
        self.points.iter().map(|p| p.inputs.clone()).collect()
    }
}

impl FromIterator<DataPoint> for DataSet {
    fn from_iter<T: IntoIterator<Item = DataPoint>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a DataSet {
    type Item = &'a DataPoint;
    type IntoIter = std::slice::Iter<'a, DataPoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

/// How per-point residuals are folded into the scalar cost ("entropy").
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum CostAggregate {
    /// `Σ r²`
    #[default]
    SumOfSquares,
    /// `Σ |r| / n`
    MeanAbsolute,
    /// `sqrt(Σ r²) · ln(n) / n`
    ScaledRootSumOfSquares,
}

impl CostAggregate {
    pub fn display_name(self) -> &'static str {
        match self {
            CostAggregate::SumOfSquares => "sum of squares",
            CostAggregate::MeanAbsolute => "mean absolute",
            CostAggregate::ScaledRootSumOfSquares => "scaled root sum of squares",
        }
    }
}

/// Move set explored by each iteration of the search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SearchStrategy {
    /// One dimension at a time, `±step[i]`, accepting improvements immediately.
    #[default]
    Coordinate,
    /// All hypercube corners plus the axis moves, moving to the best candidate.
    Lattice,
}

impl SearchStrategy {
    pub fn display_name(self) -> &'static str {
        match self {
            SearchStrategy::Coordinate => "coordinate",
            SearchStrategy::Lattice => "lattice",
        }
    }
}

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Termination {
    /// The per-iteration improvement fell below the convergence threshold.
    Converged,
    /// `max_depth` iterations ran without converging.
    DepthExhausted,
}

impl Termination {
    pub fn display_name(self) -> &'static str {
        match self {
            Termination::Converged => "converged",
            Termination::DepthExhausted => "depth exhausted",
        }
    }
}

/// Portable summary of a finished fit (what `--export` writes).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitReport {
    pub tool: String,
    pub generated: DateTime<Local>,
    pub termination: Termination,
    pub iterations: usize,
    pub initial_entropy: f64,
    pub final_entropy: f64,
    pub parameters: Vec<f64>,
    pub constants: Vec<f64>,
    pub config: FitConfig,
    pub entropy_trace: Option<Vec<f64>>,
}
