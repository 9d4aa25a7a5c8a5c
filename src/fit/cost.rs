//! Scalar cost ("entropy") of a parameter vector against a data set.

use crate::domain::{CostAggregate, DataSet};
use crate::error::DomainError;
use crate::models::ErrorMetric;

/// An error-function failure, tagged with the data point that caused it.
#[derive(Debug, Clone, PartialEq)]
pub struct EvalFailure {
    pub point: usize,
    pub source: DomainError,
}

/// Evaluates the aggregate cost of parameter vectors.
///
/// Holds only shared borrows: evaluation is deterministic and has no side
/// effects, so one evaluator may serve any number of runs.
#[derive(Debug)]
pub struct CostEvaluator<'a, E: ?Sized> {
    metric: &'a E,
    data: &'a DataSet,
    constants: &'a [f64],
    aggregate: CostAggregate,
}

impl<E: ?Sized> Clone for CostEvaluator<'_, E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E: ?Sized> Copy for CostEvaluator<'_, E> {}

impl<'a, E: ErrorMetric + ?Sized> CostEvaluator<'a, E> {
    pub fn new(
        metric: &'a E,
        data: &'a DataSet,
        constants: &'a [f64],
        aggregate: CostAggregate,
    ) -> Self {
        Self {
            metric,
            data,
            constants,
            aggregate,
        }
    }

    pub fn data(&self) -> &'a DataSet {
        self.data
    }

    pub fn constants(&self) -> &'a [f64] {
        self.constants
    }

    pub fn aggregate(&self) -> CostAggregate {
        self.aggregate
    }

    /// Cost of `params` over the whole data set.
    ///
    /// A residual that is an explicit `DomainError` or is not finite aborts
    /// the evaluation.
    pub fn evaluate(&self, params: &[f64]) -> Result<f64, EvalFailure> {
        let mut acc = Accumulator::default();
        for (point, p) in self.data.iter().enumerate() {
            let r = self.residual_at(point, p, params)?;
            acc.push(r);
        }

        let cost = acc.finish(self.aggregate);
        if !cost.is_finite() {
            return Err(EvalFailure {
                point: self.data.len().saturating_sub(1),
                source: DomainError::new(format!("aggregate cost is not finite ({cost})")),
            });
        }
        Ok(cost)
    }

    /// Residual of the first data point only.
    ///
    /// Used as a cheap preflight check that the error function accepts the
    /// data and parameter shapes before a full run starts.
    pub fn probe(&self, params: &[f64]) -> Result<f64, EvalFailure> {
        match self.data.points().first() {
            Some(p) => self.residual_at(0, p, params),
            None => Err(EvalFailure {
                point: 0,
                source: DomainError::new("data set is empty"),
            }),
        }
    }

    fn residual_at(
        &self,
        point: usize,
        p: &crate::domain::DataPoint,
        params: &[f64],
    ) -> Result<f64, EvalFailure> {
        let r = self
            .metric
            .residual(p, params, self.constants)
            .map_err(|source| EvalFailure { point, source })?;
        if !r.is_finite() {
            return Err(EvalFailure {
                point,
                source: DomainError::non_finite(r),
            });
        }
        Ok(r)
    }
}

/// Running sums needed by every `CostAggregate` variant.
#[derive(Debug, Default, Clone, Copy)]
struct Accumulator {
    n: usize,
    sum_sq: f64,
    sum_abs: f64,
}

impl Accumulator {
    fn push(&mut self, r: f64) {
        self.n += 1;
        self.sum_sq += r * r;
        self.sum_abs += r.abs();
    }

    fn finish(self, aggregate: CostAggregate) -> f64 {
        if self.n == 0 {
            return 0.0;
        }
        let n = self.n as f64;
        match aggregate {
            CostAggregate::SumOfSquares => self.sum_sq,
            CostAggregate::MeanAbsolute => self.sum_abs / n,
            CostAggregate::ScaledRootSumOfSquares => self.sum_sq.sqrt() * n.ln() / n,
        }
    }
}
