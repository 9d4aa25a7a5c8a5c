//! Per-run engine configuration.
//!
//! A `FitConfig` is a small `Copy` value that every run receives explicitly.
//! Fields are private and only settable through validating constructors, so
//! an existing config is always valid and can be shared read-only between
//! concurrent runs.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{CostAggregate, SearchStrategy};

/// Step shrinkage per unit of throttle factor.
///
/// A non-improving dimension has its step divided by
/// `1 + THROTTLE_RATE * throttle_factor`.
pub const THROTTLE_RATE: f64 = 0.01;

/// Configuration for one fitting run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawFitConfig")]
pub struct FitConfig {
    convergence_threshold: f64,
    max_depth: usize,
    throttle_factor: f64,
    throttle: bool,
    retain_trace: bool,
    aggregate: CostAggregate,
    strategy: SearchStrategy,
}

/// Errors that can occur when validating a fit config.
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum ConfigError {
    #[error("convergence threshold must be finite and > 0 (got {0})")]
    ConvergenceThreshold(f64),

    #[error("max depth must be >= 1")]
    MaxDepth,

    #[error("throttle factor must be finite and > 0 (got {0})")]
    ThrottleFactor(f64),
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            convergence_threshold: 0.1,
            max_depth: 1000,
            throttle_factor: 1.0,
            throttle: false,
            retain_trace: true,
            aggregate: CostAggregate::SumOfSquares,
            strategy: SearchStrategy::Coordinate,
        }
    }
}

impl FitConfig {
    /// Creates a config with validated numeric settings and default flags
    /// (throttling off, trace retained, sum of squares, coordinate search).
    ///
    /// # Errors
    ///
    /// Returns an error if the threshold or throttle factor is not a finite
    /// positive number, or if `max_depth` is zero.
    pub fn new(
        convergence_threshold: f64,
        max_depth: usize,
        throttle_factor: f64,
    ) -> Result<Self, ConfigError> {
        Self::default()
            .with_convergence_threshold(convergence_threshold)?
            .with_max_depth(max_depth)?
            .with_throttle_factor(throttle_factor)
    }

    pub fn with_convergence_threshold(mut self, value: f64) -> Result<Self, ConfigError> {
        if !(value.is_finite() && value > 0.0) {
            return Err(ConfigError::ConvergenceThreshold(value));
        }
        self.convergence_threshold = value;
        Ok(self)
    }

    pub fn with_max_depth(mut self, value: usize) -> Result<Self, ConfigError> {
        if value < 1 {
            return Err(ConfigError::MaxDepth);
        }
        self.max_depth = value;
        Ok(self)
    }

    pub fn with_throttle_factor(mut self, value: f64) -> Result<Self, ConfigError> {
        if !(value.is_finite() && value > 0.0) {
            return Err(ConfigError::ThrottleFactor(value));
        }
        self.throttle_factor = value;
        Ok(self)
    }

    #[must_use]
    pub fn with_throttle(mut self, enabled: bool) -> Self {
        self.throttle = enabled;
        self
    }

    #[must_use]
    pub fn with_retain_trace(mut self, retain: bool) -> Self {
        self.retain_trace = retain;
        self
    }

    #[must_use]
    pub fn with_aggregate(mut self, aggregate: CostAggregate) -> Self {
        self.aggregate = aggregate;
        self
    }

    #[must_use]
    pub fn with_strategy(mut self, strategy: SearchStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Minimum per-iteration cost improvement required to keep iterating.
    #[must_use]
    pub fn convergence_threshold(&self) -> f64 {
        self.convergence_threshold
    }

    /// Maximum number of iterations (the search "depth").
    #[must_use]
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    #[must_use]
    pub fn throttle_factor(&self) -> f64 {
        self.throttle_factor
    }

    /// Whether step sizes shrink on non-improving dimensions.
    #[must_use]
    pub fn throttle(&self) -> bool {
        self.throttle
    }

    /// Whether the per-iteration entropy trace is kept ("full" mode).
    #[must_use]
    pub fn retain_trace(&self) -> bool {
        self.retain_trace
    }

    #[must_use]
    pub fn aggregate(&self) -> CostAggregate {
        self.aggregate
    }

    #[must_use]
    pub fn strategy(&self) -> SearchStrategy {
        self.strategy
    }

    /// Divisor applied to a step when throttling shrinks it.
    pub(crate) fn shrink_divisor(&self) -> f64 {
        1.0 + THROTTLE_RATE * self.throttle_factor
    }
}

/// Unvalidated, serde-facing mirror of `FitConfig`.
///
/// Missing keys take the `FitConfig::default()` values.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawFitConfig {
    convergence_threshold: f64,
    max_depth: usize,
    throttle_factor: f64,
    throttle: bool,
    retain_trace: bool,
    aggregate: CostAggregate,
    strategy: SearchStrategy,
}

impl Default for RawFitConfig {
    fn default() -> Self {
        let d = FitConfig::default();
        Self {
            convergence_threshold: d.convergence_threshold,
            max_depth: d.max_depth,
            throttle_factor: d.throttle_factor,
            throttle: d.throttle,
            retain_trace: d.retain_trace,
            aggregate: d.aggregate,
            strategy: d.strategy,
        }
    }
}

impl TryFrom<RawFitConfig> for FitConfig {
    type Error = ConfigError;

    fn try_from(raw: RawFitConfig) -> Result<Self, Self::Error> {
        Ok(FitConfig::new(raw.convergence_threshold, raw.max_depth, raw.throttle_factor)?
            .with_throttle(raw.throttle)
            .with_retain_trace(raw.retain_trace)
            .with_aggregate(raw.aggregate)
            .with_strategy(raw.strategy))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_domain_values() {
        assert_eq!(
            FitConfig::new(0.0, 10, 1.0),
            Err(ConfigError::ConvergenceThreshold(0.0))
        );
        assert_eq!(
            FitConfig::new(-1.0, 10, 1.0),
            Err(ConfigError::ConvergenceThreshold(-1.0))
        );
        assert!(matches!(
            FitConfig::new(f64::NAN, 10, 1.0),
            Err(ConfigError::ConvergenceThreshold(_))
        ));
        assert_eq!(FitConfig::new(0.1, 0, 1.0), Err(ConfigError::MaxDepth));
        assert_eq!(
            FitConfig::new(0.1, 10, 0.0),
            Err(ConfigError::ThrottleFactor(0.0))
        );
        assert!(matches!(
            FitConfig::new(0.1, 10, f64::INFINITY),
            Err(ConfigError::ThrottleFactor(_))
        ));
    }

    #[test]
    fn builders_keep_other_fields() {
        let config = FitConfig::new(0.04, 1000, 60.0)
            .unwrap()
            .with_throttle(true)
            .with_retain_trace(false)
            .with_strategy(SearchStrategy::Lattice);

        assert_eq!(config.convergence_threshold(), 0.04);
        assert_eq!(config.max_depth(), 1000);
        assert_eq!(config.throttle_factor(), 60.0);
        assert!(config.throttle());
        assert!(!config.retain_trace());
        assert_eq!(config.aggregate(), CostAggregate::SumOfSquares);
        assert_eq!(config.strategy(), SearchStrategy::Lattice);
        assert!((config.shrink_divisor() - 1.6).abs() < 1e-12);
    }

    #[test]
    fn failed_builder_does_not_produce_a_config() {
        let base = FitConfig::default();
        assert!(base.with_max_depth(0).is_err());
        // `base` is Copy and untouched.
        assert_eq!(base.max_depth(), 1000);
    }

    #[test]
    fn deserialize_applies_defaults_and_validation() {
        let config: FitConfig =
            serde_json::from_str(r#"{"convergence_threshold": 0.04, "throttle": true}"#).unwrap();
        assert_eq!(config.convergence_threshold(), 0.04);
        assert_eq!(config.max_depth(), 1000);
        assert!(config.throttle());

        let bad = serde_json::from_str::<FitConfig>(r#"{"max_depth": 0}"#);
        assert!(bad.is_err());

        let unknown = serde_json::from_str::<FitConfig>(r#"{"maxdepth": 5}"#);
        assert!(unknown.is_err());
    }

    #[test]
    fn serializes_round_trip_through_json() {
        let config = FitConfig::new(0.5, 42, 3.0)
            .unwrap()
            .with_aggregate(CostAggregate::MeanAbsolute);
        let json = serde_json::to_string(&config).unwrap();
        let back: FitConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
