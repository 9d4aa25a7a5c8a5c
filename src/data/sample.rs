//! Synthetic data sets: a known model sampled on a grid, plus seeded noise.

use clap::ValueEnum;
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::{Normal, Uniform};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{DataPoint, DataSet};
use crate::error::FitError;
use crate::models::{Model, build_curve};

/// Shape of the noise added to each clean model value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum NoiseKind {
    None,
    /// Uniform on `[-amplitude, amplitude]`.
    #[default]
    Uniform,
    /// Normal with mean 0 and standard deviation `amplitude`.
    Gaussian,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Noise {
    pub kind: NoiseKind,
    pub amplitude: f64,
}

impl Noise {
    pub fn none() -> Self {
        Self {
            kind: NoiseKind::None,
            amplitude: 0.0,
        }
    }

    pub fn uniform(amplitude: f64) -> Self {
        Self {
            kind: NoiseKind::Uniform,
            amplitude,
        }
    }

    pub fn gaussian(sigma: f64) -> Self {
        Self {
            kind: NoiseKind::Gaussian,
            amplitude: sigma,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SampleError {
    #[error("noise amplitude must be finite and >= 0 (got {0})")]
    Amplitude(f64),

    #[error("grid needs at least one sample")]
    EmptyGrid,

    #[error("model value at sample {index} is not finite ({value})")]
    NonFinite { index: usize, value: f64 },

    #[error(transparent)]
    Fit(#[from] FitError),
}

/// `count` evenly spaced values from `start` to `end` inclusive.
///
/// `count == 1` yields `[start]`; `count == 0` yields an empty vector.
pub fn linspace(start: f64, end: f64, count: usize) -> Vec<f64> {
    match count {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (count - 1) as f64;
            (0..count)
                .map(|i| if i + 1 == count { end } else { start + step * i as f64 })
                .collect()
        }
    }
}

/// Sample `model` at each `x` and add seeded noise to the observed values.
///
/// The same seed always produces the same data set.
pub fn generate_dataset<M: Model + ?Sized>(
    model: &M,
    params: &[f64],
    constants: &[f64],
    xs: &[f64],
    noise: Noise,
    seed: u64,
) -> Result<DataSet, SampleError> {
    if xs.is_empty() {
        return Err(SampleError::EmptyGrid);
    }
    if !(noise.amplitude.is_finite() && noise.amplitude >= 0.0) {
        return Err(SampleError::Amplitude(noise.amplitude));
    }

    let samples: Vec<[f64; 1]> = xs.iter().map(|&x| [x]).collect();
    let clean = build_curve(model, params, constants, &samples)?;
    if let Some((index, &value)) = clean.iter().enumerate().find(|(_, v)| !v.is_finite()) {
        return Err(SampleError::NonFinite { index, value });
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let source = NoiseSource::new(noise)?;

    let points = xs
        .iter()
        .zip(clean)
        .map(|(&x, y)| DataPoint::scalar(x, y + source.draw(&mut rng)))
        .collect();
    Ok(points)
}

enum NoiseSource {
    Silent,
    Uniform(Uniform<f64>),
    Gaussian(Normal<f64>),
}

impl NoiseSource {
    fn new(noise: Noise) -> Result<Self, SampleError> {
        let a = noise.amplitude;
        if a == 0.0 {
            return Ok(NoiseSource::Silent);
        }
        Ok(match noise.kind {
            NoiseKind::None => NoiseSource::Silent,
            NoiseKind::Uniform => NoiseSource::Uniform(Uniform::new_inclusive(-a, a)),
            NoiseKind::Gaussian => {
                NoiseSource::Gaussian(Normal::new(0.0, a).map_err(|_| SampleError::Amplitude(a))?)
            }
        })
    }

    fn draw(&self, rng: &mut StdRng) -> f64 {
        match self {
            NoiseSource::Silent => 0.0,
            NoiseSource::Uniform(dist) => dist.sample(rng),
            NoiseSource::Gaussian(dist) => dist.sample(rng),
        }
    }
}
