//! Data sources.
//!
//! - synthetic data sets sampled from a known model (`sample`)

pub mod sample;

pub use sample::*;
