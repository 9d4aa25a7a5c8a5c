//! `ndfit` library crate: N-dimensional derivative-free curve fitting.
//!
//! The binary (`ndfit`) is a thin wrapper around this library so that:
//!
//! - the engine is testable without spawning processes
//! - models, configs and results are usable from other crates
//!
//! Typical use: build a [`fit::FitConfig`] and a [`domain::DataSet`], supply a
//! model and an error function (closures work), call [`fit::run`], then read
//! the [`fit::FitResult`] or rebuild a curve from it.

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod report;
