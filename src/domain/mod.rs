//! Domain types used throughout the crate.
//!
//! This module defines:
//!
//! - observations (`DataPoint`, `DataSet`)
//! - engine option enums (`CostAggregate`, `SearchStrategy`)
//! - run outcomes (`Termination`, `FitReport`)

pub mod types;

pub use types::*;
