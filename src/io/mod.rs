//! Input/output helpers.
//!
//! - fit report JSON read/write (`export`)
//! - observed vs fitted CSV export (`curve`)

pub mod curve;
pub mod export;

pub use curve::*;
pub use export::*;
