//! Numeric utilities that stand apart from the search engine.

pub mod derivative;
pub mod elementwise;

pub use derivative::derivative;
