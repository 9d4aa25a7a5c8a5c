//! Model abstractions and the curve builder.
//!
//! Models are plain functions (or small types) so that the search code can
//! stay generic.

pub mod model;

pub use model::*;
