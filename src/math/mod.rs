//! Numeric helpers: z-score normalization and arg-max selection.

pub mod argmax;
pub mod zscore;

pub use argmax::*;
pub use zscore::*;
