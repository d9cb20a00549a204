//! Feature encoding: raw form values to the normalized model input vector.
//!
//! The encoder is a small, pure component so the pipeline, the batch path and
//! the `encode` command all share one implementation.

pub mod encoder;

pub use encoder::*;
