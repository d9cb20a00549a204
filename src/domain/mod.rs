//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the feature schema, normalization constants and label set (`types`)
//! - the canonical, versioned values of those tables (`tables`)
//! - per-request values (`RawInput`, `EncodedVector`, `PredictionResult`)

pub mod tables;
pub mod types;

pub use tables::*;
pub use types::*;
