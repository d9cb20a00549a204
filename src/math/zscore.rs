//! Z-score normalization.
//!
//! Each feature is standardized independently with fixed training-time
//! statistics:
//!
//! ```text
//! z_i = (x_i - mean_i) / std_i
//! ```
//!
//! Callers guarantee `std_i > 0` (checked once on the constant table).

use nalgebra::SVector;

/// Standardize a whole vector component-wise.
pub fn standardize<const D: usize>(
    values: &SVector<f64, D>,
    mean: &SVector<f64, D>,
    std: &SVector<f64, D>,
) -> SVector<f64, D> {
    (values - mean).component_div(std)
}
