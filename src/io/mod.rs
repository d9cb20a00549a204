//! Input/output helpers.
//!
//! - raw form input from JSON, `NAME=VALUE` flags and CSV (`input`)
//! - prediction exports (JSON/CSV) (`export`)

pub mod export;
pub mod input;

pub use export::*;
pub use input::*;
