//! Reporting utilities: terminal formatting of predictions, encodings and tables.

pub mod format;

pub use format::*;
