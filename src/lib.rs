//! `obesity-predict` library crate.
//!
//! The binary (`obp`) is a thin wrapper around this library so that:
//!
//! - the encoder and pipeline are testable without spawning processes
//! - the same prediction path serves the CLI, batch and TUI front-ends
//! - inference backends stay swappable behind one trait

pub mod app;
pub mod cli;
pub mod domain;
pub mod encode;
pub mod engine;
pub mod error;
pub mod io;
pub mod math;
pub mod report;
pub mod tui;
