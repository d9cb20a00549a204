//! Command-line parsing for the obesity-level predictor.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the encoding/inference code.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::engine::{Backend, ExecutionProvider, ModelSource};
use crate::io::parse_assignment;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "obp", version, about = "Obesity level predictor (16-feature tabular model)")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Predict the obesity level for one set of answers.
    Predict(PredictArgs),
    /// Print the normalized feature vector without running the model.
    Encode(EncodeArgs),
    /// Predict every row of a CSV file (header = feature names).
    Batch(BatchArgs),
    /// Print the encoding table, normalization statistics and labels.
    Tables,
    /// Launch the interactive form.
    ///
    /// Uses the same pipeline as `obp predict`, rendered with Ratatui.
    Tui(TuiArgs),
}

/// Where the model comes from and how to run it.
#[derive(Debug, Args, Clone)]
pub struct EngineArgs {
    /// Model artifact: a file path or an http(s) URL.
    #[arg(long, env = "OBP_MODEL", value_name = "PATH|URL")]
    pub model: Option<ModelSource>,

    /// Inference backend (`uniform` is a dry run that needs no model).
    #[arg(long, value_enum, env = "OBP_BACKEND", default_value_t = Backend::default())]
    pub backend: Backend,

    /// ONNX Runtime execution provider.
    #[arg(long, value_enum, default_value_t = ExecutionProvider::Cpu)]
    pub provider: ExecutionProvider,

    /// Reject unrecognized categorical values instead of falling back to the
    /// first declared category.
    #[arg(long, env = "OBP_STRICT")]
    pub strict: bool,
}

/// Raw answers for a single request.
#[derive(Debug, Args, Clone)]
pub struct InputArgs {
    /// JSON object of feature name -> value.
    #[arg(short = 'i', long, value_name = "JSON")]
    pub input: Option<PathBuf>,

    /// Set one feature, e.g. `--set Height=170` (overrides `--input`).
    #[arg(long = "set", value_name = "NAME=VALUE", value_parser = parse_assignment)]
    pub set: Vec<(String, String)>,
}

#[derive(Debug, Args, Clone)]
pub struct PredictArgs {
    #[command(flatten)]
    pub engine: EngineArgs,

    #[command(flatten)]
    pub input: InputArgs,

    /// Export the result (with metadata) to JSON.
    #[arg(long, value_name = "JSON")]
    pub export: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct EncodeArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Reject unrecognized categorical values.
    #[arg(long, env = "OBP_STRICT")]
    pub strict: bool,
}

#[derive(Debug, Args, Clone)]
pub struct BatchArgs {
    #[command(flatten)]
    pub engine: EngineArgs,

    /// CSV with a header row of feature names.
    #[arg(short = 'f', long, value_name = "CSV")]
    pub file: PathBuf,

    /// Export per-row results to CSV.
    #[arg(long, value_name = "CSV")]
    pub export: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct TuiArgs {
    #[command(flatten)]
    pub engine: EngineArgs,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn predict_collects_assignments() {
        let cli = Cli::try_parse_from([
            "obp",
            "predict",
            "--backend",
            "uniform",
            "--set",
            "Age=30",
            "--set",
            "Gender=Male",
        ])
        .unwrap();
        let Command::Predict(args) = cli.command else {
            panic!("expected predict");
        };
        assert_eq!(args.engine.backend, Backend::Uniform);
        assert_eq!(
            args.input.set,
            vec![
                ("Age".to_string(), "30".to_string()),
                ("Gender".to_string(), "Male".to_string())
            ]
        );
    }

    #[test]
    fn model_flag_accepts_urls() {
        let cli = Cli::try_parse_from([
            "obp",
            "batch",
            "-f",
            "rows.csv",
            "--model",
            "https://example.org/m.onnx",
        ])
        .unwrap();
        let Command::Batch(args) = cli.command else {
            panic!("expected batch");
        };
        assert_eq!(
            args.engine.model,
            Some(ModelSource::Url("https://example.org/m.onnx".to_string()))
        );
    }
}
