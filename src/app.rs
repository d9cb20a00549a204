//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and sets up logging
//! - loads the model session once
//! - runs single, batch or interactive predictions
//! - writes optional exports

use std::sync::Arc;

use chrono::Utc;
use clap::Parser;
use tracing::{debug, info};

use crate::cli::{BatchArgs, Command, EncodeArgs, EngineArgs, InputArgs, PredictArgs, TuiArgs};
use crate::domain::{EncodingPolicy, RawInput};
use crate::encode::FeatureEncoder;
use crate::engine::{EngineConfig, load_engine};
use crate::error::AppError;

pub mod pipeline;

use pipeline::Predictor;

/// Entry point for the `obp` binary.
pub async fn run() -> Result<(), AppError> {
    // We want `obp` and `obp --backend uniform` to behave like `obp tui ...`.
    //
    // Clap requires a subcommand name, so we do a small, explicit rewrite of the
    // argv list before parsing.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    // The TUI owns the terminal; log lines would corrupt the screen.
    let default_filter = match cli.command {
        Command::Tui(_) => "off",
        _ => "obesity_predict=info",
    };
    init_tracing(default_filter);

    match cli.command {
        Command::Predict(args) => handle_predict(args).await,
        Command::Encode(args) => handle_encode(args),
        Command::Batch(args) => handle_batch(args).await,
        Command::Tables => {
            println!("{}", crate::report::format_tables());
            Ok(())
        }
        Command::Tui(args) => handle_tui(args).await,
    }
}

async fn handle_predict(args: PredictArgs) -> Result<(), AppError> {
    let raw = raw_input_from_args(&args.input)?;
    let config = engine_config_from_args(&args.engine);
    let engine = load_engine(&config).await?;
    let backend = engine.backend();
    let predictor = Predictor::new(engine, policy_from(args.engine.strict));

    let prediction = predictor.run_request(&raw).await?;
    println!("{}", crate::report::format_prediction(&prediction));

    if let Some(path) = &args.export {
        let record = crate::io::PredictionRecord::new(&prediction, backend, Utc::now());
        crate::io::write_prediction_json(path, &record)?;
        info!(path = %path.display(), "prediction exported");
    }
    Ok(())
}

fn handle_encode(args: EncodeArgs) -> Result<(), AppError> {
    let raw = raw_input_from_args(&args.input)?;
    let encoded = FeatureEncoder::canonical(policy_from(args.strict)).encode(&raw)?;
    println!("{}", crate::report::format_encoding(&raw, &encoded));
    Ok(())
}

async fn handle_batch(args: BatchArgs) -> Result<(), AppError> {
    let rows = crate::io::read_input_csv(&args.file)?;
    info!(rows = rows.len(), file = %args.file.display(), "batch loaded");

    let config = engine_config_from_args(&args.engine);
    let engine = load_engine(&config).await?;
    let predictor = Predictor::new(engine, policy_from(args.engine.strict));

    let results = pipeline::run_batch(&predictor, &rows).await;
    println!("{}", crate::report::format_batch_summary(&results));

    if let Some(path) = &args.export {
        crate::io::write_batch_csv(path, &results)?;
        info!(path = %path.display(), "batch results exported");
    }
    Ok(())
}

async fn handle_tui(args: TuiArgs) -> Result<(), AppError> {
    let config = engine_config_from_args(&args.engine);
    let engine = load_engine(&config).await?;
    let predictor = Arc::new(Predictor::new(engine, policy_from(args.engine.strict)));

    // The form loop blocks on terminal events; predictions are spawned back
    // onto this runtime through the handle.
    let runtime = tokio::runtime::Handle::current();
    tokio::task::spawn_blocking(move || crate::tui::run(predictor, runtime))
        .await
        .map_err(|e| AppError::new(4, format!("TUI task failed: {e}")))?
}

pub fn engine_config_from_args(args: &EngineArgs) -> EngineConfig {
    EngineConfig {
        backend: args.backend,
        model: args.model.clone(),
        provider: args.provider,
    }
}

pub fn policy_from(strict: bool) -> EncodingPolicy {
    if strict {
        EncodingPolicy::Strict
    } else {
        EncodingPolicy::Lenient
    }
}

/// Build the raw request: the JSON file first, then `--set` overrides.
pub fn raw_input_from_args(args: &InputArgs) -> Result<RawInput, AppError> {
    let mut raw = match &args.input {
        Some(path) => crate::io::read_input_json(path)?,
        None => RawInput::new(),
    };
    let overrides: RawInput = args.set.iter().cloned().collect();
    raw.merge(overrides);

    if raw.is_empty() {
        return Err(AppError::new(
            2,
            "No input given: pass --input <JSON> and/or --set NAME=VALUE.",
        ));
    }
    debug!(fields = raw.len(), "raw input assembled");
    Ok(raw)
}

/// `RUST_LOG` wins; otherwise `default_filter`. Logs go to stderr so stdout
/// stays clean for reports.
fn init_tracing(default_filter: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

/// Rewrite argv so `obp` defaults to `obp tui`.
///
/// Rules:
/// - `obp`                      -> `obp tui`
/// - `obp --model m.onnx ...`   -> `obp tui --model m.onnx ...`
/// - `obp --help/--version/-h`  -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("tui".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(
        arg1.as_str(),
        "predict" | "encode" | "batch" | "tables" | "tui"
    );
    if is_subcommand {
        return argv;
    }

    // If the first token is a flag, treat it as "tui flags".
    if arg1.starts_with('-') {
        argv.insert(1, "tui".to_string());
        return argv;
    }

    argv
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn bare_binary_opens_the_tui() {
        assert_eq!(rewrite_args(argv(&["obp"])), argv(&["obp", "tui"]));
    }

    #[test]
    fn leading_flags_go_to_the_tui() {
        assert_eq!(
            rewrite_args(argv(&["obp", "--backend", "uniform"])),
            argv(&["obp", "tui", "--backend", "uniform"])
        );
    }

    #[test]
    fn subcommands_and_help_are_untouched() {
        for args in [
            argv(&["obp", "predict", "--set", "Age=3"]),
            argv(&["obp", "tables"]),
            argv(&["obp", "--help"]),
            argv(&["obp", "-V"]),
        ] {
            assert_eq!(rewrite_args(args.clone()), args);
        }
    }

    #[test]
    fn set_overrides_json_input() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, br#"{"Age": 24, "Gender": "Female"}"#).unwrap();

        let args = InputArgs {
            input: Some(file.path().to_path_buf()),
            set: vec![("Age".to_string(), "40".to_string())],
        };
        let raw = raw_input_from_args(&args).unwrap();
        assert_eq!(raw.get("Age"), Some("40"));
        assert_eq!(raw.get("Gender"), Some("Female"));
    }

    #[test]
    fn empty_input_is_rejected() {
        let args = InputArgs {
            input: None,
            set: Vec::new(),
        };
        assert_eq!(raw_input_from_args(&args).unwrap_err().exit_code(), 2);
    }

    #[test]
    fn strict_flag_selects_policy() {
        assert_eq!(policy_from(true), EncodingPolicy::Strict);
        assert_eq!(policy_from(false), EncodingPolicy::Lenient);
    }
}
