//! Error types.
//!
//! `PredictError` is the per-request taxonomy produced by the encoder and the
//! prediction pipeline. `AppError` is what the binary reports: a message plus a
//! process exit code.

use thiserror::Error;

/// Placeholder label shown when the model returns an index outside the label set.
pub const UNKNOWN_LABEL: &str = "Unknown";

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

/// Failures of a single encode/predict request, plus the fatal model-load case.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PredictError {
    #[error("failed to load model: {0}")]
    ModelLoad(String),

    #[error("missing value for feature '{feature}'")]
    MissingFeature { feature: &'static str },

    #[error("feature '{feature}' expects a number, got '{value}'")]
    InvalidNumericValue { feature: &'static str, value: String },

    /// Only produced under `EncodingPolicy::Strict`.
    #[error("feature '{feature}' has no category '{value}' (expected one of: {expected})")]
    UnrecognizedCategory {
        feature: &'static str,
        value: String,
        expected: String,
    },

    #[error("model output '{output}' has {actual} values, expected {expected}")]
    OutputShapeMismatch {
        output: String,
        expected: usize,
        actual: usize,
    },

    #[error("model selected class index {index}, outside the {len} known labels")]
    UnknownClass { index: usize, len: usize },

    #[error("a prediction is already in progress")]
    Busy,

    #[error("inference engine error: {0}")]
    Engine(String),
}

impl PredictError {
    /// Text for the status line / terminal output.
    pub fn status_message(&self) -> String {
        match self {
            PredictError::UnknownClass { .. } => format!("Result: {UNKNOWN_LABEL} ({self})"),
            _ => format!("Error: {self}"),
        }
    }

    fn exit_code(&self) -> u8 {
        match self {
            PredictError::ModelLoad(_) => 3,
            PredictError::MissingFeature { .. }
            | PredictError::InvalidNumericValue { .. }
            | PredictError::UnrecognizedCategory { .. } => 2,
            PredictError::OutputShapeMismatch { .. }
            | PredictError::UnknownClass { .. }
            | PredictError::Busy
            | PredictError::Engine(_) => 4,
        }
    }
}

impl From<PredictError> for AppError {
    fn from(err: PredictError) -> Self {
        AppError::new(err.exit_code(), err.status_message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predict_errors_map_to_exit_codes() {
        let load: AppError = PredictError::ModelLoad("no such file".to_string()).into();
        assert_eq!(load.exit_code(), 3);

        let missing: AppError = PredictError::MissingFeature { feature: "Age" }.into();
        assert_eq!(missing.exit_code(), 2);
        assert_eq!(missing.to_string(), "Error: missing value for feature 'Age'");

        let shape: AppError = PredictError::OutputShapeMismatch {
            output: "softmax".to_string(),
            expected: 7,
            actual: 3,
        }
        .into();
        assert_eq!(shape.exit_code(), 4);
    }

    #[test]
    fn unknown_class_surfaces_placeholder_label() {
        let msg = PredictError::UnknownClass { index: 9, len: 7 }.status_message();
        assert!(msg.starts_with("Result: Unknown"), "{msg}");
    }

    #[test]
    fn unknown_class_keeps_placeholder_at_the_binary_edge() {
        let err: AppError = PredictError::UnknownClass { index: 9, len: 7 }.into();
        assert_eq!(err.exit_code(), 4);
        assert!(err.to_string().starts_with("Result: Unknown ("), "{err}");
    }
}
