//! Inference engine boundary.
//!
//! The model runtime is an external collaborator with a fixed contract:
//! - a session declares its input and output names
//! - `run` takes one tensor bound to an input name and returns output tensors by name
//!
//! `Engine` is the concrete session the binary loads once at startup; the
//! pipeline is generic over `InferenceEngine` so tests can substitute their own.

use std::collections::HashMap;
use std::future::Future;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::PredictError;

pub mod artifact;
#[cfg(feature = "onnx")]
pub mod onnx;
pub mod fixed;

pub use artifact::ModelSource;
pub use fixed::FixedEngine;
#[cfg(feature = "onnx")]
pub use onnx::OnnxEngine;

/// Dense `f32` tensor handed to the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct InputTensor {
    pub shape: Vec<usize>,
    pub data: Vec<f32>,
}

/// Dense `f32` tensor returned by the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputTensor {
    pub shape: Vec<i64>,
    pub data: Vec<f32>,
}

pub type EngineOutputs = HashMap<String, OutputTensor>;

/// A loaded model session.
pub trait InferenceEngine: Send + Sync {
    fn input_names(&self) -> &[String];

    fn output_names(&self) -> &[String];

    /// Run the model once and fetch `output_name` only; other declared
    /// outputs are neither extracted nor validated. This is the pipeline's
    /// only suspension point.
    fn run(
        &self,
        input_name: &str,
        output_name: &str,
        tensor: InputTensor,
    ) -> impl Future<Output = Result<EngineOutputs, PredictError>> + Send;
}

/// Which runtime backs predictions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// ONNX Runtime (requires the `onnx` cargo feature).
    Onnx,
    /// Dry run: every class gets probability 1/7.
    Uniform,
}

impl Default for Backend {
    fn default() -> Self {
        #[cfg(feature = "onnx")]
        return Self::Onnx;
        #[cfg(not(feature = "onnx"))]
        return Self::Uniform;
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Onnx => write!(f, "onnx"),
            Self::Uniform => write!(f, "uniform"),
        }
    }
}

/// ONNX Runtime execution provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionProvider {
    #[default]
    Cpu,
    /// CUDA with CPU fallback.
    Cuda,
}

/// Everything needed to create the session.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub backend: Backend,
    pub model: Option<ModelSource>,
    pub provider: ExecutionProvider,
}

/// The session the application owns for its whole lifetime.
pub enum Engine {
    Fixed(FixedEngine),
    #[cfg(feature = "onnx")]
    Onnx(OnnxEngine),
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("backend", &self.backend().to_string())
            .field("inputs", &self.input_names())
            .field("outputs", &self.output_names())
            .finish()
    }
}

impl Engine {
    pub fn backend(&self) -> Backend {
        match self {
            Engine::Fixed(_) => Backend::Uniform,
            #[cfg(feature = "onnx")]
            Engine::Onnx(_) => Backend::Onnx,
        }
    }
}

impl InferenceEngine for Engine {
    fn input_names(&self) -> &[String] {
        match self {
            Engine::Fixed(e) => e.input_names(),
            #[cfg(feature = "onnx")]
            Engine::Onnx(e) => e.input_names(),
        }
    }

    fn output_names(&self) -> &[String] {
        match self {
            Engine::Fixed(e) => e.output_names(),
            #[cfg(feature = "onnx")]
            Engine::Onnx(e) => e.output_names(),
        }
    }

    async fn run(
        &self,
        input_name: &str,
        output_name: &str,
        tensor: InputTensor,
    ) -> Result<EngineOutputs, PredictError> {
        match self {
            Engine::Fixed(e) => e.run(input_name, output_name, tensor).await,
            #[cfg(feature = "onnx")]
            Engine::Onnx(e) => e.run(input_name, output_name, tensor).await,
        }
    }
}

/// Create the session once at startup.
///
/// Every failure here is a `ModelLoad` error: predictions cannot proceed.
pub async fn load_engine(config: &EngineConfig) -> Result<Engine, PredictError> {
    match config.backend {
        Backend::Uniform => {
            warn!("uniform backend selected: predictions are a dry run, not model output");
            Ok(Engine::Fixed(FixedEngine::uniform()))
        }
        Backend::Onnx => {
            let source = config.model.as_ref().ok_or_else(|| {
                PredictError::ModelLoad("no model configured (pass --model or set OBP_MODEL)".to_string())
            })?;
            load_onnx(source, config.provider).await
        }
    }
}

#[cfg(feature = "onnx")]
async fn load_onnx(source: &ModelSource, provider: ExecutionProvider) -> Result<Engine, PredictError> {
    let bytes = source.fetch().await?;
    let engine = OnnxEngine::from_memory(&bytes, provider)?;
    info!(
        model = %source,
        inputs = ?engine.input_names(),
        outputs = ?engine.output_names(),
        "model session ready"
    );
    Ok(Engine::Onnx(engine))
}

#[cfg(not(feature = "onnx"))]
async fn load_onnx(source: &ModelSource, _provider: ExecutionProvider) -> Result<Engine, PredictError> {
    info!(model = %source, "onnx backend requested");
    Err(PredictError::ModelLoad(
        "this build has no ONNX support; rebuild with `--features onnx` or use `--backend uniform`"
            .to_string(),
    ))
}
