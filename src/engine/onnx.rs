//! ONNX Runtime backend.
//!
//! `Session::run` is blocking and needs exclusive access, so the session sits
//! behind `Arc<Mutex<_>>` and each call runs on the blocking thread pool.

use std::sync::{Arc, Mutex};

use ort::execution_providers::{CPUExecutionProvider, CUDAExecutionProvider};
use ort::session::Session;
use ort::value::Tensor;

use crate::engine::{EngineOutputs, ExecutionProvider, InferenceEngine, InputTensor, OutputTensor};
use crate::error::PredictError;

pub struct OnnxEngine {
    session: Arc<Mutex<Session>>,
    inputs: Vec<String>,
    outputs: Vec<String>,
}

fn load_error(e: impl std::fmt::Display) -> PredictError {
    PredictError::ModelLoad(e.to_string())
}

fn engine_error(e: impl std::fmt::Display) -> PredictError {
    PredictError::Engine(e.to_string())
}

impl OnnxEngine {
    /// Create a session from an in-memory model.
    pub fn from_memory(model: &[u8], provider: ExecutionProvider) -> Result<Self, PredictError> {
        let builder = Session::builder().map_err(load_error)?;
        let builder = match provider {
            ExecutionProvider::Cpu => {
                builder.with_execution_providers([CPUExecutionProvider::default().build()])
            }
            ExecutionProvider::Cuda => builder.with_execution_providers([
                CUDAExecutionProvider::default().build(),
                CPUExecutionProvider::default().build(),
            ]),
        }
        .map_err(load_error)?;
        let session = builder.commit_from_memory(model).map_err(load_error)?;

        let inputs: Vec<String> = session.inputs.iter().map(|i| i.name.clone()).collect();
        let outputs: Vec<String> = session.outputs.iter().map(|o| o.name.clone()).collect();
        if inputs.len() != 1 {
            return Err(PredictError::ModelLoad(format!(
                "model declares {} inputs, expected exactly one",
                inputs.len()
            )));
        }
        if outputs.is_empty() {
            return Err(PredictError::ModelLoad("model declares no outputs".to_string()));
        }

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            inputs,
            outputs,
        })
    }
}

impl InferenceEngine for OnnxEngine {
    fn input_names(&self) -> &[String] {
        &self.inputs
    }

    fn output_names(&self) -> &[String] {
        &self.outputs
    }

    async fn run(
        &self,
        input_name: &str,
        output_name: &str,
        tensor: InputTensor,
    ) -> Result<EngineOutputs, PredictError> {
        let session = Arc::clone(&self.session);
        let input_name = input_name.to_string();
        let output_name = output_name.to_string();

        tokio::task::spawn_blocking(move || {
            let mut session = session
                .lock()
                .map_err(|_| PredictError::Engine("session lock poisoned".to_string()))?;

            let shape: Vec<i64> = tensor.shape.iter().map(|&d| d as i64).collect();
            let value = Tensor::from_array((shape, tensor.data)).map_err(engine_error)?;
            let results = session
                .run(ort::inputs![input_name.as_str() => value])
                .map_err(engine_error)?;

            // Only the requested output is extracted; a second output of
            // another element type (e.g. an int64 label) is left untouched.
            let mut outputs = EngineOutputs::new();
            if let Some(value) = results.get(output_name.as_str()) {
                let (shape, data) = value.try_extract_tensor::<f32>().map_err(engine_error)?;
                outputs.insert(
                    output_name.clone(),
                    OutputTensor {
                        shape: shape.iter().copied().collect(),
                        data: data.to_vec(),
                    },
                );
            }
            Ok(outputs)
        })
        .await
        .map_err(|e| PredictError::Engine(format!("inference task failed: {e}")))?
    }
}
