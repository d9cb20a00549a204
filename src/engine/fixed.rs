//! Engine that returns a fixed probability vector.
//!
//! Backs the `uniform` dry-run backend and stands in for a real model in tests.
//! It enforces the same input contract a real session does, so an encoder or
//! packaging regression still fails loudly.

use crate::domain::{CLASS_COUNT, INPUT_SHAPE};
use crate::engine::{EngineOutputs, InferenceEngine, InputTensor, OutputTensor};
use crate::error::PredictError;

const INPUT_NAME: &str = "input";
const OUTPUT_NAME: &str = "softmax";

#[derive(Debug, Clone)]
pub struct FixedEngine {
    inputs: Vec<String>,
    outputs: Vec<String>,
    probabilities: Vec<f32>,
}

impl FixedEngine {
    /// `1/7` for every class.
    pub fn uniform() -> Self {
        Self::with_probabilities(vec![1.0 / CLASS_COUNT as f32; CLASS_COUNT])
    }

    pub fn with_probabilities(probabilities: Vec<f32>) -> Self {
        Self {
            inputs: vec![INPUT_NAME.to_string()],
            outputs: vec![OUTPUT_NAME.to_string()],
            probabilities,
        }
    }

    /// Declare an additional output after the probabilities. It is never
    /// produced: asking for it is an engine error, like a tensor of the wrong
    /// element type would be.
    pub fn with_extra_output(mut self, name: &str) -> Self {
        self.outputs.push(name.to_string());
        self
    }
}

impl InferenceEngine for FixedEngine {
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
        if input_name != INPUT_NAME {
            return Err(PredictError::Engine(format!("unknown input '{input_name}'")));
        }
        if output_name != OUTPUT_NAME {
            return Err(PredictError::Engine(format!(
                "output '{output_name}' cannot be read as f32"
            )));
        }
        if tensor.shape != INPUT_SHAPE {
            return Err(PredictError::Engine(format!(
                "input shape {:?} does not match expected {:?}",
                tensor.shape, INPUT_SHAPE
            )));
        }
        let expected_len: usize = INPUT_SHAPE.iter().product();
        if tensor.data.len() != expected_len {
            return Err(PredictError::Engine(format!(
                "input has {} values, shape requires {expected_len}",
                tensor.data.len()
            )));
        }

        let output = OutputTensor {
            shape: vec![1, self.probabilities.len() as i64],
            data: self.probabilities.clone(),
        };
        Ok(EngineOutputs::from([(OUTPUT_NAME.to_string(), output)]))
    }
}
