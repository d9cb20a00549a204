//! Shared prediction pipeline used by the CLI, batch and TUI front-ends.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! raw input -> encode -> tensor packaging -> inference -> arg-max -> label
//!
//! The front-ends can then focus on presentation (printing vs widgets).

use rayon::prelude::*;
use serde::Serialize;
use tokio::sync::{Mutex, watch};
use tracing::{debug, info, warn};

use crate::domain::{
    EncodeWarning, EncodedVector, EncodingPolicy, INPUT_SHAPE, LABEL_SET, LabelSet,
    PredictionResult, RawInput,
};
use crate::encode::FeatureEncoder;
use crate::engine::{InferenceEngine, InputTensor, OutputTensor};
use crate::error::PredictError;
use crate::math::argmax;

/// Externally visible progress of the current (or last) request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Encoding,
    AwaitingInference,
    Done,
    Failed,
}

impl PipelineState {
    pub fn label(self) -> &'static str {
        match self {
            PipelineState::Idle => "idle",
            PipelineState::Encoding => "encoding",
            PipelineState::AwaitingInference => "computing",
            PipelineState::Done => "done",
            PipelineState::Failed => "failed",
        }
    }

    pub fn is_in_flight(self) -> bool {
        matches!(self, PipelineState::Encoding | PipelineState::AwaitingInference)
    }
}

/// A prediction together with any encoder fallback warnings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub result: PredictionResult,
    pub warnings: Vec<EncodeWarning>,
}

/// Owns the loaded session and runs requests against it, one at a time.
pub struct Predictor<E> {
    engine: E,
    encoder: FeatureEncoder<'static>,
    labels: &'static LabelSet,
    in_flight: Mutex<()>,
    state: watch::Sender<PipelineState>,
}

impl<E> std::fmt::Debug for Predictor<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Predictor")
            .field("policy", &self.encoder.policy())
            .field("state", &*self.state.borrow())
            .finish()
    }
}

impl<E: InferenceEngine> Predictor<E> {
    pub fn new(engine: E, policy: EncodingPolicy) -> Self {
        let (state, _) = watch::channel(PipelineState::Idle);
        Self {
            engine,
            encoder: FeatureEncoder::canonical(policy),
            labels: &LABEL_SET,
            in_flight: Mutex::new(()),
            state,
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn encoder(&self) -> &FeatureEncoder<'static> {
        &self.encoder
    }

    pub fn state(&self) -> PipelineState {
        *self.state.borrow()
    }

    /// Watch state transitions (for status lines).
    pub fn subscribe(&self) -> watch::Receiver<PipelineState> {
        self.state.subscribe()
    }

    /// Encode and predict one request.
    ///
    /// Returns `Busy` if another request is still outstanding.
    pub async fn run_request(&self, raw: &RawInput) -> Result<Prediction, PredictError> {
        let _guard = self.in_flight.try_lock().map_err(|_| PredictError::Busy)?;
        self.state.send_replace(PipelineState::Encoding);

        let outcome = match self.encoder.encode(raw) {
            Ok(encoded) => self.infer(&encoded.vector).await.map(|result| Prediction {
                result,
                warnings: encoded.warnings,
            }),
            Err(e) => Err(e),
        };
        self.finish(outcome.as_ref().map(|p| &p.result));
        outcome
    }

    /// Predict on an already-encoded vector.
    pub async fn predict(&self, vector: &EncodedVector) -> Result<PredictionResult, PredictError> {
        let _guard = self.in_flight.try_lock().map_err(|_| PredictError::Busy)?;
        let outcome = self.infer(vector).await;
        self.finish(outcome.as_ref());
        outcome
    }

    async fn infer(&self, vector: &EncodedVector) -> Result<PredictionResult, PredictError> {
        let tensor = package(vector);
        let input_name = self
            .engine
            .input_names()
            .first()
            .ok_or_else(|| PredictError::Engine("model declares no inputs".to_string()))?;
        let output_name = self
            .engine
            .output_names()
            .first()
            .cloned()
            .ok_or_else(|| PredictError::Engine("model declares no outputs".to_string()))?;

        self.state.send_replace(PipelineState::AwaitingInference);
        debug!(input = %input_name, shape = ?tensor.shape, "submitting inference request");
        let mut outputs = self.engine.run(input_name, &output_name, tensor).await?;

        let output = outputs
            .remove(&output_name)
            .ok_or_else(|| PredictError::OutputShapeMismatch {
                output: output_name.clone(),
                expected: self.labels.len(),
                actual: 0,
            })?;
        interpret(&output_name, output, self.labels)
    }

    fn finish(&self, outcome: Result<&PredictionResult, &PredictError>) {
        match outcome {
            Ok(result) => {
                info!(
                    class = result.class.key(),
                    confidence = result.confidence,
                    "prediction complete"
                );
                self.state.send_replace(PipelineState::Done);
            }
            Err(e) => {
                warn!(error = %e, "prediction failed");
                self.state.send_replace(PipelineState::Failed);
            }
        }
    }
}

/// Wrap the vector in the `[1, 1, 16, 1]` tensor the model accepts.
pub fn package(vector: &EncodedVector) -> InputTensor {
    InputTensor {
        shape: INPUT_SHAPE.to_vec(),
        data: vector.to_f32_vec(),
    }
}

/// Turn the output tensor into a `PredictionResult`.
///
/// The declared shape must account for exactly the values returned, and the
/// flat length must match the label set.
pub fn interpret(
    output_name: &str,
    output: OutputTensor,
    labels: &LabelSet,
) -> Result<PredictionResult, PredictError> {
    let OutputTensor { shape, data: probabilities } = output;
    let declared = shape.iter().try_fold(1usize, |acc, &d| {
        usize::try_from(d).ok().and_then(|d| acc.checked_mul(d))
    });
    if declared != Some(probabilities.len()) {
        return Err(PredictError::OutputShapeMismatch {
            output: output_name.to_string(),
            expected: labels.len(),
            actual: declared.unwrap_or(0),
        });
    }
    if probabilities.len() != labels.len() {
        return Err(PredictError::OutputShapeMismatch {
            output: output_name.to_string(),
            expected: labels.len(),
            actual: probabilities.len(),
        });
    }

    let index = argmax(&probabilities).ok_or_else(|| PredictError::OutputShapeMismatch {
        output: output_name.to_string(),
        expected: labels.len(),
        actual: 0,
    })?;
    let class = labels.get(index).ok_or(PredictError::UnknownClass {
        index,
        len: labels.len(),
    })?;

    Ok(PredictionResult {
        index,
        class,
        confidence: f64::from(probabilities[index]) * 100.0,
        probabilities,
    })
}

/// Run many requests: encode in parallel, then predict strictly one after another.
///
/// Each row gets its own outcome; one bad row does not stop the batch.
pub async fn run_batch<E: InferenceEngine>(
    predictor: &Predictor<E>,
    rows: &[RawInput],
) -> Vec<Result<Prediction, PredictError>> {
    let encoder = *predictor.encoder();
    let encoded: Vec<_> = rows.par_iter().map(|raw| encoder.encode(raw)).collect();

    let mut out = Vec::with_capacity(encoded.len());
    for item in encoded {
        let outcome = match item {
            Ok(encoded) => predictor
                .predict(&encoded.vector)
                .await
                .map(|result| Prediction {
                    result,
                    warnings: encoded.warnings,
                }),
            Err(e) => Err(e),
        };
        out.push(outcome);
    }
    out
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::domain::{CLASS_COUNT, FEATURE_COUNT, ObesityClass};
    use crate::encode::example_input;
    use crate::engine::{EngineOutputs, FixedEngine};
    use tokio::sync::Notify;

    #[tokio::test]
    async fn example_with_uniform_model_selects_first_class() {
        let predictor = Predictor::new(FixedEngine::uniform(), EncodingPolicy::Lenient);
        let prediction = predictor.run_request(&example_input()).await.unwrap();

        assert_eq!(prediction.result.index, 0);
        assert_eq!(prediction.result.class, ObesityClass::InsufficientWeight);
        assert!((prediction.result.confidence - 14.2857).abs() < 1e-3);
        assert_eq!(prediction.result.probabilities.len(), CLASS_COUNT);
        assert!(prediction.warnings.is_empty());
        assert_eq!(predictor.state(), PipelineState::Done);
    }

    #[tokio::test]
    async fn tie_break_prefers_first_maximum() {
        let engine = FixedEngine::with_probabilities(vec![0.2, 0.5, 0.5, 0.1, 0.0, 0.0, 0.0]);
        let predictor = Predictor::new(engine, EncodingPolicy::Lenient);
        let prediction = predictor.run_request(&example_input()).await.unwrap();
        assert_eq!(prediction.result.index, 1);
        assert_eq!(prediction.result.class, ObesityClass::NormalWeight);
        assert!((prediction.result.confidence - 50.0).abs() < 1e-4);
    }

    #[tokio::test]
    async fn wrong_output_length_is_a_shape_mismatch() {
        let engine = FixedEngine::with_probabilities(vec![0.5, 0.5, 0.0]);
        let predictor = Predictor::new(engine, EncodingPolicy::Lenient);
        let err = predictor.run_request(&example_input()).await.unwrap_err();
        assert_eq!(
            err,
            PredictError::OutputShapeMismatch {
                output: "softmax".to_string(),
                expected: CLASS_COUNT,
                actual: 3,
            }
        );
        assert_eq!(predictor.state(), PipelineState::Failed);
    }

    #[tokio::test]
    async fn encoder_errors_fail_the_request_but_not_the_session() {
        let predictor = Predictor::new(FixedEngine::uniform(), EncodingPolicy::Lenient);
        let mut raw = example_input();
        raw.insert("Age", "twenty");
        let err = predictor.run_request(&raw).await.unwrap_err();
        assert!(matches!(err, PredictError::InvalidNumericValue { feature: "Age", .. }));
        assert_eq!(predictor.state(), PipelineState::Failed);

        assert!(predictor.run_request(&example_input()).await.is_ok());
        assert_eq!(predictor.state(), PipelineState::Done);
    }

    #[tokio::test]
    async fn fallback_warnings_are_returned_with_the_prediction() {
        let predictor = Predictor::new(FixedEngine::uniform(), EncodingPolicy::Lenient);
        let mut raw = example_input();
        raw.insert("CALC", "Rarely");
        let prediction = predictor.run_request(&raw).await.unwrap();
        assert_eq!(prediction.warnings.len(), 1);
        assert_eq!(prediction.warnings[0].feature, "CALC");
    }

    #[test]
    fn packaged_tensor_always_has_model_shape() {
        let predictor = Predictor::new(FixedEngine::uniform(), EncodingPolicy::Lenient);
        let mut raw = example_input();
        for weight in ["40", "86.5", "250"] {
            raw.insert("Weight", weight);
            let encoded = predictor.encoder().encode(&raw).unwrap();
            let tensor = package(&encoded.vector);
            assert_eq!(tensor.shape, vec![1, 1, FEATURE_COUNT, 1]);
            assert_eq!(tensor.data.len(), FEATURE_COUNT);
        }
    }

    fn output(data: Vec<f32>) -> OutputTensor {
        OutputTensor {
            shape: vec![1, data.len() as i64],
            data,
        }
    }

    #[test]
    fn declared_shape_must_cover_the_data() {
        let tensor = OutputTensor {
            shape: vec![1, 8],
            data: vec![1.0 / 7.0; 7],
        };
        let err = interpret("softmax", tensor, &LABEL_SET).unwrap_err();
        assert!(matches!(err, PredictError::OutputShapeMismatch { actual: 8, .. }));

        let dynamic = OutputTensor {
            shape: vec![-1, 7],
            data: vec![1.0 / 7.0; 7],
        };
        assert!(interpret("softmax", dynamic, &LABEL_SET).is_err());
    }

    #[tokio::test]
    async fn only_the_first_output_is_read() {
        let engine = FixedEngine::uniform().with_extra_output("label");
        let predictor = Predictor::new(engine, EncodingPolicy::Lenient);
        let prediction = predictor.run_request(&example_input()).await.unwrap();
        assert_eq!(prediction.result.index, 0);
        assert_eq!(predictor.state(), PipelineState::Done);
    }

    #[test]
    fn empty_output_is_a_shape_mismatch() {
        let err = interpret("softmax", output(vec![]), &LABEL_SET).unwrap_err();
        assert!(matches!(err, PredictError::OutputShapeMismatch { actual: 0, .. }));
    }

    #[test]
    fn confidence_is_winning_probability_in_percent() {
        let result = interpret(
            "softmax",
            output(vec![0.05, 0.05, 0.1, 0.1, 0.6, 0.05, 0.05]),
            &LABEL_SET,
        )
        .unwrap();
        assert_eq!(result.class, ObesityClass::ObesityTypeIII);
        assert!((result.confidence - 60.0).abs() < 1e-4);
    }

    /// Engine that blocks until released, to observe the in-flight window.
    struct GatedEngine {
        inner: FixedEngine,
        gate: Notify,
    }

    impl InferenceEngine for GatedEngine {
        fn input_names(&self) -> &[String] {
            self.inner.input_names()
        }

        fn output_names(&self) -> &[String] {
            self.inner.output_names()
        }

        async fn run(
            &self,
            input_name: &str,
            output_name: &str,
            tensor: InputTensor,
        ) -> Result<EngineOutputs, PredictError> {
            self.gate.notified().await;
            self.inner.run(input_name, output_name, tensor).await
        }
    }

    #[tokio::test]
    async fn second_request_while_in_flight_is_rejected() {
        let predictor = Arc::new(Predictor::new(
            GatedEngine {
                inner: FixedEngine::uniform(),
                gate: Notify::new(),
            },
            EncodingPolicy::Lenient,
        ));
        let mut states = predictor.subscribe();

        let first = {
            let predictor = Arc::clone(&predictor);
            tokio::spawn(async move { predictor.run_request(&example_input()).await })
        };

        states
            .wait_for(|s| *s == PipelineState::AwaitingInference)
            .await
            .unwrap();
        assert!(predictor.state().is_in_flight());

        let err = predictor.run_request(&example_input()).await.unwrap_err();
        assert_eq!(err, PredictError::Busy);

        predictor.engine().gate.notify_one();
        let prediction = first.await.unwrap().unwrap();
        assert_eq!(prediction.result.index, 0);
        assert_eq!(predictor.state(), PipelineState::Done);
    }

    #[tokio::test]
    async fn missing_output_tensor_is_a_shape_mismatch() {
        struct SilentEngine {
            names: Vec<String>,
        }

        impl InferenceEngine for SilentEngine {
            fn input_names(&self) -> &[String] {
                &self.names
            }

            fn output_names(&self) -> &[String] {
                &self.names
            }

            async fn run(&self, _: &str, _: &str, _: InputTensor) -> Result<EngineOutputs, PredictError> {
                Ok(EngineOutputs::from([(
                    "other".to_string(),
                    OutputTensor {
                        shape: vec![1, 7],
                        data: vec![0.0; 7],
                    },
                )]))
            }
        }

        let predictor = Predictor::new(
            SilentEngine {
                names: vec!["io".to_string()],
            },
            EncodingPolicy::Lenient,
        );
        let err = predictor.run_request(&example_input()).await.unwrap_err();
        assert!(matches!(err, PredictError::OutputShapeMismatch { actual: 0, .. }));
    }

    #[tokio::test]
    async fn batch_keeps_row_order_and_isolates_failures() {
        let predictor = Predictor::new(FixedEngine::uniform(), EncodingPolicy::Strict);
        let mut bad = example_input();
        bad.insert("MTRANS", "Scooter");
        let rows = vec![example_input(), bad, example_input()];

        let results = run_batch(&predictor, &rows).await;
        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(matches!(
            results[1],
            Err(PredictError::UnrecognizedCategory { feature: "MTRANS", .. })
        ));
        assert!(results[2].is_ok());
    }
}
