//! ONNX Runtime evaluator for neural network inference.
//!
//! Runs the Brandubh network exported from the Python trainer. The model
//! contract:
//!
//! - Input: "input" - shape (batch_size, 4, 7, 7) float32
//! - Output: "policy" - shape (batch_size, 1176) float32 raw logits
//! - Output: "value" - shape (batch_size, 1) float32 in [-1, 1]
//!
//! Logits are returned raw; the engine applies legality masking and the
//! softmax at expansion time.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Instant;

use games_brandubh::{BOARD_SIZE, PLANES, STATE_SIZE};
use ort::{session::Session, value::Value};
use tracing::debug;

use crate::evaluator::{Evaluation, Evaluator, EvaluatorError};

/// ONNX Runtime evaluator that loads and runs the Brandubh network.
///
/// Uses a Mutex internally because `Session::run` requires `&mut self`,
/// while the `Evaluator` trait takes `&self` so one evaluator can be shared
/// across engine instances.
pub struct OnnxEvaluator {
    session: Mutex<Session>,
    /// Number of inferences performed (for diagnostics)
    inference_count: AtomicU64,
    /// Total inference time in microseconds (for diagnostics)
    total_inference_time_us: AtomicU64,
}

impl std::fmt::Debug for OnnxEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxEvaluator")
            .field(
                "inference_count",
                &self.inference_count.load(Ordering::Relaxed),
            )
            .finish_non_exhaustive()
    }
}

impl OnnxEvaluator {
    /// Load an ONNX model from the given path.
    pub fn load<P: AsRef<Path>>(model_path: P) -> Result<Self, EvaluatorError> {
        let session = Session::builder()
            .map_err(|e| {
                EvaluatorError::ModelError(format!("Failed to create session builder: {}", e))
            })?
            .with_intra_threads(2)
            .map_err(|e| EvaluatorError::ModelError(format!("Failed to set intra threads: {}", e)))?
            .commit_from_file(model_path)
            .map_err(|e| EvaluatorError::ModelError(format!("Failed to load model: {}", e)))?;

        Ok(Self::from_session(session))
    }

    /// Load an ONNX model from memory.
    pub fn load_from_memory(model_data: &[u8]) -> Result<Self, EvaluatorError> {
        let session = Session::builder()
            .map_err(|e| {
                EvaluatorError::ModelError(format!("Failed to create session builder: {}", e))
            })?
            .with_intra_threads(1)
            .map_err(|e| EvaluatorError::ModelError(format!("Failed to set intra threads: {}", e)))?
            .commit_from_memory(model_data)
            .map_err(|e| {
                EvaluatorError::ModelError(format!("Failed to load model from memory: {}", e))
            })?;

        Ok(Self::from_session(session))
    }

    fn from_session(session: Session) -> Self {
        Self {
            session: Mutex::new(session),
            inference_count: AtomicU64::new(0),
            total_inference_time_us: AtomicU64::new(0),
        }
    }
}

impl Evaluator for OnnxEvaluator {
    fn evaluate(&self, input: &[f32; STATE_SIZE]) -> Result<Evaluation, EvaluatorError> {
        // Shape the flat plane tensor as (1, 4, 7, 7).
        let input_array =
            ndarray::Array4::from_shape_vec((1, PLANES, BOARD_SIZE, BOARD_SIZE), input.to_vec())
                .map_err(|e| {
                    EvaluatorError::ModelError(format!("Failed to create input array: {}", e))
                })?;

        let input_value = Value::from_array(input_array).map_err(|e| {
            EvaluatorError::ModelError(format!("Failed to create input tensor: {}", e))
        })?;

        // Run inference - extract all data inside the lock scope
        let inference_start = Instant::now();
        let (policy_logits, value) = {
            let mut session = self.session.lock().map_err(|e| {
                EvaluatorError::EvaluationFailed(format!("Failed to acquire session lock: {}", e))
            })?;
            let outputs = session
                .run(ort::inputs!["input" => input_value])
                .map_err(|e| {
                    EvaluatorError::EvaluationFailed(format!("Inference failed: {}", e))
                })?;

            // Policy head - shape (1, 1176)
            let policy_output = outputs
                .get("policy")
                .ok_or_else(|| EvaluatorError::ModelError("Missing policy output".to_string()))?;

            let (_shape, policy_data) = policy_output.try_extract_tensor::<f32>().map_err(|e| {
                EvaluatorError::ModelError(format!("Failed to extract policy tensor: {}", e))
            })?;

            let policy_logits: Vec<f32> = policy_data.to_vec();

            // Value head - shape (1, 1)
            let value_output = outputs
                .get("value")
                .ok_or_else(|| EvaluatorError::ModelError("Missing value output".to_string()))?;

            let (_shape, value_data) = value_output.try_extract_tensor::<f32>().map_err(|e| {
                EvaluatorError::ModelError(format!("Failed to extract value tensor: {}", e))
            })?;

            let value = value_data.first().cloned().unwrap_or(0.0);
            (policy_logits, value)
        };

        // Track inference timing for diagnostics
        let inference_time_us = inference_start.elapsed().as_micros() as u64;
        self.total_inference_time_us
            .fetch_add(inference_time_us, Ordering::Relaxed);
        let count = self.inference_count.fetch_add(1, Ordering::Relaxed) + 1;

        // Log stats periodically (every 10,000 inferences)
        if count % 10_000 == 0 {
            let total_us = self.total_inference_time_us.load(Ordering::Relaxed);
            let avg_us = total_us / count;
            debug!(
                count,
                avg_ms = avg_us as f64 / 1000.0,
                "ONNX inference stats"
            );
        }

        Ok(Evaluation {
            policy_logits,
            value,
        })
    }
}
