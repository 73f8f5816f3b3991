//! Evaluator boundary: the only polymorphic seam of the engine.
//!
//! An evaluator maps an encoded position to raw policy logits over the
//! 1176-index move space plus a scalar value in [-1, 1] from the mover's
//! perspective. In play this is a neural network; tests use
//! [`UniformEvaluator`]. Logits come back raw - legality masking and the
//! softmax happen inside the engine at expansion time, so every evaluator
//! backend stays a pure tensor-in/tensor-out function.

use std::sync::Arc;

use games_brandubh::STATE_SIZE;
use thiserror::Error;

/// Errors that can occur during evaluation.
#[derive(Debug, Error)]
pub enum EvaluatorError {
    #[error("evaluation failed: {0}")]
    EvaluationFailed(String),

    #[error("model error: {0}")]
    ModelError(String),

    /// The evaluator produced output the engine cannot use: wrong policy
    /// length, or non-finite logits/value.
    #[error("invalid evaluator output: {0}")]
    InvalidOutput(String),
}

/// Result of evaluating a position.
#[derive(Debug, Clone)]
pub struct Evaluation {
    /// Raw (un-softmaxed) policy logits, one per policy index.
    pub policy_logits: Vec<f32>,

    /// Value estimate for the side to move.
    /// Range: -1.0 (certain loss) to +1.0 (certain win).
    pub value: f32,
}

/// Trait for position evaluators.
///
/// Implementations could be:
/// - [`UniformEvaluator`]: all-zero logits, neutral value (for testing)
/// - `OnnxEvaluator`: neural network inference (feature `onnx`)
///
/// The call is synchronous from the engine's point of view. Implementations
/// may cache or batch internally but must serialize their own state: a
/// single evaluator may be shared by several engine instances.
pub trait Evaluator: Send + Sync {
    /// Evaluate one encoded position (the 4×7×7 plane tensor).
    fn evaluate(&self, input: &[f32; STATE_SIZE]) -> Result<Evaluation, EvaluatorError>;
}

/// Sharing an evaluator across engines is just sharing the `Arc`.
impl<E: Evaluator + ?Sized> Evaluator for Arc<E> {
    fn evaluate(&self, input: &[f32; STATE_SIZE]) -> Result<Evaluation, EvaluatorError> {
        (**self).evaluate(input)
    }
}

/// Evaluator that is indifferent to the position: zero logits (a uniform
/// prior once masked and softmaxed) and a neutral value. Useful for testing
/// the search without a model.
#[derive(Debug, Clone, Default)]
pub struct UniformEvaluator;

impl UniformEvaluator {
    pub fn new() -> Self {
        Self
    }
}

impl Evaluator for UniformEvaluator {
    fn evaluate(&self, _input: &[f32; STATE_SIZE]) -> Result<Evaluation, EvaluatorError> {
        Ok(Evaluation {
            policy_logits: vec![0.0; games_brandubh::POLICY_SIZE],
            value: 0.0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use games_brandubh::{encode_state, Board, POLICY_SIZE};

    #[test]
    fn test_uniform_evaluator_shape() {
        let eval = UniformEvaluator::new();
        let input = encode_state(&Board::initial());
        let result = eval.evaluate(&input).unwrap();

        assert_eq!(result.policy_logits.len(), POLICY_SIZE);
        assert!(result.policy_logits.iter().all(|&l| l == 0.0));
        assert_eq!(result.value, 0.0);
    }

    #[test]
    fn test_shared_evaluator_through_arc() {
        let shared: Arc<UniformEvaluator> = Arc::new(UniformEvaluator::new());
        let input = encode_state(&Board::initial());

        // Both handles evaluate through the same instance.
        let a = shared.evaluate(&input).unwrap();
        let b = Arc::clone(&shared).evaluate(&input).unwrap();
        assert_eq!(a.policy_logits, b.policy_logits);
    }
}
