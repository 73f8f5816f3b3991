//! Neural-network-guided Monte Carlo Tree Search for Brandubh.
//!
//! Given a position and the side to move, the engine returns a move - and,
//! as byproducts, a visit-weighted policy, a scalar value estimate and
//! per-move statistics suitable for visualization.
//!
//! # Overview
//!
//! The search is AlphaZero-style MCTS. Each simulation runs four phases:
//!
//! 1. **Selection**: traverse the tree by PUCT (with first-play urgency for
//!    unvisited children), materializing lazily-stored child positions along
//!    the way
//! 2. **Expansion**: at a non-terminal leaf, create one child per legal
//!    move, with priors from the legality-masked softmax of the policy
//!    logits
//! 3. **Evaluation**: the same evaluator call provides the leaf value;
//!    terminal leaves use the exact game result instead
//! 4. **Backpropagation**: the value flows back to the root, negated at
//!    each level (values are always from the side to move's perspective)
//!
//! # Usage
//!
//! ```rust,ignore
//! use games_brandubh::Board;
//! use mcts::{MctsConfig, MctsEngine, UniformEvaluator};
//!
//! let mut engine = MctsEngine::new(UniformEvaluator::new(), MctsConfig::default());
//!
//! let (best, policy) = engine
//!     .best_move(&Board::initial(), 800, 0.0, None)
//!     .await?;
//! println!("best move: {best}");
//! println!("root visits: {:?}", policy.visit_counts);
//! ```
//!
//! # Concurrency model
//!
//! Single-threaded and cooperative: one simulation and one evaluator call
//! in flight per engine, no locks. The engine yields to the async runtime
//! between simulation batches so a host event loop stays responsive, and a
//! [`CancelFlag`] observed at the same boundaries turns long searches into
//! best-effort ones. Engines serialize their own operations; run
//! independent engines for parallel searches, sharing one evaluator via
//! `Arc`.
//!
//! # Evaluators
//!
//! The [`Evaluator`] trait is the engine's only polymorphic boundary:
//!
//! - [`UniformEvaluator`]: zero logits, neutral value (for tests)
//! - `OnnxEvaluator` (feature `onnx`): ONNX Runtime inference against the
//!   trained Brandubh network

pub mod config;
pub mod evaluator;
pub mod node;
pub mod policy;
pub mod search;
pub mod tree;

#[cfg(feature = "onnx")]
pub mod onnx;

// Re-export main types
pub use config::MctsConfig;
pub use evaluator::{Evaluation, Evaluator, EvaluatorError, UniformEvaluator};
pub use node::{MctsNode, NodeId};
pub use policy::{MoveEval, PolicyData, PositionEval, VisitDistribution};
pub use search::{CancelFlag, MctsEngine, SearchError};
pub use tree::{MctsTree, TreeStats};

#[cfg(feature = "onnx")]
pub use onnx::OnnxEvaluator;
