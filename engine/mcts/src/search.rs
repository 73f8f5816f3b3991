//! The MCTS engine: simulation loop, tree reuse, cooperative scheduling,
//! and the public search operations.
//!
//! Each simulation runs three phases atomically between yield points:
//!
//! 1. **Selection**: walk the tree by PUCT until a leaf, tracking the path
//!    on a working copy of the board and materializing lazy child positions
//!    as it descends
//! 2. **Expansion + evaluation**: a terminal leaf produces its exact value;
//!    any other leaf gets one evaluator call, legality-masked softmax
//!    priors, and one child per legal move
//! 3. **Backpropagation**: the value flows back to the root, flipping
//!    perspective at every level
//!
//! Simulations are grouped into batches; between batches the engine yields
//! to the async runtime and observes cancellation, so long searches stay
//! responsive inside a host event loop without threads or locks.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use games_brandubh::moves::legal_moves_with_indices;
use games_brandubh::{encode_state, Board, Move, RulesError, POLICY_SIZE};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use thiserror::Error;
use tracing::{debug, trace};

use crate::config::MctsConfig;
use crate::evaluator::{Evaluation, Evaluator, EvaluatorError};
use crate::policy::{PolicyData, PositionEval, VisitDistribution};
use crate::tree::{MctsTree, TreeStats};

/// Errors that can occur during MCTS search.
#[derive(Debug, Error)]
pub enum SearchError {
    /// The requested root position is malformed.
    #[error("rules error: {0}")]
    Rules(#[from] RulesError),

    /// The evaluator failed or produced unusable output. The current search
    /// is aborted; the tree built so far stays valid and reusable.
    #[error("evaluator error: {0}")]
    Evaluator(#[from] EvaluatorError),

    /// A move was requested from a position that has none.
    #[error("no legal moves available")]
    NoLegalMoves,
}

/// Cooperative cancellation signal.
///
/// Clones share one flag. The engine observes it at simulation-batch
/// boundaries only, never mid-simulation; a cancelled search returns the
/// best result computable from the statistics gathered so far.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Neural-network-guided MCTS engine for Brandubh.
///
/// The engine owns its search tree and serializes its own operations; run
/// concurrent searches on independent engine instances. The evaluator is
/// the only shared resource - pass an `Arc<E>` to share one model across
/// engines.
pub struct MctsEngine<E: Evaluator> {
    evaluator: E,
    config: MctsConfig,
    /// Current tree, kept across searches for reuse.
    tree: Option<MctsTree>,
    /// Raw logits from the most recent root evaluation.
    root_logits: Option<Vec<f32>>,
    rng: ChaCha20Rng,
}

impl<E: Evaluator> MctsEngine<E> {
    pub fn new(evaluator: E, config: MctsConfig) -> Self {
        Self {
            evaluator,
            config,
            tree: None,
            root_logits: None,
            rng: ChaCha20Rng::from_entropy(),
        }
    }

    /// Create with a fixed RNG seed for deterministic move sampling.
    pub fn with_seed(evaluator: E, config: MctsConfig, seed: u64) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed),
            ..Self::new(evaluator, config)
        }
    }

    pub fn config(&self) -> &MctsConfig {
        &self.config
    }

    /// Statistics of the current tree, if one exists.
    pub fn tree_stats(&self) -> Option<TreeStats> {
        self.tree.as_ref().map(|t| t.stats())
    }

    /// Run `n_sims` simulations from `position` and return the refined
    /// visit distribution over root moves.
    ///
    /// If the engine already holds a tree whose root equals `position`
    /// (value equality, side to move included), all prior statistics are
    /// reused and the new simulations refine them. A terminal root returns
    /// an empty distribution without consulting the evaluator.
    pub async fn search(
        &mut self,
        position: &Board,
        n_sims: u32,
        cancel: Option<&CancelFlag>,
    ) -> Result<VisitDistribution, SearchError> {
        self.prepare_root(position)?;

        let root_terminal = {
            let tree = self.tree.as_ref().expect("prepare_root built a tree");
            tree.get(tree.root()).is_terminal
        };
        if root_terminal {
            debug!("root is terminal, skipping simulations");
            return Ok(self.visit_distribution());
        }

        let batch_size = self.config.sim_batch_size.max(1);
        let mut remaining = n_sims;
        while remaining > 0 {
            if cancel.is_some_and(|c| c.is_cancelled()) {
                debug!(remaining, "search cancelled at batch boundary");
                break;
            }
            let batch = remaining.min(batch_size);
            for _ in 0..batch {
                self.simulate()?;
            }
            remaining -= batch;
            // Let the host event loop breathe between batches.
            tokio::task::yield_now().await;
        }

        if let Some(stats) = self.tree_stats() {
            trace!(
                nodes = stats.total_nodes,
                root_visits = stats.root_visits,
                root_value = stats.root_value,
                depth = stats.max_depth,
                "search finished"
            );
        }

        Ok(self.visit_distribution())
    }

    /// Search, then pick a move at the given temperature: argmax visits at
    /// τ=0, a `N^(1/τ)`-proportional sample otherwise. Also returns the raw
    /// root policy data for visualization/training.
    ///
    /// Errors with [`SearchError::NoLegalMoves`] when the position is
    /// game-over for the side to move.
    pub async fn best_move(
        &mut self,
        position: &Board,
        n_sims: u32,
        temperature: f32,
        cancel: Option<&CancelFlag>,
    ) -> Result<(Move, PolicyData), SearchError> {
        let distribution = self.search(position, n_sims, cancel).await?;
        let chosen = distribution
            .sample(temperature, &mut self.rng)
            .ok_or(SearchError::NoLegalMoves)?;
        Ok((chosen, self.policy_data()))
    }

    /// One direct evaluator call for `position` - no tree involved.
    /// Returns the raw policy logits and the value for the side to move.
    pub fn raw_policy(&self, position: &Board) -> Result<(Vec<f32>, f32), SearchError> {
        position.validate()?;
        let eval = evaluate_checked(&self.evaluator, position)?;
        Ok((eval.policy_logits, eval.value))
    }

    /// Search, then summarize: the root's mean value plus the `top_k` moves
    /// ranked by visit count.
    pub async fn evaluate_position(
        &mut self,
        position: &Board,
        n_sims: u32,
        top_k: usize,
        cancel: Option<&CancelFlag>,
    ) -> Result<PositionEval, SearchError> {
        self.search(position, n_sims, cancel).await?;
        let tree = self.tree.as_ref().expect("search built a tree");
        Ok(PositionEval::from_root(tree, top_k))
    }

    /// Validate the position, reuse or rebuild the tree, and make sure the
    /// root is expanded.
    fn prepare_root(&mut self, position: &Board) -> Result<(), SearchError> {
        position.validate()?;

        let reusable = self
            .tree
            .as_ref()
            .is_some_and(|t| t.get(t.root()).position.as_ref() == Some(position));
        if reusable {
            debug!("reusing search tree for identical root");
        } else {
            self.tree = Some(MctsTree::new(*position));
            self.root_logits = None;
        }

        let root_is_leaf = {
            let tree = self.tree.as_ref().expect("tree was just ensured");
            let root = tree.get(tree.root());
            !root.is_expanded && !root.is_terminal
        };
        if root_is_leaf {
            // Expand-only: children and priors are created, but nothing is
            // backed up. Guarantees root children exist whenever legal
            // moves do (so even a cancelled search can produce a move)
            // while root statistics come solely from the simulation loop.
            self.expand_root()?;

            // Noise belongs to the root's first expansion only; reused
            // roots keep their already-noised priors.
            if self.config.dirichlet_alpha > 0.0 {
                self.add_dirichlet_noise();
            }
        }

        Ok(())
    }

    /// Expand a fresh root: evaluate it, create one child per legal move
    /// with masked-softmax priors, or mark it terminal. The evaluator's
    /// value is discarded rather than backed up, so a search adds exactly
    /// `n_sims` visits to the root.
    fn expand_root(&mut self) -> Result<(), SearchError> {
        let tree = self
            .tree
            .as_mut()
            .expect("expand_root called without a tree");
        let root_id = tree.root();
        let root_position = tree
            .get(root_id)
            .position
            .expect("root position is always cached");

        let material = root_position.material_outcome();
        if material.is_over() {
            let v = material.value_for(root_position.to_move());
            tree.get_mut(root_id).mark_terminal(v);
            return Ok(());
        }

        let legal = legal_moves_with_indices(&root_position);
        if legal.is_empty() {
            tree.get_mut(root_id).mark_terminal(-1.0);
            return Ok(());
        }

        let eval = evaluate_checked(&self.evaluator, &root_position)?;
        let priors = masked_priors(&eval.policy_logits, &legal);
        let child_side = root_position.to_move().opponent();
        for (&(mv, _), &prior) in legal.iter().zip(priors.iter()) {
            tree.add_child(root_id, mv, prior, child_side);
        }
        tree.get_mut(root_id).is_expanded = true;
        self.root_logits = Some(eval.policy_logits);

        trace!(children = legal.len(), "expanded root");
        Ok(())
    }

    /// One simulation: select to a leaf, evaluate/expand it, back the value
    /// up. Runs to completion without suspension points.
    fn simulate(&mut self) -> Result<(), SearchError> {
        let tree = self
            .tree
            .as_mut()
            .expect("simulate called without a prepared root");
        let root_id = tree.root();

        // Selection. The working copy tracks the path; lazily cached child
        // positions are materialized by applying the incoming move.
        let mut current = root_id;
        let mut working = tree
            .get(root_id)
            .position
            .expect("root position is always cached");
        loop {
            if tree.get(current).is_leaf() {
                break;
            }
            let Some(child_id) = tree.select_child(current, &self.config) else {
                break;
            };
            let child = tree.get_mut(child_id);
            match child.position {
                Some(cached) => working = cached,
                None => {
                    let mv = child.action.expect("non-root node has an incoming move");
                    working = working.apply_unchecked(mv);
                    child.position = Some(working);
                }
            }
            current = child_id;
        }

        // Evaluation / expansion. Terminal values are stored from the
        // leaf's side-to-move perspective.
        let value = if tree.get(current).is_terminal {
            tree.get(current).terminal_value
        } else {
            let material = working.material_outcome();
            if material.is_over() {
                let v = material.value_for(working.to_move());
                tree.get_mut(current).mark_terminal(v);
                v
            } else {
                let legal = legal_moves_with_indices(&working);
                if legal.is_empty() {
                    // Stalemate: the side to move loses.
                    tree.get_mut(current).mark_terminal(-1.0);
                    -1.0
                } else {
                    let eval = evaluate_checked(&self.evaluator, &working)?;
                    let priors = masked_priors(&eval.policy_logits, &legal);
                    let child_side = working.to_move().opponent();
                    for (&(mv, _), &prior) in legal.iter().zip(priors.iter()) {
                        tree.add_child(current, mv, prior, child_side);
                    }
                    tree.get_mut(current).is_expanded = true;
                    trace!(
                        node = current.0,
                        children = legal.len(),
                        value = eval.value,
                        "expanded leaf"
                    );
                    eval.value
                }
            }
        };

        tree.backpropagate(current, value);
        Ok(())
    }

    /// Mix Dirichlet noise into the root priors for self-play exploration.
    fn add_dirichlet_noise(&mut self) {
        use rand_distr::{Distribution, Gamma};

        let Some(tree) = self.tree.as_mut() else {
            return;
        };
        let root_id = tree.root();
        let children: Vec<_> = tree
            .get(root_id)
            .children
            .iter()
            .map(|&(_, id)| id)
            .collect();
        if children.is_empty() {
            return;
        }

        let gamma = Gamma::new(self.config.dirichlet_alpha as f64, 1.0)
            .expect("dirichlet_alpha is positive");
        let mut noise: Vec<f32> = (0..children.len())
            .map(|_| gamma.sample(&mut self.rng) as f32)
            .collect();
        let sum: f32 = noise.iter().sum();
        if sum > 0.0 {
            for n in &mut noise {
                *n /= sum;
            }
        }

        let eps = self.config.dirichlet_epsilon;
        for (child_id, n) in children.into_iter().zip(noise) {
            let child = tree.get_mut(child_id);
            child.prior = (1.0 - eps) * child.prior + eps * n;
        }
    }

    fn visit_distribution(&self) -> VisitDistribution {
        match &self.tree {
            Some(tree) => VisitDistribution::from_root(tree),
            None => VisitDistribution::empty(),
        }
    }

    fn policy_data(&self) -> PolicyData {
        let logits = self.root_logits.clone().unwrap_or_default();
        let visit_counts = match &self.tree {
            Some(tree) => tree
                .get(tree.root())
                .children
                .iter()
                .filter_map(|&(mv, id)| {
                    mv.policy_index().map(|ix| (ix, tree.get(id).visit_count))
                })
                .collect(),
            None => Vec::new(),
        };
        PolicyData {
            logits,
            visit_counts,
        }
    }
}

/// Evaluate a position and validate the output shape: exactly
/// [`POLICY_SIZE`] finite logits and a finite value.
fn evaluate_checked<E: Evaluator>(
    evaluator: &E,
    position: &Board,
) -> Result<Evaluation, EvaluatorError> {
    let input = encode_state(position);
    let eval = evaluator.evaluate(&input)?;

    if eval.policy_logits.len() != POLICY_SIZE {
        return Err(EvaluatorError::InvalidOutput(format!(
            "expected {POLICY_SIZE} policy logits, got {}",
            eval.policy_logits.len()
        )));
    }
    if !eval.policy_logits.iter().all(|l| l.is_finite()) {
        return Err(EvaluatorError::InvalidOutput(
            "non-finite policy logit".to_string(),
        ));
    }
    if !eval.value.is_finite() {
        return Err(EvaluatorError::InvalidOutput(format!(
            "non-finite value {}",
            eval.value
        )));
    }
    Ok(eval)
}

/// Softmax over the logits at the legal indices (everything else is an
/// implicit -inf). Falls back to a uniform prior if the masked mass
/// underflows to zero.
fn masked_priors(logits: &[f32], legal: &[(Move, u16)]) -> Vec<f32> {
    let mut max_logit = f32::NEG_INFINITY;
    for &(_, index) in legal {
        max_logit = max_logit.max(logits[index as usize]);
    }

    let mut priors: Vec<f32> = legal
        .iter()
        .map(|&(_, index)| (logits[index as usize] - max_logit).exp())
        .collect();
    let sum: f32 = priors.iter().sum();

    if sum > 0.0 {
        for p in &mut priors {
            *p /= sum;
        }
    } else {
        priors.fill(1.0 / legal.len() as f32);
    }
    priors
}
