//! MCTS engine parameters.

/// Configuration for Monte Carlo Tree Search.
#[derive(Debug, Clone)]
pub struct MctsConfig {
    /// Exploration constant in the PUCT formula.
    /// Higher values encourage exploration, lower values favor exploitation.
    pub c_puct: f32,

    /// First-play urgency reduction. An unvisited child is scored as if its
    /// value were the parent's current estimate minus this amount, so the
    /// first visited sibling does not monopolize selection.
    pub fpu_reduction: f32,

    /// Simulations per cooperative batch. The engine yields to the runtime
    /// (and observes cancellation) between batches, never mid-simulation.
    pub sim_batch_size: u32,

    /// Dirichlet noise alpha for root-prior exploration during self-play.
    /// Set to 0.0 to disable (the default, used for evaluation/inference).
    pub dirichlet_alpha: f32,

    /// Fraction of the root prior replaced by Dirichlet noise.
    pub dirichlet_epsilon: f32,
}

impl Default for MctsConfig {
    fn default() -> Self {
        Self {
            c_puct: 1.25,
            fpu_reduction: 0.2,
            sim_batch_size: 10,
            dirichlet_alpha: 0.0,
            dirichlet_epsilon: 0.25,
        }
    }
}

impl MctsConfig {
    /// Config for evaluation/inference: no root noise.
    pub fn for_evaluation() -> Self {
        Self::default()
    }

    /// Config for self-play training: root noise enabled. Alpha follows the
    /// 10/avg-legal-moves rule of thumb (~40 legal moves in Brandubh).
    pub fn for_training() -> Self {
        Self {
            dirichlet_alpha: 0.25,
            ..Self::default()
        }
    }

    /// Small-batch config for tests.
    pub fn for_testing() -> Self {
        Self {
            sim_batch_size: 4,
            ..Self::default()
        }
    }

    /// Builder pattern: set the c_puct exploration constant.
    pub fn with_c_puct(mut self, c: f32) -> Self {
        self.c_puct = c;
        self
    }

    /// Builder pattern: set the first-play urgency reduction.
    pub fn with_fpu_reduction(mut self, fpu: f32) -> Self {
        self.fpu_reduction = fpu;
        self
    }

    /// Builder pattern: set the cooperative batch size.
    pub fn with_sim_batch_size(mut self, size: u32) -> Self {
        self.sim_batch_size = size;
        self
    }

    /// Builder pattern: set Dirichlet noise parameters.
    pub fn with_dirichlet(mut self, alpha: f32, epsilon: f32) -> Self {
        self.dirichlet_alpha = alpha;
        self.dirichlet_epsilon = epsilon;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MctsConfig::default();
        assert!((config.c_puct - 1.25).abs() < 1e-6);
        assert_eq!(config.sim_batch_size, 10);
        // Noise off by default.
        assert_eq!(config.dirichlet_alpha, 0.0);
    }

    #[test]
    fn test_builder_pattern() {
        let config = MctsConfig::default()
            .with_c_puct(2.0)
            .with_sim_batch_size(32)
            .with_fpu_reduction(0.5);

        assert!((config.c_puct - 2.0).abs() < 1e-6);
        assert_eq!(config.sim_batch_size, 32);
        assert!((config.fpu_reduction - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_training_config_has_noise() {
        let config = MctsConfig::for_training();
        assert!(config.dirichlet_alpha > 0.0);
        assert!(MctsConfig::for_evaluation().dirichlet_alpha == 0.0);
    }
}
