//! Policy extraction from a finished search.
//!
//! The refined policy of a search is the visit distribution over the root's
//! children. Temperature controls how it is consumed: 0 is a deterministic
//! argmax, larger values sample proportionally to `N^(1/τ)`.

use games_brandubh::Move;
use rand::Rng;

use crate::tree::MctsTree;

/// Visit counts over the root's children, in legal-move enumeration order.
#[derive(Debug, Clone)]
pub struct VisitDistribution {
    entries: Vec<(Move, u32)>,
    total: u32,
}

impl VisitDistribution {
    pub(crate) fn from_root(tree: &MctsTree) -> Self {
        let root = tree.get(tree.root());
        let entries: Vec<(Move, u32)> = root
            .children
            .iter()
            .map(|&(mv, id)| (mv, tree.get(id).visit_count))
            .collect();
        let total = entries.iter().map(|&(_, n)| n).sum();
        Self { entries, total }
    }

    pub(crate) fn empty() -> Self {
        Self {
            entries: Vec::new(),
            total: 0,
        }
    }

    /// (move, visit count) pairs in enumeration order.
    pub fn entries(&self) -> &[(Move, u32)] {
        &self.entries
    }

    /// Sum of child visit counts.
    pub fn total_visits(&self) -> u32 {
        self.total
    }

    /// True when the root had no children (terminal or never searched).
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The most-visited move; ties (including the all-zero case) resolve to
    /// the first move in enumeration order.
    pub fn best_move(&self) -> Option<Move> {
        let mut best: Option<(Move, u32)> = None;
        for &(mv, visits) in &self.entries {
            if best.is_none_or(|(_, b)| visits > b) {
                best = Some((mv, visits));
            }
        }
        best.map(|(mv, _)| mv)
    }

    /// Move probabilities at the given temperature.
    ///
    /// Temperature 0 is one-hot on [`best_move`](Self::best_move). For
    /// τ > 0 probabilities are proportional to `N^(1/τ)`; if every visit
    /// count is zero the distribution is empty.
    pub fn probabilities(&self, temperature: f32) -> Vec<(Move, f32)> {
        if self.entries.is_empty() {
            return Vec::new();
        }

        if temperature < 1e-6 {
            let best = self.best_move();
            return self
                .entries
                .iter()
                .map(|&(mv, _)| (mv, if Some(mv) == best { 1.0 } else { 0.0 }))
                .collect();
        }

        if self.total == 0 {
            return Vec::new();
        }

        // Exponentiate in f64: N^(1/τ) overflows f32 quickly at low τ.
        let inv_tau = 1.0 / temperature as f64;
        let weights: Vec<f64> = self
            .entries
            .iter()
            .map(|&(_, n)| (n as f64).powf(inv_tau))
            .collect();
        let sum: f64 = weights.iter().sum();

        self.entries
            .iter()
            .zip(weights)
            .map(|(&(mv, _), w)| (mv, (w / sum) as f32))
            .collect()
    }

    /// Draw a move at the given temperature. τ=0 is argmax; when no child
    /// has been visited yet the first move in enumeration order is returned
    /// rather than nothing, so a cancelled-early search still yields a move.
    pub fn sample(&self, temperature: f32, rng: &mut impl Rng) -> Option<Move> {
        if temperature < 1e-6 || self.total == 0 {
            return self.best_move();
        }

        let probabilities = self.probabilities(temperature);
        let r: f32 = rng.gen();
        let mut cumsum = 0.0;
        for &(mv, p) in &probabilities {
            cumsum += p;
            if r < cumsum {
                return Some(mv);
            }
        }

        // Floating-point slack: fall back to the last move with mass.
        probabilities
            .iter()
            .rev()
            .find(|&&(_, p)| p > 0.0)
            .map(|&(mv, _)| mv)
    }
}

/// Raw policy data attached to a move choice: the root's latest policy
/// logits and the visit count per policy index, for visualization and
/// training targets.
#[derive(Debug, Clone)]
pub struct PolicyData {
    /// Raw logits from the most recent root evaluation (empty if the root
    /// was terminal and never evaluated).
    pub logits: Vec<f32>,

    /// (policy index, visit count) per root child.
    pub visit_counts: Vec<(u16, u32)>,
}

/// One ranked root move from [`PositionEval`].
#[derive(Debug, Clone)]
pub struct MoveEval {
    pub action: Move,
    pub visits: u32,
    /// Mean value of playing `action`, from the root mover's perspective.
    pub value: f32,
    pub prior: f32,
}

/// Search summary for a position: root value plus the top moves by visits.
#[derive(Debug, Clone)]
pub struct PositionEval {
    /// Root mean value, from the root mover's perspective.
    pub root_value: f32,
    pub top_moves: Vec<MoveEval>,
}

impl PositionEval {
    pub(crate) fn from_root(tree: &MctsTree, top_k: usize) -> Self {
        let root = tree.get(tree.root());

        let mut moves: Vec<MoveEval> = root
            .children
            .iter()
            .map(|&(mv, id)| {
                let child = tree.get(id);
                MoveEval {
                    action: mv,
                    visits: child.visit_count,
                    // Children store values from the opponent's perspective.
                    value: -child.mean_value(),
                    prior: child.prior,
                }
            })
            .collect();
        // Stable sort keeps enumeration order among equally-visited moves.
        moves.sort_by(|a, b| b.visits.cmp(&a.visits));
        moves.truncate(top_k);

        Self {
            root_value: root.mean_value(),
            top_moves: moves,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::MctsTree;
    use games_brandubh::{Board, Side};
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    /// A tree whose root children carry the given visit counts.
    fn distribution(visits: &[u32]) -> VisitDistribution {
        let mut tree = MctsTree::new(Board::initial());
        for (i, &n) in visits.iter().enumerate() {
            let mv = Move::new(0, 3, i as u8 + 1, 3);
            let id = tree.add_child(tree.root(), mv, 1.0 / visits.len() as f32, Side::Defender);
            tree.get_mut(id).visit_count = n;
        }
        VisitDistribution::from_root(&tree)
    }

    #[test]
    fn test_empty_distribution() {
        let dist = VisitDistribution::empty();
        assert!(dist.is_empty());
        assert_eq!(dist.best_move(), None);
        assert!(dist.probabilities(1.0).is_empty());
        assert!(dist.probabilities(0.0).is_empty());
    }

    #[test]
    fn test_greedy_is_one_hot_on_max_visits() {
        let dist = distribution(&[30, 70, 10]);
        let probs = dist.probabilities(0.0);

        assert_eq!(probs[0].1, 0.0);
        assert_eq!(probs[1].1, 1.0);
        assert_eq!(probs[2].1, 0.0);
        assert_eq!(dist.best_move(), Some(Move::new(0, 3, 2, 3)));
    }

    #[test]
    fn test_greedy_tie_breaks_to_first() {
        let dist = distribution(&[50, 50, 50]);
        assert_eq!(dist.best_move(), Some(Move::new(0, 3, 1, 3)));

        // All-zero visits behave the same way.
        let dist = distribution(&[0, 0, 0]);
        assert_eq!(dist.best_move(), Some(Move::new(0, 3, 1, 3)));
    }

    #[test]
    fn test_temperature_one_is_proportional() {
        let dist = distribution(&[30, 70]);
        let probs = dist.probabilities(1.0);

        assert!((probs[0].1 - 0.3).abs() < 1e-6);
        assert!((probs[1].1 - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_low_temperature_sharpens() {
        let dist = distribution(&[30, 70]);
        let probs = dist.probabilities(0.5);

        // 0.3²/(0.3²+0.7²) vs plain 0.3.
        assert!(probs[0].1 < 0.3);
        assert!(probs[1].1 > 0.7);
        let sum: f32 = probs.iter().map(|&(_, p)| p).sum();
        assert!((sum - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_low_temperature_does_not_overflow() {
        // N^(1/τ) at τ=0.05 would overflow f32; the f64 path must survive.
        let dist = distribution(&[800, 400]);
        let probs = dist.probabilities(0.05);

        assert!(probs.iter().all(|&(_, p)| p.is_finite()));
        assert!(probs[0].1 > 0.99);
    }

    #[test]
    fn test_zero_visits_with_positive_temperature() {
        let dist = distribution(&[0, 0]);
        assert!(dist.probabilities(1.0).is_empty());
        // Sampling still resolves to the first move.
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        assert_eq!(dist.sample(1.0, &mut rng), Some(Move::new(0, 3, 1, 3)));
    }

    #[test]
    fn test_sampling_follows_visit_mass() {
        let dist = distribution(&[0, 500, 300, 200]);
        let mut rng = ChaCha20Rng::seed_from_u64(42);

        let mut counts = [0u32; 4];
        for _ in 0..1000 {
            let mv = dist.sample(1.0, &mut rng).unwrap();
            let idx = dist
                .entries()
                .iter()
                .position(|&(m, _)| m == mv)
                .unwrap();
            counts[idx] += 1;
        }

        // The unvisited move is never drawn; heavier moves dominate.
        assert_eq!(counts[0], 0);
        assert!(counts[1] > counts[2]);
        assert!(counts[2] > counts[3]);
    }

    #[test]
    fn test_sampling_at_zero_temperature_is_deterministic() {
        let dist = distribution(&[10, 90, 40]);
        let mut rng = ChaCha20Rng::seed_from_u64(7);
        for _ in 0..10 {
            assert_eq!(dist.sample(0.0, &mut rng), Some(Move::new(0, 3, 2, 3)));
        }
    }

    #[test]
    fn test_position_eval_ranking() {
        let mut tree = MctsTree::new(Board::initial());
        for (i, (visits, value_sum)) in [(10u32, 5.0f32), (40, -20.0), (25, 0.0)]
            .into_iter()
            .enumerate()
        {
            let mv = Move::new(0, 3, i as u8 + 1, 3);
            let id = tree.add_child(tree.root(), mv, 0.33, Side::Defender);
            let child = tree.get_mut(id);
            child.visit_count = visits;
            child.value_sum = value_sum;
        }
        tree.get_mut(tree.root()).visit_count = 76;
        tree.get_mut(tree.root()).value_sum = 19.0;

        let eval = PositionEval::from_root(&tree, 2);

        assert_eq!(eval.top_moves.len(), 2);
        assert_eq!(eval.top_moves[0].visits, 40);
        assert_eq!(eval.top_moves[1].visits, 25);
        // Child stored -0.5 from the opponent's perspective -> +0.5 for us.
        assert!((eval.top_moves[0].value - 0.5).abs() < 1e-6);
        assert!((eval.root_value - 0.25).abs() < 1e-6);
    }
}
