//! MCTS tree node representation.
//!
//! Each node represents the position reached by playing a move from its
//! parent. Statistics (visit count, accumulated value) are stored from the
//! perspective of the side to move *at that node*, so selection negates a
//! child's mean value to read it from the parent's point of view.

use games_brandubh::{Board, Move, Side};

/// Index into the node arena. Using a newtype for type safety.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

impl NodeId {
    pub const NONE: NodeId = NodeId(u32::MAX);

    pub fn is_none(self) -> bool {
        self == Self::NONE
    }

    pub fn is_some(self) -> bool {
        !self.is_none()
    }
}

/// A node in the MCTS tree.
#[derive(Debug, Clone)]
pub struct MctsNode {
    /// Parent node index (NONE for the root).
    pub parent: NodeId,

    /// The move that led here from the parent. `None` only for the root.
    pub action: Option<Move>,

    /// The position at this node. Children are created with `None` and the
    /// position is materialized the first time the selection walk passes
    /// through, by applying `action` to the parent's working copy.
    pub position: Option<Board>,

    /// Side to move at this node.
    pub to_move: Side,

    /// Prior probability from the parent's expansion.
    pub prior: f32,

    /// Number of times this node has been visited.
    pub visit_count: u32,

    /// Sum of values backed up through this node, from `to_move`'s
    /// perspective. Q(s) = value_sum / visit_count.
    pub value_sum: f32,

    /// Whether children have been created. Kept as an explicit flag: a
    /// terminal node has no children yet is not expandable.
    pub is_expanded: bool,

    /// Whether the position is game-over (or the mover has no legal moves).
    pub is_terminal: bool,

    /// Exact game result from `to_move`'s perspective (valid iff terminal).
    pub terminal_value: f32,

    /// Children as (move, node) pairs, in legal-move enumeration order.
    /// Created together at expansion, one per legal move.
    pub children: Vec<(Move, NodeId)>,
}

impl MctsNode {
    /// Create a root node. The root always carries its position.
    pub fn new_root(position: Board) -> Self {
        Self {
            parent: NodeId::NONE,
            action: None,
            to_move: position.to_move(),
            position: Some(position),
            prior: 1.0,
            visit_count: 0,
            value_sum: 0.0,
            is_expanded: false,
            is_terminal: false,
            terminal_value: 0.0,
            children: Vec::new(),
        }
    }

    /// Create a child node. The position stays lazy until first traversal.
    pub fn new_child(parent: NodeId, action: Move, prior: f32, to_move: Side) -> Self {
        Self {
            parent,
            action: Some(action),
            position: None,
            to_move,
            prior,
            visit_count: 0,
            value_sum: 0.0,
            is_expanded: false,
            is_terminal: false,
            terminal_value: 0.0,
            children: Vec::new(),
        }
    }

    /// Mean value Q = value_sum / visit_count, from this node's own
    /// perspective. 0.0 if never visited.
    #[inline]
    pub fn mean_value(&self) -> f32 {
        if self.visit_count == 0 {
            0.0
        } else {
            self.value_sum / self.visit_count as f32
        }
    }

    /// PUCT score of this node as a child, from the parent's perspective:
    ///
    /// ```text
    /// score = Q̂ + c_puct * P * sqrt(N_parent) / (1 + N)
    /// ```
    ///
    /// Q̂ negates the stored mean (the child's side to move is the parent's
    /// opponent). Unvisited children use first-play urgency instead: they
    /// are provisionally valued at the parent's estimate minus
    /// `fpu_reduction`, so selection neither ignores them nor prefers them
    /// to a sibling that is already known to be good.
    ///
    /// Takes a pre-computed sqrt(parent visits) to avoid redundant sqrt
    /// calls when scoring many siblings.
    #[inline]
    pub fn puct_score(
        &self,
        parent_q: f32,
        parent_visits_sqrt: f32,
        c_puct: f32,
        fpu_reduction: f32,
    ) -> f32 {
        let q_hat = if self.visit_count > 0 {
            -self.mean_value()
        } else {
            -(parent_q - fpu_reduction)
        };
        let u = c_puct * self.prior * parent_visits_sqrt / (1.0 + self.visit_count as f32);
        q_hat + u
    }

    /// Whether this node ends a selection walk.
    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.is_terminal || !self.is_expanded
    }

    /// Mark this node as terminal with the given value (from this node's
    /// side-to-move perspective).
    pub fn mark_terminal(&mut self, value: f32) {
        self.is_terminal = true;
        self.terminal_value = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use games_brandubh::Side;

    fn child(prior: f32) -> MctsNode {
        MctsNode::new_child(NodeId(0), Move::new(0, 3, 0, 2), prior, Side::Defender)
    }

    #[test]
    fn test_node_id_none() {
        assert!(NodeId::NONE.is_none());
        assert!(!NodeId::NONE.is_some());
        assert!(NodeId(0).is_some());
    }

    #[test]
    fn test_new_root() {
        let node = MctsNode::new_root(Board::initial());

        assert!(node.parent.is_none());
        assert!(node.action.is_none());
        assert_eq!(node.to_move, Side::Attacker);
        assert_eq!(node.visit_count, 0);
        assert!(!node.is_expanded);
        assert!(node.position.is_some());
    }

    #[test]
    fn test_child_position_is_lazy() {
        let node = child(0.5);
        assert!(node.position.is_none());
        assert_eq!(node.action, Some(Move::new(0, 3, 0, 2)));
    }

    #[test]
    fn test_mean_value() {
        let mut node = child(0.5);
        assert_eq!(node.mean_value(), 0.0);

        node.visit_count = 4;
        node.value_sum = 2.0;
        assert!((node.mean_value() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_puct_negates_child_value() {
        // A child that is bad for its own side (Q = -0.5) is good for the
        // parent, so its exploitation term is +0.5.
        let mut node = child(0.0); // prior 0 isolates the Q term
        node.visit_count = 10;
        node.value_sum = -5.0;

        let score = node.puct_score(0.0, 10.0, 1.25, 0.2);
        assert!((score - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_puct_fpu_for_unvisited() {
        // Unvisited child with zero prior: score is -(parent_q - fpu).
        let node = child(0.0);
        let score = node.puct_score(0.6, 10.0, 1.25, 0.2);
        assert!((score - (-0.4)).abs() < 1e-6);
    }

    #[test]
    fn test_puct_exploration_shrinks_with_visits() {
        let mut a = child(0.5);
        let mut b = child(0.5);
        a.visit_count = 1;
        a.value_sum = 0.0;
        b.visit_count = 100;
        b.value_sum = 0.0;

        let sa = a.puct_score(0.0, 10.0, 1.25, 0.2);
        let sb = b.puct_score(0.0, 10.0, 1.25, 0.2);
        assert!(sa > sb, "less-visited sibling should score higher: {sa} vs {sb}");
    }

    #[test]
    fn test_is_leaf() {
        let mut node = child(0.5);
        assert!(node.is_leaf());

        node.is_expanded = true;
        assert!(!node.is_leaf());

        node.mark_terminal(-1.0);
        assert!(node.is_leaf());
        assert_eq!(node.terminal_value, -1.0);
    }
}
