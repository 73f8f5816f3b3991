//! Brandubh (7×7 tafl) rules for the MCTS engine
//!
//! Brandubh is an asymmetric two-player board game: eight attackers surround
//! four defenders and a king. The king tries to reach a corner square, the
//! attackers try to capture him. This crate owns the board representation,
//! move legality, capture resolution and termination - plus the two fixed
//! neural-network contracts built on top of them: the move ↔ policy-index
//! codec ([`moves`]) and the 4×7×7 state tensor ([`encode`]).
//!
//! # Board Layout
//!
//! The board is stored in row-major order, row 0 at the top:
//! ```text
//! Row 0: [ 0][ 1][ 2][ 3][ 4][ 5][ 6]
//! Row 1: [ 7][ 8][ 9][10][11][12][13]
//! Row 2: [14][15][16][17][18][19][20]
//! Row 3: [21][22][23][24][25][26][27]
//! Row 4: [28][29][30][31][32][33][34]
//! Row 5: [35][36][37][38][39][40][41]
//! Row 6: [42][43][44][45][46][47][48]
//!         Col 0  1  2  3  4  5  6
//! ```
//!
//! The four corner squares (0,0), (0,6), (6,0) and (6,6) are restricted:
//! only the king may stand on them, and they count as hostile squares when
//! resolving captures. There is no throne square in this variant.
//!
//! # Usage
//!
//! ```rust
//! use games_brandubh::{Board, Side};
//!
//! let board = Board::initial();
//! assert_eq!(board.to_move(), Side::Attacker);
//!
//! let moves = games_brandubh::moves::legal_moves(&board);
//! let next = board.apply(moves[0]).unwrap();
//! assert_eq!(next.to_move(), Side::Defender);
//! ```

use thiserror::Error;

pub mod encode;
pub mod moves;

pub use encode::{encode_state, PLANES, STATE_SIZE};
pub use moves::{legal_move_mask, legal_moves, Direction, Move, MoveMask, POLICY_SIZE};


/// Board side length.
pub const BOARD_SIZE: usize = 7;
/// Total number of squares.
pub const NUM_SQUARES: usize = BOARD_SIZE * BOARD_SIZE; // 49

/// The four restricted corner squares as (row, col).
pub const CORNERS: [(u8, u8); 4] = [(0, 0), (0, 6), (6, 0), (6, 6)];

/// Errors produced by rule operations.
#[derive(Debug, Error)]
pub enum RulesError {
    /// The position violates a structural invariant (multiple kings,
    /// a non-king piece on a corner).
    #[error("invalid position: {0}")]
    InvalidPosition(String),

    /// `apply` was called with a move the rules do not allow.
    #[error("illegal move {0} for {1:?}")]
    IllegalMove(Move, Side),
}

/// Contents of a single square.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum Piece {
    #[default]
    Empty = 0,
    Attacker = 1,
    Defender = 2,
    King = 3,
}

impl Piece {
    /// The side this piece fights for. The king counts as a defender piece;
    /// empty squares belong to no one.
    #[inline]
    pub fn side(self) -> Option<Side> {
        match self {
            Piece::Empty => None,
            Piece::Attacker => Some(Side::Attacker),
            Piece::Defender | Piece::King => Some(Side::Defender),
        }
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self == Piece::Empty
    }
}

/// The side to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Attacker,
    Defender,
}

impl Side {
    #[inline]
    pub fn opponent(self) -> Side {
        match self {
            Side::Attacker => Side::Defender,
            Side::Defender => Side::Attacker,
        }
    }
}

/// Game result from the rules' point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Ongoing,
    AttackerWin,
    DefenderWin,
}

impl Outcome {
    #[inline]
    pub fn is_over(self) -> bool {
        self != Outcome::Ongoing
    }

    /// The terminal value of this outcome from `side`'s perspective:
    /// +1.0 when `side` has won, -1.0 when it has lost.
    ///
    /// Must not be called on `Ongoing`.
    pub fn value_for(self, side: Side) -> f32 {
        let winner = match self {
            Outcome::AttackerWin => Side::Attacker,
            Outcome::DefenderWin => Side::Defender,
            Outcome::Ongoing => panic!("value_for called on an ongoing game"),
        };
        if winner == side {
            1.0
        } else {
            -1.0
        }
    }
}

/// A Brandubh position: 49 squares plus the side to move.
///
/// Boards are value types. [`Board::apply`] returns a new board; the caller's
/// board is never mutated. The struct is `Copy` (50 bytes), so the search can
/// keep per-simulation working copies without allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Board {
    cells: [Piece; NUM_SQUARES],
    to_move: Side,
}

impl Board {
    /// An empty board with the given side to move. Useful for setting up
    /// test positions square by square.
    pub fn empty(to_move: Side) -> Self {
        Self {
            cells: [Piece::Empty; NUM_SQUARES],
            to_move,
        }
    }

    /// The standard Brandubh starting position: a cross of eight attackers
    /// around four defenders and the king on the central square. Attackers
    /// move first.
    pub fn initial() -> Self {
        let mut board = Self::empty(Side::Attacker);

        const ATTACKERS: [(u8, u8); 8] = [
            (0, 3),
            (1, 3),
            (3, 0),
            (3, 1),
            (3, 5),
            (3, 6),
            (5, 3),
            (6, 3),
        ];
        const DEFENDERS: [(u8, u8); 4] = [(2, 3), (3, 2), (3, 4), (4, 3)];

        for (r, c) in ATTACKERS {
            board.set_piece(r, c, Piece::Attacker);
        }
        for (r, c) in DEFENDERS {
            board.set_piece(r, c, Piece::Defender);
        }
        board.set_piece(3, 3, Piece::King);

        board
    }

    /// Flat index of (row, col).
    #[inline]
    pub const fn index(row: u8, col: u8) -> usize {
        row as usize * BOARD_SIZE + col as usize
    }

    /// Whether (row, col) is one of the four restricted corners.
    #[inline]
    pub const fn is_corner(row: u8, col: u8) -> bool {
        (row == 0 || row == 6) && (col == 0 || col == 6)
    }

    #[inline]
    pub fn piece_at(&self, row: u8, col: u8) -> Piece {
        self.cells[Self::index(row, col)]
    }

    #[inline]
    pub fn set_piece(&mut self, row: u8, col: u8, piece: Piece) {
        self.cells[Self::index(row, col)] = piece;
    }

    #[inline]
    pub fn to_move(&self) -> Side {
        self.to_move
    }

    /// The same position with a different side to move.
    pub fn with_to_move(mut self, side: Side) -> Self {
        self.to_move = side;
        self
    }

    /// Number of attacker pieces on the board.
    pub fn attacker_count(&self) -> usize {
        self.cells.iter().filter(|&&p| p == Piece::Attacker).count()
    }

    /// Number of defender pieces on the board (king excluded).
    pub fn defender_count(&self) -> usize {
        self.cells.iter().filter(|&&p| p == Piece::Defender).count()
    }

    /// The king's square, if he is still on the board.
    pub fn king_square(&self) -> Option<(u8, u8)> {
        self.cells
            .iter()
            .position(|&p| p == Piece::King)
            .map(|i| ((i / BOARD_SIZE) as u8, (i % BOARD_SIZE) as u8))
    }

    /// Check structural invariants: at most one king, and no non-king piece
    /// standing on a restricted corner.
    pub fn validate(&self) -> Result<(), RulesError> {
        let kings = self.cells.iter().filter(|&&p| p == Piece::King).count();
        if kings > 1 {
            return Err(RulesError::InvalidPosition(format!(
                "{kings} kings on the board"
            )));
        }
        for (r, c) in CORNERS {
            let piece = self.piece_at(r, c);
            if !piece.is_empty() && piece != Piece::King {
                return Err(RulesError::InvalidPosition(format!(
                    "{piece:?} on restricted corner ({r}, {c})"
                )));
            }
        }
        Ok(())
    }

    /// Apply a move for the side to move, resolve captures, and flip the
    /// side to move. Returns the new position.
    ///
    /// The move must be one the legal-move enumerator would produce;
    /// anything else is rejected with [`RulesError::IllegalMove`].
    pub fn apply(&self, mv: Move) -> Result<Board, RulesError> {
        if !moves::is_legal(self, mv) {
            return Err(RulesError::IllegalMove(mv, self.to_move));
        }
        Ok(self.apply_unchecked(mv))
    }

    /// Apply a known-legal move. Used by the search on moves that came out
    /// of the legal-move enumerator.
    pub fn apply_unchecked(&self, mv: Move) -> Board {
        let mut next = *self;
        let piece = next.piece_at(mv.from_row, mv.from_col);
        next.set_piece(mv.from_row, mv.from_col, Piece::Empty);
        next.set_piece(mv.to_row, mv.to_col, piece);
        next.resolve_captures(mv.to_row, mv.to_col);
        next.to_move = self.to_move.opponent();
        next
    }

    /// Custodial capture around the square just moved to: an adjacent enemy
    /// piece is removed when the square directly beyond it holds a friendly
    /// piece or is a corner. The king is captured by the same sandwich rule
    /// as any other piece.
    fn resolve_captures(&mut self, row: u8, col: u8) {
        let mover = match self.piece_at(row, col).side() {
            Some(side) => side,
            None => return,
        };

        for dir in Direction::ALL {
            let Some((r1, c1)) = dir.offset(row, col, 1) else {
                continue;
            };
            let victim = self.piece_at(r1, c1);
            if victim.side() != Some(mover.opponent()) {
                continue;
            }
            let Some((r2, c2)) = dir.offset(row, col, 2) else {
                continue;
            };
            let beyond = self.piece_at(r2, c2);
            if beyond.side() == Some(mover) || Self::is_corner(r2, c2) {
                self.set_piece(r1, c1, Piece::Empty);
            }
        }
    }

    /// Full termination check, in rule order:
    ///
    /// 1. King on a corner → defenders win.
    /// 2. No king on the board → attackers win.
    /// 3. No attackers on the board → defenders win.
    /// 4. The side to move has no legal moves → it loses.
    pub fn outcome(&self) -> Outcome {
        let material = self.material_outcome();
        if material.is_over() {
            return material;
        }
        if moves::legal_moves(self).is_empty() {
            return match self.to_move {
                Side::Attacker => Outcome::DefenderWin,
                Side::Defender => Outcome::AttackerWin,
            };
        }
        Outcome::Ongoing
    }

    /// Termination by material and king position only - skips the stalemate
    /// scan. The search uses this before enumerating legal moves (which it
    /// needs anyway for expansion) so it never generates moves twice.
    pub fn material_outcome(&self) -> Outcome {
        match self.king_square() {
            None => return Outcome::AttackerWin,
            Some((r, c)) if Self::is_corner(r, c) => return Outcome::DefenderWin,
            Some(_) => {}
        }
        if self.attacker_count() == 0 {
            return Outcome::DefenderWin;
        }
        Outcome::Ongoing
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::initial()
    }
}
