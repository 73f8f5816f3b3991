//! Move representation, legal-move enumeration, and the policy-index codec.
//!
//! Every move is a strict orthogonal slide of 1–6 squares. Moves map onto a
//! fixed policy space of 1176 indices:
//!
//! ```text
//! index = from_square * 24 + direction * 6 + (distance - 1)
//! ```
//!
//! with `from_square = row * 7 + col`, directions ordered Up, Down, Left,
//! Right and distances 1..=6. The layout is part of the trained model's ABI
//! and must not drift. Decoding is total over [0, 1176): indices whose
//! destination falls off the board decode to `None` and are never produced
//! by the legal-move enumerator.

use std::fmt;

use crate::{Board, Piece, BOARD_SIZE, NUM_SQUARES};

/// Size of the policy vector: 49 from-squares × 4 directions × 6 distances.
pub const POLICY_SIZE: usize = NUM_SQUARES * NUM_DIRECTIONS * MAX_DISTANCE;

const NUM_DIRECTIONS: usize = 4;
/// Longest possible slide on a 7-square line.
const MAX_DISTANCE: usize = 6;

/// A sliding direction, in policy-index order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Direction {
    Up = 0,
    Down = 1,
    Left = 2,
    Right = 3,
}

impl Direction {
    /// All directions in enumeration (and policy-index) order.
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    /// The square `dist` steps from (row, col) in this direction, or `None`
    /// if it falls off the board.
    #[inline]
    pub fn offset(self, row: u8, col: u8, dist: u8) -> Option<(u8, u8)> {
        let (row, col, dist) = (row as i8, col as i8, dist as i8);
        let (r, c) = match self {
            Direction::Up => (row - dist, col),
            Direction::Down => (row + dist, col),
            Direction::Left => (row, col - dist),
            Direction::Right => (row, col + dist),
        };
        if (0..BOARD_SIZE as i8).contains(&r) && (0..BOARD_SIZE as i8).contains(&c) {
            Some((r as u8, c as u8))
        } else {
            None
        }
    }
}

/// A move: slide the piece on (from_row, from_col) to (to_row, to_col).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Move {
    pub from_row: u8,
    pub from_col: u8,
    pub to_row: u8,
    pub to_col: u8,
}

impl Move {
    pub fn new(from_row: u8, from_col: u8, to_row: u8, to_col: u8) -> Self {
        Self {
            from_row,
            from_col,
            to_row,
            to_col,
        }
    }

    /// The direction and distance of this move, or `None` if it is not a
    /// strict orthogonal slide of 1–6 squares.
    pub fn direction(&self) -> Option<(Direction, u8)> {
        let dr = self.to_row as i8 - self.from_row as i8;
        let dc = self.to_col as i8 - self.from_col as i8;
        let (dir, dist) = match (dr, dc) {
            (dr, 0) if dr < 0 => (Direction::Up, -dr),
            (dr, 0) if dr > 0 => (Direction::Down, dr),
            (0, dc) if dc < 0 => (Direction::Left, -dc),
            (0, dc) if dc > 0 => (Direction::Right, dc),
            _ => return None,
        };
        if (1..=MAX_DISTANCE as i8).contains(&dist) {
            Some((dir, dist as u8))
        } else {
            None
        }
    }

    /// Whether both endpoints lie on the 7×7 board. The fields are plain
    /// integers, so out-of-range coordinates are representable; rule
    /// operations reject such moves instead of indexing out of bounds.
    pub fn is_on_board(&self) -> bool {
        let max = BOARD_SIZE as u8;
        self.from_row < max && self.from_col < max && self.to_row < max && self.to_col < max
    }

    /// Encode this move into its policy index, or `None` if the move is not
    /// an on-board orthogonal slide. Inverse of [`Move::from_policy_index`].
    pub fn policy_index(&self) -> Option<u16> {
        if !self.is_on_board() {
            return None;
        }
        let (dir, dist) = self.direction()?;
        let from_square = self.from_row as usize * BOARD_SIZE + self.from_col as usize;
        let index = from_square * NUM_DIRECTIONS * MAX_DISTANCE
            + dir as usize * MAX_DISTANCE
            + (dist as usize - 1);
        Some(index as u16)
    }

    /// Decode a policy index back into a move. Returns `None` for indices
    /// whose destination falls off the board; such indices never carry mask
    /// bits and are never produced by the enumerator.
    pub fn from_policy_index(index: u16) -> Option<Move> {
        debug_assert!((index as usize) < POLICY_SIZE);
        let index = index as usize;
        let from_square = index / (NUM_DIRECTIONS * MAX_DISTANCE);
        let dir = Direction::ALL[(index / MAX_DISTANCE) % NUM_DIRECTIONS];
        let dist = (index % MAX_DISTANCE) as u8 + 1;

        let from_row = (from_square / BOARD_SIZE) as u8;
        let from_col = (from_square % BOARD_SIZE) as u8;
        let (to_row, to_col) = dir.offset(from_row, from_col, dist)?;
        Some(Move::new(from_row, from_col, to_row, to_col))
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({},{})-({},{})",
            self.from_row, self.from_col, self.to_row, self.to_col
        )
    }
}

/// Fixed bitset over the policy-index space.
///
/// `to_policy_floats` produces the 1.0/0.0 mask of the evaluator contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveMask {
    bits: [u64; Self::WORDS],
}

impl MoveMask {
    const WORDS: usize = POLICY_SIZE.div_ceil(64); // 19

    pub fn new() -> Self {
        Self {
            bits: [0; Self::WORDS],
        }
    }

    #[inline]
    pub fn set(&mut self, index: u16) {
        debug_assert!((index as usize) < POLICY_SIZE);
        self.bits[index as usize / 64] |= 1u64 << (index % 64);
    }

    #[inline]
    pub fn contains(&self, index: u16) -> bool {
        debug_assert!((index as usize) < POLICY_SIZE);
        self.bits[index as usize / 64] & (1u64 << (index % 64)) != 0
    }

    /// Number of set indices.
    pub fn count(&self) -> usize {
        self.bits.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// The mask as a float vector of length [`POLICY_SIZE`]: 1.0 at legal
    /// indices, 0.0 elsewhere.
    pub fn to_policy_floats(&self) -> Vec<f32> {
        (0..POLICY_SIZE as u16)
            .map(|i| if self.contains(i) { 1.0 } else { 0.0 })
            .collect()
    }
}

impl Default for MoveMask {
    fn default() -> Self {
        Self::new()
    }
}

/// Enumerate every legal move for the side to move.
///
/// Pieces are scanned in row-major order, directions in Up/Down/Left/Right
/// order, distances ascending - the enumeration order is stable and shared
/// by everything downstream (child ordering, tie-breaks, tests).
pub fn legal_moves(board: &Board) -> Vec<Move> {
    let mut moves = Vec::new();
    for_each_legal_move(board, |mv, _| moves.push(mv));
    moves
}

/// Like [`legal_moves`], but paired with each move's policy index.
pub fn legal_moves_with_indices(board: &Board) -> Vec<(Move, u16)> {
    let mut moves = Vec::new();
    for_each_legal_move(board, |mv, index| moves.push((mv, index)));
    moves
}

/// The legal-move bitset for the side to move. Agrees set-wise with
/// [`legal_moves`] by construction.
pub fn legal_move_mask(board: &Board) -> MoveMask {
    let mut mask = MoveMask::new();
    for_each_legal_move(board, |_, index| mask.set(index));
    mask
}

/// Whether `mv` is a move the enumerator would produce for this position.
pub fn is_legal(board: &Board, mv: Move) -> bool {
    if !mv.is_on_board() {
        return false;
    }
    let piece = board.piece_at(mv.from_row, mv.from_col);
    if piece.side() != Some(board.to_move()) {
        return false;
    }
    let Some((dir, dist)) = mv.direction() else {
        return false;
    };
    // Every square along the slide must be empty, and only the king may
    // finish on a corner.
    for step in 1..=dist {
        let Some((r, c)) = dir.offset(mv.from_row, mv.from_col, step) else {
            return false;
        };
        if !board.piece_at(r, c).is_empty() {
            return false;
        }
        if step == dist && Board::is_corner(r, c) && piece != Piece::King {
            return false;
        }
    }
    true
}

/// Shared enumeration core: visits (move, policy_index) for every legal
/// move, in the stable order documented on [`legal_moves`].
fn for_each_legal_move(board: &Board, mut visit: impl FnMut(Move, u16)) {
    let side = board.to_move();
    for row in 0..BOARD_SIZE as u8 {
        for col in 0..BOARD_SIZE as u8 {
            let piece = board.piece_at(row, col);
            if piece.side() != Some(side) {
                continue;
            }
            let from_square = row as usize * BOARD_SIZE + col as usize;
            for dir in Direction::ALL {
                for dist in 1..=MAX_DISTANCE as u8 {
                    let Some((r, c)) = dir.offset(row, col, dist) else {
                        break;
                    };
                    if !board.piece_at(r, c).is_empty() {
                        break;
                    }
                    // Corners sit at the end of their rank/file, so a
                    // blocked corner also ends the slide.
                    if Board::is_corner(r, c) && piece != Piece::King {
                        break;
                    }
                    let index = from_square * NUM_DIRECTIONS * MAX_DISTANCE
                        + dir as usize * MAX_DISTANCE
                        + (dist as usize - 1);
                    visit(Move::new(row, col, r, c), index as u16);
                }
            }
        }
    }
}
