//! Neural-network state encoding.
//!
//! A position is encoded as 4 planes of 7×7 floats, flattened plane-major:
//!
//! | Plane | Meaning | Value at (r, c) |
//! |---|---|---|
//! | 0 | Attackers | 1.0 iff an attacker stands on (r, c) |
//! | 1 | Defenders | 1.0 iff a defender stands on (r, c) |
//! | 2 | King | 1.0 iff the king stands on (r, c) |
//! | 3 | Side to move | uniformly 0.0 (attacker) or 1.0 (defender) |
//!
//! The layout is the input half of the trained model's ABI (input tensor
//! `[1, 4, 7, 7]`). No normalization, no history planes.

use crate::{Board, Piece, Side, NUM_SQUARES};

/// Number of input planes.
pub const PLANES: usize = 4;
/// Total tensor length: 4 × 49.
pub const STATE_SIZE: usize = PLANES * NUM_SQUARES; // 196

/// Encode a position (side to move included) into the flat plane tensor.
pub fn encode_state(board: &Board) -> [f32; STATE_SIZE] {
    let mut tensor = [0.0f32; STATE_SIZE];

    for square in 0..NUM_SQUARES {
        let row = (square / crate::BOARD_SIZE) as u8;
        let col = (square % crate::BOARD_SIZE) as u8;
        let plane = match board.piece_at(row, col) {
            Piece::Attacker => 0,
            Piece::Defender => 1,
            Piece::King => 2,
            Piece::Empty => continue,
        };
        tensor[plane * NUM_SQUARES + square] = 1.0;
    }

    if board.to_move() == Side::Defender {
        for value in &mut tensor[3 * NUM_SQUARES..] {
            *value = 1.0;
        }
    }

    tensor
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Board;

    #[test]
    fn test_initial_position_planes() {
        let tensor = encode_state(&Board::initial());

        // 8 attackers on plane 0, 4 defenders on plane 1, 1 king on plane 2.
        let plane_sum = |p: usize| -> f32 {
            tensor[p * NUM_SQUARES..(p + 1) * NUM_SQUARES].iter().sum()
        };
        assert_eq!(plane_sum(0), 8.0);
        assert_eq!(plane_sum(1), 4.0);
        assert_eq!(plane_sum(2), 1.0);

        // Attacker to move: side plane all zeros.
        assert_eq!(plane_sum(3), 0.0);

        // King on the central square of plane 2.
        assert_eq!(tensor[2 * NUM_SQUARES + Board::index(3, 3)], 1.0);
    }

    #[test]
    fn test_side_to_move_plane() {
        let board = Board::initial().with_to_move(Side::Defender);
        let tensor = encode_state(&board);

        for value in &tensor[3 * NUM_SQUARES..] {
            assert_eq!(*value, 1.0);
        }
    }

    #[test]
    fn test_planes_are_disjoint() {
        let tensor = encode_state(&Board::initial());

        // No square can be marked on more than one piece plane.
        for square in 0..NUM_SQUARES {
            let marks: f32 = (0..3).map(|p| tensor[p * NUM_SQUARES + square]).sum();
            assert!(marks <= 1.0, "square {square} marked on multiple planes");
        }
    }
}
