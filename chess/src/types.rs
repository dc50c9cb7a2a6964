//! Shared move/material helpers over cozy-chess types.

use cozy_chess::{Board, Move, Piece};

/// Errors raised while turning text into a legal move.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoveNotationError {
    #[error("Invalid move: {0}")]
    InvalidMove(String),
    #[error("Invalid square: {0}")]
    InvalidSquare(String),
    #[error("Invalid promotion: {0}")]
    InvalidPromotion(String),
    #[error("Illegal move in position: {0}")]
    IllegalMove(String),
}

/// Material scale used by the tagger: pawn 1, minor pieces 3, rook 5, queen 9.
/// The king carries no exchangeable material.
pub fn material_value(piece: Piece) -> f64 {
    match piece {
        Piece::Pawn => 1.0,
        Piece::Knight | Piece::Bishop => 3.0,
        Piece::Rook => 5.0,
        Piece::Queen => 9.0,
        Piece::King => 0.0,
    }
}

/// All legal moves for the side to move, castling in cozy-chess (king-to-rook) form.
pub fn legal_moves(board: &Board) -> Vec<Move> {
    let mut moves = Vec::new();
    board.generate_moves(|mvs| {
        moves.extend(mvs);
        false
    });
    moves
}

/// Total number of pieces (kings and pawns included) on the board.
pub fn piece_count(board: &Board) -> u32 {
    board.occupied().len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_position_has_twenty_moves_and_thirty_two_pieces() {
        let board = Board::default();
        assert_eq!(legal_moves(&board).len(), 20);
        assert_eq!(piece_count(&board), 32);
    }

    #[test]
    fn material_scale() {
        assert_eq!(material_value(Piece::Pawn), 1.0);
        assert_eq!(material_value(Piece::Bishop), material_value(Piece::Knight));
        assert_eq!(material_value(Piece::Queen), 9.0);
        assert_eq!(material_value(Piece::King), 0.0);
    }
}
