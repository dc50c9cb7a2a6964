use chess::material_value;
use cozy_chess::{BitBoard, Board, Color, Piece, Square};
use smallvec::SmallVec;

use super::helpers::piece_attacks;

const MAX_ATTACKERS_PER_SQUARE: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attacker {
    pub from: Square,
    pub piece: Piece,
}

type Attackers = SmallVec<[Attacker; MAX_ATTACKERS_PER_SQUARE]>;

/// Who attacks every square, for both colors, computed once per position.
#[derive(Debug, Clone)]
pub struct AttackMap {
    by_white: [Attackers; 64],
    by_black: [Attackers; 64],
    coverage_white: BitBoard,
    coverage_black: BitBoard,
}

impl AttackMap {
    pub fn compute(board: &Board) -> Self {
        let mut map = Self {
            by_white: std::array::from_fn(|_| SmallVec::new()),
            by_black: std::array::from_fn(|_| SmallVec::new()),
            coverage_white: BitBoard::EMPTY,
            coverage_black: BitBoard::EMPTY,
        };

        for color in [Color::White, Color::Black] {
            for piece in Piece::ALL {
                for from in board.pieces(piece) & board.colors(color) {
                    let attacks = piece_attacks(board, from, piece, color);
                    match color {
                        Color::White => map.coverage_white |= attacks,
                        Color::Black => map.coverage_black |= attacks,
                    }
                    for target in attacks {
                        let slot = match color {
                            Color::White => &mut map.by_white[target as usize],
                            Color::Black => &mut map.by_black[target as usize],
                        };
                        slot.push(Attacker { from, piece });
                    }
                }
            }
        }

        map
    }

    pub fn attackers_of(&self, sq: Square, color: Color) -> &[Attacker] {
        match color {
            Color::White => self.by_white[sq as usize].as_slice(),
            Color::Black => self.by_black[sq as usize].as_slice(),
        }
    }

    pub fn is_attacked(&self, sq: Square, by: Color) -> bool {
        !self.attackers_of(sq, by).is_empty()
    }

    /// Squares `color` controls.
    pub fn coverage(&self, color: Color) -> BitBoard {
        match color {
            Color::White => self.coverage_white,
            Color::Black => self.coverage_black,
        }
    }

    /// Cheapest `by` piece able to take on `sq`. The king only counts when `sq` is
    /// not defended by the other side.
    pub fn lowest_attacker_value(&self, sq: Square, by: Color) -> Option<f64> {
        let defended = self.is_attacked(sq, !by);
        self.attackers_of(sq, by)
            .iter()
            .filter(|a| a.piece != Piece::King || !defended)
            .map(|a| material_value(a.piece))
            .min_by(f64::total_cmp)
    }

    /// Non-king pieces of `color` that can be won: attacked and undefended, or attacked
    /// by something cheaper.
    pub fn loose_pieces(&self, board: &Board, color: Color) -> Vec<(Square, Piece)> {
        let mut loose = Vec::new();
        for sq in board.colors(color) & !board.pieces(Piece::King) {
            let Some(piece) = board.piece_on(sq) else {
                continue;
            };
            let Some(cheapest) = self.lowest_attacker_value(sq, !color) else {
                continue;
            };
            if !self.is_attacked(sq, color) || cheapest < material_value(piece) {
                loose.push((sq, piece));
            }
        }
        loose
    }
}
