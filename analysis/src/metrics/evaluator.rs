use chess::material_value;
use cozy_chess::{Board, Color, Piece, Square};

use super::StyleMetrics;
use crate::board_analysis::helpers::piece_attacks;
use crate::board_analysis::{king_exposure, pawn_structure, AttackMap};

const CENTER: [Square; 4] = [Square::D4, Square::E4, Square::D5, Square::E5];

/// Scores a position along the five style dimensions from `side`'s point of view.
pub trait PositionEvaluator: Send + Sync {
    fn evaluate(&self, board: &Board, side: Color) -> StyleMetrics;

    fn name(&self) -> &'static str;
}

/// Differential board evaluator: every component is "mine minus theirs", normalized
/// and clamped to [-1, 1], so swapping `side` negates the result exactly.
#[derive(Debug, Default, Clone, Copy)]
pub struct BoardEvaluator;

/// Evaluator that reports zero on every component.
#[derive(Debug, Default, Clone, Copy)]
pub struct NeutralEvaluator;

fn squares_reached(board: &Board, color: Color) -> f64 {
    let own = board.colors(color);
    let mut total = 0;
    for piece in [Piece::Knight, Piece::Bishop, Piece::Rook, Piece::Queen] {
        for sq in board.pieces(piece) & own {
            total += (piece_attacks(board, sq, piece, color) & !own).len();
        }
    }
    total as f64
}

fn center_presence(board: &Board, attacks: &AttackMap, color: Color) -> f64 {
    CENTER
        .iter()
        .map(|&sq| {
            let occupied = board.colors(color).has(sq) as u8 as f64;
            attacks.attackers_of(sq, color).len() as f64 + occupied
        })
        .sum()
}

fn threat_value(board: &Board, attacks: &AttackMap, victim: Color) -> f64 {
    attacks
        .loose_pieces(board, victim)
        .iter()
        .map(|(_, piece)| material_value(*piece).min(5.0))
        .sum()
}

fn normalized(mine: f64, theirs: f64, scale: f64) -> f64 {
    ((mine - theirs) / scale).clamp(-1.0, 1.0)
}

impl PositionEvaluator for BoardEvaluator {
    fn evaluate(&self, board: &Board, side: Color) -> StyleMetrics {
        let opp = !side;
        let attacks = AttackMap::compute(board);

        let mobility = normalized(squares_reached(board, side), squares_reached(board, opp), 30.0);
        let center_control = normalized(
            center_presence(board, &attacks, side),
            center_presence(board, &attacks, opp),
            8.0,
        );
        let king_safety = normalized(
            king_exposure(board, opp, &attacks).exposure,
            king_exposure(board, side, &attacks).exposure,
            1.0,
        );
        let structure = normalized(
            pawn_structure(board, opp).weakness(),
            pawn_structure(board, side).weakness(),
            4.0,
        );
        let tactics = normalized(
            threat_value(board, &attacks, opp),
            threat_value(board, &attacks, side),
            6.0,
        );

        StyleMetrics {
            mobility,
            center_control,
            king_safety,
            structure,
            tactics,
        }
    }

    fn name(&self) -> &'static str {
        "board"
    }
}

impl PositionEvaluator for NeutralEvaluator {
    fn evaluate(&self, _board: &Board, _side: Color) -> StyleMetrics {
        StyleMetrics::default()
    }

    fn name(&self) -> &'static str {
        "neutral"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_position_is_balanced() {
        let metrics = BoardEvaluator.evaluate(&Board::default(), Color::White);
        assert_eq!(metrics, StyleMetrics::default());
    }

    #[test]
    fn swapping_sides_negates_every_component() {
        let board: Board = "r1bqkb1r/pppp1ppp/2n2n2/4p3/2B1P3/5N2/PPPP1PPP/RNBQK2R w KQkq - 4 4"
            .parse()
            .unwrap();
        let white = BoardEvaluator.evaluate(&board, Color::White);
        let black = BoardEvaluator.evaluate(&board, Color::Black);
        assert_eq!(white.negate(), black);
    }

    #[test]
    fn developed_side_has_more_mobility_and_center() {
        // White has developed both knights and occupied the center.
        let board: Board = "rnbqkbnr/pppppppp/8/8/3PP3/2N2N2/PPP2PPP/R1BQKB1R b KQkq - 0 4"
            .parse()
            .unwrap();
        let white = BoardEvaluator.evaluate(&board, Color::White);
        assert!(white.mobility > 0.0);
        assert!(white.center_control > 0.0);
    }

    #[test]
    fn hanging_piece_shows_up_in_tactics() {
        // Black knight on d5 hangs to the f3 bishop.
        let board: Board = "4k3/8/8/3n4/8/5B2/8/4K3 w - - 0 1".parse().unwrap();
        let white = BoardEvaluator.evaluate(&board, Color::White);
        assert!(white.tactics > 0.0);
    }

    #[test]
    fn neutral_evaluator_reports_zero() {
        let board: Board = "4k3/8/8/3n4/8/5B2/8/4K3 w - - 0 1".parse().unwrap();
        assert_eq!(
            NeutralEvaluator.evaluate(&board, Color::Black),
            StyleMetrics::default()
        );
    }
}
