use cozy_chess::{Board, Color};
use serde::{Deserialize, Serialize};

use super::attack_map::AttackMap;
use super::contact::ContactProfile;

/// How much is "hanging in the air" in a position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TensionProfile {
    /// Squares attacked by both sides.
    pub contested_squares: u8,
    /// Pieces of either color that are under attack.
    pub attacked_pieces: u8,
    /// Attacked pieces that are also defended.
    pub attacked_but_defended: u8,
    /// Captures and checks available to the side to move.
    pub forcing_moves: u32,
    /// 0.0 (quiet) to 1.0 (volatile).
    pub volatility: f64,
}

pub fn compute_tension(board: &Board, attacks: &AttackMap, contact: &ContactProfile) -> TensionProfile {
    let white = attacks.coverage(Color::White);
    let black = attacks.coverage(Color::Black);
    let contested_squares = (white & black).len() as u8;

    let white_hit = board.colors(Color::White) & black;
    let black_hit = board.colors(Color::Black) & white;
    let attacked_pieces = (white_hit.len() + black_hit.len()) as u8;
    let attacked_but_defended =
        ((white_hit & white).len() + (black_hit & black).len()) as u8;
    let mutual = white_hit.len().min(black_hit.len());

    let mutual_factor = (mutual as f64 / 5.0).min(1.0);
    let forcing_factor = (contact.contact_moves as f64 / 15.0).min(1.0);
    let contested_factor = (contested_squares as f64 / 30.0).min(1.0);
    let defended_factor = (attacked_but_defended as f64 / 8.0).min(1.0);

    let volatility = (0.30 * mutual_factor
        + 0.25 * forcing_factor
        + 0.25 * contested_factor
        + 0.20 * defended_factor)
        .clamp(0.0, 1.0);

    TensionProfile {
        contested_squares,
        attacked_pieces,
        attacked_but_defended,
        forcing_moves: contact.contact_moves,
        volatility,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board_analysis::contact_profile;

    fn tension_of(fen: &str) -> TensionProfile {
        let board: Board = fen.parse().unwrap();
        let attacks = AttackMap::compute(&board);
        compute_tension(&board, &attacks, &contact_profile(&board))
    }

    #[test]
    fn start_position_is_quiet() {
        let tension = tension_of("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1");
        assert_eq!(tension.attacked_pieces, 0);
        assert_eq!(tension.forcing_moves, 0);
        assert!(tension.volatility < 0.2);
    }

    #[test]
    fn open_center_clash_is_more_volatile() {
        let quiet = tension_of("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1");
        // Mutual pawn and piece contact around d5/e4.
        let sharp = tension_of("r1bqkb1r/pppp1ppp/2n2n2/4p3/2B1P3/5N2/PPPP1PPP/RNBQK2R w KQkq - 4 4");
        assert!(sharp.contested_squares > quiet.contested_squares);
        assert!(sharp.volatility > quiet.volatility);
    }
}
