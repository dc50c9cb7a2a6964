use cozy_chess::{BitBoard, Board, Color, Piece, Rank};
use serde::{Deserialize, Serialize};

use super::attack_map::AttackMap;
use super::helpers::{file_bitboard, king_square, king_zone_files, rank_bitboard};

/// How exposed one side's king is.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KingExposure {
    /// Own pawns sheltering the king on its file and the neighbouring ones (0-3).
    pub shield_pawns: u8,
    /// King-zone files without own pawns (0-3).
    pub open_files: u8,
    /// Distinct enemy pieces hitting the king zone.
    pub attackers: u8,
    /// Weighted attack: Q=4, R=3, B=2, N=2, P=1, K=1.
    pub attack_weight: u16,
    pub attacked_zone_squares: u8,
    pub zone_size: u8,
    /// 0.0 (safe) to 1.0 (exposed).
    pub exposure: f64,
}

impl KingExposure {
    fn missing_king() -> Self {
        Self {
            shield_pawns: 0,
            open_files: 3,
            attackers: 0,
            attack_weight: 0,
            attacked_zone_squares: 0,
            zone_size: 0,
            exposure: 1.0,
        }
    }
}

pub fn king_exposure(board: &Board, color: Color, attacks: &AttackMap) -> KingExposure {
    let Some(king_sq) = king_square(board, color) else {
        return KingExposure::missing_king();
    };
    let enemy = !color;

    let zone = cozy_chess::get_king_moves(king_sq) | BitBoard::from(king_sq);
    let zone_size = zone.len() as u8;

    let own_pawns = board.pieces(Piece::Pawn) & board.colors(color);
    let shelter_ranks = match color {
        Color::White => rank_bitboard(Rank::Second) | rank_bitboard(Rank::Third),
        Color::Black => rank_bitboard(Rank::Seventh) | rank_bitboard(Rank::Sixth),
    };

    let mut shield_pawns = 0u8;
    let mut open_files = 0u8;
    for file in king_zone_files(king_sq) {
        let on_file = own_pawns & file_bitboard(file);
        if on_file.is_empty() {
            open_files += 1;
        }
        if !(on_file & shelter_ranks).is_empty() {
            shield_pawns += 1;
        }
    }

    let attacked_zone_squares = (attacks.coverage(enemy) & zone).len() as u8;

    let mut hitting = BitBoard::EMPTY;
    for sq in zone {
        for attacker in attacks.attackers_of(sq, enemy) {
            hitting |= BitBoard::from(attacker.from);
        }
    }
    let attack_weight: u16 = hitting
        .into_iter()
        .filter_map(|sq| board.piece_on(sq))
        .map(|piece| match piece {
            Piece::Queen => 4,
            Piece::Rook => 3,
            Piece::Bishop | Piece::Knight => 2,
            Piece::Pawn | Piece::King => 1,
        })
        .sum();

    let shield_deficit = (3.0 - shield_pawns as f64) / 3.0;
    let open_file_factor = open_files as f64 / 3.0;
    let attack_factor = (attack_weight as f64 / 20.0).min(1.0);
    let zone_control = if zone_size > 0 {
        attacked_zone_squares as f64 / zone_size as f64
    } else {
        0.0
    };

    let exposure = (0.25 * shield_deficit
        + 0.20 * open_file_factor
        + 0.30 * attack_factor
        + 0.25 * zone_control)
        .clamp(0.0, 1.0);

    KingExposure {
        shield_pawns,
        open_files,
        attackers: hitting.len() as u8,
        attack_weight,
        attacked_zone_squares,
        zone_size,
        exposure,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exposure_of(fen: &str, color: Color) -> KingExposure {
        let board: Board = fen.parse().unwrap();
        let attacks = AttackMap::compute(&board);
        king_exposure(&board, color, &attacks)
    }

    #[test]
    fn start_position_kings_are_sheltered() {
        let fen = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";
        let white = exposure_of(fen, Color::White);
        let black = exposure_of(fen, Color::Black);
        assert_eq!(white.shield_pawns, 3);
        assert_eq!(white.open_files, 0);
        assert!(white.exposure < 0.2);
        assert!((white.exposure - black.exposure).abs() < 1e-9);
    }

    #[test]
    fn stripped_king_under_fire_is_exposed() {
        // White king g1 without pawns, black queen and rook bearing down on it.
        let exposed = exposure_of("6k1/8/8/8/8/7q/r7/6K1 w - - 0 1", Color::White);
        let sheltered = exposure_of("6k1/8/8/8/8/8/5PPP/6K1 w - - 0 1", Color::White);
        assert!(exposed.exposure > 0.5, "got {}", exposed.exposure);
        assert!(exposed.attack_weight >= 7);
        assert!(sheltered.exposure < exposed.exposure);
    }
}
