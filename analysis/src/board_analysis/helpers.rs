use cozy_chess::{BitBoard, Board, Color, File, Piece, Rank, Square};

/// Pieces of `color` that attack `sq`.
pub fn attackers_of(board: &Board, sq: Square, color: Color) -> BitBoard {
    let occupied = board.occupied();
    let ours = board.colors(color);
    let diagonal = board.pieces(Piece::Bishop) | board.pieces(Piece::Queen);
    let straight = board.pieces(Piece::Rook) | board.pieces(Piece::Queen);

    // A pawn of `color` hits `sq` iff an enemy pawn on `sq` would hit the pawn.
    (cozy_chess::get_pawn_attacks(sq, !color) & board.pieces(Piece::Pawn)
        | cozy_chess::get_knight_moves(sq) & board.pieces(Piece::Knight)
        | cozy_chess::get_bishop_moves(sq, occupied) & diagonal
        | cozy_chess::get_rook_moves(sq, occupied) & straight
        | cozy_chess::get_king_moves(sq) & board.pieces(Piece::King))
        & ours
}

/// Attack set of `piece` standing on `sq`.
pub fn piece_attacks(board: &Board, sq: Square, piece: Piece, color: Color) -> BitBoard {
    let occupied = board.occupied();
    match piece {
        Piece::Pawn => cozy_chess::get_pawn_attacks(sq, color),
        Piece::Knight => cozy_chess::get_knight_moves(sq),
        Piece::Bishop => cozy_chess::get_bishop_moves(sq, occupied),
        Piece::Rook => cozy_chess::get_rook_moves(sq, occupied),
        Piece::Queen => {
            cozy_chess::get_bishop_moves(sq, occupied) | cozy_chess::get_rook_moves(sq, occupied)
        }
        Piece::King => cozy_chess::get_king_moves(sq),
    }
}

/// The king's file and its neighbours.
pub fn king_zone_files(king_sq: Square) -> impl Iterator<Item = File> {
    let king_file = king_sq.file() as usize;
    let min_file = king_file.saturating_sub(1);
    let max_file = (king_file + 1).min(7);
    (min_file..=max_file).filter_map(File::try_index)
}

pub fn file_bitboard(file: File) -> BitBoard {
    Rank::ALL
        .iter()
        .fold(BitBoard::EMPTY, |bb, &rank| bb | BitBoard::from(Square::new(file, rank)))
}

pub fn rank_bitboard(rank: Rank) -> BitBoard {
    File::ALL
        .iter()
        .fold(BitBoard::EMPTY, |bb, &file| bb | BitBoard::from(Square::new(file, rank)))
}

pub fn back_rank(color: Color) -> Rank {
    match color {
        Color::White => Rank::First,
        Color::Black => Rank::Eighth,
    }
}

/// Ranks between `sq` and the back rank of `color` (0 on the back rank).
pub fn distance_from_back_rank(sq: Square, color: Color) -> u8 {
    let rank = sq.rank() as u8;
    match color {
        Color::White => rank,
        Color::Black => 7 - rank,
    }
}

/// The square one step forward for a pawn of `color`, if on the board.
pub fn square_ahead(sq: Square, color: Color) -> Option<Square> {
    let rank = sq.rank() as usize;
    let next = match color {
        Color::White => rank.checked_add(1).filter(|r| *r < 8)?,
        Color::Black => rank.checked_sub(1)?,
    };
    Rank::try_index(next).map(|r| Square::new(sq.file(), r))
}

pub fn king_square(board: &Board, color: Color) -> Option<Square> {
    (board.pieces(Piece::King) & board.colors(color)).into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn knight_attackers_found() {
        // White knight on f3 attacks e5 and d4.
        let board: Board = "4k3/8/8/8/8/5N2/8/4K3 w - - 0 1".parse().unwrap();
        assert!(attackers_of(&board, Square::E5, Color::White).has(Square::F3));
        assert!(attackers_of(&board, Square::E5, Color::Black).is_empty());
    }

    #[test]
    fn pawn_attack_direction_respects_color() {
        let board: Board = "4k3/8/8/3p4/4P3/8/8/4K3 w - - 0 1".parse().unwrap();
        assert!(attackers_of(&board, Square::D5, Color::White).has(Square::E4));
        assert!(attackers_of(&board, Square::E4, Color::Black).has(Square::D5));
        assert!(attackers_of(&board, Square::E5, Color::White).is_empty());
    }

    #[test]
    fn king_zone_is_clamped_at_the_edge() {
        let files: Vec<File> = king_zone_files(Square::H1).collect();
        assert_eq!(files, vec![File::G, File::H]);
        assert_eq!(king_zone_files(Square::E1).count(), 3);
    }

    #[test]
    fn square_ahead_stops_at_the_edge() {
        assert_eq!(square_ahead(Square::E2, Color::White), Some(Square::E3));
        assert_eq!(square_ahead(Square::E7, Color::Black), Some(Square::E6));
        assert_eq!(square_ahead(Square::E8, Color::White), None);
        assert_eq!(square_ahead(Square::E1, Color::Black), None);
    }

    #[test]
    fn back_rank_distance() {
        assert_eq!(distance_from_back_rank(Square::C1, Color::White), 0);
        assert_eq!(distance_from_back_rank(Square::C1, Color::Black), 7);
        assert_eq!(distance_from_back_rank(Square::F5, Color::Black), 3);
    }
}
