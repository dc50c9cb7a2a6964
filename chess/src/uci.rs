//! UCI (Universal Chess Interface) move notation

use cozy_chess::{Board, File, Move, Piece, Rank, Square};

use crate::types::{legal_moves, MoveNotationError};

/// Parse UCI move format (e2e4, e7e8q). Purely syntactic; legality is not checked.
pub fn parse_uci_move(s: &str) -> Result<Move, MoveNotationError> {
    if !s.is_ascii() || !(4..=5).contains(&s.len()) {
        return Err(MoveNotationError::InvalidMove(s.to_string()));
    }

    let from = parse_square(&s[0..2])?;
    let to = parse_square(&s[2..4])?;

    let promotion = if s.len() == 5 {
        Some(match &s[4..5] {
            "q" => Piece::Queen,
            "r" => Piece::Rook,
            "b" => Piece::Bishop,
            "n" => Piece::Knight,
            _ => return Err(MoveNotationError::InvalidPromotion(s.to_string())),
        })
    } else {
        None
    };

    Ok(Move {
        from,
        to,
        promotion,
    })
}

pub(crate) fn parse_square(s: &str) -> Result<Square, MoveNotationError> {
    let mut chars = s.chars();
    let (Some(f), Some(r), None) = (chars.next(), chars.next(), chars.next()) else {
        return Err(MoveNotationError::InvalidSquare(s.to_string()));
    };

    let file = match f {
        'a'..='h' => File::index(f as usize - 'a' as usize),
        _ => return Err(MoveNotationError::InvalidSquare(s.to_string())),
    };
    let rank = match r {
        '1'..='8' => Rank::index(r as usize - '1' as usize),
        _ => return Err(MoveNotationError::InvalidSquare(s.to_string())),
    };

    Ok(Square::new(file, rank))
}

/// Convert UCI castling notation to cozy_chess notation
///
/// UCI uses standard notation (king moves 2 squares): e1g1, e1c1, e8g8, e8c8
/// cozy_chess uses king-to-rook notation: e1h1, e1a1, e8h8, e8a8
///
/// The converted move is only returned when it is in `legal_moves`; otherwise the
/// input is returned untouched.
pub fn convert_uci_castling_to_cozy(mv: Move, legal_moves: &[Move]) -> Move {
    let is_rank_1_or_8 = matches!(mv.from.rank(), Rank::First | Rank::Eighth);
    let is_e_file = matches!(mv.from.file(), File::E);
    let is_g_or_c_file = matches!(mv.to.file(), File::G | File::C);

    if is_rank_1_or_8 && is_e_file && is_g_or_c_file && mv.promotion.is_none() {
        let rook_file = if mv.to.file() == File::G {
            File::H
        } else {
            File::A
        };
        let converted = Move {
            from: mv.from,
            to: Square::new(rook_file, mv.from.rank()),
            promotion: None,
        };

        if legal_moves.contains(&converted) && !legal_moves.contains(&mv) {
            return converted;
        }
    }

    mv
}

/// Format move for UCI exactly as cozy-chess represents it (castling as king-to-rook).
pub fn format_uci_move(mv: Move) -> String {
    let mut s = format!("{}{}", mv.from, mv.to);
    if let Some(promo) = mv.promotion {
        s.push(match promo {
            Piece::Queen => 'q',
            Piece::Rook => 'r',
            Piece::Bishop => 'b',
            Piece::Knight => 'n',
            Piece::Pawn | Piece::King => '?',
        });
    }
    s
}

/// Format a move the way engines expect it: castling as the king's two-square step.
pub fn to_standard_uci(board: &Board, mv: Move) -> String {
    let is_castle = board.piece_on(mv.from) == Some(Piece::King)
        && board.colors(board.side_to_move()).has(mv.to);
    if !is_castle {
        return format_uci_move(mv);
    }
    let king_file = if mv.to.file() as u8 > mv.from.file() as u8 {
        File::G
    } else {
        File::C
    };
    format_uci_move(Move {
        from: mv.from,
        to: Square::new(king_file, mv.from.rank()),
        promotion: None,
    })
}

/// Resolve a move written either in UCI (standard or king-to-rook castling) or SAN
/// against `board`. The returned move is guaranteed legal.
pub fn parse_move_notation(board: &Board, text: &str) -> Result<Move, MoveNotationError> {
    let text = text.trim();
    let legal = legal_moves(board);

    if let Ok(mv) = parse_uci_move(text) {
        let mv = convert_uci_castling_to_cozy(mv, &legal);
        return if legal.contains(&mv) {
            Ok(mv)
        } else {
            Err(MoveNotationError::IllegalMove(text.to_string()))
        };
    }

    crate::pgn::parse_san(board, text)
        .map_err(|e| MoveNotationError::IllegalMove(format!("{} ({})", text, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_uci_move() {
        let mv = Move {
            from: Square::E2,
            to: Square::E4,
            promotion: None,
        };
        assert_eq!(format_uci_move(mv), "e2e4");
    }

    #[test]
    fn test_format_uci_move_with_promotion() {
        let mv = Move {
            from: Square::E7,
            to: Square::E8,
            promotion: Some(Piece::Queen),
        };
        assert_eq!(format_uci_move(mv), "e7e8q");
    }

    #[test]
    fn parse_rejects_bad_squares() {
        assert!(parse_uci_move("z9e4").is_err());
        assert!(parse_uci_move("e2").is_err());
        assert!(matches!(
            parse_uci_move("e7e8k"),
            Err(MoveNotationError::InvalidPromotion(_))
        ));
    }

    #[test]
    fn standard_castling_is_converted() {
        let board: Board = "r3k2r/pppppppp/8/8/8/8/PPPPPPPP/R3K2R w KQkq - 0 1"
            .parse()
            .unwrap();
        let mv = parse_move_notation(&board, "e1g1").unwrap();
        assert_eq!(mv.to, Square::H1);
        assert_eq!(to_standard_uci(&board, mv), "e1g1");

        let long = parse_move_notation(&board, "e1c1").unwrap();
        assert_eq!(long.to, Square::A1);
        assert_eq!(to_standard_uci(&board, long), "e1c1");
    }

    #[test]
    fn illegal_uci_move_is_rejected() {
        let board = Board::default();
        assert!(matches!(
            parse_move_notation(&board, "e2e5"),
            Err(MoveNotationError::IllegalMove(_))
        ));
    }

    #[test]
    fn san_fallback_resolves_knight_move() {
        let board = Board::default();
        let mv = parse_move_notation(&board, "Nf3").unwrap();
        assert_eq!(format_uci_move(mv), "g1f3");
    }
}
