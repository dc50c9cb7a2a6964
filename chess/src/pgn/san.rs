use cozy_chess::{Board, File, Move, Piece, Rank, Square};

use crate::types::legal_moves;
use crate::uci::parse_square;

/// Parse Standard Algebraic Notation (SAN) move against `board`.
///
/// Check/mate markers and annotation glyphs (`+`, `#`, `!`, `?`) are ignored. Castling is
/// accepted as `O-O`/`O-O-O` or with zeros.
pub fn parse_san(board: &Board, san: &str) -> Result<Move, SanError> {
    let cleaned = san.trim().trim_end_matches(['+', '#', '!', '?']);
    if cleaned.is_empty() {
        return Err(SanError::InvalidFormat(san.to_string()));
    }

    let legal = legal_moves(board);

    if let Some(kingside) = castle_side(cleaned) {
        return legal
            .into_iter()
            .find(|mv| is_castle(board, *mv) && ((mv.to.file() as u8 > mv.from.file() as u8) == kingside))
            .ok_or_else(|| SanError::NoLegalMove(san.to_string()));
    }

    let (body, promotion) = split_promotion(cleaned)?;

    let mut chars = body.chars();
    let piece = match chars.clone().next() {
        Some('K') => Piece::King,
        Some('Q') => Piece::Queen,
        Some('R') => Piece::Rook,
        Some('B') => Piece::Bishop,
        Some('N') => Piece::Knight,
        Some('a'..='h') => Piece::Pawn,
        _ => return Err(SanError::InvalidFormat(san.to_string())),
    };
    if piece != Piece::Pawn {
        chars.next();
    }

    let rest: String = chars.filter(|c| *c != 'x' && *c != '-').collect();
    if rest.len() < 2 {
        return Err(SanError::InvalidFormat(san.to_string()));
    }
    let (disambiguation, dest) = rest.split_at(rest.len() - 2);
    let to = parse_square(dest).map_err(|_| SanError::InvalidSquare(dest.to_string()))?;

    let mut from_file: Option<File> = None;
    let mut from_rank: Option<Rank> = None;
    for c in disambiguation.chars() {
        match c {
            'a'..='h' => from_file = Some(File::index(c as usize - 'a' as usize)),
            '1'..='8' => from_rank = Some(Rank::index(c as usize - '1' as usize)),
            _ => return Err(SanError::InvalidFile(c)),
        }
    }

    let mut matches = legal.into_iter().filter(|mv| {
        mv.to == to
            && board.piece_on(mv.from) == Some(piece)
            && mv.promotion == promotion
            && !is_castle(board, *mv)
            && from_file.map_or(true, |f| mv.from.file() == f)
            && from_rank.map_or(true, |r| mv.from.rank() == r)
    });

    match (matches.next(), matches.next()) {
        (Some(mv), None) => Ok(mv),
        (None, _) => Err(SanError::NoLegalMove(san.to_string())),
        (Some(_), Some(_)) => Err(SanError::AmbiguousMove(san.to_string())),
    }
}

fn castle_side(s: &str) -> Option<bool> {
    match s {
        "O-O" | "0-0" => Some(true),
        "O-O-O" | "0-0-0" => Some(false),
        _ => None,
    }
}

fn split_promotion(s: &str) -> Result<(&str, Option<Piece>), SanError> {
    let (body, promo) = match s.split_once('=') {
        Some((body, promo)) => (body, Some(promo)),
        None => match s.char_indices().last() {
            Some((idx, c)) if "QRBN".contains(c) && idx > 0 => (&s[..idx], Some(&s[idx..])),
            _ => (s, None),
        },
    };

    let piece = match promo {
        None => None,
        Some("Q") => Some(Piece::Queen),
        Some("R") => Some(Piece::Rook),
        Some("B") => Some(Piece::Bishop),
        Some("N") => Some(Piece::Knight),
        Some(other) => return Err(SanError::InvalidPromotion(other.to_string())),
    };
    Ok((body, piece))
}

fn is_castle(board: &Board, mv: Move) -> bool {
    board.piece_on(mv.from) == Some(Piece::King)
        && board.colors(board.side_to_move()).has(mv.to)
}

/// Format a legal move as SAN, including disambiguation and check/mate suffixes.
pub fn format_san(board: &Board, mv: Move) -> String {
    let Some(piece) = board.piece_on(mv.from) else {
        return crate::uci::format_uci_move(mv);
    };

    let mut san = String::new();
    if is_castle(board, mv) {
        san.push_str(if mv.to.file() as u8 > mv.from.file() as u8 {
            "O-O"
        } else {
            "O-O-O"
        });
    } else {
        let enemy = !board.side_to_move();
        let is_capture = board.colors(enemy).has(mv.to)
            || (piece == Piece::Pawn && mv.from.file() != mv.to.file());

        match piece {
            Piece::Pawn => {
                if is_capture {
                    san.push(file_char(mv.from));
                }
            }
            _ => {
                san.push(piece_letter(piece));
                san.push_str(&disambiguation(board, mv, piece));
            }
        }
        if is_capture {
            san.push('x');
        }
        san.push_str(&mv.to.to_string());
        if let Some(promo) = mv.promotion {
            san.push('=');
            san.push(piece_letter(promo));
        }
    }

    let mut after = board.clone();
    if after.try_play(mv).is_ok() && !after.checkers().is_empty() {
        let has_reply = !legal_moves(&after).is_empty();
        san.push(if has_reply { '+' } else { '#' });
    }
    san
}

fn disambiguation(board: &Board, mv: Move, piece: Piece) -> String {
    let rivals: Vec<Square> = legal_moves(board)
        .into_iter()
        .filter(|other| {
            other.to == mv.to && other.from != mv.from && board.piece_on(other.from) == Some(piece)
        })
        .map(|other| other.from)
        .collect();

    if rivals.is_empty() {
        String::new()
    } else if rivals.iter().all(|sq| sq.file() != mv.from.file()) {
        file_char(mv.from).to_string()
    } else if rivals.iter().all(|sq| sq.rank() != mv.from.rank()) {
        (mv.from.rank() as u8 + 1).to_string()
    } else {
        mv.from.to_string()
    }
}

fn piece_letter(piece: Piece) -> char {
    match piece {
        Piece::King => 'K',
        Piece::Queen => 'Q',
        Piece::Rook => 'R',
        Piece::Bishop => 'B',
        Piece::Knight => 'N',
        Piece::Pawn => 'P',
    }
}

fn file_char(square: Square) -> char {
    (b'a' + square.file() as u8) as char
}

#[derive(Debug, thiserror::Error)]
pub enum SanError {
    #[error("No legal move found for: {0}")]
    NoLegalMove(String),
    #[error("Ambiguous move: {0}")]
    AmbiguousMove(String),
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
    #[error("Invalid square: {0}")]
    InvalidSquare(String),
    #[error("Invalid file: {0}")]
    InvalidFile(char),
    #[error("Invalid promotion: {0}")]
    InvalidPromotion(String),
}
