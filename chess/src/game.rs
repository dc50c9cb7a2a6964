use cozy_chess::{Board, Color, Move};

use crate::pgn::{parse_san, PgnGame};

/// One replayed half-move: the position before it and the move that was played.
#[derive(Debug, Clone)]
pub struct PlyRecord {
    /// 1-indexed ply number; odd plies are White moves when the game starts with White.
    pub ply: u32,
    pub board_before: Board,
    pub mv: Move,
    pub san: String,
    pub mover: Color,
    /// Move played immediately before this one, if any.
    pub previous_move: Option<Move>,
}

/// Replay the main line of a PGN game, validating every move.
pub fn replay_game(game: &PgnGame) -> Result<Vec<PlyRecord>, GameError> {
    let mut board = match game.start_fen() {
        Some(fen) => crate::fen::parse_fen(fen)?,
        None => Board::default(),
    };

    let mut plies = Vec::with_capacity(game.moves.len());
    let mut previous_move = None;

    for (i, san) in game.moves.iter().enumerate() {
        let ply = i as u32 + 1;
        let mv = parse_san(&board, san).map_err(|e| GameError::IllegalMove {
            ply,
            san: san.clone(),
            reason: e.to_string(),
        })?;

        plies.push(PlyRecord {
            ply,
            board_before: board.clone(),
            mv,
            san: san.clone(),
            mover: board.side_to_move(),
            previous_move,
        });

        board.play_unchecked(mv);
        previous_move = Some(mv);
    }

    Ok(plies)
}

#[derive(Debug, thiserror::Error)]
pub enum GameError {
    #[error("Illegal move at ply {ply} ({san}): {reason}")]
    IllegalMove { ply: u32, san: String, reason: String },
    #[error("FEN parse error: {0}")]
    FenError(#[from] crate::fen::FenError),
}
