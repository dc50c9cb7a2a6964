use cozy_chess::{Board, Piece};
use serde::{Deserialize, Serialize};

/// Forcing options of the side to move.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactProfile {
    /// Share of legal moves that capture or check, 0 when there are no legal moves.
    pub ratio: f64,
    pub total_moves: u32,
    pub captures: u32,
    pub checks: u32,
    /// Moves that capture, check, or both.
    pub contact_moves: u32,
}

pub fn contact_profile(board: &Board) -> ContactProfile {
    let mover = board.side_to_move();
    let enemy = board.colors(!mover);
    let ep_target = board.en_passant();

    let mut profile = ContactProfile::default();
    board.generate_moves(|moves| {
        let is_pawn = moves.piece == Piece::Pawn;
        for mv in moves {
            profile.total_moves += 1;
            // Castling is king-takes-own-rook in cozy-chess and never lands on an enemy.
            let en_passant = is_pawn
                && mv.from.file() != mv.to.file()
                && !board.occupied().has(mv.to)
                && ep_target == Some(mv.to.file());
            let capture = enemy.has(mv.to) || en_passant;

            let mut after = board.clone();
            after.play_unchecked(mv);
            let check = !after.checkers().is_empty();

            profile.captures += capture as u32;
            profile.checks += check as u32;
            profile.contact_moves += (capture || check) as u32;
        }
        false
    });

    if profile.total_moves > 0 {
        profile.ratio = profile.contact_moves as f64 / profile.total_moves as f64;
    }
    profile
}
