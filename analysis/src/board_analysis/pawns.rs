use cozy_chess::{BitBoard, Board, Color, File, Piece};
use serde::{Deserialize, Serialize};

use super::helpers::file_bitboard;

/// Pawn-structure features of one side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PawnStructure {
    /// Pawns beyond the first on each file.
    pub doubled: u8,
    /// Pawns with no friendly pawn on an adjacent file.
    pub isolated: u8,
    /// Pawns with no enemy pawn ahead on the same or an adjacent file.
    pub passed: u8,
    pub islands: u8,
}

impl PawnStructure {
    /// Weaknesses minus assets; higher is worse.
    pub fn weakness(&self) -> f64 {
        self.doubled as f64 + self.isolated as f64 + 0.5 * self.islands.saturating_sub(1) as f64
            - self.passed as f64
    }
}

fn adjacent_files(file: File) -> BitBoard {
    let idx = file as usize;
    let mut bb = BitBoard::EMPTY;
    if idx > 0 {
        if let Some(f) = File::try_index(idx - 1) {
            bb |= file_bitboard(f);
        }
    }
    if let Some(f) = File::try_index(idx + 1) {
        bb |= file_bitboard(f);
    }
    bb
}

/// Squares strictly in front of `sq` (from `color`'s point of view) on the given files.
fn ahead_mask(files: BitBoard, rank: usize, color: Color) -> BitBoard {
    files
        .into_iter()
        .filter(|sq| match color {
            Color::White => (sq.rank() as usize) > rank,
            Color::Black => (sq.rank() as usize) < rank,
        })
        .fold(BitBoard::EMPTY, |bb, sq| bb | BitBoard::from(sq))
}

pub fn pawn_structure(board: &Board, color: Color) -> PawnStructure {
    let own = board.pieces(Piece::Pawn) & board.colors(color);
    let enemy = board.pieces(Piece::Pawn) & board.colors(!color);
    let mut structure = PawnStructure::default();

    let mut occupied_files = [false; 8];
    for file in File::ALL {
        let count = (own & file_bitboard(file)).len() as u8;
        structure.doubled += count.saturating_sub(1);
        occupied_files[file as usize] = count > 0;
    }

    let mut in_island = false;
    for occupied in occupied_files {
        if occupied && !in_island {
            structure.islands += 1;
        }
        in_island = occupied;
    }

    for sq in own {
        let file = sq.file();
        if (own & adjacent_files(file)).is_empty() {
            structure.isolated += 1;
        }
        let lanes = file_bitboard(file) | adjacent_files(file);
        if (enemy & ahead_mask(lanes, sq.rank() as usize, color)).is_empty() {
            structure.passed += 1;
        }
    }

    structure
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_position_has_clean_structure() {
        let board = Board::default();
        let white = pawn_structure(&board, Color::White);
        assert_eq!(white, PawnStructure { doubled: 0, isolated: 0, passed: 0, islands: 1 });
        assert_eq!(white.weakness(), 0.0);
    }

    #[test]
    fn doubled_isolated_and_passed() {
        // White: a2 (isolated, passed), c2 + c3 (doubled, isolated). Black: e7, f7.
        let board: Board = "4k3/4pp2/8/8/8/2P5/P1P5/4K3 w - - 0 1".parse().unwrap();
        let white = pawn_structure(&board, Color::White);
        assert_eq!(white.doubled, 1);
        assert_eq!(white.isolated, 3);
        assert_eq!(white.passed, 3);
        assert_eq!(white.islands, 2);

        let black = pawn_structure(&board, Color::Black);
        assert_eq!(black.isolated, 0);
        assert_eq!(black.passed, 2);
    }
}
