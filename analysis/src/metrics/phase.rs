use cozy_chess::{Board, Piece};
use serde::{Deserialize, Serialize};

/// Non-pawn, non-king material at the start of a game (N/B = 1, R = 2, Q = 4).
const START_PHASE_MATERIAL: f64 = 24.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseBucket {
    Opening,
    Middlegame,
    Endgame,
}

impl PhaseBucket {
    pub fn from_ratio(ratio: f64) -> Self {
        if ratio <= 0.33 {
            Self::Endgame
        } else if ratio <= 0.66 {
            Self::Middlegame
        } else {
            Self::Opening
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Opening => "opening",
            Self::Middlegame => "middlegame",
            Self::Endgame => "endgame",
        }
    }
}

/// Remaining piece material relative to the starting amount, in [0, 1].
pub fn phase_ratio(board: &Board) -> f64 {
    let weight = |piece: Piece| board.pieces(piece).len() as f64;
    let remaining = weight(Piece::Knight)
        + weight(Piece::Bishop)
        + 2.0 * weight(Piece::Rook)
        + 4.0 * weight(Piece::Queen);
    (remaining / START_PHASE_MATERIAL).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn start_position_is_full_opening() {
        let ratio = phase_ratio(&Board::default());
        assert_eq!(ratio, 1.0);
        assert_eq!(PhaseBucket::from_ratio(ratio), PhaseBucket::Opening);
    }

    #[test]
    fn bare_kings_are_an_endgame() {
        let board: Board = "4k3/pppp4/8/8/8/8/PPPP4/4K3 w - - 0 1".parse().unwrap();
        assert_eq!(phase_ratio(&board), 0.0);
        assert_eq!(PhaseBucket::from_ratio(0.0), PhaseBucket::Endgame);
    }

    #[test]
    fn bucket_edges() {
        assert_eq!(PhaseBucket::from_ratio(0.33), PhaseBucket::Endgame);
        assert_eq!(PhaseBucket::from_ratio(0.34), PhaseBucket::Middlegame);
        assert_eq!(PhaseBucket::from_ratio(0.66), PhaseBucket::Middlegame);
        assert_eq!(PhaseBucket::from_ratio(0.67), PhaseBucket::Opening);
    }

    const START_ROWS: [&str; 8] = [
        "rnbqkbnr", "pppppppp", "........", "........", "........", "........", "PPPPPPPP",
        "RNBQKBNR",
    ];

    // (row, column) of every removable (non-pawn, non-king) piece.
    const PIECE_CELLS: [(usize, usize); 14] = [
        (0, 0), (0, 1), (0, 2), (0, 3), (0, 5), (0, 6), (0, 7),
        (7, 0), (7, 1), (7, 2), (7, 3), (7, 5), (7, 6), (7, 7),
    ];

    fn board_from_rows(rows: &[Vec<char>]) -> Board {
        let placement: Vec<String> = rows
            .iter()
            .map(|row| {
                let mut out = String::new();
                let mut empty = 0;
                for &c in row {
                    if c == '.' {
                        empty += 1;
                    } else {
                        if empty > 0 {
                            out.push_str(&empty.to_string());
                            empty = 0;
                        }
                        out.push(c);
                    }
                }
                if empty > 0 {
                    out.push_str(&empty.to_string());
                }
                out
            })
            .collect();
        format!("{} w - - 0 1", placement.join("/")).parse().unwrap()
    }

    proptest! {
        #[test]
        fn ratio_stays_in_range_and_never_grows_as_pieces_leave(
            order in Just((0..PIECE_CELLS.len()).collect::<Vec<_>>()).prop_shuffle()
        ) {
            let mut rows: Vec<Vec<char>> = START_ROWS.iter().map(|r| r.chars().collect()).collect();
            let mut previous = phase_ratio(&board_from_rows(&rows));
            prop_assert!((0.0..=1.0).contains(&previous));

            for idx in order {
                let (row, col) = PIECE_CELLS[idx];
                rows[row][col] = '.';
                let ratio = phase_ratio(&board_from_rows(&rows));
                prop_assert!((0.0..=1.0).contains(&ratio));
                prop_assert!(ratio <= previous);
                previous = ratio;
            }
            prop_assert_eq!(previous, 0.0);
        }
    }
}
