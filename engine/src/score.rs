//! Engine scores and search metadata.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Centipawn value used for a delivered mate.
pub const MATE_SCORE_CP: i32 = 30000;

/// Engine evaluation score.
///
/// Centipawns: positive = side-to-move is better.
/// Mate: positive N = side-to-move mates in N moves,
/// negative N = side-to-move gets mated in N moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Score {
    Centipawns(i32),
    Mate(i32),
}

impl Score {
    pub fn display(&self) -> String {
        match self {
            Self::Centipawns(cp) => format!("{:+.2}", *cp as f64 / 100.0),
            Self::Mate(m) => {
                if *m > 0 {
                    format!("+M{}", m)
                } else {
                    format!("-M{}", m.abs())
                }
            }
        }
    }

    /// Convert to centipawns for comparison. Mate scores use large values that shrink
    /// with the distance to mate.
    pub fn to_cp(&self) -> i32 {
        match self {
            Self::Centipawns(cp) => *cp,
            Self::Mate(m) => {
                if *m > 0 {
                    MATE_SCORE_CP - *m * 100
                } else {
                    -MATE_SCORE_CP - *m * 100
                }
            }
        }
    }

    /// Score in pawns.
    pub fn to_pawns(&self) -> f64 {
        self.to_cp() as f64 / 100.0
    }

    /// Negate the score (flip perspective).
    pub fn negate(&self) -> Self {
        match self {
            Self::Centipawns(cp) => Self::Centipawns(-cp),
            Self::Mate(m) => Self::Mate(-m),
        }
    }

    pub fn is_mate(&self) -> bool {
        matches!(self, Self::Mate(_))
    }
}

impl std::fmt::Display for Score {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}

/// Metadata about the search that produced a candidate list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisMeta {
    /// Engine identification (`id name`), or the binding label.
    pub engine: String,
    pub requested_depth: u8,
    /// Deepest depth reported for the principal line.
    pub reached_depth: u8,
    pub multipv: u8,
    pub nodes: Option<u64>,
    pub time_ms: Option<u64>,
    /// Principal-line score (cp) at each reported depth, shallowest first.
    pub score_by_depth: Vec<(u8, i32)>,
    /// Final principal score minus the shallowest reported one.
    pub depth_jump_cp: i32,
    /// Final principal score minus the previous iteration's.
    pub deepening_gain_cp: i32,
    /// Number of engine lines skipped because they could not be parsed.
    pub skipped_lines: usize,
    /// Binding-specific extras.
    pub extras: BTreeMap<String, serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mate_scores_order_correctly() {
        assert!(Score::Mate(1).to_cp() > Score::Mate(5).to_cp());
        assert!(Score::Mate(5).to_cp() > Score::Centipawns(2000).to_cp());
        assert!(Score::Mate(-1).to_cp() < Score::Mate(-5).to_cp());
        assert!(Score::Mate(-5).to_cp() < Score::Centipawns(-2000).to_cp());
    }

    #[test]
    fn negate_flips_sign() {
        assert_eq!(Score::Centipawns(35).negate(), Score::Centipawns(-35));
        assert_eq!(Score::Mate(3).negate(), Score::Mate(-3));
        assert_eq!(Score::Centipawns(35).negate().to_cp(), -35);
    }

    #[test]
    fn display_formats_pawns_and_mates() {
        assert_eq!(Score::Centipawns(150).display(), "+1.50");
        assert_eq!(Score::Centipawns(-25).display(), "-0.25");
        assert_eq!(Score::Mate(2).display(), "+M2");
        assert_eq!(Score::Mate(-4).display(), "-M4");
    }
}
