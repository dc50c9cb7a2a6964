//! Scripted engine for tests. Lines go through the same [`CandidateCollector`] as the
//! real bindings, so castling conversion and multipv handling are exercised too.

use std::collections::HashMap;

use async_trait::async_trait;
use chess::{format_fen, format_uci_move, legal_moves};
use cozy_chess::Board;

use crate::{
    CandidateAnalysis, CandidateCollector, EngineAdapter, EngineError, Score, ScorePerspective,
};

#[derive(Debug, Default)]
pub struct MockEngine {
    scripts: HashMap<String, Vec<(String, Score)>>,
    default_score: i32,
    strict: bool,
    calls: usize,
    closed: bool,
}

/// Board, side to move, castling and en-passant fields. Clocks are ignored.
fn position_key(board: &Board) -> String {
    format_fen(board)
        .split_whitespace()
        .take(4)
        .collect::<Vec<_>>()
        .join(" ")
}

impl MockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the ranked lines (UCI move, side-to-move score) returned for `board`.
    pub fn with_lines(mut self, board: &Board, lines: &[(&str, Score)]) -> Self {
        self.scripts.insert(
            position_key(board),
            lines.iter().map(|(uci, s)| (uci.to_string(), *s)).collect(),
        );
        self
    }

    /// Score used for unscripted positions.
    pub fn with_default_score(mut self, cp: i32) -> Self {
        self.default_score = cp;
        self
    }

    /// Fail on unscripted positions instead of answering with the first legal move.
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    /// Number of `analyse_candidates` calls served.
    pub fn calls(&self) -> usize {
        self.calls
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn script_for(&self, board: &Board) -> Result<Vec<(String, Score)>, EngineError> {
        if let Some(lines) = self.scripts.get(&position_key(board)) {
            return Ok(lines.clone());
        }
        if self.strict {
            return Err(EngineError::Protocol(format!(
                "no scripted lines for {}",
                format_fen(board)
            )));
        }
        let first = legal_moves(board)
            .first()
            .copied()
            .ok_or_else(|| EngineError::Protocol("no legal moves".into()))?;
        Ok(vec![(
            format_uci_move(first),
            Score::Centipawns(self.default_score),
        )])
    }
}

fn info_line(depth: u8, slot: usize, uci: &str, score: Score) -> String {
    let score = match score {
        Score::Centipawns(cp) => format!("cp {}", cp),
        Score::Mate(n) => format!("mate {}", n),
    };
    format!(
        "info depth {} multipv {} score {} nodes 1000 time 5 pv {}",
        depth,
        slot + 1,
        score,
        uci
    )
}

#[async_trait]
impl EngineAdapter for MockEngine {
    async fn analyse_candidates(
        &mut self,
        board: &Board,
        depth: u8,
        multipv: u8,
    ) -> Result<CandidateAnalysis, EngineError> {
        if self.closed {
            return Err(EngineError::Closed);
        }
        self.calls += 1;
        let script = self.script_for(board)?;

        let mut collector = CandidateCollector::new(board, ScorePerspective::SideToMove);
        collector.set_engine_name("mock");
        for (slot, (uci, score)) in script.iter().enumerate() {
            collector.push_line(&info_line(depth, slot, uci, *score));
        }
        collector.finish(depth, multipv)
    }

    async fn shutdown(&mut self) {
        self.closed = true;
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_lines_are_ranked_and_truncated() {
        let board = Board::default();
        let mut engine = MockEngine::new().with_lines(
            &board,
            &[
                ("e2e4", Score::Centipawns(30)),
                ("d2d4", Score::Centipawns(25)),
                ("g1f3", Score::Centipawns(20)),
            ],
        );
        let analysis = engine.analyse_candidates(&board, 12, 2).await.unwrap();
        assert_eq!(analysis.candidates.len(), 2);
        assert_eq!(analysis.candidates[0].uci, "e2e4");
        assert_eq!(analysis.meta.engine, "mock");
        assert_eq!(analysis.meta.requested_depth, 12);
        assert_eq!(engine.calls(), 1);
    }

    #[tokio::test]
    async fn unscripted_positions_fall_back_unless_strict() {
        let board = Board::default();
        let mut lenient = MockEngine::new().with_default_score(7);
        let analysis = lenient.analyse_candidates(&board, 8, 3).await.unwrap();
        assert_eq!(analysis.best_score_cp, 7);

        let mut strict = MockEngine::new().strict();
        assert!(strict.analyse_candidates(&board, 8, 3).await.is_err());
    }

    #[tokio::test]
    async fn shutdown_closes_the_session() {
        let board = Board::default();
        let mut engine = MockEngine::new();
        engine.shutdown().await;
        assert!(engine.is_closed());
        assert!(matches!(
            engine.analyse_candidates(&board, 8, 1).await,
            Err(EngineError::Closed)
        ));
    }
}
