//! Turning streamed `info` lines into a ranked candidate list.
//!
//! Both the local and the remote binding feed raw engine lines into a
//! [`CandidateCollector`]; unparseable lines are counted and skipped, and the call only
//! fails when no usable line is left.

use std::collections::BTreeMap;

use chess::{convert_uci_castling_to_cozy, format_uci_move, legal_moves};
use cozy_chess::{Board, Color, Move, Piece};
use serde::{Deserialize, Serialize};

use crate::uci::{parse_uci_message, UciMessage};
use crate::{AnalysisMeta, EngineError, EngineInfo, Score};

/// Coarse move classification used throughout the tagger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveKind {
    Quiet,
    Dynamic,
    Forcing,
}

impl MoveKind {
    /// Forcing = capture or check, dynamic = pawn push, quiet = everything else.
    pub fn classify(board: &Board, mv: Move) -> Self {
        let mover = board.side_to_move();
        let Some(piece) = board.piece_on(mv.from) else {
            return Self::Quiet;
        };
        let is_capture = board.colors(!mover).has(mv.to)
            || (piece == Piece::Pawn && mv.from.file() != mv.to.file());
        let mut after = board.clone();
        let gives_check = after.try_play(mv).is_ok() && !after.checkers().is_empty();

        if is_capture || gives_check {
            Self::Forcing
        } else if piece == Piece::Pawn {
            Self::Dynamic
        } else {
            Self::Quiet
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Quiet => "quiet",
            Self::Dynamic => "dynamic",
            Self::Forcing => "forcing",
        }
    }
}

/// One engine candidate move, scored from the mover's perspective.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    #[serde(skip)]
    pub mv: Move,
    /// Move in cozy-chess UCI form (castling as king-to-rook).
    pub uci: String,
    pub score: Score,
    pub score_cp: i32,
    pub kind: MoveKind,
    pub depth: u8,
    pub pv: Vec<String>,
}

/// Result of a multi-candidate analysis, best candidate first.
#[derive(Debug, Clone, Serialize)]
pub struct CandidateAnalysis {
    pub candidates: Vec<Candidate>,
    pub best_score_cp: i32,
    pub meta: AnalysisMeta,
}

impl CandidateAnalysis {
    pub fn best(&self) -> Option<&Candidate> {
        self.candidates.first()
    }

    /// Score gap between the best and the second-best candidate, in centipawns.
    pub fn second_gap_cp(&self) -> i32 {
        match (self.candidates.first(), self.candidates.get(1)) {
            (Some(best), Some(second)) => best.score_cp - second.score_cp,
            _ => 0,
        }
    }

    pub fn find(&self, mv: Move) -> Option<&Candidate> {
        self.candidates.iter().find(|c| c.mv == mv)
    }
}

/// Sign convention of the scores a binding receives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScorePerspective {
    /// Positive means the side to move is better (UCI convention).
    #[default]
    SideToMove,
    /// Positive means White is better.
    White,
}

impl ScorePerspective {
    /// Normalize a score to the side-to-move perspective.
    pub fn normalize(self, score: Score, side_to_move: Color) -> Score {
        match (self, side_to_move) {
            (Self::White, Color::Black) => score.negate(),
            _ => score,
        }
    }
}

/// Accumulates engine output for one search.
pub struct CandidateCollector<'a> {
    board: &'a Board,
    legal: Vec<Move>,
    perspective: ScorePerspective,
    lines: BTreeMap<u8, EngineInfo>,
    principal_by_depth: BTreeMap<u8, i32>,
    engine: String,
    nodes: Option<u64>,
    time_ms: Option<u64>,
    skipped: usize,
}

impl<'a> CandidateCollector<'a> {
    pub fn new(board: &'a Board, perspective: ScorePerspective) -> Self {
        Self {
            board,
            legal: legal_moves(board),
            perspective,
            lines: BTreeMap::new(),
            principal_by_depth: BTreeMap::new(),
            engine: String::new(),
            nodes: None,
            time_ms: None,
            skipped: 0,
        }
    }

    pub fn set_engine_name(&mut self, name: impl Into<String>) {
        self.engine = name.into();
    }

    /// Feed one raw output line. Non-`info` chatter is ignored; a malformed `info` line
    /// is counted and skipped.
    pub fn push_line(&mut self, line: &str) {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return;
        }
        match parse_uci_message(trimmed) {
            Ok(UciMessage::Info(info)) => self.push_info(info),
            Ok(UciMessage::Id { name, value }) if name == "name" => self.engine = value,
            Ok(_) => {}
            Err(e) => {
                if trimmed.starts_with("info") {
                    self.note_malformed(trimmed);
                } else {
                    tracing::trace!("Ignoring engine line: {} ({})", trimmed, e);
                }
            }
        }
    }

    pub fn note_malformed(&mut self, line: &str) {
        tracing::warn!("Skipping unparseable engine line: {}", line);
        self.skipped += 1;
    }

    /// Feed one parsed `info` line.
    pub fn push_info(&mut self, info: EngineInfo) {
        if info.nodes.is_some() {
            self.nodes = info.nodes;
        }
        if info.time_ms.is_some() {
            self.time_ms = info.time_ms;
        }

        let (Some(score), Some(&first)) = (info.score, info.pv.first()) else {
            // currmove / string / hashfull-only lines carry no candidate
            return;
        };
        let mv = convert_uci_castling_to_cozy(first, &self.legal);
        if !self.legal.contains(&mv) {
            self.note_malformed(&format!("illegal pv move {}", format_uci_move(first)));
            return;
        }

        let slot = info.multipv.unwrap_or(1);
        let depth = info.depth.unwrap_or(0);
        if slot == 1 {
            let cp = self
                .perspective
                .normalize(score, self.board.side_to_move())
                .to_cp();
            self.principal_by_depth.insert(depth, cp);
        }

        let replace = self
            .lines
            .get(&slot)
            .map_or(true, |existing| existing.depth.unwrap_or(0) <= depth);
        if replace {
            self.lines.insert(slot, info);
        }
    }

    /// Build the ranked candidate list.
    pub fn finish(self, requested_depth: u8, multipv: u8) -> Result<CandidateAnalysis, EngineError> {
        let side = self.board.side_to_move();
        let mut candidates = Vec::with_capacity(self.lines.len());

        for info in self.lines.values().take(multipv.max(1) as usize) {
            let (Some(score), Some(&first)) = (info.score, info.pv.first()) else {
                continue;
            };
            let mv = convert_uci_castling_to_cozy(first, &self.legal);
            let score = self.perspective.normalize(score, side);
            candidates.push(Candidate {
                mv,
                uci: format_uci_move(mv),
                score,
                score_cp: score.to_cp(),
                kind: MoveKind::classify(self.board, mv),
                depth: info.depth.unwrap_or(0),
                pv: info.pv.iter().map(|m| format_uci_move(*m)).collect(),
            });
        }

        if candidates.is_empty() {
            return Err(EngineError::Protocol(format!(
                "no usable analysis lines ({} skipped)",
                self.skipped
            )));
        }

        // Slot order is the engine's multipv rank; scores of lines not yet re-searched
        // at the new depth are stale and must not reorder them.

        let score_by_depth: Vec<(u8, i32)> = self.principal_by_depth.into_iter().collect();
        let (depth_jump_cp, deepening_gain_cp) = depth_gains(&score_by_depth);
        let reached_depth = score_by_depth.last().map_or(requested_depth, |(d, _)| *d);

        Ok(CandidateAnalysis {
            best_score_cp: candidates[0].score_cp,
            candidates,
            meta: AnalysisMeta {
                engine: self.engine,
                requested_depth,
                reached_depth,
                multipv,
                nodes: self.nodes,
                time_ms: self.time_ms,
                score_by_depth,
                depth_jump_cp,
                deepening_gain_cp,
                skipped_lines: self.skipped,
                extras: BTreeMap::new(),
            },
        })
    }
}

fn depth_gains(scores: &[(u8, i32)]) -> (i32, i32) {
    match scores {
        [] | [_] => (0, 0),
        [first, .., prev, last] => (last.1 - first.1, last.1 - prev.1),
        [first, last] => (last.1 - first.1, last.1 - first.1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cozy_chess::Square;

    const CASTLE_FEN: &str = "r3k2r/pppppppp/8/8/8/8/PPPPPPPP/R3K2R w KQkq - 0 1";

    #[test]
    fn collects_ranked_candidates_from_multipv_lines() {
        let board = Board::default();
        let mut collector = CandidateCollector::new(&board, ScorePerspective::SideToMove);
        for line in [
            "info depth 1 multipv 1 score cp 10 pv d2d4",
            "info depth 2 multipv 1 score cp 40 pv e2e4 e7e5",
            "info depth 2 multipv 2 score cp 25 pv g1f3",
            "info depth 2 multipv 3 score cp 5 pv e2e3",
            "bestmove e2e4",
        ] {
            collector.push_line(line);
        }

        let analysis = collector.finish(2, 3).unwrap();
        assert_eq!(analysis.candidates.len(), 3);
        assert_eq!(analysis.candidates[0].uci, "e2e4");
        assert_eq!(analysis.candidates[0].kind, MoveKind::Dynamic);
        assert_eq!(analysis.candidates[1].kind, MoveKind::Quiet);
        assert_eq!(analysis.best_score_cp, 40);
        assert_eq!(analysis.second_gap_cp(), 15);
        assert_eq!(analysis.meta.depth_jump_cp, 30);
        assert_eq!(analysis.meta.deepening_gain_cp, 30);
        assert_eq!(analysis.meta.reached_depth, 2);
    }

    #[test]
    fn stale_lower_line_does_not_outrank_the_principal_line() {
        let board = Board::default();
        let mut collector = CandidateCollector::new(&board, ScorePerspective::SideToMove);
        for line in [
            "info depth 20 multipv 1 score cp 30 pv e2e4",
            // Not yet re-searched at depth 20, still carrying its depth-19 score.
            "info depth 19 multipv 2 score cp 45 pv d2d4",
            "bestmove e2e4",
        ] {
            collector.push_line(line);
        }

        let analysis = collector.finish(20, 2).unwrap();
        assert_eq!(analysis.candidates[0].uci, "e2e4");
        assert_eq!(analysis.candidates[1].uci, "d2d4");
        assert_eq!(analysis.best_score_cp, 30);
    }

    #[test]
    fn skips_unparseable_lines_but_keeps_good_ones() {
        let board = Board::default();
        let mut collector = CandidateCollector::new(&board, ScorePerspective::SideToMove);
        collector.push_line("info depth 5 score cp garbage pv e2e4");
        collector.push_line("info depth 5 multipv 1 score cp 20 pv e2e4");
        let analysis = collector.finish(5, 1).unwrap();
        assert_eq!(analysis.candidates.len(), 1);
        assert_eq!(analysis.meta.skipped_lines, 1);
    }

    #[test]
    fn fails_when_no_usable_line_remains() {
        let board = Board::default();
        let mut collector = CandidateCollector::new(&board, ScorePerspective::SideToMove);
        collector.push_line("info depth 5 score cp garbage pv e2e4");
        collector.push_line("info string hello");
        let err = collector.finish(5, 1).unwrap_err();
        assert!(err.is_protocol());
    }

    #[test]
    fn illegal_pv_moves_are_skipped() {
        let board = Board::default();
        let mut collector = CandidateCollector::new(&board, ScorePerspective::SideToMove);
        collector.push_line("info depth 5 multipv 1 score cp 20 pv e2e5");
        assert!(collector.finish(5, 1).is_err());
    }

    #[test]
    fn white_perspective_is_normalized_for_black_to_move() {
        let board: Board = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1"
            .parse()
            .unwrap();
        let mut collector = CandidateCollector::new(&board, ScorePerspective::White);
        collector.push_line("info depth 8 multipv 1 score cp 30 pv e7e5");
        let analysis = collector.finish(8, 1).unwrap();
        assert_eq!(analysis.best_score_cp, -30);
    }

    #[test]
    fn engine_castling_is_converted() {
        let board: Board = CASTLE_FEN.parse().unwrap();
        let mut collector = CandidateCollector::new(&board, ScorePerspective::SideToMove);
        collector.push_line("info depth 3 multipv 1 score cp 15 pv e1g1");
        let analysis = collector.finish(3, 1).unwrap();
        assert_eq!(analysis.candidates[0].mv.to, Square::H1);
    }

    #[test]
    fn captures_and_checks_are_forcing() {
        let board: Board = "rnbqkbnr/ppp1pppp/8/3p4/4P3/8/PPPP1PPP/RNBQKBNR w KQkq - 0 2"
            .parse()
            .unwrap();
        let capture = chess::parse_uci_move("e4d5").unwrap();
        assert_eq!(MoveKind::classify(&board, capture), MoveKind::Forcing);

        let check_board: Board = "4k3/8/8/8/8/8/8/R3K3 w - - 0 1".parse().unwrap();
        let check = chess::parse_uci_move("a1a8").unwrap();
        assert_eq!(MoveKind::classify(&check_board, check), MoveKind::Forcing);
    }
}
