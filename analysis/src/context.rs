//! Context Builder: turns a (position, played move) pair into the immutable
//! [`TagContext`] every detector reads.
//!
//! Building happens in two halves. [`gather_engine_readout`] makes the only two engine
//! calls; [`build_context`] is pure and computes everything else on fresh copies of the
//! board.

use chess::{format_san, parse_move_notation, parse_fen, to_standard_uci};
use cozy_chess::{Board, Color, Move, Piece};
use engine::{AnalysisMeta, Candidate, CandidateAnalysis, EngineAdapter, MoveKind, Score};
use serde::Serialize;

use crate::board_analysis::{
    compute_tension, contact_profile, AttackMap, ContactProfile, TensionProfile,
};
use crate::error::TagError;
use crate::metrics::{metrics_delta, phase_ratio, MetricsEngine, PhaseBucket, StyleMetrics};
use crate::weight::{tactical_weight, WeightInputs};

pub const DEFAULT_DEPTH: u8 = 14;
pub const DEFAULT_MULTIPV: u8 = 3;

/// One move to tag.
#[derive(Debug, Clone)]
pub struct TagRequest {
    pub board: Board,
    /// Played move as UCI (`e2e4`, `e1g1`, `e1h1`) or SAN (`Nf3`, `O-O`).
    pub played: String,
    pub depth: u8,
    pub multipv: u8,
    /// The opponent's move that led to `board`, when known.
    pub previous_move: Option<Move>,
}

impl TagRequest {
    pub fn new(board: Board, played: impl Into<String>) -> Self {
        Self {
            board,
            played: played.into(),
            depth: DEFAULT_DEPTH,
            multipv: DEFAULT_MULTIPV,
            previous_move: None,
        }
    }

    pub fn from_fen(fen: &str, played: impl Into<String>) -> Result<Self, TagError> {
        Ok(Self::new(parse_fen(fen)?, played))
    }

    pub fn with_depth(mut self, depth: u8) -> Self {
        self.depth = depth.max(1);
        self
    }

    pub fn with_multipv(mut self, multipv: u8) -> Self {
        self.multipv = multipv.max(1);
        self
    }

    pub fn with_previous_move(mut self, mv: Option<Move>) -> Self {
        self.previous_move = mv;
        self
    }

    /// The played move, validated against the position.
    pub fn resolve_move(&self) -> Result<Move, TagError> {
        parse_move_notation(&self.board, &self.played).map_err(|e| TagError::IllegalMove {
            notation: self.played.clone(),
            reason: e.to_string(),
        })
    }
}

/// Raw engine answers for one request.
#[derive(Debug, Clone)]
pub struct EngineReadout {
    pub board: Board,
    pub played: Move,
    pub analysis: CandidateAnalysis,
    /// Evaluation after the played move, mover's perspective.
    pub played_score: Score,
    pub depth: u8,
    pub multipv: u8,
    pub previous_move: Option<Move>,
}

/// Validate the move, then make the two engine calls.
pub async fn gather_engine_readout(
    engine: &mut dyn EngineAdapter,
    request: &TagRequest,
) -> Result<EngineReadout, TagError> {
    let played = request.resolve_move()?;

    tracing::debug!(
        "Analysing {} before {} (depth {}, multipv {})",
        request.board,
        request.played,
        request.depth,
        request.multipv
    );
    let analysis = engine
        .analyse_candidates(&request.board, request.depth, request.multipv)
        .await?;
    let played_score = engine
        .eval_after_move(&request.board, played, request.depth)
        .await?;

    Ok(EngineReadout {
        board: request.board.clone(),
        played,
        analysis,
        played_score,
        depth: request.depth,
        multipv: request.multipv,
        previous_move: request.previous_move,
    })
}

/// Everything the detectors may look at. Built once, never mutated.
#[derive(Debug, Clone, Serialize)]
pub struct TagContext {
    #[serde(serialize_with = "serialize_board")]
    pub board_before: Board,
    #[serde(serialize_with = "serialize_board")]
    pub board_played: Board,
    #[serde(serialize_with = "serialize_board")]
    pub board_best: Board,
    #[serde(skip)]
    pub played_move: Move,
    #[serde(skip)]
    pub best_move: Move,
    pub played_uci: String,
    pub played_san: String,
    pub best_uci: String,
    #[serde(serialize_with = "serialize_color")]
    pub mover: Color,
    pub played_kind: MoveKind,
    pub best_kind: MoveKind,
    pub candidates: Vec<Candidate>,

    pub eval_before_cp: i32,
    pub eval_played_cp: i32,
    pub eval_best_cp: i32,
    /// Pawns, mover's perspective.
    pub eval_before: f64,
    pub eval_played: f64,
    pub eval_best: f64,
    /// `eval_played - eval_before`, pawns.
    pub delta_eval: f64,

    pub metrics_before: StyleMetrics,
    pub metrics_played: StyleMetrics,
    pub metrics_best: StyleMetrics,
    pub opp_metrics_before: StyleMetrics,
    pub opp_metrics_played: StyleMetrics,
    pub opp_metrics_best: StyleMetrics,
    /// Played minus before, mover's side.
    pub component_deltas: StyleMetrics,
    /// Played minus before, opponent's side.
    pub opp_component_deltas: StyleMetrics,
    /// Best minus before, mover's side.
    pub best_component_deltas: StyleMetrics,

    pub phase_ratio: f64,
    pub phase: PhaseBucket,
    pub contact_before: ContactProfile,
    pub contact_played: ContactProfile,
    pub contact_best: ContactProfile,
    /// The opponent's options before the move, as if it were their turn.
    pub opp_contact_before: Option<ContactProfile>,
    pub tension_before: TensionProfile,
    pub tension_played: TensionProfile,
    pub tactical_weight: f64,
    pub mate_threat: bool,

    #[serde(serialize_with = "serialize_piece")]
    pub piece: Piece,
    #[serde(serialize_with = "serialize_opt_piece")]
    pub captured: Option<Piece>,
    pub is_capture: bool,
    pub is_check: bool,
    pub is_castling: bool,
    pub in_check_before: bool,
    pub move_number: u16,
    #[serde(skip)]
    pub previous_move: Option<Move>,
    /// Squares the mover attacks before and after the move.
    pub coverage_before: u32,
    pub coverage_after: u32,

    pub depth: u8,
    pub multipv: u8,
    pub meta: AnalysisMeta,
}

fn serialize_board<S: serde::Serializer>(board: &Board, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(board)
}

fn serialize_color<S: serde::Serializer>(color: &Color, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(match color {
        Color::White => "white",
        Color::Black => "black",
    })
}

fn serialize_piece<S: serde::Serializer>(piece: &Piece, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(piece)
}

fn serialize_opt_piece<S: serde::Serializer>(
    piece: &Option<Piece>,
    s: S,
) -> Result<S::Ok, S::Error> {
    match piece {
        Some(piece) => s.collect_str(piece),
        None => s.serialize_none(),
    }
}

impl TagContext {
    /// Eval given away relative to the engine's best, never negative.
    pub fn eval_loss(&self) -> f64 {
        (-self.delta_eval).max(0.0)
    }

    pub fn played_is_best(&self) -> bool {
        self.played_move == self.best_move
    }

    pub fn coverage_delta(&self) -> i32 {
        self.coverage_after as i32 - self.coverage_before as i32
    }

    /// The piece standing on the destination after the move (promotion applied).
    pub fn piece_after(&self) -> Piece {
        self.played_move.promotion.unwrap_or(self.piece)
    }

    /// A non-capturing, non-checking move by a knight, bishop, rook or queen.
    pub fn is_quiet_piece_move(&self) -> bool {
        matches!(
            self.piece,
            Piece::Knight | Piece::Bishop | Piece::Rook | Piece::Queen
        ) && !self.is_capture
            && !self.is_check
    }

    pub fn second_best(&self) -> Option<&Candidate> {
        self.candidates.get(1)
    }
}

fn captured_piece(board: &Board, mv: Move, piece: Piece) -> Option<Piece> {
    let mover = board.side_to_move();
    if board.colors(!mover).has(mv.to) {
        return board.piece_on(mv.to);
    }
    let diagonal_pawn_step = piece == Piece::Pawn && mv.from.file() != mv.to.file();
    diagonal_pawn_step.then_some(Piece::Pawn)
}

fn played(board: &Board, mv: Move, what: &str) -> Result<Board, TagError> {
    let mut after = board.clone();
    after
        .try_play(mv)
        .map_err(|_| TagError::stage("feature", format!("{} move {} is not legal", what, mv)))?;
    Ok(after)
}

/// Pure half of the context build.
pub fn build_context(readout: EngineReadout, metrics: &MetricsEngine) -> Result<TagContext, TagError> {
    let EngineReadout {
        board,
        played: played_move,
        analysis,
        played_score,
        depth,
        multipv,
        previous_move,
    } = readout;

    let best = analysis
        .best()
        .cloned()
        .ok_or_else(|| TagError::stage("feature", "engine returned no candidates"))?;
    let mover = board.side_to_move();
    let piece = board
        .piece_on(played_move.from)
        .ok_or_else(|| TagError::stage("feature", "no piece on the origin square"))?;

    let board_played = played(&board, played_move, "played")?;
    let board_best = played(&board, best.mv, "best")?;

    let played_kind = analysis
        .find(played_move)
        .map(|c| c.kind)
        .unwrap_or(MoveKind::Quiet);
    let best_kind = best.kind;

    let eval_before_cp = analysis.best_score_cp;
    let eval_best_cp = best.score_cp;
    let eval_played_cp = played_score.to_cp();
    let eval_before = eval_before_cp as f64 / 100.0;
    let eval_played = eval_played_cp as f64 / 100.0;
    let eval_best = eval_best_cp as f64 / 100.0;
    let delta_eval = (eval_played_cp - eval_before_cp) as f64 / 100.0;

    let phase_ratio = phase_ratio(&board);
    let contact_before = contact_profile(&board);
    let contact_played = contact_profile(&board_played);
    let contact_best = contact_profile(&board_best);
    let opp_contact_before = board.null_move().map(|b| contact_profile(&b));

    let (metrics_before, opp_metrics_before) = metrics.evaluate(&board, mover);
    let (metrics_played, opp_metrics_played) = metrics.evaluate(&board_played, mover);
    let (metrics_best, opp_metrics_best) = metrics.evaluate(&board_best, mover);
    let component_deltas = metrics_delta(&metrics_before, &metrics_played);
    let opp_component_deltas = metrics_delta(&opp_metrics_before, &opp_metrics_played);
    let best_component_deltas = metrics_delta(&metrics_before, &metrics_best);

    let attacks_before = AttackMap::compute(&board);
    let attacks_played = AttackMap::compute(&board_played);
    let tension_before = compute_tension(&board, &attacks_before, &contact_before);
    let tension_played = compute_tension(&board_played, &attacks_played, &contact_played);

    let mate_threat = analysis.candidates.iter().any(|c| c.score.is_mate());
    let tactical_weight = tactical_weight(&WeightInputs {
        eval_delta_cp: (eval_played_cp - eval_before_cp) as f64,
        tactics_delta: component_deltas.tactics,
        structure_delta: component_deltas.structure,
        depth_jump_cp: analysis.meta.depth_jump_cp as f64,
        deepening_gain_cp: analysis.meta.deepening_gain_cp as f64,
        best_gap_cp: analysis.second_gap_cp() as f64,
        contact_ratio: contact_before.ratio,
        phase_ratio,
        best_is_forcing: best_kind == MoveKind::Forcing,
        played_is_forcing: played_kind == MoveKind::Forcing,
        mate_threat,
    });

    let captured = captured_piece(&board, played_move, piece);
    let is_castling = piece == Piece::King && board.colors(mover).has(played_move.to);

    let context = TagContext {
        played_uci: to_standard_uci(&board, played_move),
        played_san: format_san(&board, played_move),
        best_uci: to_standard_uci(&board, best.mv),
        mover,
        played_kind,
        best_kind,
        candidates: analysis.candidates,
        eval_before_cp,
        eval_played_cp,
        eval_best_cp,
        eval_before,
        eval_played,
        eval_best,
        delta_eval,
        metrics_before,
        metrics_played,
        metrics_best,
        opp_metrics_before,
        opp_metrics_played,
        opp_metrics_best,
        component_deltas,
        opp_component_deltas,
        best_component_deltas,
        phase_ratio,
        phase: PhaseBucket::from_ratio(phase_ratio),
        contact_before,
        contact_played,
        contact_best,
        opp_contact_before,
        tension_before,
        tension_played,
        tactical_weight,
        mate_threat,
        piece,
        captured,
        is_capture: captured.is_some(),
        is_check: !board_played.checkers().is_empty(),
        is_castling,
        in_check_before: !board.checkers().is_empty(),
        move_number: board.fullmove_number(),
        previous_move,
        coverage_before: attacks_before.coverage(mover).len(),
        coverage_after: attacks_played.coverage(mover).len(),
        depth,
        multipv,
        meta: analysis.meta,
        played_move,
        best_move: best.mv,
        board_before: board,
        board_played,
        board_best,
    };

    tracing::debug!(
        "Context for {}: delta {:+.2}, weight {:.3}, phase {}",
        context.played_uci,
        context.delta_eval,
        context.tactical_weight,
        context.phase.as_str()
    );
    Ok(context)
}

/// Validate, query the engine, and build the context in one call.
pub async fn assemble_context(
    engine: &mut dyn EngineAdapter,
    metrics: &MetricsEngine,
    request: &TagRequest,
) -> Result<TagContext, TagError> {
    let readout = gather_engine_readout(engine, request).await?;
    build_context(readout, metrics)
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Hand-built contexts for detector tests.

    use super::*;
    use engine::MockEngine;

    /// Build a context through the real builder with scripted engine answers.
    ///
    /// `before` scores the candidates for the mover; `after_reply` is the opponent's
    /// best reply score after the played move (its negation is the played eval).
    pub async fn scripted_context(
        fen: &str,
        played: &str,
        candidates: &[(&str, i32)],
        after_reply_cp: i32,
    ) -> TagContext {
        let board = parse_fen(fen).unwrap();
        let lines: Vec<(&str, Score)> = candidates
            .iter()
            .map(|(uci, cp)| (*uci, Score::Centipawns(*cp)))
            .collect();
        // The reply position stays unscripted: the mock answers it with the default score.
        let mut engine = MockEngine::new()
            .with_lines(&board, &lines)
            .with_default_score(after_reply_cp);

        let request = TagRequest::new(board, played).with_depth(10);
        assemble_context(&mut engine, &MetricsEngine::default(), &request)
            .await
            .unwrap()
    }

    /// A neutral context (no engine involved) that tests tweak field by field.
    pub fn neutral_context(fen: &str, played: &str) -> TagContext {
        let board = parse_fen(fen).unwrap();
        let mv = parse_move_notation(&board, played).unwrap();
        let kind = MoveKind::classify(&board, mv);
        let readout = EngineReadout {
            analysis: CandidateAnalysis {
                candidates: vec![Candidate {
                    mv,
                    uci: chess::format_uci_move(mv),
                    score: Score::Centipawns(0),
                    score_cp: 0,
                    kind,
                    depth: 10,
                    pv: vec![chess::format_uci_move(mv)],
                }],
                best_score_cp: 0,
                meta: AnalysisMeta::default(),
            },
            board,
            played: mv,
            played_score: Score::Centipawns(0),
            depth: 10,
            multipv: 1,
            previous_move: None,
        };
        build_context(readout, &MetricsEngine::new(crate::metrics::EvaluatorKind::Neutral)).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use engine::MockEngine;

    #[tokio::test]
    async fn illegal_move_fails_before_any_engine_call() {
        let mut engine = MockEngine::new();
        let request = TagRequest::new(Board::default(), "e2e5");
        let err = assemble_context(&mut engine, &MetricsEngine::default(), &request)
            .await
            .unwrap_err();
        assert!(matches!(err, TagError::IllegalMove { .. }));
        assert_eq!(engine.calls(), 0);
    }

    #[tokio::test]
    async fn unparseable_notation_is_an_illegal_move() {
        let mut engine = MockEngine::new();
        let request = TagRequest::new(Board::default(), "Zz9");
        let err = assemble_context(&mut engine, &MetricsEngine::default(), &request)
            .await
            .unwrap_err();
        assert!(matches!(err, TagError::IllegalMove { .. }));
    }

    #[tokio::test]
    async fn builds_evals_from_both_engine_calls() {
        let ctx = scripted_context(
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
            "d2d4",
            &[("e2e4", 40), ("d2d4", 35), ("g1f3", 20)],
            -30,
        )
        .await;
        assert_eq!(ctx.eval_before_cp, 40);
        assert_eq!(ctx.eval_best_cp, 40);
        assert_eq!(ctx.eval_played_cp, 30);
        assert!((ctx.delta_eval - (-0.10)).abs() < 1e-9);
        assert_eq!(ctx.best_uci, "e2e4");
        assert_eq!(ctx.played_san, "d4");
        assert_eq!(ctx.played_kind, MoveKind::Dynamic);
        assert!(!ctx.played_is_best());
        assert_eq!(ctx.phase, PhaseBucket::Opening);
        assert_eq!(ctx.move_number, 1);
        assert!(ctx.tactical_weight > 0.0 && ctx.tactical_weight < 1.0);
        assert_eq!(ctx.opp_metrics_played, ctx.metrics_played.negate());
    }

    #[tokio::test]
    async fn played_move_missing_from_candidates_defaults_to_quiet() {
        let ctx = scripted_context(
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
            "a2a3",
            &[("e2e4", 40)],
            0,
        )
        .await;
        assert_eq!(ctx.played_kind, MoveKind::Quiet);
    }

    #[test]
    fn castling_is_flagged_and_reported_in_standard_uci() {
        let ctx = neutral_context("r3k2r/pppppppp/8/8/8/8/PPPPPPPP/R3K2R w KQkq - 0 1", "O-O");
        assert!(ctx.is_castling);
        assert!(!ctx.is_capture);
        assert_eq!(ctx.played_uci, "e1g1");
        assert_eq!(ctx.played_san, "O-O");
    }

    #[test]
    fn en_passant_counts_as_a_capture() {
        let ctx = neutral_context("4k3/8/8/3pP3/8/8/8/4K3 w - d6 0 2", "e5d6");
        assert!(ctx.is_capture);
        assert_eq!(ctx.captured, Some(Piece::Pawn));
    }

    #[test]
    fn coverage_delta_tracks_attacked_squares() {
        let ctx = neutral_context("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1", "e2e4");
        // The pawn push opens the f1 bishop and queen diagonals.
        assert!(ctx.coverage_delta() > 0);
    }
}
