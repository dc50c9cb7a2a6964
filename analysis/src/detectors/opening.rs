use chess::piece_count;
use cozy_chess::{File, Piece, Square};

use super::Detector;
use crate::board_analysis::helpers::back_rank;
use crate::context::TagContext;
use crate::evidence::{EvidenceBuilder, TagEvidence};
use crate::tags::TagId;

const CENTRAL_SQUARES: [Square; 4] = [Square::D4, Square::E4, Square::D5, Square::E5];
const CENTRAL_PAWN_LAST_MOVE: u16 = 15;
const EARLY_MOVE_LAST: u16 = 12;
const OPENING_MIN_PIECES: u32 = 28;

pub(super) const DETECTORS: [Detector; 3] = [
    Detector::new(TagId::OpeningCentralPawnMove, opening_central_pawn_move),
    Detector::new(TagId::OpeningRookPawnMove, opening_rook_pawn_move),
    Detector::new(TagId::OpeningDevelopment, opening_development),
];

fn accuracy_confidence(base: f64, ctx: &TagContext) -> f64 {
    base + (1.0 - base) * (1.0 - (ctx.eval_loss() / 0.5).min(1.0))
}

fn opening_central_pawn_move(ctx: &TagContext) -> TagEvidence {
    let mut ev = EvidenceBuilder::new(TagId::OpeningCentralPawnMove);
    let pieces = piece_count(&ctx.board_before);
    ev.record("move_number", ctx.move_number)
        .record("piece_count", pieces)
        .record("to", ctx.played_move.to.to_string());
    ev.gate("pawn_move", ctx.piece == Piece::Pawn);
    ev.gate("central_destination", CENTRAL_SQUARES.contains(&ctx.played_move.to));
    ev.gate("early_move", ctx.move_number <= CENTRAL_PAWN_LAST_MOVE);
    ev.gate("full_material", pieces >= OPENING_MIN_PIECES);
    ev.finish(|| accuracy_confidence(0.7, ctx))
}

fn opening_rook_pawn_move(ctx: &TagContext) -> TagEvidence {
    let mut ev = EvidenceBuilder::new(TagId::OpeningRookPawnMove);
    let pieces = piece_count(&ctx.board_before);
    let file = ctx.played_move.from.file();
    ev.record("move_number", ctx.move_number)
        .record("piece_count", pieces)
        .record("file", file.to_string());
    ev.gate("pawn_move", ctx.piece == Piece::Pawn);
    ev.gate("rook_file", matches!(file, File::A | File::H));
    ev.gate("not_capture", !ctx.is_capture);
    ev.gate("early_move", ctx.move_number <= EARLY_MOVE_LAST);
    ev.gate("full_material", pieces >= OPENING_MIN_PIECES);
    ev.finish(|| accuracy_confidence(0.5, ctx) * 0.9)
}

fn opening_development(ctx: &TagContext) -> TagEvidence {
    let mut ev = EvidenceBuilder::new(TagId::OpeningDevelopment);
    let home = back_rank(ctx.mover);
    ev.record("move_number", ctx.move_number)
        .record("piece", ctx.piece.to_string())
        .metric("mobility_delta", ctx.component_deltas.mobility);
    ev.gate("minor_piece", matches!(ctx.piece, Piece::Knight | Piece::Bishop));
    ev.gate("leaves_back_rank", ctx.played_move.from.rank() == home && ctx.played_move.to.rank() != home);
    ev.gate("early_move", ctx.move_number <= EARLY_MOVE_LAST);
    ev.finish(|| accuracy_confidence(0.6, ctx) + ctx.component_deltas.mobility.max(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::test_support::neutral_context;

    const START: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

    #[test]
    fn central_pawn_push_on_move_one() {
        let ev = opening_central_pawn_move(&neutral_context(START, "e2e4"));
        assert!(ev.fired, "{:?}", ev.gates_failed);
        assert!(ev.confidence >= 0.7);
    }

    #[test]
    fn central_pawn_move_needs_an_early_full_board() {
        let late = neutral_context(
            "rnbqkbnr/pppp1ppp/8/8/8/8/PPP1PPPP/RNBQKBNR w KQkq - 0 16",
            "e2e4",
        );
        let ev = opening_central_pawn_move(&late);
        assert!(!ev.fired);
        assert!(ev.gate_failed("early_move"));
        assert!(ev.gate_passed("full_material"));
    }

    #[test]
    fn knight_development_fires_pawn_push_does_not() {
        assert!(opening_development(&neutral_context(START, "g1f3")).fired);
        assert!(!opening_development(&neutral_context(START, "e2e4")).fired);
    }

    #[test]
    fn rook_pawn_push() {
        assert!(opening_rook_pawn_move(&neutral_context(START, "h2h4")).fired);
        assert!(!opening_rook_pawn_move(&neutral_context(START, "g2g4")).fired);
    }
}
