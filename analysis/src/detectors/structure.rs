use cozy_chess::Piece;

use super::{past_threshold, Detector};
use crate::board_analysis::helpers::square_ahead;
use crate::context::TagContext;
use crate::evidence::{EvidenceBuilder, TagEvidence};
use crate::tags::TagId;

const COMPROMISE: f64 = -0.1;
const DYNAMIC_GAIN: f64 = 0.05;

pub(super) const DETECTORS: [Detector; 4] = [
    Detector::new(TagId::StructuralIntegrity, structural_integrity),
    Detector::new(TagId::StructuralCompromiseDynamic, structural_compromise_dynamic),
    Detector::new(TagId::StructuralCompromiseStatic, structural_compromise_static),
    Detector::new(TagId::StructuralBlockage, structural_blockage),
];

fn touches_pawns(ctx: &TagContext) -> bool {
    ctx.piece == Piece::Pawn || ctx.captured == Some(Piece::Pawn)
}

fn has_dynamic_compensation(ctx: &TagContext) -> bool {
    ctx.component_deltas.mobility > DYNAMIC_GAIN
        || ctx.component_deltas.tactics > DYNAMIC_GAIN
        || ctx.tactical_weight >= 0.5
}

fn record_inputs(ev: &mut EvidenceBuilder, ctx: &TagContext) {
    ev.metric("structure_delta", ctx.component_deltas.structure)
        .metric("mobility_delta", ctx.component_deltas.mobility)
        .metric("tactics_delta", ctx.component_deltas.tactics)
        .metric("tactical_weight", ctx.tactical_weight)
        .metric("eval_loss", ctx.eval_loss());
}

fn structural_integrity(ctx: &TagContext) -> TagEvidence {
    let mut ev = EvidenceBuilder::new(TagId::StructuralIntegrity);
    record_inputs(&mut ev, ctx);
    ev.gate("pawn_structure_touched", touches_pawns(ctx));
    ev.gate("structure_kept", ctx.component_deltas.structure >= 0.0);
    ev.gate("accurate", ctx.eval_loss() <= 0.3);
    ev.finish(|| past_threshold(ctx.component_deltas.structure, 0.0, 0.25, 0.6))
}

fn structural_compromise_dynamic(ctx: &TagContext) -> TagEvidence {
    let mut ev = EvidenceBuilder::new(TagId::StructuralCompromiseDynamic);
    record_inputs(&mut ev, ctx);
    ev.gate("structure_worsened", ctx.component_deltas.structure <= COMPROMISE);
    ev.gate("dynamic_compensation", has_dynamic_compensation(ctx));
    ev.gate("affordable", ctx.eval_loss() <= 0.5);
    ev.finish(|| {
        let gain = ctx.component_deltas.mobility.max(ctx.component_deltas.tactics);
        past_threshold(gain, DYNAMIC_GAIN, 0.25, 0.55)
    })
}

fn structural_compromise_static(ctx: &TagContext) -> TagEvidence {
    let mut ev = EvidenceBuilder::new(TagId::StructuralCompromiseStatic);
    record_inputs(&mut ev, ctx);
    ev.gate("structure_worsened", ctx.component_deltas.structure <= COMPROMISE);
    ev.gate("no_dynamic_compensation", !has_dynamic_compensation(ctx));
    ev.finish(|| past_threshold(-ctx.component_deltas.structure, -COMPROMISE, 0.4, 0.5))
}

fn structural_blockage(ctx: &TagContext) -> TagEvidence {
    let mut ev = EvidenceBuilder::new(TagId::StructuralBlockage);
    let ahead = square_ahead(ctx.played_move.to, ctx.mover);
    let enemy_pawns = ctx.board_played.colored_pieces(!ctx.mover, Piece::Pawn);
    let blocked = ahead.is_some_and(|sq| enemy_pawns.has(sq));
    ev.record("blocking_square", ahead.map(|sq| sq.to_string()))
        .metric("mobility_delta", ctx.component_deltas.mobility);
    ev.gate("pawn_move", ctx.piece == Piece::Pawn && ctx.played_move.promotion.is_none());
    ev.gate("rammed_by_enemy_pawn", blocked);
    ev.gate("no_mobility_gain", ctx.component_deltas.mobility <= 0.02);
    ev.finish(|| 0.6 + (-ctx.component_deltas.mobility).clamp(0.0, 0.4))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::test_support::neutral_context;

    #[test]
    fn advance_into_an_enemy_pawn_is_a_blockage() {
        let french = neutral_context(
            "rnbqkbnr/ppp2ppp/4p3/3p4/3PP3/8/PPP2PPP/RNBQKBNR w KQkq - 0 3",
            "e4e5",
        );
        let ev = structural_blockage(&french);
        assert!(ev.fired, "{:?}", ev.gates_failed);
        assert_eq!(ev.evidence["blocking_square"], "e6");

        let open = neutral_context(
            "rnbqkbnr/pppp1ppp/8/4p3/3PP3/8/PPP2PPP/RNBQKBNR b KQkq - 0 2",
            "g8f6",
        );
        assert!(structural_blockage(&open).gate_failed("pawn_move"));

        let free = neutral_context(
            "rnbqkbnr/pppp1ppp/8/4p3/3PP3/8/PPP2PPP/RNBQKBNR w KQkq - 0 3",
            "d4d5",
        );
        assert!(structural_blockage(&free).gate_failed("rammed_by_enemy_pawn"));
    }

    #[test]
    fn compromise_splits_on_compensation() {
        let mut ctx = neutral_context(
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
            "e2e4",
        );
        ctx.component_deltas.structure = -0.25;
        ctx.tactical_weight = 0.2;
        assert!(structural_compromise_static(&ctx).fired);
        assert!(!structural_compromise_dynamic(&ctx).fired);

        ctx.component_deltas.mobility = 0.2;
        assert!(!structural_compromise_static(&ctx).fired);
        assert!(structural_compromise_dynamic(&ctx).fired);
    }

    #[test]
    fn integrity_needs_pawn_involvement() {
        let ctx = neutral_context(
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
            "g1f3",
        );
        let ev = structural_integrity(&ctx);
        assert!(!ev.fired);
        assert!(ev.gate_failed("pawn_structure_touched"));
    }
}
