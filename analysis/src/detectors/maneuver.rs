//! Quiet piece relocations.

use cozy_chess::Piece;

use super::{past_threshold, Detector};
use crate::board_analysis::helpers::back_rank;
use crate::context::TagContext;
use crate::evidence::{EvidenceBuilder, TagEvidence};
use crate::tags::TagId;

const PLACEMENT_STEP: f64 = 0.08;

pub(super) const DETECTORS: [Detector; 5] = [
    Detector::new(TagId::ConstructiveManeuver, constructive_maneuver),
    Detector::new(TagId::ConstructiveManeuverPrepare, constructive_maneuver_prepare),
    Detector::new(TagId::NeutralManeuver, neutral_maneuver),
    Detector::new(TagId::MisplacedManeuver, misplaced_maneuver),
    Detector::new(TagId::ManeuverOpening, maneuver_opening),
];

/// Mobility plus center-control change for the mover.
fn placement_gain(ctx: &TagContext) -> f64 {
    ctx.component_deltas.mobility + ctx.component_deltas.center_control
}

fn maneuver_gates(tag: TagId, ctx: &TagContext) -> EvidenceBuilder {
    let mut ev = EvidenceBuilder::new(tag);
    ev.record("piece", ctx.piece.to_string())
        .metric("placement_gain", placement_gain(ctx))
        .metric("mobility_delta", ctx.component_deltas.mobility)
        .metric("eval_loss", ctx.eval_loss());
    ev.gate("quiet_piece_move", ctx.is_quiet_piece_move());
    ev
}

fn constructive_maneuver(ctx: &TagContext) -> TagEvidence {
    let mut ev = maneuver_gates(TagId::ConstructiveManeuver, ctx);
    ev.gate("improves_placement", placement_gain(ctx) >= PLACEMENT_STEP);
    ev.gate("accurate", ctx.eval_loss() <= 0.2);
    ev.finish(|| past_threshold(placement_gain(ctx), PLACEMENT_STEP, 0.3, 0.6))
}

fn constructive_maneuver_prepare(ctx: &TagContext) -> TagEvidence {
    let mut ev = maneuver_gates(TagId::ConstructiveManeuverPrepare, ctx);
    let groundwork = ctx.component_deltas.king_safety.max(ctx.component_deltas.structure);
    ev.metric("groundwork", groundwork)
        .record("coverage_delta", ctx.coverage_delta());
    ev.gate("placement_steady", placement_gain(ctx).abs() < PLACEMENT_STEP);
    ev.gate("prepares", ctx.coverage_delta() > 0 || groundwork > 0.0);
    ev.gate("accurate", ctx.eval_loss() <= 0.3);
    ev.finish(|| 0.5 + 0.1 * ctx.coverage_delta().clamp(0, 4) as f64)
}

fn neutral_maneuver(ctx: &TagContext) -> TagEvidence {
    let mut ev = maneuver_gates(TagId::NeutralManeuver, ctx);
    ev.gate("placement_steady", placement_gain(ctx).abs() < PLACEMENT_STEP);
    ev.gate("affordable", ctx.eval_loss() <= 0.5);
    ev.finish(|| 0.5)
}

fn misplaced_maneuver(ctx: &TagContext) -> TagEvidence {
    let mut ev = maneuver_gates(TagId::MisplacedManeuver, ctx);
    ev.gate("mobility_lost", ctx.component_deltas.mobility <= -PLACEMENT_STEP);
    ev.gate("costly", ctx.eval_loss() >= 0.3);
    ev.finish(|| past_threshold(ctx.eval_loss(), 0.3, 1.0, 0.55))
}

fn maneuver_opening(ctx: &TagContext) -> TagEvidence {
    let mut ev = maneuver_gates(TagId::ManeuverOpening, ctx);
    let redeploys = match ctx.piece {
        Piece::Knight | Piece::Bishop => ctx.played_move.from.rank() != back_rank(ctx.mover),
        _ => true,
    };
    ev.record("move_number", ctx.move_number);
    ev.gate("early_move", ctx.move_number <= 12);
    ev.gate("moves_developed_piece", redeploys);
    ev.gate("affordable", ctx.eval_loss() <= 0.5);
    ev.finish(|| 0.5 + 0.3 * (1.0 - ctx.eval_loss() / 0.5))
}
