use engine::MoveKind;

use super::{past_threshold, Detector};
use crate::context::TagContext;
use crate::evidence::{EvidenceBuilder, TagEvidence};
use crate::tags::TagId;

pub(super) const DETECTORS: [Detector; 4] = [
    Detector::new(TagId::InitiativeExploitation, initiative_exploitation),
    Detector::new(TagId::InitiativeAttempt, initiative_attempt),
    Detector::new(TagId::DeferredInitiative, deferred_initiative),
    Detector::new(TagId::PrematureAttack, premature_attack),
];

/// Forcing, or taking squares and safety away from the opponent.
fn is_pressing(ctx: &TagContext) -> bool {
    ctx.played_kind == MoveKind::Forcing
        || ctx.opp_component_deltas.mobility <= -0.1
        || ctx.opp_component_deltas.king_safety <= -0.1
        || ctx.coverage_delta() >= 3
}

fn record_inputs(ev: &mut EvidenceBuilder, ctx: &TagContext) {
    ev.record("played_kind", ctx.played_kind.as_str())
        .metric("eval_before", ctx.eval_before)
        .metric("eval_loss", ctx.eval_loss())
        .metric("opp_mobility_delta", ctx.opp_component_deltas.mobility)
        .metric("opp_king_safety_delta", ctx.opp_component_deltas.king_safety)
        .record("coverage_delta", ctx.coverage_delta());
}

fn initiative_exploitation(ctx: &TagContext) -> TagEvidence {
    let mut ev = EvidenceBuilder::new(TagId::InitiativeExploitation);
    record_inputs(&mut ev, ctx);
    ev.gate("holds_advantage", ctx.eval_before >= 0.5);
    ev.gate("pressing_move", is_pressing(ctx));
    ev.gate("accurate", ctx.eval_loss() <= 0.2);
    ev.finish(|| past_threshold(ctx.eval_before, 0.5, 1.5, 0.6))
}

fn initiative_attempt(ctx: &TagContext) -> TagEvidence {
    let mut ev = EvidenceBuilder::new(TagId::InitiativeAttempt);
    record_inputs(&mut ev, ctx);
    ev.gate("balanced_position", (-1.0..0.5).contains(&ctx.eval_before));
    ev.gate("pressing_move", is_pressing(ctx));
    ev.gate("affordable", ctx.eval_loss() <= 0.5);
    ev.finish(|| 0.5 + 0.4 * (1.0 - ctx.eval_loss() / 0.5))
}

fn deferred_initiative(ctx: &TagContext) -> TagEvidence {
    let mut ev = EvidenceBuilder::new(TagId::DeferredInitiative);
    record_inputs(&mut ev, ctx);
    ev.record("best_kind", ctx.best_kind.as_str());
    ev.gate("holds_advantage", ctx.eval_before >= 0.3);
    ev.gate("forcing_best_available", ctx.best_kind == MoveKind::Forcing);
    ev.gate("slow_move_played", ctx.played_kind == MoveKind::Quiet);
    ev.gate("moderate_cost", ctx.eval_loss() > 0.2 && ctx.eval_loss() <= 1.0);
    ev.finish(|| past_threshold(ctx.eval_loss(), 0.2, 0.8, 0.5))
}

fn premature_attack(ctx: &TagContext) -> TagEvidence {
    let mut ev = EvidenceBuilder::new(TagId::PrematureAttack);
    record_inputs(&mut ev, ctx);
    ev.gate("pressing_move", is_pressing(ctx));
    ev.gate(
        "aimed_at_king",
        ctx.is_check || ctx.opp_component_deltas.king_safety < 0.0,
    );
    ev.gate("costly", ctx.eval_loss() > 0.6);
    ev.finish(|| past_threshold(ctx.eval_loss(), 0.6, 1.4, 0.55))
}
