//! Move-quality tags that read the evaluation swing more than the board.

use engine::MoveKind;

use super::{past_threshold, Detector};
use crate::context::TagContext;
use crate::evidence::{EvidenceBuilder, TagEvidence};
use crate::tags::TagId;

const MISSED_TACTIC_DROP: f64 = 1.5;
const PANIC_EVAL_DROP: f64 = -2.5;
const PANIC_MOBILITY_DROP: f64 = -0.8;
const SHARP_WEIGHT: f64 = 0.65;

pub(super) const DETECTORS: [Detector; 7] = [
    Detector::new(TagId::FirstChoice, first_choice),
    Detector::new(TagId::MissedTactic, missed_tactic),
    Detector::new(TagId::TacticalSensitivity, tactical_sensitivity),
    Detector::new(TagId::ConversionPrecision, conversion_precision),
    Detector::new(TagId::PanicMove, panic_move),
    Detector::new(TagId::TacticalRecovery, tactical_recovery),
    Detector::new(TagId::RiskAvoidance, risk_avoidance),
];

fn first_choice(ctx: &TagContext) -> TagEvidence {
    let mut ev = EvidenceBuilder::new(TagId::FirstChoice);
    let gap = ctx.second_best().map(|c| ctx.eval_best_cp - c.score_cp);
    ev.record("played", ctx.played_uci.as_str())
        .record("best", ctx.best_uci.as_str())
        .record("best_gap_cp", gap);
    ev.gate("matches_engine_best", ctx.played_is_best());
    ev.finish(|| past_threshold(gap.unwrap_or(0) as f64, 0.0, 100.0, 0.6))
}

fn missed_tactic(ctx: &TagContext) -> TagEvidence {
    let mut ev = EvidenceBuilder::new(TagId::MissedTactic);
    ev.metric("delta_eval", ctx.delta_eval)
        .metric("threshold", -MISSED_TACTIC_DROP)
        .record("best_kind", ctx.best_kind.as_str());
    ev.gate("eval_drop", ctx.delta_eval < -MISSED_TACTIC_DROP);
    ev.finish(|| past_threshold(-ctx.delta_eval, MISSED_TACTIC_DROP, 1.5, 0.5))
}

fn tactical_sensitivity(ctx: &TagContext) -> TagEvidence {
    let mut ev = EvidenceBuilder::new(TagId::TacticalSensitivity);
    ev.metric("tactical_weight", ctx.tactical_weight)
        .metric("eval_loss", ctx.eval_loss());
    ev.gate("sharp_position", ctx.tactical_weight >= SHARP_WEIGHT);
    ev.gate("accurate_reply", ctx.eval_loss() <= 0.3);
    ev.finish(|| past_threshold(ctx.tactical_weight, SHARP_WEIGHT, 0.3, 0.55) - ctx.eval_loss())
}

fn conversion_precision(ctx: &TagContext) -> TagEvidence {
    let mut ev = EvidenceBuilder::new(TagId::ConversionPrecision);
    ev.metric("eval_before", ctx.eval_before)
        .metric("eval_loss", ctx.eval_loss());
    ev.gate("winning_position", ctx.eval_before >= 2.0);
    ev.gate("advantage_kept", ctx.eval_loss() <= 0.2);
    ev.finish(|| 0.6 + 0.4 * (1.0 - ctx.eval_loss() / 0.2))
}

fn panic_move(ctx: &TagContext) -> TagEvidence {
    let mut ev = EvidenceBuilder::new(TagId::PanicMove);
    let mobility = ctx.component_deltas.mobility;
    ev.metric("delta_eval", ctx.delta_eval)
        .metric("mobility_delta", mobility);
    ev.gate("eval_collapse", ctx.delta_eval <= PANIC_EVAL_DROP);
    ev.gate("mobility_collapse", mobility <= PANIC_MOBILITY_DROP);
    ev.finish(|| {
        0.5 * past_threshold(-ctx.delta_eval, -PANIC_EVAL_DROP, 2.5, 0.6)
            + 0.5 * past_threshold(-mobility, -PANIC_MOBILITY_DROP, 0.2, 0.6)
    })
}

fn tactical_recovery(ctx: &TagContext) -> TagEvidence {
    let mut ev = EvidenceBuilder::new(TagId::TacticalRecovery);
    ev.metric("eval_before", ctx.eval_before)
        .metric("eval_loss", ctx.eval_loss())
        .metric("tactical_weight", ctx.tactical_weight);
    ev.gate("worse_position", ctx.eval_before <= -1.0);
    ev.gate("best_defence", ctx.eval_loss() <= 0.2);
    ev.gate("sharp_position", ctx.tactical_weight >= 0.5);
    ev.finish(|| past_threshold(ctx.tactical_weight, 0.5, 0.4, 0.55))
}

fn risk_avoidance(ctx: &TagContext) -> TagEvidence {
    let mut ev = EvidenceBuilder::new(TagId::RiskAvoidance);
    ev.metric("tactical_weight", ctx.tactical_weight)
        .record("best_kind", ctx.best_kind.as_str())
        .record("played_kind", ctx.played_kind.as_str())
        .metric("eval_loss", ctx.eval_loss())
        .metric("tactics_delta", ctx.component_deltas.tactics);
    ev.gate("sharp_position", ctx.tactical_weight >= 0.5);
    ev.gate("forcing_best_declined", ctx.best_kind == MoveKind::Forcing && ctx.played_kind != MoveKind::Forcing);
    ev.gate("small_cost", ctx.eval_loss() <= 0.5);
    ev.gate("tactics_not_raised", ctx.component_deltas.tactics <= 0.0);
    ev.finish(|| 0.5 + 0.4 * (1.0 - ctx.eval_loss() / 0.5))
}
