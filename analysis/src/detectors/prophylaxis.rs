//! Prophylaxis: quiet moves whose main effect is on what the opponent can do.
//!
//! Every prophylaxis tag first passes the same candidacy gates, then reads one shared
//! quality classification so the direct/latent/meaningless/failed verdicts never
//! disagree with each other.

use chess::piece_count;
use cozy_chess::Piece;
use serde::{Deserialize, Serialize};

use super::{past_threshold, Detector};
use crate::board_analysis::helpers::distance_from_back_rank;
use crate::context::TagContext;
use crate::evidence::{EvidenceBuilder, TagEvidence};
use crate::tags::TagId;

/// Preventive score a move must reach to count as prophylactic outright.
pub const PROPHYLAXIS_TRIGGER: f64 = 0.16;
const SOFT_WEIGHT_CAP: f64 = 0.6;
const MEANINGLESS_EVAL_BAND: f64 = 2.0;
const MEANINGLESS_DROP: f64 = -0.5;
const FAILED_DROP: f64 = -0.3;
const EARLY_OPENING_MOVES: u16 = 6;

pub(super) const DETECTORS: [Detector; 6] = [
    Detector::new(TagId::ProphylacticMove, prophylactic_move),
    Detector::new(TagId::ProphylacticDirect, prophylactic_direct),
    Detector::new(TagId::ProphylacticLatent, prophylactic_latent),
    Detector::new(TagId::ProphylacticMeaningless, prophylactic_meaningless),
    Detector::new(TagId::FailedProphylactic, failed_prophylactic),
    Detector::new(TagId::ControlOverDynamics, control_over_dynamics),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProphylaxisQuality {
    Direct,
    Latent,
    Meaningless,
    Failed,
    NotProphylactic,
}

impl ProphylaxisQuality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Latent => "latent",
            Self::Meaningless => "meaningless",
            Self::Failed => "failed",
            Self::NotProphylactic => "not_prophylactic",
        }
    }

    pub fn is_prophylactic(&self) -> bool {
        matches!(self, Self::Direct | Self::Latent)
    }
}

/// Numeric inputs to the quality classification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ProphylaxisSignals {
    pub preventive_score: f64,
    pub soft_weight: f64,
    pub volatility_drop_cp: f64,
    /// Always 0 until a follow-up search measures the opponent's threats directly.
    pub threat_reduction: f64,
    pub pattern: Option<&'static str>,
}

/// Classify a move from its evaluation and prophylaxis signals.
///
/// An eval drop of more than half a pawn in a roughly balanced position is
/// meaningless whatever else the move does.
pub fn classify_prophylaxis(
    eval_before: f64,
    delta_eval: f64,
    signals: &ProphylaxisSignals,
) -> ProphylaxisQuality {
    if eval_before.abs() <= MEANINGLESS_EVAL_BAND && delta_eval < MEANINGLESS_DROP {
        return ProphylaxisQuality::Meaningless;
    }

    let above_trigger = signals.preventive_score >= PROPHYLAXIS_TRIGGER;
    let has_pattern = signals.pattern.is_some();
    if (above_trigger || has_pattern) && delta_eval <= FAILED_DROP {
        return ProphylaxisQuality::Failed;
    }

    if above_trigger {
        let strong = signals.preventive_score >= PROPHYLAXIS_TRIGGER + 0.02
            || signals.threat_reduction >= 0.2
            || signals.soft_weight >= 0.45
            || signals.volatility_drop_cp >= 30.0;
        return if strong {
            ProphylaxisQuality::Direct
        } else {
            ProphylaxisQuality::Latent
        };
    }

    let secondary = signals.threat_reduction >= 0.05
        || signals.volatility_drop_cp >= 15.0
        || signals.soft_weight >= 0.3
        || signals.preventive_score >= PROPHYLAXIS_TRIGGER / 2.0;
    if has_pattern && secondary {
        ProphylaxisQuality::Latent
    } else {
        ProphylaxisQuality::NotProphylactic
    }
}

fn canonical_pattern(ctx: &TagContext) -> Option<&'static str> {
    let from = distance_from_back_rank(ctx.played_move.from, ctx.mover);
    let to = distance_from_back_rank(ctx.played_move.to, ctx.mover);
    match ctx.piece {
        Piece::Bishop if to < from => Some("bishop_retreat"),
        Piece::Knight if to <= 3 => Some("knight_reposition"),
        Piece::King if !ctx.is_castling && from <= 1 && to <= 1 => Some("king_shuffle"),
        Piece::Pawn if ctx.opp_component_deltas.mobility < 0.0 => Some("restricting_pawn_advance"),
        _ => None,
    }
}

pub fn prophylaxis_signals(ctx: &TagContext) -> ProphylaxisSignals {
    let opp = &ctx.opp_component_deltas;
    let own = &ctx.component_deltas;

    let trend_drop = ctx
        .opp_contact_before
        .map(|before| (before.ratio - ctx.contact_played.ratio).max(0.0))
        .unwrap_or(0.0);
    let preventive_score =
        0.9 * (-opp.mobility).max(0.0) + 0.7 * (-opp.tactics).max(0.0) + 0.5 * trend_drop;

    let mild_self_drop = if (-0.15..0.0).contains(&own.mobility) {
        -own.mobility
    } else {
        0.0
    };
    let soft_weight = (0.8 * own.structure.max(0.0)
        + 0.8 * own.king_safety.max(0.0)
        + 0.5 * mild_self_drop)
        .min(SOFT_WEIGHT_CAP);

    ProphylaxisSignals {
        preventive_score,
        soft_weight,
        volatility_drop_cp: (ctx.tension_before.volatility - ctx.tension_played.volatility) * 100.0,
        threat_reduction: 0.0,
        pattern: canonical_pattern(ctx),
    }
}

/// Candidacy gates shared by every prophylaxis tag, plus the signal evidence.
fn candidate_gates(tag: TagId, ctx: &TagContext) -> (EvidenceBuilder, ProphylaxisSignals, ProphylaxisQuality) {
    let mut ev = EvidenceBuilder::new(tag);
    let signals = prophylaxis_signals(ctx);
    let quality = classify_prophylaxis(ctx.eval_before, ctx.delta_eval, &signals);
    let recapture = ctx.previous_move.is_some_and(|prev| prev.to == ctx.played_move.to);
    let early_opening =
        ctx.move_number < EARLY_OPENING_MOVES && piece_count(&ctx.board_before) == 32;

    ev.metric("preventive_score", signals.preventive_score)
        .metric("soft_weight", signals.soft_weight)
        .metric("volatility_drop_cp", signals.volatility_drop_cp)
        .metric("threat_reduction", signals.threat_reduction)
        .record("pattern", signals.pattern)
        .metric("trigger", PROPHYLAXIS_TRIGGER)
        .metric("eval_before", ctx.eval_before)
        .metric("delta_eval", ctx.delta_eval)
        .record("quality", quality.as_str());

    ev.gate("not_check", !ctx.is_check);
    ev.gate("not_capture", !ctx.is_capture);
    ev.gate("not_in_check", !ctx.in_check_before);
    ev.gate("not_recapture", !recapture);
    ev.gate("past_early_opening", !early_opening);
    (ev, signals, quality)
}

fn quality_confidence(signals: &ProphylaxisSignals) -> f64 {
    0.5 * past_threshold(signals.preventive_score, PROPHYLAXIS_TRIGGER / 2.0, PROPHYLAXIS_TRIGGER, 0.4)
        + 0.3 * (signals.soft_weight / SOFT_WEIGHT_CAP)
        + 0.2 * (signals.volatility_drop_cp / 30.0).clamp(0.0, 1.0)
}

fn prophylactic_move(ctx: &TagContext) -> TagEvidence {
    let (mut ev, signals, quality) = candidate_gates(TagId::ProphylacticMove, ctx);
    ev.gate("prophylactic_quality", quality.is_prophylactic());
    ev.finish(|| quality_confidence(&signals))
}

fn prophylactic_direct(ctx: &TagContext) -> TagEvidence {
    let (mut ev, signals, quality) = candidate_gates(TagId::ProphylacticDirect, ctx);
    ev.gate("direct_quality", quality == ProphylaxisQuality::Direct);
    ev.finish(|| 0.2 + quality_confidence(&signals))
}

fn prophylactic_latent(ctx: &TagContext) -> TagEvidence {
    let (mut ev, signals, quality) = candidate_gates(TagId::ProphylacticLatent, ctx);
    ev.gate("latent_quality", quality == ProphylaxisQuality::Latent);
    ev.finish(|| quality_confidence(&signals))
}

fn prophylactic_meaningless(ctx: &TagContext) -> TagEvidence {
    let (mut ev, _, quality) = candidate_gates(TagId::ProphylacticMeaningless, ctx);
    ev.gate("meaningless_quality", quality == ProphylaxisQuality::Meaningless);
    ev.finish(|| past_threshold(-ctx.delta_eval, -MEANINGLESS_DROP, 1.0, 0.6))
}

fn failed_prophylactic(ctx: &TagContext) -> TagEvidence {
    let (mut ev, _, quality) = candidate_gates(TagId::FailedProphylactic, ctx);
    ev.gate("failed_quality", quality == ProphylaxisQuality::Failed);
    ev.finish(|| past_threshold(-ctx.delta_eval, -FAILED_DROP, 1.0, 0.55))
}

fn control_over_dynamics(ctx: &TagContext) -> TagEvidence {
    let (mut ev, signals, _) = candidate_gates(TagId::ControlOverDynamics, ctx);
    let opp_contact_drop = ctx
        .opp_contact_before
        .map(|before| before.ratio - ctx.contact_played.ratio)
        .unwrap_or(0.0);
    ev.metric("opp_contact_drop", opp_contact_drop)
        .metric("eval_loss", ctx.eval_loss());
    ev.gate("volatility_damped", signals.volatility_drop_cp >= 10.0);
    ev.gate("opponent_options_cut", opp_contact_drop > 0.0);
    ev.gate("accurate", ctx.eval_loss() <= 0.3);
    ev.finish(|| past_threshold(signals.volatility_drop_cp, 10.0, 30.0, 0.5))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::test_support::neutral_context;

    fn signals(preventive: f64, pattern: Option<&'static str>) -> ProphylaxisSignals {
        ProphylaxisSignals {
            preventive_score: preventive,
            pattern,
            ..Default::default()
        }
    }

    #[test]
    fn balanced_eval_drop_is_always_meaningless() {
        for s in [
            signals(0.0, None),
            signals(0.5, Some("bishop_retreat")),
            ProphylaxisSignals {
                preventive_score: 1.0,
                soft_weight: 0.6,
                volatility_drop_cp: 80.0,
                threat_reduction: 0.5,
                pattern: Some("king_shuffle"),
            },
        ] {
            assert_eq!(classify_prophylaxis(0.0, -0.6, &s), ProphylaxisQuality::Meaningless);
        }
    }

    #[test]
    fn intent_with_an_eval_drop_outside_the_band_fails() {
        let s = signals(0.3, None);
        assert_eq!(classify_prophylaxis(3.0, -0.6, &s), ProphylaxisQuality::Failed);
        assert_eq!(classify_prophylaxis(0.0, -0.35, &s), ProphylaxisQuality::Failed);
        assert_eq!(
            classify_prophylaxis(0.0, -0.35, &signals(0.0, None)),
            ProphylaxisQuality::NotProphylactic
        );
    }

    #[test]
    fn direct_versus_latent_above_trigger() {
        assert_eq!(classify_prophylaxis(0.0, 0.0, &signals(0.19, None)), ProphylaxisQuality::Direct);
        assert_eq!(classify_prophylaxis(0.0, 0.0, &signals(0.17, None)), ProphylaxisQuality::Latent);
    }

    #[test]
    fn below_trigger_needs_pattern_and_secondary_signal() {
        assert_eq!(
            classify_prophylaxis(0.0, 0.0, &signals(0.1, None)),
            ProphylaxisQuality::NotProphylactic
        );
        assert_eq!(
            classify_prophylaxis(0.0, 0.0, &signals(0.1, Some("knight_reposition"))),
            ProphylaxisQuality::Latent
        );
        assert_eq!(
            classify_prophylaxis(0.0, 0.0, &signals(0.02, Some("knight_reposition"))),
            ProphylaxisQuality::NotProphylactic
        );
    }

    const MIDDLEGAME: &str = "r1bq1rk1/pp2bppp/2n1pn2/3p4/2PP4/2N1PN2/PP2BPPP/R2QKB1R w KQ - 0 9";

    #[test]
    fn meaningless_tag_fires_on_a_quiet_move_losing_sixty_centipawns() {
        let mut ctx = neutral_context(MIDDLEGAME, "a2a3");
        ctx.eval_before = 0.0;
        ctx.delta_eval = -0.6;
        ctx.opp_component_deltas.mobility = -0.4;
        let ev = prophylactic_meaningless(&ctx);
        assert!(ev.fired, "{:?}", ev.gates_failed);
        assert!(!prophylactic_direct(&ctx).fired);
        assert!(!prophylactic_move(&ctx).fired);
    }

    #[test]
    fn captures_and_early_opening_moves_are_not_candidates() {
        let start = neutral_context("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1", "g1f3");
        assert!(prophylactic_move(&start).gate_failed("past_early_opening"));

        let capture = neutral_context("4k3/8/8/3p4/4P3/8/8/4K3 w - - 0 30", "e4d5");
        assert!(prophylactic_move(&capture).gate_failed("not_capture"));
    }

    #[test]
    fn direct_prophylaxis_from_a_strong_preventive_score() {
        let mut ctx = neutral_context(MIDDLEGAME, "h2h3");
        ctx.opp_component_deltas.mobility = -0.25;
        let ev = prophylactic_direct(&ctx);
        assert!(ev.fired, "{:?}", ev.gates_failed);
        assert!(prophylactic_move(&ctx).fired);
        assert!(!prophylactic_latent(&ctx).fired);
    }
}
