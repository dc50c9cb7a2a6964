//! Sacrifice family: material deliberately left en prise, split by how sound it is
//! and what it is for.

use chess::material_value;
use engine::MoveKind;
use serde::Serialize;

use super::{past_threshold, Detector};
use crate::board_analysis::AttackMap;
use crate::context::TagContext;
use crate::evidence::{EvidenceBuilder, TagEvidence};
use crate::tags::TagId;

const MIN_MATERIAL_GIVEN: f64 = 0.5;
const EVEN_EXCHANGE_BAND: f64 = 0.15;
const SOUND_LOSS: f64 = 0.6;
const INACCURATE_LOSS: f64 = 1.5;
const SPECULATIVE_LOSS: f64 = 2.0;
const DESPERATE_EVAL: f64 = -2.0;
const COMPENSATION: f64 = 0.05;

pub(super) const DETECTORS: [Detector; 9] = [
    Detector::new(TagId::TacticalSacrifice, tactical_sacrifice),
    Detector::new(TagId::TacticalCombinationSacrifice, tactical_combination_sacrifice),
    Detector::new(TagId::TacticalInitiativeSacrifice, tactical_initiative_sacrifice),
    Detector::new(TagId::PositionalSacrifice, positional_sacrifice),
    Detector::new(TagId::PositionalStructureSacrifice, positional_structure_sacrifice),
    Detector::new(TagId::PositionalSpaceSacrifice, positional_space_sacrifice),
    Detector::new(TagId::InaccurateTacticalSacrifice, inaccurate_tactical_sacrifice),
    Detector::new(TagId::SpeculativeSacrifice, speculative_sacrifice),
    Detector::new(TagId::DesperateSacrifice, desperate_sacrifice),
];

/// What the sacrifice gate looks at.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SacrificeFacts {
    /// Value of the piece left on the destination minus anything it captured.
    pub material_given: f64,
    /// Cheapest opponent piece able to take on the destination.
    pub lowest_attacker_value: Option<f64>,
    pub moved_value: f64,
    /// Played minus pre-move evaluation, pawns.
    pub eval_delta: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SacrificeCheck {
    pub is_sacrifice: bool,
    pub reason: &'static str,
}

pub fn sacrifice_gate(facts: &SacrificeFacts) -> SacrificeCheck {
    let reason = if facts.material_given < MIN_MATERIAL_GIVEN {
        "no_material_given"
    } else if !facts
        .lowest_attacker_value
        .is_some_and(|v| v <= facts.moved_value)
    {
        "opponent_cannot_capture"
    } else if facts.eval_delta.abs() <= EVEN_EXCHANGE_BAND {
        "even_exchange"
    } else {
        return SacrificeCheck {
            is_sacrifice: true,
            reason: "material_offered",
        };
    };
    SacrificeCheck {
        is_sacrifice: false,
        reason,
    }
}

fn sacrifice_facts(ctx: &TagContext) -> SacrificeFacts {
    let moved_value = material_value(ctx.piece_after());
    let captured_value = ctx.captured.map(material_value).unwrap_or(0.0);
    let attacks = AttackMap::compute(&ctx.board_played);
    SacrificeFacts {
        material_given: moved_value - captured_value,
        lowest_attacker_value: attacks.lowest_attacker_value(ctx.played_move.to, !ctx.mover),
        moved_value,
        eval_delta: ctx.delta_eval,
    }
}

fn sacrifice_gates(tag: TagId, ctx: &TagContext) -> (EvidenceBuilder, SacrificeFacts) {
    let mut ev = EvidenceBuilder::new(tag);
    let facts = sacrifice_facts(ctx);
    let check = sacrifice_gate(&facts);
    ev.metric("material_given", facts.material_given)
        .record("lowest_attacker_value", facts.lowest_attacker_value)
        .metric("eval_delta", facts.eval_delta)
        .metric("eval_loss", ctx.eval_loss())
        .metric("opp_king_safety_delta", ctx.opp_component_deltas.king_safety)
        .record("reason", check.reason);
    ev.gate("is_sacrifice", check.is_sacrifice);
    (ev, facts)
}

fn attacks_king(ctx: &TagContext) -> bool {
    ctx.opp_component_deltas.king_safety < 0.0
}

fn tactical_confidence(ctx: &TagContext, facts: &SacrificeFacts) -> f64 {
    0.4 + 0.1 * facts.material_given.min(5.0)
        + ctx.opp_component_deltas.king_safety.abs().min(0.3)
        - 0.1 * (ctx.eval_loss() / SOUND_LOSS)
}

fn positional_confidence(ctx: &TagContext, facts: &SacrificeFacts, gain: f64) -> f64 {
    0.35 + 0.08 * facts.material_given.min(5.0) + gain.clamp(0.0, 0.3)
        - 0.1 * (ctx.eval_loss() / SOUND_LOSS)
}

fn tactical_sacrifice(ctx: &TagContext) -> TagEvidence {
    let (mut ev, facts) = sacrifice_gates(TagId::TacticalSacrifice, ctx);
    ev.gate("sound", ctx.eval_loss() <= SOUND_LOSS);
    ev.gate("attacks_king", attacks_king(ctx));
    ev.finish(|| tactical_confidence(ctx, &facts))
}

fn tactical_combination_sacrifice(ctx: &TagContext) -> TagEvidence {
    let (mut ev, facts) = sacrifice_gates(TagId::TacticalCombinationSacrifice, ctx);
    ev.metric("tactical_weight", ctx.tactical_weight);
    ev.gate("sound", ctx.eval_loss() <= SOUND_LOSS);
    ev.gate("attacks_king", attacks_king(ctx));
    ev.gate("forcing_move", ctx.played_kind == MoveKind::Forcing);
    ev.gate("sharp_position", ctx.tactical_weight >= 0.55);
    ev.finish(|| tactical_confidence(ctx, &facts) + 0.1 * ctx.tactical_weight)
}

fn tactical_initiative_sacrifice(ctx: &TagContext) -> TagEvidence {
    let (mut ev, facts) = sacrifice_gates(TagId::TacticalInitiativeSacrifice, ctx);
    ev.metric("opp_mobility_delta", ctx.opp_component_deltas.mobility);
    ev.gate("sound", ctx.eval_loss() <= SOUND_LOSS);
    ev.gate("attacks_king", attacks_king(ctx));
    ev.gate("opponent_restricted", ctx.opp_component_deltas.mobility <= -0.1);
    ev.finish(|| tactical_confidence(ctx, &facts) - 0.05)
}

fn positional_sacrifice(ctx: &TagContext) -> TagEvidence {
    let (mut ev, facts) = sacrifice_gates(TagId::PositionalSacrifice, ctx);
    let gain = ctx.component_deltas.mobility.max(ctx.component_deltas.structure);
    ev.metric("compensation", gain);
    ev.gate("sound", ctx.eval_loss() <= SOUND_LOSS);
    ev.gate("not_king_attack", !attacks_king(ctx));
    ev.gate("compensation", gain > COMPENSATION);
    ev.finish(|| positional_confidence(ctx, &facts, gain))
}

fn positional_structure_sacrifice(ctx: &TagContext) -> TagEvidence {
    let (mut ev, facts) = sacrifice_gates(TagId::PositionalStructureSacrifice, ctx);
    let gain = ctx.component_deltas.structure;
    ev.metric("structure_delta", gain);
    ev.gate("sound", ctx.eval_loss() <= SOUND_LOSS);
    ev.gate("not_king_attack", !attacks_king(ctx));
    ev.gate("structure_gain", gain >= 0.1);
    ev.finish(|| positional_confidence(ctx, &facts, gain))
}

fn positional_space_sacrifice(ctx: &TagContext) -> TagEvidence {
    let (mut ev, facts) = sacrifice_gates(TagId::PositionalSpaceSacrifice, ctx);
    let center = ctx.component_deltas.center_control;
    ev.metric("center_control_delta", center)
        .record("coverage_delta", ctx.coverage_delta());
    ev.gate("sound", ctx.eval_loss() <= SOUND_LOSS);
    ev.gate("not_king_attack", !attacks_king(ctx));
    ev.gate("space_gain", center >= 0.1 || ctx.coverage_delta() >= 3);
    ev.finish(|| positional_confidence(ctx, &facts, center))
}

fn inaccurate_tactical_sacrifice(ctx: &TagContext) -> TagEvidence {
    let (mut ev, _) = sacrifice_gates(TagId::InaccurateTacticalSacrifice, ctx);
    let loss = ctx.eval_loss();
    ev.gate("unsound", loss > SOUND_LOSS && loss <= INACCURATE_LOSS);
    ev.gate("attacks_king", attacks_king(ctx));
    ev.finish(|| 0.5 + 0.3 * (INACCURATE_LOSS - loss) / (INACCURATE_LOSS - SOUND_LOSS))
}

fn speculative_sacrifice(ctx: &TagContext) -> TagEvidence {
    let (mut ev, _) = sacrifice_gates(TagId::SpeculativeSacrifice, ctx);
    let loss = ctx.eval_loss();
    ev.gate("speculative_cost", loss > SOUND_LOSS && loss <= SPECULATIVE_LOSS);
    ev.finish(|| 0.45 + 0.25 * (SPECULATIVE_LOSS - loss) / (SPECULATIVE_LOSS - SOUND_LOSS))
}

fn desperate_sacrifice(ctx: &TagContext) -> TagEvidence {
    let (mut ev, _) = sacrifice_gates(TagId::DesperateSacrifice, ctx);
    ev.metric("eval_before", ctx.eval_before);
    ev.gate("lost_position", ctx.eval_before <= DESPERATE_EVAL);
    ev.finish(|| past_threshold(-ctx.eval_before, -DESPERATE_EVAL, 3.0, 0.5))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::test_support::neutral_context;
    use crate::pipeline::{AnalysisMode, Tagger};

    // Nd4-f5 walks into two pawn captures.
    const KNIGHT_OFFER: &str = "6k1/5p1p/4p1p1/8/3N4/8/5PPP/6K1 w - - 0 30";

    fn facts(material_given: f64, attacker: Option<f64>, eval_delta: f64) -> SacrificeFacts {
        SacrificeFacts {
            material_given,
            lowest_attacker_value: attacker,
            moved_value: 3.0,
            eval_delta,
        }
    }

    #[test]
    fn half_a_pawn_nobody_can_take_is_not_a_sacrifice() {
        let check = sacrifice_gate(&facts(0.5, None, -0.4));
        assert!(!check.is_sacrifice);
        assert_eq!(check.reason, "opponent_cannot_capture");
    }

    #[test]
    fn gate_reasons_in_order() {
        assert_eq!(sacrifice_gate(&facts(0.0, Some(1.0), -1.0)).reason, "no_material_given");
        assert_eq!(sacrifice_gate(&facts(3.0, Some(5.0), -1.0)).reason, "opponent_cannot_capture");
        assert_eq!(sacrifice_gate(&facts(3.0, Some(1.0), -0.1)).reason, "even_exchange");
        assert!(sacrifice_gate(&facts(3.0, Some(1.0), -0.3)).is_sacrifice);
    }

    #[test]
    fn sound_knight_offer_against_the_king_is_tactical() {
        let mut ctx = neutral_context(KNIGHT_OFFER, "d4f5");
        ctx.delta_eval = -0.3;
        ctx.opp_component_deltas.king_safety = -0.15;
        ctx.component_deltas.king_safety = 0.15;

        let facts = sacrifice_facts(&ctx);
        assert_eq!(facts.material_given, 3.0);
        assert_eq!(facts.lowest_attacker_value, Some(1.0));

        let tactical = tactical_sacrifice(&ctx);
        assert!(tactical.fired, "{:?}", tactical.gates_failed);
        assert!(tactical.confidence >= 0.7);
        assert!(!positional_sacrifice(&ctx).fired);
        assert!(!speculative_sacrifice(&ctx).fired);
    }

    #[test]
    fn tactical_sacrifice_survives_resolution_alone() {
        let mut ctx = neutral_context(KNIGHT_OFFER, "d4f5");
        ctx.delta_eval = -0.3;
        ctx.eval_played = ctx.eval_before - 0.3;
        ctx.opp_component_deltas.king_safety = -0.15;
        ctx.component_deltas.king_safety = 0.15;

        let tagger = Tagger::default();
        let evidence = tagger.tagging_stage(&ctx).unwrap();
        let result = tagger
            .finalize_stage(&ctx, AnalysisMode::Tactical, evidence)
            .unwrap();
        let outcome = result.resolution();

        assert!(outcome.primary.contains(&TagId::TacticalSacrifice));
        for positional in [
            TagId::PositionalSacrifice,
            TagId::PositionalStructureSacrifice,
            TagId::PositionalSpaceSacrifice,
        ] {
            assert!(!outcome.primary.contains(&positional), "{:?} survived", positional);
        }
        for suppressed in outcome.suppressed.iter().filter(|s| s.hierarchy == "sacrifice") {
            assert_eq!(suppressed.by, TagId::TacticalSacrifice);
        }
    }

    #[test]
    fn unsound_offer_grades_by_loss() {
        let mut ctx = neutral_context(KNIGHT_OFFER, "d4f5");
        ctx.opp_component_deltas.king_safety = -0.2;
        ctx.delta_eval = -1.0;
        assert!(!tactical_sacrifice(&ctx).fired);
        assert!(inaccurate_tactical_sacrifice(&ctx).fired);
        assert!(speculative_sacrifice(&ctx).fired);

        ctx.delta_eval = -1.8;
        assert!(!inaccurate_tactical_sacrifice(&ctx).fired);
        assert!(speculative_sacrifice(&ctx).fired);
    }

    #[test]
    fn safe_retreat_is_not_a_sacrifice() {
        let mut ctx = neutral_context(KNIGHT_OFFER, "d4f3");
        ctx.delta_eval = -0.3;
        let ev = tactical_sacrifice(&ctx);
        assert!(!ev.fired);
        assert_eq!(ev.evidence["reason"], "opponent_cannot_capture");
    }
}
