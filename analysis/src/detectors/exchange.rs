//! Knight-for-bishop (and bishop-for-knight) trades, graded by what they cost.

use cozy_chess::Piece;

use super::Detector;
use crate::context::TagContext;
use crate::evidence::{EvidenceBuilder, TagEvidence};
use crate::tags::TagId;

const ACCURATE_BAND: f64 = -0.15;
const INACCURATE_BAND: f64 = -0.6;

pub(super) const DETECTORS: [Detector; 3] = [
    Detector::new(TagId::AccurateKnightBishopExchange, accurate_exchange),
    Detector::new(TagId::InaccurateKnightBishopExchange, inaccurate_exchange),
    Detector::new(TagId::BadKnightBishopExchange, bad_exchange),
];

fn is_minor(piece: Piece) -> bool {
    matches!(piece, Piece::Knight | Piece::Bishop)
}

fn exchange_gates(tag: TagId, ctx: &TagContext) -> EvidenceBuilder {
    let mut ev = EvidenceBuilder::new(tag);
    ev.record("piece", ctx.piece.to_string())
        .record("captured", ctx.captured.map(|p| p.to_string()))
        .metric("delta_eval", ctx.delta_eval);
    let cross = match ctx.captured {
        Some(captured) => is_minor(ctx.piece) && is_minor(captured) && captured != ctx.piece,
        None => false,
    };
    ev.gate("knight_bishop_trade", cross);
    ev
}

fn accurate_exchange(ctx: &TagContext) -> TagEvidence {
    let mut ev = exchange_gates(TagId::AccurateKnightBishopExchange, ctx);
    ev.gate("within_accurate_band", ctx.delta_eval >= ACCURATE_BAND);
    ev.finish(|| 0.7 + 0.3 * (1.0 - ctx.eval_loss() / -ACCURATE_BAND))
}

fn inaccurate_exchange(ctx: &TagContext) -> TagEvidence {
    let mut ev = exchange_gates(TagId::InaccurateKnightBishopExchange, ctx);
    ev.gate(
        "within_inaccurate_band",
        ctx.delta_eval < ACCURATE_BAND && ctx.delta_eval >= INACCURATE_BAND,
    );
    ev.finish(|| 0.5 + 0.4 * (ctx.eval_loss() + ACCURATE_BAND) / (ACCURATE_BAND - INACCURATE_BAND))
}

fn bad_exchange(ctx: &TagContext) -> TagEvidence {
    let mut ev = exchange_gates(TagId::BadKnightBishopExchange, ctx);
    ev.gate("beyond_inaccurate_band", ctx.delta_eval < INACCURATE_BAND);
    ev.finish(|| super::past_threshold(ctx.eval_loss(), -INACCURATE_BAND, 1.0, 0.6))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::test_support::neutral_context;

    // White bishop on b5 can take the knight on c6.
    const RUY: &str = "r1bqkbnr/pppp1ppp/2n5/1B2p3/4P3/5N2/PPPP1PPP/RNBQK2R w KQkq - 3 4";

    fn trade(delta: f64) -> TagContext {
        let mut ctx = neutral_context(RUY, "b5c6");
        ctx.delta_eval = delta;
        ctx
    }

    #[test]
    fn bands_are_exclusive() {
        for (delta, expected) in [
            (0.0, TagId::AccurateKnightBishopExchange),
            (-0.15, TagId::AccurateKnightBishopExchange),
            (-0.3, TagId::InaccurateKnightBishopExchange),
            (-0.6, TagId::InaccurateKnightBishopExchange),
            (-1.2, TagId::BadKnightBishopExchange),
        ] {
            let ctx = trade(delta);
            let fired: Vec<TagId> = DETECTORS
                .iter()
                .map(|d| (d.run)(&ctx))
                .filter(|e| e.fired)
                .map(|e| e.tag)
                .collect();
            assert_eq!(fired, vec![expected], "delta {}", delta);
        }
    }

    #[test]
    fn non_capture_is_not_an_exchange() {
        let ctx = neutral_context(RUY, "b5a4");
        let ev = accurate_exchange(&ctx);
        assert!(!ev.fired);
        assert!(ev.gate_failed("knight_bishop_trade"));
    }
}
