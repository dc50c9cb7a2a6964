use cozy_chess::{BitBoard, Piece};

use super::{past_threshold, Detector};
use crate::board_analysis::helpers::file_bitboard;
use crate::context::TagContext;
use crate::evidence::{EvidenceBuilder, TagEvidence};
use crate::tags::TagId;

const VOLATILITY_STEP: f64 = 0.05;

pub(super) const DETECTORS: [Detector; 4] = [
    Detector::new(TagId::TensionCreation, tension_creation),
    Detector::new(TagId::NeutralTensionCreation, neutral_tension_creation),
    Detector::new(TagId::TensionRelease, tension_release),
    Detector::new(TagId::FilePressure, file_pressure),
];

fn volatility_change(ctx: &TagContext) -> f64 {
    ctx.tension_played.volatility - ctx.tension_before.volatility
}

fn gains_pressure(ctx: &TagContext) -> bool {
    let contested =
        ctx.tension_played.contested_squares as i32 - ctx.tension_before.contested_squares as i32;
    ctx.component_deltas.tactics > 0.0 || contested >= 2
}

fn record_inputs(ev: &mut EvidenceBuilder, ctx: &TagContext) {
    ev.metric("volatility_before", ctx.tension_before.volatility)
        .metric("volatility_after", ctx.tension_played.volatility)
        .record("contested_before", ctx.tension_before.contested_squares)
        .record("contested_after", ctx.tension_played.contested_squares)
        .metric("tactics_delta", ctx.component_deltas.tactics)
        .metric("eval_loss", ctx.eval_loss());
}

fn tension_creation(ctx: &TagContext) -> TagEvidence {
    let mut ev = EvidenceBuilder::new(TagId::TensionCreation);
    record_inputs(&mut ev, ctx);
    ev.gate("not_capture", !ctx.is_capture);
    ev.gate("volatility_rise", volatility_change(ctx) >= VOLATILITY_STEP);
    ev.gate("pressure_gain", gains_pressure(ctx));
    ev.gate("accurate", ctx.eval_loss() <= 0.3);
    ev.finish(|| past_threshold(volatility_change(ctx), VOLATILITY_STEP, 0.2, 0.55))
}

fn neutral_tension_creation(ctx: &TagContext) -> TagEvidence {
    let mut ev = EvidenceBuilder::new(TagId::NeutralTensionCreation);
    record_inputs(&mut ev, ctx);
    ev.gate("not_capture", !ctx.is_capture);
    ev.gate("volatility_rise", volatility_change(ctx) >= VOLATILITY_STEP);
    ev.gate("no_pressure_gain", !gains_pressure(ctx));
    ev.gate("affordable", ctx.eval_loss() <= 0.6);
    ev.finish(|| 0.45 + 0.3 * (1.0 - ctx.eval_loss() / 0.6))
}

fn tension_release(ctx: &TagContext) -> TagEvidence {
    let mut ev = EvidenceBuilder::new(TagId::TensionRelease);
    record_inputs(&mut ev, ctx);
    ev.record("attacked_but_defended_before", ctx.tension_before.attacked_but_defended);
    ev.gate("existing_tension", ctx.tension_before.attacked_but_defended >= 1);
    ev.gate("resolving_move", ctx.is_capture);
    ev.gate("volatility_drop", volatility_change(ctx) <= -VOLATILITY_STEP);
    ev.finish(|| past_threshold(-volatility_change(ctx), VOLATILITY_STEP, 0.2, 0.55))
}

fn file_pressure(ctx: &TagContext) -> TagEvidence {
    let mut ev = EvidenceBuilder::new(TagId::FilePressure);
    let piece = ctx.piece_after();
    let file = file_bitboard(ctx.played_move.to.file());
    let own_pawns = ctx.board_played.colored_pieces(ctx.mover, Piece::Pawn) & file;
    let enemy_on_file: BitBoard = ctx.board_played.colors(!ctx.mover) & file;
    let enemy_pawns = ctx.board_played.colored_pieces(!ctx.mover, Piece::Pawn) & file;
    let changed_file = ctx.played_move.from.file() != ctx.played_move.to.file();

    ev.record("file", ctx.played_move.to.file().to_string())
        .record("own_pawns_on_file", own_pawns.len())
        .record("enemy_pieces_on_file", enemy_on_file.len())
        .record("open_file", enemy_pawns.is_empty());
    ev.gate("heavy_piece", matches!(piece, Piece::Rook | Piece::Queen));
    ev.gate("arrives_on_file", changed_file && !ctx.is_castling);
    ev.gate("semi_open_file", own_pawns.is_empty());
    ev.gate("target_on_file", !enemy_on_file.is_empty());
    ev.finish(|| if enemy_pawns.is_empty() { 0.85 } else { 0.65 })
}
