//! Staged pipeline: Engine → Feature → Mode → Tagging → Finalize.
//!
//! [`Tagger::tag`] is the single-call form and simply runs the five stages in order,
//! so both entry points share one implementation. Each stage checks what the next
//! one relies on and fails with [`TagError::Stage`] otherwise.

use std::collections::BTreeMap;

use chess::{format_fen, parse_fen};
use cozy_chess::Board;
use engine::{open_engine, EngineAdapter, EngineMode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::context::{
    build_context, gather_engine_readout, EngineReadout, TagContext, TagRequest, DEFAULT_DEPTH,
    DEFAULT_MULTIPV,
};
use crate::detectors::{prophylaxis_signals, DetectorRegistry};
use crate::error::TagError;
use crate::evidence::TagEvidence;
use crate::metrics::{EvaluatorKind, MetricsEngine};
use crate::resolver::{resolve, SuppressionOutcome};
use crate::tags::{TagId, TagSet};

pub const TAGGER_VERSION: &str = env!("CARGO_PKG_VERSION");

const TACTICAL_MODE: f64 = 0.65;
const POSITIONAL_MODE: f64 = 0.35;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaggerConfig {
    pub depth: u8,
    pub multipv: u8,
    pub evaluator: EvaluatorKind,
}

impl Default for TaggerConfig {
    fn default() -> Self {
        Self {
            depth: DEFAULT_DEPTH,
            multipv: DEFAULT_MULTIPV,
            evaluator: EvaluatorKind::default(),
        }
    }
}

/// How sharp the position was judged to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisMode {
    Tactical,
    Positional,
    Mixed,
}

impl AnalysisMode {
    pub fn from_weight(weight: f64) -> Self {
        if weight >= TACTICAL_MODE {
            Self::Tactical
        } else if weight <= POSITIONAL_MODE {
            Self::Positional
        } else {
            Self::Mixed
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tactical => "tactical",
            Self::Positional => "positional",
            Self::Mixed => "mixed",
        }
    }
}

/// Everything the tagger concluded about one move.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagResult {
    pub fen: String,
    pub played_uci: String,
    pub played_san: String,
    pub best_move: String,
    /// Raw detector output; see [`TagResult::resolution`] for the conflict-free view.
    pub tags: TagSet,
    pub evidence: Vec<TagEvidence>,
    pub prophylaxis_score: f64,
    pub tactical_weight: f64,
    pub coverage_delta: i32,
    pub eval_before: f64,
    pub eval_played: f64,
    pub eval_best: f64,
    pub mode: AnalysisMode,
    pub analysis_context: BTreeMap<String, Value>,
}

impl TagResult {
    pub fn fired(&self, tag: TagId) -> bool {
        self.tags.contains(tag)
    }

    pub fn evidence_for(&self, tag: TagId) -> Option<&TagEvidence> {
        self.evidence.iter().find(|e| e.tag == tag)
    }

    pub fn resolution(&self) -> SuppressionOutcome {
        resolve(&self.tags)
    }

    pub fn primary_tags(&self) -> Vec<TagId> {
        self.resolution().primary
    }

    /// Played minus pre-move evaluation, exact to the centipawn.
    pub fn delta_eval(&self) -> f64 {
        ((self.eval_played - self.eval_before) * 100.0).round() / 100.0
    }
}

pub struct Tagger {
    config: TaggerConfig,
    metrics: MetricsEngine,
    registry: DetectorRegistry,
}

impl Default for Tagger {
    fn default() -> Self {
        Self::new(TaggerConfig::default())
    }
}

impl Tagger {
    pub fn new(config: TaggerConfig) -> Self {
        Self {
            metrics: MetricsEngine::new(config.evaluator),
            registry: DetectorRegistry::standard(),
            config,
        }
    }

    /// Swap the metrics capability, e.g. for a custom [`crate::metrics::PositionEvaluator`].
    pub fn with_metrics(mut self, metrics: MetricsEngine) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_registry(mut self, registry: DetectorRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn config(&self) -> &TaggerConfig {
        &self.config
    }

    /// A request carrying this tagger's depth and multipv.
    pub fn request(&self, board: Board, played: impl Into<String>) -> TagRequest {
        TagRequest::new(board, played)
            .with_depth(self.config.depth)
            .with_multipv(self.config.multipv)
    }

    pub async fn engine_stage(
        &self,
        engine: &mut dyn EngineAdapter,
        request: &TagRequest,
    ) -> Result<EngineReadout, TagError> {
        let readout = gather_engine_readout(engine, request).await?;
        if readout.analysis.candidates.is_empty() {
            return Err(TagError::stage("engine", "no candidate moves"));
        }
        Ok(readout)
    }

    pub fn feature_stage(&self, readout: EngineReadout) -> Result<TagContext, TagError> {
        let ctx = build_context(readout, &self.metrics)?;
        let evals = [ctx.eval_before, ctx.eval_played, ctx.eval_best];
        if evals.iter().any(|v| !v.is_finite()) {
            return Err(TagError::stage("feature", "non-finite evaluation"));
        }
        Ok(ctx)
    }

    pub fn mode_stage(&self, ctx: &TagContext) -> Result<AnalysisMode, TagError> {
        let weight = ctx.tactical_weight;
        if !(weight > 0.0 && weight < 1.0) {
            return Err(TagError::stage(
                "mode",
                format!("tactical weight {} outside (0, 1)", weight),
            ));
        }
        Ok(AnalysisMode::from_weight(weight))
    }

    pub fn tagging_stage(&self, ctx: &TagContext) -> Result<Vec<TagEvidence>, TagError> {
        let evidence = self.registry.run(ctx);
        if evidence.len() != self.registry.len() {
            return Err(TagError::stage("tagging", "detector output count mismatch"));
        }
        if let Some(bad) = evidence.iter().find(|e| !e.is_well_formed()) {
            return Err(TagError::stage(
                "tagging",
                format!("{} reported confidence {} with fired={}", bad.tag, bad.confidence, bad.fired),
            ));
        }
        Ok(evidence)
    }

    pub fn finalize_stage(
        &self,
        ctx: &TagContext,
        mode: AnalysisMode,
        evidence: Vec<TagEvidence>,
    ) -> Result<TagResult, TagError> {
        let tags: TagSet = evidence.iter().filter(|e| e.fired).map(|e| e.tag).collect();
        if tags.iter().any(|t| t.is_reserved()) {
            return Err(TagError::stage("finalize", "reserved tag fired"));
        }

        let mut analysis_context = BTreeMap::new();
        analysis_context.insert("version".into(), json!(TAGGER_VERSION));
        analysis_context.insert("engine".into(), json!(ctx.meta.engine));
        analysis_context.insert("engine_meta".into(), json!(ctx.meta));
        analysis_context.insert("depth".into(), json!(ctx.depth));
        analysis_context.insert("multipv".into(), json!(ctx.multipv));
        analysis_context.insert("evaluator".into(), json!(self.metrics.evaluator_name()));
        analysis_context.insert("phase".into(), json!(ctx.phase.as_str()));
        analysis_context.insert("phase_ratio".into(), json!(ctx.phase_ratio));
        analysis_context.insert("mode".into(), json!(mode.as_str()));
        analysis_context.insert("contact_ratio".into(), json!(ctx.contact_before.ratio));
        analysis_context.insert("played_kind".into(), json!(ctx.played_kind));
        analysis_context.insert("best_kind".into(), json!(ctx.best_kind));
        analysis_context.insert("candidates".into(), json!(ctx.candidates));
        analysis_context.insert("component_deltas".into(), json!(ctx.component_deltas));

        let result = TagResult {
            fen: format_fen(&ctx.board_before),
            played_uci: ctx.played_uci.clone(),
            played_san: ctx.played_san.clone(),
            best_move: ctx.best_uci.clone(),
            tags,
            evidence,
            prophylaxis_score: prophylaxis_signals(ctx).preventive_score,
            tactical_weight: ctx.tactical_weight,
            coverage_delta: ctx.coverage_delta(),
            eval_before: ctx.eval_before,
            eval_played: ctx.eval_played,
            eval_best: ctx.eval_best,
            mode,
            analysis_context,
        };
        tracing::debug!(
            "Tagged {} ({}): {:?}",
            result.played_uci,
            mode.as_str(),
            result.tags.names()
        );
        Ok(result)
    }

    /// Run all five stages for one move.
    pub async fn tag(
        &self,
        engine: &mut dyn EngineAdapter,
        request: &TagRequest,
    ) -> Result<TagResult, TagError> {
        let readout = self.engine_stage(engine, request).await?;
        let ctx = self.feature_stage(readout)?;
        let mode = self.mode_stage(&ctx)?;
        let evidence = self.tagging_stage(&ctx)?;
        self.finalize_stage(&ctx, mode, evidence)
    }
}

/// Tag one move with a freshly opened engine, closing it on every path.
#[tracing::instrument(skip(mode), fields(engine = mode.label()))]
pub async fn tag_position(
    fen: &str,
    played: &str,
    depth: u8,
    multipv: u8,
    mode: &EngineMode,
) -> Result<TagResult, TagError> {
    let board = parse_fen(fen)?;
    let tagger = Tagger::new(TaggerConfig {
        depth,
        multipv,
        ..TaggerConfig::default()
    });
    let request = tagger.request(board, played);
    request.resolve_move()?;

    let mut engine = open_engine(mode).await?;
    let result = tagger.tag(engine.as_mut(), &request).await;
    engine.shutdown().await;
    result
}
