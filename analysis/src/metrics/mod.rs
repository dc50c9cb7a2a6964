//! Metrics Engine: five style components per side, game phase and contact profile.

mod evaluator;
mod phase;

pub use evaluator::{BoardEvaluator, NeutralEvaluator, PositionEvaluator};
pub use phase::{phase_ratio, PhaseBucket};

use std::sync::Arc;

use cozy_chess::{Board, Color};
use serde::{Deserialize, Serialize};

/// Five named positional components, each roughly in [-1, 1].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StyleMetrics {
    pub mobility: f64,
    pub center_control: f64,
    pub king_safety: f64,
    pub structure: f64,
    pub tactics: f64,
}

impl StyleMetrics {
    pub fn negate(&self) -> Self {
        Self {
            mobility: -self.mobility,
            center_control: -self.center_control,
            king_safety: -self.king_safety,
            structure: -self.structure,
            tactics: -self.tactics,
        }
    }

    pub fn components(&self) -> [(&'static str, f64); 5] {
        [
            ("mobility", self.mobility),
            ("center_control", self.center_control),
            ("king_safety", self.king_safety),
            ("structure", self.structure),
            ("tactics", self.tactics),
        ]
    }
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Per-component `after - before`, rounded to 3 decimals.
pub fn metrics_delta(before: &StyleMetrics, after: &StyleMetrics) -> StyleMetrics {
    StyleMetrics {
        mobility: round3(after.mobility - before.mobility),
        center_control: round3(after.center_control - before.center_control),
        king_safety: round3(after.king_safety - before.king_safety),
        structure: round3(after.structure - before.structure),
        tactics: round3(after.tactics - before.tactics),
    }
}

/// Which [`PositionEvaluator`] the metrics engine uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluatorKind {
    #[default]
    Board,
    /// All components are zero; for engine-only tagging.
    Neutral,
}

#[derive(Clone)]
pub struct MetricsEngine {
    evaluator: Arc<dyn PositionEvaluator>,
}

impl std::fmt::Debug for MetricsEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsEngine")
            .field("evaluator", &self.evaluator.name())
            .finish()
    }
}

impl Default for MetricsEngine {
    fn default() -> Self {
        Self::new(EvaluatorKind::default())
    }
}

impl MetricsEngine {
    pub fn new(kind: EvaluatorKind) -> Self {
        match kind {
            EvaluatorKind::Board => Self::with_evaluator(BoardEvaluator),
            EvaluatorKind::Neutral => Self::with_evaluator(NeutralEvaluator),
        }
    }

    pub fn with_evaluator(evaluator: impl PositionEvaluator + 'static) -> Self {
        Self {
            evaluator: Arc::new(evaluator),
        }
    }

    pub fn evaluator_name(&self) -> &'static str {
        self.evaluator.name()
    }

    /// Metrics for `side` and for its opponent (always the exact negation).
    pub fn evaluate(&self, board: &Board, side: Color) -> (StyleMetrics, StyleMetrics) {
        let metrics = self.evaluator.evaluate(board, side);
        (metrics, metrics.negate())
    }
}
