//! Move tagging: engine readout and positional metrics in, a resolved set of semantic
//! tags out.

pub mod board_analysis;
pub mod context;
pub mod detectors;
pub mod error;
pub mod evidence;
pub mod metrics;
pub mod pipeline;
pub mod resolver;
pub mod stats;
pub mod tags;
pub mod weight;

pub use context::{
    assemble_context, build_context, gather_engine_readout, EngineReadout, TagContext, TagRequest,
};
pub use detectors::{DetectorRegistry, TagDetector};
pub use error::TagError;
pub use evidence::{EvidenceBuilder, TagEvidence};
pub use metrics::{EvaluatorKind, MetricsEngine, PhaseBucket, PositionEvaluator, StyleMetrics};
pub use pipeline::{tag_position, AnalysisMode, TagResult, Tagger, TaggerConfig, TAGGER_VERSION};
pub use resolver::{resolve, Suppressed, SuppressionOutcome, HIERARCHIES};
pub use stats::{StatsKey, TagTally, TallyBook, STATS_SCHEMA_VERSION};
pub use tags::{TagCategory, TagId, TagSet};
pub use weight::{tactical_weight, WeightInputs};
