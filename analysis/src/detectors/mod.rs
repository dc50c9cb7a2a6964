//! Detector Registry.
//!
//! Each detector is a pure function of the shared [`TagContext`]. Gates are recorded in a
//! fixed order through an [`EvidenceBuilder`], which also settles `fired` and clamps the
//! confidence, so every detector upholds the same invariants.

mod exchange;
mod initiative;
mod maneuver;
mod meta;
mod opening;
mod prophylaxis;
mod sacrifice;
mod structure;
mod tension;

pub use prophylaxis::{
    classify_prophylaxis, prophylaxis_signals, ProphylaxisQuality, ProphylaxisSignals,
    PROPHYLAXIS_TRIGGER,
};
pub use sacrifice::{sacrifice_gate, SacrificeCheck, SacrificeFacts};

use rayon::prelude::*;

use crate::context::TagContext;
use crate::evidence::TagEvidence;
use crate::tags::TagId;

/// Something that inspects a context and reports on exactly one tag.
pub trait TagDetector: Send + Sync {
    fn tag(&self) -> TagId;

    fn detect(&self, ctx: &TagContext) -> TagEvidence;
}

/// A detector backed by a plain function.
#[derive(Clone, Copy)]
pub struct Detector {
    tag: TagId,
    run: fn(&TagContext) -> TagEvidence,
}

impl Detector {
    pub const fn new(tag: TagId, run: fn(&TagContext) -> TagEvidence) -> Self {
        Self { tag, run }
    }
}

impl TagDetector for Detector {
    fn tag(&self) -> TagId {
        self.tag
    }

    fn detect(&self, ctx: &TagContext) -> TagEvidence {
        (self.run)(ctx)
    }
}

impl std::fmt::Debug for Detector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Detector").field(&self.tag).finish()
    }
}

/// The set of detectors a tagger runs.
pub struct DetectorRegistry {
    detectors: Vec<Box<dyn TagDetector>>,
}

impl Default for DetectorRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl DetectorRegistry {
    pub fn empty() -> Self {
        Self {
            detectors: Vec::new(),
        }
    }

    /// Every built-in detector, grouped by category.
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        for group in [
            meta::DETECTORS.as_slice(),
            opening::DETECTORS.as_slice(),
            exchange::DETECTORS.as_slice(),
            structure::DETECTORS.as_slice(),
            initiative::DETECTORS.as_slice(),
            tension::DETECTORS.as_slice(),
            maneuver::DETECTORS.as_slice(),
            prophylaxis::DETECTORS.as_slice(),
            sacrifice::DETECTORS.as_slice(),
        ] {
            for detector in group {
                registry.register(*detector);
            }
        }
        registry
    }

    pub fn register(&mut self, detector: impl TagDetector + 'static) {
        self.detectors.push(Box::new(detector));
    }

    pub fn len(&self) -> usize {
        self.detectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detectors.is_empty()
    }

    pub fn tags(&self) -> impl Iterator<Item = TagId> + '_ {
        self.detectors.iter().map(|d| d.tag())
    }

    /// Run every detector against one context. Results keep registration order.
    pub fn run(&self, ctx: &TagContext) -> Vec<TagEvidence> {
        self.detectors.par_iter().map(|d| d.detect(ctx)).collect()
    }
}

/// Confidence that grows linearly from `base` at the threshold to 1.0 at `threshold + span`.
pub(crate) fn past_threshold(value: f64, threshold: f64, span: f64, base: f64) -> f64 {
    if span <= 0.0 {
        return base;
    }
    base + (1.0 - base) * ((value - threshold) / span).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::test_support::neutral_context;
    use std::collections::HashSet;

    #[test]
    fn standard_registry_covers_every_active_tag_once() {
        let registry = DetectorRegistry::standard();
        let tags: Vec<TagId> = registry.tags().collect();
        let unique: HashSet<TagId> = tags.iter().copied().collect();
        assert_eq!(tags.len(), 45);
        assert_eq!(unique.len(), 45);
        for tag in TagId::ALL {
            assert_eq!(unique.contains(&tag), !tag.is_reserved(), "{}", tag);
        }
    }

    #[test]
    fn every_detector_reports_its_own_tag_and_is_well_formed() {
        let registry = DetectorRegistry::standard();
        let ctx = neutral_context(
            "r1bqkbnr/pppp1ppp/2n5/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R w KQkq - 2 3",
            "f1b5",
        );
        let results = registry.run(&ctx);
        for (tag, evidence) in registry.tags().zip(&results) {
            assert_eq!(evidence.tag, tag);
            assert!(evidence.is_well_formed(), "{:?}", evidence);
            assert!(
                !evidence.gates_passed.is_empty() || !evidence.gates_failed.is_empty(),
                "{} recorded no gates",
                tag
            );
        }
    }

    #[test]
    fn past_threshold_is_linear_and_capped() {
        assert_eq!(past_threshold(1.0, 1.0, 1.0, 0.5), 0.5);
        assert!((past_threshold(1.5, 1.0, 1.0, 0.5) - 0.75).abs() < 1e-12);
        assert_eq!(past_threshold(9.0, 1.0, 1.0, 0.5), 1.0);
        assert_eq!(past_threshold(0.0, 1.0, 0.0, 0.4), 0.4);
    }
}
