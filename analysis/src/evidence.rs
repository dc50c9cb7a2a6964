use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::tags::TagId;

/// Smallest confidence a fired tag may carry.
pub const MIN_FIRED_CONFIDENCE: f64 = 0.01;

/// What a detector saw and decided.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagEvidence {
    pub tag: TagId,
    pub fired: bool,
    /// In (0, 1] when fired, exactly 0 otherwise.
    pub confidence: f64,
    pub evidence: BTreeMap<String, Value>,
    pub gates_passed: Vec<String>,
    pub gates_failed: Vec<String>,
}

impl TagEvidence {
    pub fn gate_passed(&self, gate: &str) -> bool {
        self.gates_passed.iter().any(|g| g == gate)
    }

    pub fn gate_failed(&self, gate: &str) -> bool {
        self.gates_failed.iter().any(|g| g == gate)
    }

    /// Whether the fired/confidence pair is consistent.
    pub fn is_well_formed(&self) -> bool {
        if self.fired {
            self.confidence >= MIN_FIRED_CONFIDENCE && self.confidence <= 1.0
        } else {
            self.confidence == 0.0
        }
    }
}

/// Collects inputs and gate outcomes in order, then settles `fired` and `confidence`
/// so that every detector upholds the same invariants.
#[derive(Debug)]
pub struct EvidenceBuilder {
    tag: TagId,
    evidence: BTreeMap<String, Value>,
    passed: Vec<String>,
    failed: Vec<String>,
}

impl EvidenceBuilder {
    pub fn new(tag: TagId) -> Self {
        Self {
            tag,
            evidence: BTreeMap::new(),
            passed: Vec::new(),
            failed: Vec::new(),
        }
    }

    pub fn record(&mut self, key: &str, value: impl Into<Value>) -> &mut Self {
        self.evidence.insert(key.to_string(), value.into());
        self
    }

    /// Record a numeric input rounded to 4 decimals.
    pub fn metric(&mut self, key: &str, value: f64) -> &mut Self {
        self.record(key, (value * 10_000.0).round() / 10_000.0)
    }

    /// Record a named gate and return its outcome.
    pub fn gate(&mut self, name: &str, ok: bool) -> bool {
        if ok {
            self.passed.push(name.to_string());
        } else {
            self.failed.push(name.to_string());
        }
        ok
    }

    pub fn all_passed(&self) -> bool {
        self.failed.is_empty() && !self.passed.is_empty()
    }

    /// Fires iff every recorded gate passed. `confidence` is only consulted when fired.
    pub fn finish(self, confidence: impl FnOnce() -> f64) -> TagEvidence {
        let fired = self.all_passed();
        let confidence = if fired {
            let raw = confidence();
            if raw.is_nan() {
                MIN_FIRED_CONFIDENCE
            } else {
                raw.clamp(MIN_FIRED_CONFIDENCE, 1.0)
            }
        } else {
            0.0
        };
        TagEvidence {
            tag: self.tag,
            fired,
            confidence,
            evidence: self.evidence,
            gates_passed: self.passed,
            gates_failed: self.failed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_only_when_every_gate_passes() {
        let mut builder = EvidenceBuilder::new(TagId::MissedTactic);
        builder.metric("delta_eval", -1.2);
        builder.gate("eval_drop", false);
        let evidence = builder.finish(|| 0.9);
        assert!(!evidence.fired);
        assert_eq!(evidence.confidence, 0.0);
        assert!(evidence.gate_failed("eval_drop"));
        assert!(evidence.is_well_formed());
    }

    #[test]
    fn confidence_is_clamped_when_fired() {
        let mut high = EvidenceBuilder::new(TagId::FirstChoice);
        high.gate("matches_best", true);
        assert_eq!(high.finish(|| 1.7).confidence, 1.0);

        let mut low = EvidenceBuilder::new(TagId::FirstChoice);
        low.gate("matches_best", true);
        let evidence = low.finish(|| -0.3);
        assert_eq!(evidence.confidence, MIN_FIRED_CONFIDENCE);
        assert!(evidence.is_well_formed());

        let mut nan = EvidenceBuilder::new(TagId::FirstChoice);
        nan.gate("matches_best", true);
        assert_eq!(nan.finish(|| f64::NAN).confidence, MIN_FIRED_CONFIDENCE);
    }

    #[test]
    fn no_gates_means_not_fired() {
        let builder = EvidenceBuilder::new(TagId::CodSlowdown);
        assert!(!builder.finish(|| 1.0).fired);
    }

    #[test]
    fn metrics_are_rounded() {
        let mut builder = EvidenceBuilder::new(TagId::PanicMove);
        builder.metric("delta_eval", -2.123456);
        let evidence = builder.finish(|| 0.5);
        assert_eq!(evidence.evidence["delta_eval"], -2.1235);
    }
}
