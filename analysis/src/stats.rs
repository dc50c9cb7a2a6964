//! Aggregated tag counts. Persistence stays with the caller; this only counts and merges.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::pipeline::TagResult;
use crate::tags::TagId;

pub const STATS_SCHEMA_VERSION: u32 = 1;

/// Identifies one bucket of counts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StatsKey {
    pub player: String,
    /// E.g. `"all"`, a game id or an event name.
    pub scope: String,
    pub engine_version: String,
    pub depth: u8,
    pub multipv: u8,
    pub schema_version: u32,
}

impl StatsKey {
    pub fn new(
        player: impl Into<String>,
        scope: impl Into<String>,
        engine_version: impl Into<String>,
        depth: u8,
        multipv: u8,
    ) -> Self {
        Self {
            player: player.into(),
            scope: scope.into(),
            engine_version: engine_version.into(),
            depth,
            multipv,
            schema_version: STATS_SCHEMA_VERSION,
        }
    }
}

/// Per-tag counts over a number of tagged positions. Counts are of primary tags,
/// after conflict resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagTally {
    pub positions: u64,
    pub counts: BTreeMap<TagId, u64>,
}

impl TagTally {
    pub fn record(&mut self, result: &TagResult) {
        self.positions += 1;
        for tag in result.primary_tags() {
            *self.counts.entry(tag).or_default() += 1;
        }
    }

    pub fn merge(&mut self, other: &TagTally) {
        self.positions += other.positions;
        for (tag, count) in &other.counts {
            *self.counts.entry(*tag).or_default() += count;
        }
    }

    pub fn count(&self, tag: TagId) -> u64 {
        self.counts.get(&tag).copied().unwrap_or(0)
    }

    /// Share of positions carrying `tag`, in percent.
    pub fn percentage(&self, tag: TagId) -> f64 {
        if self.positions == 0 {
            return 0.0;
        }
        self.count(tag) as f64 * 100.0 / self.positions as f64
    }

    /// Tags with a non-zero count, most frequent first.
    pub fn ranked(&self) -> Vec<(TagId, u64)> {
        let mut ranked: Vec<(TagId, u64)> = self.counts.iter().map(|(t, c)| (*t, *c)).collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.priority().cmp(&b.0.priority())));
        ranked
    }
}

/// Tallies keyed by [`StatsKey`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TallyBook {
    entries: BTreeMap<StatsKey, TagTally>,
}

impl TallyBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, key: StatsKey, result: &TagResult) {
        self.entries.entry(key).or_default().record(result);
    }

    pub fn merge(&mut self, other: &TallyBook) {
        for (key, tally) in &other.entries {
            self.entries.entry(key.clone()).or_default().merge(tally);
        }
    }

    pub fn get(&self, key: &StatsKey) -> Option<&TagTally> {
        self.entries.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&StatsKey, &TagTally)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One row of a serialized [`TallyBook`]; JSON maps need string keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TallyEntry {
    key: StatsKey,
    tally: TagTally,
}

impl Serialize for TallyBook {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.entries.iter().map(|(key, tally)| TallyEntry {
            key: key.clone(),
            tally: tally.clone(),
        }))
    }
}

impl<'de> Deserialize<'de> for TallyBook {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let rows = Vec::<TallyEntry>::deserialize(deserializer)?;
        let mut book = TallyBook::new();
        for row in rows {
            book.entries.entry(row.key).or_default().merge(&row.tally);
        }
        Ok(book)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{AnalysisMode, TagResult};
    use crate::tags::TagSet;

    fn result_with(tags: &[TagId]) -> TagResult {
        TagResult {
            fen: String::new(),
            played_uci: "e2e4".into(),
            played_san: "e4".into(),
            best_move: "e2e4".into(),
            tags: tags.iter().copied().collect::<TagSet>(),
            evidence: Vec::new(),
            prophylaxis_score: 0.0,
            tactical_weight: 0.3,
            coverage_delta: 0,
            eval_before: 0.0,
            eval_played: 0.0,
            eval_best: 0.0,
            mode: AnalysisMode::Positional,
            analysis_context: Default::default(),
        }
    }

    #[test]
    fn counts_primary_tags_only() {
        let mut tally = TagTally::default();
        tally.record(&result_with(&[TagId::TacticalSacrifice, TagId::SpeculativeSacrifice]));
        tally.record(&result_with(&[TagId::FirstChoice]));
        assert_eq!(tally.positions, 2);
        assert_eq!(tally.count(TagId::TacticalSacrifice), 1);
        assert_eq!(tally.count(TagId::SpeculativeSacrifice), 0);
        assert_eq!(tally.percentage(TagId::FirstChoice), 50.0);
    }

    #[test]
    fn merge_adds_counts_per_key() {
        let key = StatsKey::new("Carlsen", "all", "Stockfish 16", 14, 3);
        let mut a = TallyBook::new();
        a.record(key.clone(), &result_with(&[TagId::FirstChoice]));
        let mut b = TallyBook::new();
        b.record(key.clone(), &result_with(&[TagId::FirstChoice, TagId::FilePressure]));
        b.record(
            StatsKey::new("Carlsen", "all", "Stockfish 16", 20, 3),
            &result_with(&[]),
        );

        a.merge(&b);
        assert_eq!(a.len(), 2);
        let tally = a.get(&key).unwrap();
        assert_eq!(tally.positions, 2);
        assert_eq!(tally.count(TagId::FirstChoice), 2);
        assert_eq!(tally.ranked()[0], (TagId::FirstChoice, 2));
    }

    #[test]
    fn book_survives_json() {
        let mut book = TallyBook::new();
        book.record(StatsKey::new("a", "all", "mock", 8, 1), &result_with(&[TagId::PanicMove]));
        let json = serde_json::to_string(&book).unwrap();
        let back: TallyBook = serde_json::from_str(&json).unwrap();
        assert_eq!(back, book);
    }

    #[test]
    fn empty_tally_has_zero_percentages() {
        assert_eq!(TagTally::default().percentage(TagId::FirstChoice), 0.0);
    }
}
