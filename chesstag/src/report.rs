//! Batch summary, written as `tag_report.txt` and `tag_report.json`.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use analysis::{StatsKey, TagId, TagTally, TallyBook, TAGGER_VERSION};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::jobs::GameFailure;
use crate::worker::{FailureKind, JobOutcome};

pub const TEXT_REPORT: &str = "tag_report.txt";
pub const JSON_REPORT: &str = "tag_report.json";

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize report: {0}")]
    Json(#[from] serde_json::Error),
}

/// Parameters of the run, echoed in the report header.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSettings {
    pub input: String,
    pub engine_mode: String,
    pub depth: u8,
    pub multipv: u8,
    pub skip_opening: u16,
    pub workers: usize,
    pub player: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagLine {
    pub tag: TagId,
    pub count: u64,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSummary {
    pub player: String,
    pub positions: u64,
    pub tags: Vec<TagLine>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagReport {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub tagger_version: String,
    pub settings: RunSettings,
    pub games: usize,
    pub positions_tagged: u64,
    pub positions_failed: u64,
    pub failures: BTreeMap<FailureKind, u64>,
    pub skipped_games: Vec<GameFailure>,
    pub tags: Vec<TagLine>,
    pub players: Vec<PlayerSummary>,
}

fn tag_lines(tally: &TagTally) -> Vec<TagLine> {
    tally
        .ranked()
        .into_iter()
        .map(|(tag, count)| TagLine {
            tag,
            count,
            percentage: tally.percentage(tag),
        })
        .collect()
}

impl TagReport {
    /// Tally `outcomes` per player. Each unreplayable game counts once as an
    /// illegal-move failure.
    pub fn build(
        settings: RunSettings,
        games: usize,
        outcomes: &[JobOutcome],
        game_failures: &[GameFailure],
    ) -> Self {
        let mut book = TallyBook::new();
        let mut failures: BTreeMap<FailureKind, u64> = BTreeMap::new();

        for outcome in outcomes {
            match &outcome.result {
                Ok(result) => {
                    let key = StatsKey::new(
                        outcome.player.as_str(),
                        settings.input.as_str(),
                        settings.engine_mode.as_str(),
                        settings.depth,
                        settings.multipv,
                    );
                    book.record(key, result);
                }
                Err(kind) => *failures.entry(*kind).or_default() += 1,
            }
        }
        if !game_failures.is_empty() {
            *failures.entry(FailureKind::IllegalMove).or_default() += game_failures.len() as u64;
        }

        let mut overall = TagTally::default();
        let mut players = Vec::with_capacity(book.len());
        for (key, tally) in book.iter() {
            overall.merge(tally);
            players.push(PlayerSummary {
                player: key.player.clone(),
                positions: tally.positions,
                tags: tag_lines(tally),
            });
        }
        players.sort_by(|a, b| b.positions.cmp(&a.positions).then_with(|| a.player.cmp(&b.player)));

        Self {
            run_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            tagger_version: TAGGER_VERSION.to_string(),
            settings,
            games,
            positions_tagged: overall.positions,
            positions_failed: failures.values().sum(),
            failures,
            skipped_games: game_failures.to_vec(),
            tags: tag_lines(&overall),
            players,
        }
    }

    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let s = &self.settings;
        let _ = writeln!(out, "chesstag {} report", self.tagger_version);
        let _ = writeln!(out, "run id:        {}", self.run_id);
        let _ = writeln!(out, "generated:     {}", self.generated_at.to_rfc3339());
        let _ = writeln!(out, "input:         {} ({} games)", s.input, self.games);
        let _ = writeln!(out, "engine:        {} (depth {}, multipv {})", s.engine_mode, s.depth, s.multipv);
        let _ = writeln!(out, "skip opening:  {} moves", s.skip_opening);
        if let Some(player) = &s.player {
            let _ = writeln!(out, "player filter: {}", player);
        }
        let _ = writeln!(out, "tagged:        {} positions", self.positions_tagged);
        let _ = writeln!(out, "failed:        {} positions", self.positions_failed);
        for (kind, count) in &self.failures {
            let _ = writeln!(out, "  {:<20} {:>6}", kind.as_str(), count);
        }
        for skipped in &self.skipped_games {
            let _ = writeln!(out, "  game {}: {}", skipped.game + 1, skipped.reason);
        }

        let _ = writeln!(out, "\ntags");
        write_tag_lines(&mut out, &self.tags, "  ");

        for player in &self.players {
            let _ = writeln!(out, "\n{} ({} positions)", player.player, player.positions);
            write_tag_lines(&mut out, &player.tags, "  ");
        }
        out
    }

    /// Write both report files into `dir`, creating it if needed.
    pub fn write(&self, dir: &Path) -> Result<(PathBuf, PathBuf), ReportError> {
        let io_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source| ReportError::Io { path, source }
        };
        std::fs::create_dir_all(dir).map_err(io_err(dir))?;

        let text_path = dir.join(TEXT_REPORT);
        std::fs::write(&text_path, self.render_text()).map_err(io_err(&text_path))?;

        let json_path = dir.join(JSON_REPORT);
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&json_path, json).map_err(io_err(&json_path))?;

        Ok((text_path, json_path))
    }
}

fn write_tag_lines(out: &mut String, lines: &[TagLine], indent: &str) {
    if lines.is_empty() {
        let _ = writeln!(out, "{}(none)", indent);
    }
    for line in lines {
        let _ = writeln!(
            out,
            "{}{:<36} {:>6} {:>6.1}%",
            indent,
            line.tag.as_str(),
            line.count,
            line.percentage
        );
    }
}
