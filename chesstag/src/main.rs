//! chesstag - batch move tagger.
//!
//! Reads a PGN collection, replays every game and tags each played move with the
//! analysis pipeline, then writes a summary report (`tag_report.txt` and
//! `tag_report.json`) into the output directory.
//!
//! # Exit codes
//!
//! - `0` on success, including runs where some positions failed (failures are
//!   counted in the report).
//! - `2` when the input file is missing or the local engine binary cannot be found.
//! - `1` for any other error (unparsable PGN, unwritable output directory).
//!
//! See [`config`] for the environment variables that supply defaults for the
//! engine flags and the worker count.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use analysis::{Tagger, TaggerConfig};
use anyhow::Context;
use clap::{Parser, ValueEnum};
use engine::{find_stockfish_path, EngineMode, LocalEngineConfig, RemoteEngineConfig};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

mod config;
mod jobs;
mod report;
mod worker;

use jobs::{collect_jobs, JobFilter};
use report::{RunSettings, TagReport};

/// Which engine binding the workers open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum EngineKind {
    /// A UCI engine subprocess per worker.
    Local,
    /// An HTTP analysis service.
    Remote,
}

/// Command-line arguments for the batch tagger.
#[derive(Parser, Debug)]
#[command(name = "chesstag", version, about = "Tag every move of a PGN collection")]
struct Cli {
    /// PGN file to tag.
    #[arg(short, long)]
    input: PathBuf,

    /// Directory that receives tag_report.txt and tag_report.json.
    #[arg(short, long, default_value = "out")]
    output_dir: PathBuf,

    /// Engine binding.
    #[arg(long, value_enum, default_value_t = EngineKind::Local)]
    engine_mode: EngineKind,

    /// Engine binary (local mode) or service URL (remote mode).
    #[arg(short, long)]
    engine: Option<String>,

    /// Search depth per position.
    #[arg(short, long, default_value_t = analysis::context::DEFAULT_DEPTH)]
    depth: u8,

    /// Number of candidate lines per position.
    #[arg(short, long, default_value_t = analysis::context::DEFAULT_MULTIPV)]
    multipv: u8,

    /// Skip positions up to and including this full-move number.
    #[arg(long, default_value_t = 0)]
    skip_opening: u16,

    /// Concurrent workers, each with its own engine session.
    #[arg(short, long)]
    workers: Option<usize>,

    /// Only tag moves made by this player.
    #[arg(short, long)]
    player: Option<String>,
}

/// Error type for CLI operations.
#[derive(Debug, thiserror::Error)]
enum CliError {
    /// The PGN file does not exist.
    #[error("input file not found: {0}")]
    InputMissing(PathBuf),

    /// No local engine binary could be located.
    #[error("engine binary not found: {0}")]
    EngineMissing(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CliError {
    fn exit_code(&self) -> u8 {
        match self {
            Self::InputMissing(_) | Self::EngineMissing(_) => 2,
            Self::Other(_) => 1,
        }
    }
}

/// Resolve the engine binding from flags, then environment, then defaults.
///
/// For local mode the binary must exist; a bare name is accepted only when it is
/// found by the install-location search.
fn resolve_engine_mode(kind: EngineKind, engine: Option<&str>) -> Result<EngineMode, CliError> {
    let timeout = Duration::from_secs(config::get_engine_timeout_secs());
    match kind {
        EngineKind::Remote => {
            let url = engine.map(str::to_string).unwrap_or_else(config::get_engine_url);
            let mut remote = RemoteEngineConfig::new(url);
            remote.timeout = timeout;
            Ok(EngineMode::Remote(remote))
        }
        EngineKind::Local => {
            let path = match engine.map(PathBuf::from).or_else(config::get_engine_path) {
                Some(path) if path.exists() => path,
                Some(path) => return Err(CliError::EngineMissing(path.display().to_string())),
                None => find_stockfish_path().ok_or_else(|| {
                    CliError::EngineMissing("no stockfish in the usual locations".into())
                })?,
            };
            Ok(EngineMode::Local(LocalEngineConfig {
                path: Some(path),
                timeout,
                ..LocalEngineConfig::default()
            }))
        }
    }
}

fn read_games(input: &Path) -> Result<Vec<chess::PgnGame>, CliError> {
    if !input.is_file() {
        return Err(CliError::InputMissing(input.to_path_buf()));
    }
    let text = std::fs::read_to_string(input)
        .with_context(|| format!("failed to read {}", input.display()))?;
    let games = chess::parse_pgn_collection(&text)
        .with_context(|| format!("failed to parse {}", input.display()))?;
    Ok(games)
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let games = read_games(&cli.input)?;
    let mode = resolve_engine_mode(cli.engine_mode, cli.engine.as_deref())?;
    let workers = cli.workers.filter(|w| *w > 0).unwrap_or_else(config::get_workers);

    let filter = JobFilter {
        skip_opening: cli.skip_opening,
        player: cli.player.clone(),
    };
    let (jobs, game_failures) = collect_jobs(&games, &filter);
    tracing::info!(
        games = games.len(),
        positions = jobs.len(),
        unreadable_games = game_failures.len(),
        workers,
        engine = mode.label(),
        "Starting batch"
    );

    let tagger = Arc::new(Tagger::new(TaggerConfig {
        depth: cli.depth.max(1),
        multipv: cli.multipv.max(1),
        ..TaggerConfig::default()
    }));
    let settings = RunSettings {
        input: cli.input.display().to_string(),
        engine_mode: mode.label().to_string(),
        depth: tagger.config().depth,
        multipv: tagger.config().multipv,
        skip_opening: cli.skip_opening,
        workers,
        player: cli.player,
    };

    let outcomes = worker::run_batch(jobs, workers, tagger, worker::engine_factory(mode)).await;
    let report = TagReport::build(settings, games.len(), &outcomes, &game_failures);
    let (text_path, json_path) = report
        .write(&cli.output_dir)
        .context("failed to write report")?;

    tracing::info!(
        run_id = %report.run_id,
        tagged = report.positions_tagged,
        failed = report.positions_failed,
        "Batch complete"
    );
    println!("{}", text_path.display());
    println!("{}", json_path.display());
    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_span_events(FmtSpan::CLOSE)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::from(e.exit_code())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_defaults() {
        let cli = Cli::try_parse_from(["chesstag", "--input", "games.pgn"]).unwrap();
        assert_eq!(cli.output_dir, PathBuf::from("out"));
        assert_eq!(cli.engine_mode, EngineKind::Local);
        assert_eq!(cli.depth, analysis::context::DEFAULT_DEPTH);
        assert_eq!(cli.skip_opening, 0);
        assert!(cli.player.is_none());
    }

    #[test]
    fn cli_accepts_every_flag() {
        let cli = Cli::try_parse_from([
            "chesstag",
            "--input",
            "g.pgn",
            "--output-dir",
            "reports",
            "--engine-mode",
            "remote",
            "--engine",
            "http://localhost:9000",
            "--depth",
            "10",
            "--multipv",
            "2",
            "--skip-opening",
            "6",
            "--workers",
            "3",
            "--player",
            "Alice",
        ])
        .unwrap();
        assert_eq!(cli.engine_mode, EngineKind::Remote);
        assert_eq!(cli.engine.as_deref(), Some("http://localhost:9000"));
        assert_eq!(cli.depth, 10);
        assert_eq!(cli.multipv, 2);
        assert_eq!(cli.skip_opening, 6);
        assert_eq!(cli.workers, Some(3));
    }

    #[test]
    fn missing_input_exits_with_two() {
        let tempdir = tempfile::tempdir().expect("failed to create temp dir");
        let err = read_games(&tempdir.path().join("absent.pgn")).unwrap_err();
        assert!(matches!(err, CliError::InputMissing(_)));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn missing_engine_binary_exits_with_two() {
        let tempdir = tempfile::tempdir().expect("failed to create temp dir");
        let bogus = tempdir.path().join("no-such-engine");
        let err =
            resolve_engine_mode(EngineKind::Local, Some(bogus.to_str().unwrap())).unwrap_err();
        assert!(matches!(err, CliError::EngineMissing(_)));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn remote_mode_uses_the_given_url() {
        let mode = resolve_engine_mode(EngineKind::Remote, Some("http://engine:8080")).unwrap();
        match mode {
            EngineMode::Remote(config) => assert_eq!(config.base_url, "http://engine:8080"),
            EngineMode::Local(_) => panic!("expected remote mode"),
        }
    }

    #[test]
    fn reads_games_from_disk() {
        let tempdir = tempfile::tempdir().expect("failed to create temp dir");
        let path = tempdir.path().join("games.pgn");
        std::fs::write(&path, "[White \"A\"]\n[Black \"B\"]\n\n1. e4 e5 *\n").unwrap();
        let games = read_games(&path).unwrap();
        assert_eq!(games.len(), 1);
        assert_eq!(games[0].moves.len(), 2);
    }
}
