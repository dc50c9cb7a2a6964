//! Engine Adapter: the capability the tagger needs from a chess engine.
//!
//! Two calls make up the whole contract ([`EngineAdapter::analyse_candidates`] and
//! [`EngineAdapter::eval_after_move`]). Every binding reports scores from the
//! perspective of the side that moves in the position it was given, so nothing
//! downstream re-derives signs from FEN fields.

pub mod adapter;
pub mod candidates;
pub mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod remote;
pub mod score;
pub mod stockfish;
pub mod uci;

pub use adapter::{open_engine, EngineAdapter, EngineMode};
pub use candidates::{
    Candidate, CandidateAnalysis, CandidateCollector, MoveKind, ScorePerspective,
};
pub use error::EngineError;
#[cfg(any(test, feature = "mock"))]
pub use mock::MockEngine;
pub use remote::{RemoteEngine, RemoteEngineConfig};
pub use score::{AnalysisMeta, Score, MATE_SCORE_CP};
pub use stockfish::{find_stockfish_path, LocalEngineConfig, StockfishEngine};
pub use uci::{UciError, UciMessage};

use cozy_chess::Move;

/// Commands sent to the engine process
#[derive(Debug, Clone)]
pub enum EngineCommand {
    Uci,
    SetPosition { fen: String, moves: Vec<String> },
    SetOption { name: String, value: Option<String> },
    NewGame,
    IsReady,
    Go(GoParams),
    Stop,
    Quit,
}

/// Parameters for the "go" command
#[derive(Debug, Clone, Default)]
pub struct GoParams {
    pub movetime: Option<u64>, // Move time in milliseconds
    pub depth: Option<u8>,     // Search depth
    pub infinite: bool,        // Search until "stop"
}

/// Events received from the engine process
#[derive(Debug, Clone)]
pub enum EngineEvent {
    Ready,
    Id { name: String, value: String },
    /// `None` when the engine answers `bestmove (none)` (no legal moves).
    BestMove(Option<Move>),
    Info(EngineInfo),
    /// An `info` line that could not be parsed; kept so callers can count it.
    Malformed(String),
}

/// Engine analysis information from one `info` line
#[derive(Debug, Clone, Default)]
pub struct EngineInfo {
    pub depth: Option<u8>,
    pub seldepth: Option<u8>,
    pub time_ms: Option<u64>,
    pub nodes: Option<u64>,
    pub score: Option<Score>,
    pub pv: Vec<Move>, // Principal variation, raw UCI notation
    pub multipv: Option<u8>,
    pub currmove: Option<Move>,
    pub hashfull: Option<u16>,
    pub nps: Option<u64>,
}
