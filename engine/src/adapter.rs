use async_trait::async_trait;
use cozy_chess::{Board, GameStatus, Move};

use crate::remote::{RemoteEngine, RemoteEngineConfig};
use crate::stockfish::{LocalEngineConfig, StockfishEngine};
use crate::{CandidateAnalysis, EngineError, Score, MATE_SCORE_CP};

/// What the tagger needs from a chess engine.
///
/// Implementations own their transport (a subprocess, an HTTP client) and must release
/// it in [`EngineAdapter::shutdown`] as well as on drop.
#[async_trait]
pub trait EngineAdapter: Send {
    /// Up to `multipv` candidates for the side to move, best first.
    async fn analyse_candidates(
        &mut self,
        board: &Board,
        depth: u8,
        multipv: u8,
    ) -> Result<CandidateAnalysis, EngineError>;

    /// Evaluation after `mv` is played, from the perspective of the side that played it.
    ///
    /// Terminal positions are scored without asking the engine: mate is
    /// `MATE_SCORE_CP`, stalemate and other draws are 0.
    async fn eval_after_move(
        &mut self,
        board: &Board,
        mv: Move,
        depth: u8,
    ) -> Result<Score, EngineError> {
        let mut after = board.clone();
        after
            .try_play(mv)
            .map_err(|_| EngineError::Protocol(format!("move {} is not legal here", mv)))?;

        match after.status() {
            GameStatus::Won => return Ok(Score::Centipawns(MATE_SCORE_CP)),
            GameStatus::Drawn => return Ok(Score::Centipawns(0)),
            GameStatus::Ongoing => {}
        }

        let analysis = self.analyse_candidates(&after, depth, 1).await?;
        let reply = analysis
            .best()
            .map(|c| c.score)
            .ok_or_else(|| EngineError::Protocol("empty analysis after move".into()))?;
        // The engine scored the reply for the opponent.
        Ok(reply.negate())
    }

    /// Release the engine session. Calling it twice is harmless.
    async fn shutdown(&mut self);

    fn name(&self) -> &str;
}

/// Which binding to open.
#[derive(Debug, Clone)]
pub enum EngineMode {
    Local(LocalEngineConfig),
    Remote(RemoteEngineConfig),
}

impl EngineMode {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Local(_) => "local",
            Self::Remote(_) => "remote",
        }
    }
}

/// Open a fresh engine session for `mode`.
pub async fn open_engine(mode: &EngineMode) -> Result<Box<dyn EngineAdapter>, EngineError> {
    match mode {
        EngineMode::Local(config) => Ok(Box::new(StockfishEngine::spawn(config.clone()).await?)),
        EngineMode::Remote(config) => Ok(Box::new(RemoteEngine::new(config.clone())?)),
    }
}
