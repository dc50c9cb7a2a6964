//! Worker pool that tags positions in parallel.
//!
//! Jobs go through one shared channel; each worker owns its own engine session,
//! opened lazily on the first job and reopened after a transport failure.

use std::sync::Arc;

use analysis::{TagError, TagResult, Tagger};
use engine::{open_engine, EngineAdapter, EngineError, EngineMode};
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Mutex};

use crate::jobs::PositionJob;

/// Opens one engine session per call.
pub type EngineFactory =
    Arc<dyn Fn() -> BoxFuture<'static, Result<Box<dyn EngineAdapter>, EngineError>> + Send + Sync>;

pub fn engine_factory(mode: EngineMode) -> EngineFactory {
    Arc::new(move || {
        let mode = mode.clone();
        async move { open_engine(&mode).await }.boxed()
    })
}

/// Why a position could not be tagged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    IllegalMove,
    EngineTimeout,
    EngineUnavailable,
    Unknown,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IllegalMove => "illegal_move",
            Self::EngineTimeout => "engine_timeout",
            Self::EngineUnavailable => "engine_unavailable",
            Self::Unknown => "unknown",
        }
    }

    /// The engine session should be dropped and reopened for the next job.
    fn needs_new_engine(&self) -> bool {
        matches!(self, Self::EngineTimeout | Self::EngineUnavailable)
    }
}

impl From<&EngineError> for FailureKind {
    fn from(err: &EngineError) -> Self {
        if err.is_timeout() {
            Self::EngineTimeout
        } else if err.is_io() {
            Self::EngineUnavailable
        } else {
            Self::Unknown
        }
    }
}

impl From<&TagError> for FailureKind {
    fn from(err: &TagError) -> Self {
        match err {
            TagError::IllegalMove { .. } => Self::IllegalMove,
            TagError::Engine(e) => e.into(),
            TagError::InvalidPosition(_) | TagError::Stage { .. } => Self::Unknown,
        }
    }
}

/// What happened to one job.
#[derive(Debug)]
pub struct JobOutcome {
    pub game: usize,
    pub ply: u32,
    pub player: String,
    pub result: Result<TagResult, FailureKind>,
}

/// A long-lived worker task. Pulls jobs from the shared channel until it closes.
pub async fn run_tag_worker(
    worker_id: usize,
    job_rx: Arc<Mutex<mpsc::Receiver<PositionJob>>>,
    outcome_tx: mpsc::UnboundedSender<JobOutcome>,
    tagger: Arc<Tagger>,
    factory: EngineFactory,
) {
    tracing::info!(worker_id, "Tag worker started");
    let mut engine: Option<Box<dyn EngineAdapter>> = None;

    loop {
        let job = {
            let mut rx = job_rx.lock().await;
            match rx.recv().await {
                Some(job) => job,
                None => {
                    tracing::debug!(worker_id, "Job channel closed, worker exiting");
                    break;
                }
            }
        };

        let result = tag_job(worker_id, &job, &tagger, &factory, &mut engine).await;
        if let Err(kind) = &result {
            if kind.needs_new_engine() {
                if let Some(mut stale) = engine.take() {
                    stale.shutdown().await;
                }
            }
        }

        let outcome = JobOutcome {
            game: job.game,
            ply: job.ply,
            player: job.player,
            result,
        };
        if outcome_tx.send(outcome).is_err() {
            tracing::warn!(worker_id, "Outcome channel closed, worker exiting");
            break;
        }
    }

    if let Some(mut engine) = engine {
        engine.shutdown().await;
    }
    tracing::info!(worker_id, "Tag worker stopped");
}

async fn tag_job(
    worker_id: usize,
    job: &PositionJob,
    tagger: &Tagger,
    factory: &EngineFactory,
    engine: &mut Option<Box<dyn EngineAdapter>>,
) -> Result<TagResult, FailureKind> {
    let request = tagger
        .request(job.board.clone(), job.played.clone())
        .with_previous_move(job.previous_move);
    // Illegal moves never reach the engine.
    if let Err(e) = request.resolve_move() {
        tracing::warn!(worker_id, game = job.game, ply = job.ply, "Position skipped: {}", e);
        return Err(FailureKind::from(&e));
    }

    if engine.is_none() {
        match factory().await {
            Ok(opened) => *engine = Some(opened),
            Err(e) => {
                tracing::error!(worker_id, "Failed to open engine: {}", e);
                return Err(FailureKind::from(&e));
            }
        }
    }
    let Some(active) = engine.as_mut() else {
        return Err(FailureKind::EngineUnavailable);
    };

    match tagger.tag(active.as_mut(), &request).await {
        Ok(result) => {
            tracing::debug!(worker_id, game = job.game, ply = job.ply, tags = ?result.tags.names(), "Position tagged");
            Ok(result)
        }
        Err(e) => {
            let kind = FailureKind::from(&e);
            tracing::warn!(worker_id, game = job.game, ply = job.ply, kind = kind.as_str(), "Position failed: {}", e);
            Err(kind)
        }
    }
}

/// Tag every job with `workers` concurrent workers. Outcomes come back in input order.
pub async fn run_batch(
    jobs: Vec<PositionJob>,
    workers: usize,
    tagger: Arc<Tagger>,
    factory: EngineFactory,
) -> Vec<JobOutcome> {
    let total = jobs.len();
    let (job_tx, job_rx) = mpsc::channel::<PositionJob>(64);
    let shared_rx = Arc::new(Mutex::new(job_rx));
    let (outcome_tx, mut outcome_rx) = mpsc::unbounded_channel();

    let handles: Vec<_> = (0..workers.max(1))
        .map(|worker_id| {
            tokio::spawn(run_tag_worker(
                worker_id,
                Arc::clone(&shared_rx),
                outcome_tx.clone(),
                Arc::clone(&tagger),
                Arc::clone(&factory),
            ))
        })
        .collect();
    drop(outcome_tx);

    let feeder = tokio::spawn(async move {
        for job in jobs {
            if job_tx.send(job).await.is_err() {
                tracing::error!("All tag workers exited before the queue drained");
                break;
            }
        }
    });

    let mut outcomes = Vec::with_capacity(total);
    while let Some(outcome) = outcome_rx.recv().await {
        outcomes.push(outcome);
        if outcomes.len() % 100 == 0 {
            tracing::info!(done = outcomes.len(), total, "Tagging progress");
        }
    }

    if let Err(e) = feeder.await {
        tracing::error!("Job feeder failed: {}", e);
    }
    for handle in handles {
        if let Err(e) = handle.await {
            tracing::error!("Tag worker panicked: {}", e);
        }
    }

    outcomes.sort_by_key(|o| (o.game, o.ply));
    outcomes
}
