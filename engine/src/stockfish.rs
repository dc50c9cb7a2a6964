use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use chess::format_fen;
use cozy_chess::Board;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Child;
use tokio::sync::mpsc;

use crate::uci::{parse_uci_message, UciMessage};
use crate::{
    CandidateAnalysis, CandidateCollector, EngineAdapter, EngineCommand, EngineError,
    EngineEvent, GoParams, ScorePerspective,
};

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);
const STOP_GRACE: Duration = Duration::from_secs(1);

/// Configuration of a local UCI engine process.
#[derive(Debug, Clone)]
pub struct LocalEngineConfig {
    /// Engine binary. `None` searches the common install locations.
    pub path: Option<PathBuf>,
    pub threads: Option<u32>,
    pub hash_mb: Option<u32>,
    /// Upper bound for a single search.
    pub timeout: Duration,
}

impl Default for LocalEngineConfig {
    fn default() -> Self {
        Self {
            path: None,
            threads: None,
            hash_mb: None,
            timeout: Duration::from_secs(30),
        }
    }
}

/// A UCI engine subprocess. The process is killed when the value is dropped.
pub struct StockfishEngine {
    process: Child,
    command_tx: mpsc::Sender<EngineCommand>,
    event_rx: mpsc::Receiver<EngineEvent>,
    name: String,
    timeout: Duration,
    closed: bool,
}

fn command_line(cmd: &EngineCommand) -> String {
    match cmd {
        EngineCommand::SetPosition { fen, moves } => {
            let mut line = format!("position fen {}", fen);
            if !moves.is_empty() {
                line.push_str(" moves ");
                line.push_str(&moves.join(" "));
            }
            line
        }
        EngineCommand::SetOption { name, value } => match value {
            Some(value) => format!("setoption name {} value {}", name, value),
            None => format!("setoption name {}", name),
        },
        EngineCommand::Uci => "uci".to_string(),
        EngineCommand::NewGame => "ucinewgame".to_string(),
        EngineCommand::IsReady => "isready".to_string(),
        EngineCommand::Go(params) => {
            let mut line = "go".to_string();
            if let Some(depth) = params.depth {
                line.push_str(&format!(" depth {}", depth));
            } else if let Some(movetime) = params.movetime {
                line.push_str(&format!(" movetime {}", movetime));
            } else if params.infinite {
                line.push_str(" infinite");
            } else {
                line.push_str(" movetime 1000");
            }
            line
        }
        EngineCommand::Stop => "stop".to_string(),
        EngineCommand::Quit => "quit".to_string(),
    }
}

fn event_for(line: &str) -> Option<EngineEvent> {
    match parse_uci_message(line) {
        Ok(UciMessage::UciOk) | Ok(UciMessage::ReadyOk) => Some(EngineEvent::Ready),
        Ok(UciMessage::Id { name, value }) => Some(EngineEvent::Id { name, value }),
        Ok(UciMessage::BestMove { mv, .. }) => Some(EngineEvent::BestMove(mv)),
        Ok(UciMessage::Info(info)) => Some(EngineEvent::Info(info)),
        Err(_) if line.starts_with("info") => Some(EngineEvent::Malformed(line.to_string())),
        Err(_) => {
            tracing::trace!("Ignoring engine output: {}", line);
            None
        }
    }
}

impl StockfishEngine {
    /// Spawn the engine and complete the UCI handshake.
    #[tracing::instrument(level = "info", skip(config), fields(path = ?config.path))]
    pub async fn spawn(config: LocalEngineConfig) -> Result<Self, EngineError> {
        let path = match config.path.clone() {
            Some(path) => path,
            None => find_stockfish_path()
                .ok_or_else(|| EngineError::Unavailable("stockfish not found".into()))?,
        };
        tracing::info!("Starting engine at {:?}", path);

        let mut process = tokio::process::Command::new(&path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    EngineError::Unavailable(format!("{}: {}", path.display(), e))
                } else {
                    tracing::error!("Failed to spawn engine: {}", e);
                    EngineError::Spawn(e)
                }
            })?;

        let mut stdin = process
            .stdin
            .take()
            .ok_or_else(|| EngineError::Transport("engine stdin unavailable".into()))?;
        let stdout = process
            .stdout
            .take()
            .ok_or_else(|| EngineError::Transport("engine stdout unavailable".into()))?;

        let (command_tx, mut command_rx) = mpsc::channel::<EngineCommand>(32);
        let (event_tx, mut event_rx) = mpsc::channel::<EngineEvent>(256);

        // Output reader: one event per meaningful line.
        tokio::spawn(async move {
            let mut reader = BufReader::new(stdout);
            let mut line = String::new();
            loop {
                line.clear();
                match reader.read_line(&mut line).await {
                    Ok(0) => {
                        tracing::debug!("Engine stdout closed");
                        break;
                    }
                    Ok(_) => {
                        let trimmed = line.trim();
                        tracing::trace!("UCI << {}", trimmed);
                        if let Some(event) = event_for(trimmed) {
                            if event_tx.send(event).await.is_err() {
                                break;
                            }
                        }
                    }
                    Err(e) => {
                        tracing::error!("Error reading engine output: {}", e);
                        break;
                    }
                }
            }
        });

        // Command writer: serializes commands onto stdin.
        tokio::spawn(async move {
            while let Some(cmd) = command_rx.recv().await {
                let line = command_line(&cmd);
                tracing::trace!("UCI >> {}", line);
                let written = async {
                    stdin.write_all(line.as_bytes()).await?;
                    stdin.write_all(b"\n").await?;
                    stdin.flush().await
                }
                .await;
                if let Err(e) = written {
                    tracing::error!("Failed to write to engine stdin: {}", e);
                    break;
                }
                if matches!(cmd, EngineCommand::Quit) {
                    break;
                }
            }
        });

        command_tx
            .send(EngineCommand::Uci)
            .await
            .map_err(|_| EngineError::Closed)?;

        let name = tokio::time::timeout(HANDSHAKE_TIMEOUT, async {
            let mut name = String::from("stockfish");
            while let Some(event) = event_rx.recv().await {
                match event {
                    EngineEvent::Id { name: key, value } if key == "name" => name = value,
                    EngineEvent::Ready => return Ok(name),
                    _ => {}
                }
            }
            Err(EngineError::Closed)
        })
        .await
        .map_err(|_| EngineError::Timeout(HANDSHAKE_TIMEOUT))??;

        let mut engine = Self {
            process,
            command_tx,
            event_rx,
            name,
            timeout: config.timeout,
            closed: false,
        };

        if let Some(threads) = config.threads {
            engine.set_option("Threads", threads.clamp(1, 16)).await?;
        }
        if let Some(hash_mb) = config.hash_mb {
            engine.set_option("Hash", hash_mb.clamp(1, 2048)).await?;
        }
        engine.send(EngineCommand::NewGame).await?;
        engine.sync().await?;

        tracing::info!("Engine {} ready", engine.name);
        Ok(engine)
    }

    async fn send(&self, cmd: EngineCommand) -> Result<(), EngineError> {
        self.command_tx.send(cmd).await.map_err(|_| EngineError::Closed)
    }

    async fn set_option(&self, name: &str, value: impl ToString) -> Result<(), EngineError> {
        tracing::debug!("Setting engine option {}", name);
        self.send(EngineCommand::SetOption {
            name: name.to_string(),
            value: Some(value.to_string()),
        })
        .await
    }

    /// `isready` round trip; discards any output left over from earlier searches.
    async fn sync(&mut self) -> Result<(), EngineError> {
        self.send(EngineCommand::IsReady).await?;
        let waited = tokio::time::timeout(HANDSHAKE_TIMEOUT, async {
            while let Some(event) = self.event_rx.recv().await {
                if matches!(event, EngineEvent::Ready) {
                    return Ok(());
                }
            }
            Err(EngineError::Closed)
        })
        .await;
        waited.map_err(|_| EngineError::Timeout(HANDSHAKE_TIMEOUT))?
    }

    async fn abort_search(&mut self) {
        let _ = self.send(EngineCommand::Stop).await;
        let _ = tokio::time::timeout(STOP_GRACE, async {
            while let Some(event) = self.event_rx.recv().await {
                if matches!(event, EngineEvent::BestMove(_)) {
                    break;
                }
            }
        })
        .await;
    }
}

#[async_trait]
impl EngineAdapter for StockfishEngine {
    #[tracing::instrument(level = "debug", skip(self, board))]
    async fn analyse_candidates(
        &mut self,
        board: &Board,
        depth: u8,
        multipv: u8,
    ) -> Result<CandidateAnalysis, EngineError> {
        if self.closed {
            return Err(EngineError::Closed);
        }
        self.set_option("MultiPV", multipv.max(1)).await?;
        self.send(EngineCommand::SetPosition {
            fen: format_fen(board),
            moves: Vec::new(),
        })
        .await?;
        self.sync().await?;
        self.send(EngineCommand::Go(GoParams {
            depth: Some(depth),
            ..Default::default()
        }))
        .await?;

        let mut collector = CandidateCollector::new(board, ScorePerspective::SideToMove);
        collector.set_engine_name(self.name.clone());

        let timeout = self.timeout;
        let searched = tokio::time::timeout(timeout, async {
            while let Some(event) = self.event_rx.recv().await {
                match event {
                    EngineEvent::Info(info) => collector.push_info(info),
                    EngineEvent::Malformed(line) => collector.note_malformed(&line),
                    EngineEvent::BestMove(_) => return Ok(()),
                    _ => {}
                }
            }
            Err(EngineError::Closed)
        })
        .await;

        match searched {
            Ok(Ok(())) => collector.finish(depth, multipv),
            Ok(Err(e)) => {
                tracing::error!("Engine {} went away during search", self.name);
                Err(e)
            }
            Err(_) => {
                tracing::error!("Engine {} timed out after {:?}", self.name, timeout);
                self.abort_search().await;
                Err(EngineError::Timeout(timeout))
            }
        }
    }

    async fn shutdown(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        let _ = self.send(EngineCommand::Quit).await;
        let _ = tokio::time::timeout(STOP_GRACE, self.process.wait()).await;
        let _ = self.process.kill().await;
        tracing::debug!("Engine {} shut down", self.name);
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Find Stockfish executable in common locations
pub fn find_stockfish_path() -> Option<PathBuf> {
    let paths = [
        "/usr/local/bin/stockfish",
        "/usr/bin/stockfish",
        "/opt/homebrew/bin/stockfish",
        "/usr/games/stockfish",
        "stockfish", // In PATH
    ];

    for path_str in paths {
        let path = Path::new(path_str);
        if path.exists() || path_str == "stockfish" {
            // Try to verify it's actually runnable
            if std::process::Command::new(path_str)
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .arg("quit")
                .status()
                .is_ok()
            {
                return Some(PathBuf::from(path_str));
            }
        }
    }

    None
}
