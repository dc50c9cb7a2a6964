//! Remote engine over HTTP: the service answers a JSON analysis request with a body of
//! UCI-style `info ...` lines, streamed as the search deepens.

use std::time::Duration;

use async_trait::async_trait;
use chess::format_fen;
use cozy_chess::Board;
use futures::StreamExt;
use serde::Serialize;

use crate::{
    CandidateAnalysis, CandidateCollector, EngineAdapter, EngineError, ScorePerspective,
};

#[derive(Debug, Clone)]
pub struct RemoteEngineConfig {
    /// Service root; requests go to `{base_url}/analyse`.
    pub base_url: String,
    pub timeout: Duration,
    /// Sign convention of the scores the service streams.
    pub perspective: ScorePerspective,
}

impl RemoteEngineConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(30),
            perspective: ScorePerspective::SideToMove,
        }
    }
}

#[derive(Debug, Serialize)]
struct AnalyseRequest<'a> {
    fen: &'a str,
    depth: u8,
    multipv: u8,
}

pub struct RemoteEngine {
    client: reqwest::Client,
    endpoint: String,
    config: RemoteEngineConfig,
}

impl RemoteEngine {
    pub fn new(config: RemoteEngineConfig) -> Result<Self, EngineError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| EngineError::Transport(e.to_string()))?;
        let endpoint = format!("{}/analyse", config.base_url.trim_end_matches('/'));
        Ok(Self {
            client,
            endpoint,
            config,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// Splits a chunked byte stream into lines; chunks may end mid-line.
#[derive(Debug, Default)]
struct LineBuffer {
    pending: String,
}

impl LineBuffer {
    fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.push_str(&String::from_utf8_lossy(chunk));
        let mut lines = Vec::new();
        while let Some(pos) = self.pending.find('\n') {
            let line: String = self.pending.drain(..=pos).collect();
            lines.push(line.trim_end().to_string());
        }
        lines
    }

    fn finish(self) -> Option<String> {
        let rest = self.pending.trim();
        (!rest.is_empty()).then(|| rest.to_string())
    }
}

#[async_trait]
impl EngineAdapter for RemoteEngine {
    #[tracing::instrument(level = "debug", skip(self, board))]
    async fn analyse_candidates(
        &mut self,
        board: &Board,
        depth: u8,
        multipv: u8,
    ) -> Result<CandidateAnalysis, EngineError> {
        let fen = format_fen(board);
        let request = AnalyseRequest {
            fen: &fen,
            depth,
            multipv: multipv.max(1),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Engine service returned {}: {}", status, body);
            return Err(EngineError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let mut collector = CandidateCollector::new(board, self.config.perspective);
        collector.set_engine_name(self.endpoint.clone());

        let mut buffer = LineBuffer::default();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| self.classify(e))?;
            for line in buffer.push(&chunk) {
                tracing::trace!("remote << {}", line);
                collector.push_line(&line);
            }
        }
        if let Some(line) = buffer.finish() {
            collector.push_line(&line);
        }

        collector.finish(depth, multipv)
    }

    async fn shutdown(&mut self) {
        // Connections are pooled by the client and closed when it is dropped.
        tracing::debug!("Remote engine {} released", self.endpoint);
    }

    fn name(&self) -> &str {
        &self.endpoint
    }
}

impl RemoteEngine {
    fn classify(&self, err: reqwest::Error) -> EngineError {
        match EngineError::from(err) {
            EngineError::Timeout(_) => EngineError::Timeout(self.config.timeout),
            other => other,
        }
    }
}
