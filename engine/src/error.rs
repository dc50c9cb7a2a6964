use std::time::Duration;

/// Failures of an engine binding.
///
/// Transport problems (process, socket, HTTP status, timeout) are kept apart from
/// protocol problems (the engine answered, but nothing usable could be parsed).
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("engine unavailable: {0}")]
    Unavailable(String),
    #[error("failed to spawn engine: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("engine I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("engine did not answer within {0:?}")]
    Timeout(Duration),
    #[error("engine service returned HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("engine transport error: {0}")]
    Transport(String),
    #[error("engine channel closed")]
    Closed,
    #[error("engine protocol error: {0}")]
    Protocol(String),
}

impl EngineError {
    /// True for connection, process, HTTP-status and timeout failures.
    pub fn is_io(&self) -> bool {
        !self.is_protocol()
    }

    /// True when the engine answered but its analysis could not be used.
    pub fn is_protocol(&self) -> bool {
        matches!(self, Self::Protocol(_))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

impl From<reqwest::Error> for EngineError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            // reqwest does not expose the configured duration on the error.
            Self::Timeout(Duration::ZERO)
        } else if err.is_connect() {
            Self::Unavailable(err.to_string())
        } else if let Some(status) = err.status() {
            Self::Http {
                status: status.as_u16(),
                body: err.to_string(),
            }
        } else {
            Self::Transport(err.to_string())
        }
    }
}
