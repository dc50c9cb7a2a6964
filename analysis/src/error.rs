use engine::EngineError;

/// Failures of the tagging core.
#[derive(Debug, thiserror::Error)]
pub enum TagError {
    #[error("invalid position: {0}")]
    InvalidPosition(String),
    #[error("illegal move {notation}: {reason}")]
    IllegalMove { notation: String, reason: String },
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("{stage} stage precondition failed: {reason}")]
    Stage { stage: &'static str, reason: String },
}

impl TagError {
    pub(crate) fn stage(stage: &'static str, reason: impl Into<String>) -> Self {
        Self::Stage {
            stage,
            reason: reason.into(),
        }
    }
}

impl From<chess::FenError> for TagError {
    fn from(err: chess::FenError) -> Self {
        Self::InvalidPosition(err.to_string())
    }
}
