use super::normalize::NormalizeError;
use super::parse::ExtractError;
use flowguess_core::ValidationError;
use std::time::Duration;
use thiserror::Error;

/// Why a synthesis request produced no flow.
#[derive(Debug, Error)]
pub enum SynthesisCause {
    #[error("Completion request failed: {0:#}")]
    Upstream(#[source] anyhow::Error),

    #[error("Could not parse the example selection: {0}")]
    ExamplesParse(#[source] serde_json::Error),

    #[error(transparent)]
    MalformedPayload(#[from] ExtractError),

    #[error("Model output has no trigger")]
    MissingTrigger,

    #[error(transparent)]
    UnsupportedNodeType(#[from] NormalizeError),

    #[error("Synthesized flow is invalid: {0}")]
    InvalidFlow(#[from] ValidationError),

    #[error("Synthesis was cancelled")]
    Cancelled,

    #[error("Synthesis timed out after {0:?}")]
    Timeout(Duration),
}

/// The single error surfaced to callers of the synthesizer.
#[derive(Debug, Error)]
#[error("Flow synthesis failed: {cause}")]
pub struct SynthesisFailed {
    #[source]
    cause: SynthesisCause,
}

impl SynthesisFailed {
    pub fn cause(&self) -> &SynthesisCause {
        &self.cause
    }

    pub fn into_cause(self) -> SynthesisCause {
        self.cause
    }
}

impl From<SynthesisCause> for SynthesisFailed {
    fn from(cause: SynthesisCause) -> Self {
        Self { cause }
    }
}
