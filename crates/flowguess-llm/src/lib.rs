mod client;
pub mod synthesizer;
mod types;

use std::future::Future;

pub use client::{LlmClient, LlmConfig, complete};
pub use synthesizer::{
    SynthesisCause, SynthesisFailed, SynthesisOptions, SynthesisResult, synthesize_flow,
    synthesize_flow_with_backend,
};
pub use types::*;

/// A chat-completion service. `LlmClient` talks HTTP; tests plug in mocks.
pub trait ChatBackend: Send + Sync {
    fn model_name(&self) -> &str;

    fn chat(
        &self,
        messages: Vec<Message>,
    ) -> impl Future<Output = anyhow::Result<ChatResponse>> + Send;
}
