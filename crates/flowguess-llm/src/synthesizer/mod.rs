mod candidate;
mod error;
mod examples;
mod normalize;
mod parse;
mod prompt;
mod repair;


use std::future::Future;
use std::time::Duration;

use crate::{ChatBackend, LlmClient, LlmConfig, complete};
use examples::build_examples;
use flowguess_core::{Catalog, Trigger, validate_flow};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

pub use candidate::{CandidateSettings, CandidateStep};
pub use error::{SynthesisCause, SynthesisFailed};
pub use examples::ExamplePick;
pub use normalize::{FlowNormalizer, NormalizeError, UnknownStepPolicy};
pub use parse::{ExtractError, extract_json};
pub use prompt::{PromptTemplates, render_template};

// ── Public types ────────────────────────────────────────────────

/// Per-request knobs. The default has no deadline, no cancellation and
/// rejects unknown step types.
#[derive(Debug, Clone, Default)]
pub struct SynthesisOptions {
    /// Overall budget for the request, both completion calls included.
    pub timeout: Option<Duration>,
    pub cancel: Option<CancellationToken>,
    pub unknown_step_policy: UnknownStepPolicy,
    pub templates: PromptTemplates,
}

/// A synthesized flow and everything the normalizer had to patch up on the way.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisResult {
    pub flow: Trigger,
    pub warnings: Vec<String>,
}

// ── Public API ──────────────────────────────────────────────────

/// Synthesize a flow for `question` using an OpenAI-compatible endpoint.
pub async fn synthesize_flow<C: Catalog + ?Sized>(
    question: &str,
    config: LlmConfig,
    catalog: &C,
    options: &SynthesisOptions,
) -> Result<SynthesisResult, SynthesisFailed> {
    let client = LlmClient::new(config);
    synthesize_flow_with_backend(&client, catalog, question, options).await
}

/// Synthesize a flow for `question` with any chat backend.
///
/// Two completion calls are made: one to pick relevant catalog entries as
/// examples, one to write the flow. The model's JSON is repaired, normalized
/// against the catalog and validated. Either a valid flow comes back or a
/// single `SynthesisFailed` does.
pub async fn synthesize_flow_with_backend<C: Catalog + ?Sized>(
    backend: &impl ChatBackend,
    catalog: &C,
    question: &str,
    options: &SynthesisOptions,
) -> Result<SynthesisResult, SynthesisFailed> {
    let span = info_span!(
        "synthesize_flow",
        request_id = %Uuid::new_v4(),
        model = backend.model_name(),
    );

    async {
        info!("Synthesizing flow for: {:?}", question);
        match guarded(options, run_pipeline(backend, catalog, question, options)).await {
            Ok(result) => {
                info!(
                    "Synthesized flow with {} steps ({} warnings)",
                    result.flow.actions().len(),
                    result.warnings.len()
                );
                Ok(result)
            }
            Err(cause) => {
                warn!("Flow synthesis failed: {}", cause);
                Err(cause.into())
            }
        }
    }
    .instrument(span)
    .await
}

// ── Internals ───────────────────────────────────────────────────

async fn run_pipeline<C: Catalog + ?Sized>(
    backend: &impl ChatBackend,
    catalog: &C,
    question: &str,
    options: &SynthesisOptions,
) -> Result<SynthesisResult, SynthesisCause> {
    let context = build_examples(backend, catalog, question, &options.templates).await?;
    let prompt = render_template(&options.templates.synthesize, question, &context);

    let response = complete(backend, &prompt)
        .await
        .map_err(SynthesisCause::Upstream)?;
    debug!("Flow response: {}", response);

    let payload = extract_json(&response)?;
    let candidate =
        CandidateStep::trigger_from_payload(&payload).ok_or(SynthesisCause::MissingTrigger)?;

    let mut normalizer =
        FlowNormalizer::new(catalog).with_policy(options.unknown_step_policy);
    let flow = normalizer.normalize_trigger(&candidate)?;
    validate_flow(&flow)?;

    Ok(SynthesisResult {
        flow,
        warnings: normalizer.into_warnings(),
    })
}

/// Race `work` against the request's cancellation token and deadline.
/// Cancellation wins ties, then the deadline.
async fn guarded<T>(
    options: &SynthesisOptions,
    work: impl Future<Output = Result<T, SynthesisCause>>,
) -> Result<T, SynthesisCause> {
    let cancelled = async {
        match &options.cancel {
            Some(token) => token.cancelled().await,
            None => std::future::pending().await,
        }
    };
    let expired = async {
        match options.timeout {
            Some(limit) => {
                tokio::time::sleep(limit).await;
                limit
            }
            None => std::future::pending().await,
        }
    };

    tokio::select! {
        biased;

        () = cancelled => Err(SynthesisCause::Cancelled),
        limit = expired => Err(SynthesisCause::Timeout(limit)),
        result = work => result,
    }
}
