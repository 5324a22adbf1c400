use super::error::SynthesisCause;
use super::parse::strip_code_fence;
use super::prompt::{PromptTemplates, render_template};
use crate::{ChatBackend, complete};
use flowguess_core::{Catalog, Integration};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

/// One integration the model picked as relevant, with the triggers and
/// actions it wants shown as examples.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ExamplePick {
    #[serde(alias = "pieceName", alias = "piece")]
    pub integration: String,
    #[serde(default)]
    pub triggers: Option<Vec<String>>,
    #[serde(default)]
    pub actions: Option<Vec<String>>,
}

/// One JSON line per integration, in catalog order.
pub(crate) fn catalog_summary<C: Catalog + ?Sized>(catalog: &C) -> String {
    catalog
        .integrations()
        .iter()
        .map(summary_line)
        .collect::<Vec<_>>()
        .join("\n")
}

fn summary_line(integration: &Integration) -> String {
    json!({
        "pieceName": integration.id,
        "triggers": integration.trigger_ids,
        "actions": integration.action_ids,
    })
    .to_string()
}

/// Parse the model's pick list. Strict: a fenced block is unwrapped but the
/// JSON itself is not repaired.
pub(crate) fn parse_picks(response: &str) -> Result<Vec<ExamplePick>, serde_json::Error> {
    serde_json::from_str(strip_code_fence(response))
}

/// Render the picks as example flows, preserving pick order and listing each
/// pick's triggers before its actions.
pub(crate) fn render_examples(picks: &[ExamplePick]) -> String {
    let mut lines = Vec::new();
    for pick in picks {
        let piece = &pick.integration;
        for trigger in pick.triggers.iter().flatten() {
            lines.push(format!("Example: Flow triggered by {} {}", piece, trigger));
            lines.push(
                json!({
                    "trigger": {
                        "type": "PIECE_TRIGGER",
                        "settings": {"pieceName": piece, "triggerName": trigger},
                        "displayName": "Every 5 Min",
                    }
                })
                .to_string(),
            );
        }
        for action in pick.actions.iter().flatten() {
            lines.push(format!("Example: every 5 minutes run {} {}", piece, action));
            lines.push(
                json!({
                    "trigger": {
                        "type": "SCHEDULE",
                        "settings": {"cronExpression": "0/5 * * * *"},
                        "displayName": "Every 5 Min",
                        "nextAction": {
                            "type": "PIECE",
                            "settings": {"pieceName": piece, "actionName": action},
                        },
                    }
                })
                .to_string(),
            );
        }
    }
    lines.join("\n")
}

/// Ask the model which catalog entries matter for `question` and render them
/// as few-shot examples for the synthesis prompt.
pub(crate) async fn build_examples<C: Catalog + ?Sized>(
    backend: &impl ChatBackend,
    catalog: &C,
    question: &str,
    templates: &PromptTemplates,
) -> Result<String, SynthesisCause> {
    let prompt = render_template(&templates.find_examples, question, &catalog_summary(catalog));
    debug!("Example selection prompt: {} chars", prompt.len());

    let response = complete(backend, &prompt)
        .await
        .map_err(SynthesisCause::Upstream)?;
    let picks = parse_picks(&response).map_err(SynthesisCause::ExamplesParse)?;
    info!("Examples to provide: {} integrations", picks.len());

    Ok(render_examples(&picks))
}
