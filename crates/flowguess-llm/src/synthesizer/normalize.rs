use super::candidate::CandidateStep;
use flowguess_core::naming::{ChildRole, Sequence, root_sequence, sequence_value, step_name};
use flowguess_core::{
    Action, ActionKind, BranchSettings, Catalog, CodeSettings, DEFAULT_PIECE_VERSION,
    EmptySettings, PieceActionSettings, PieceTriggerSettings, ScheduleSettings, TRIGGER_NAME,
    Trigger, TriggerKind, UNTITLED_STEP, UNTITLED_TRIGGER, humanize_operation,
};
use serde_json::Map;
use thiserror::Error;
use tracing::warn;

/// What to do with an action whose type is not PIECE, CODE or BRANCH.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnknownStepPolicy {
    /// Fail the whole normalization.
    #[default]
    Reject,
    /// Substitute the no-op code step, like any other unresolvable step.
    Fallback,
}

#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("Unsupported action type {step_type:?} for {name}")]
    UnsupportedNodeType {
        step_type: Option<String>,
        name: String,
    },
}

enum TriggerClass {
    Piece,
    Schedule,
    Webhook,
    Unknown,
}

enum ActionClass {
    Piece,
    Code,
    Branch,
}

fn classify_trigger(step_type: Option<&str>) -> TriggerClass {
    match step_type.map(|t| t.trim().to_ascii_uppercase()).as_deref() {
        Some("PIECE" | "PIECE_TRIGGER") => TriggerClass::Piece,
        Some("SCHEDULE") => TriggerClass::Schedule,
        Some("WEBHOOK") => TriggerClass::Webhook,
        _ => TriggerClass::Unknown,
    }
}

fn classify_action(step_type: Option<&str>) -> Option<ActionClass> {
    match step_type.map(|t| t.trim().to_ascii_uppercase()).as_deref() {
        Some("PIECE" | "PIECE_ACTION") => Some(ActionClass::Piece),
        Some("CODE") => Some(ActionClass::Code),
        Some("BRANCH") => Some(ActionClass::Branch),
        _ => None,
    }
}

fn webhook() -> TriggerKind {
    TriggerKind::Webhook {
        settings: EmptySettings::default(),
    }
}

fn code_fallback() -> ActionKind {
    ActionKind::Code {
        settings: CodeSettings::noop(),
    }
}

/// Turns a candidate step tree into a flow graph.
///
/// Every node gets its name from its position (see
/// [`flowguess_core::naming`]), every missing field a default, and every step
/// naming an integration or operation the catalog doesn't know becomes the
/// no-op code step. Each such substitution is recorded as a warning.
pub struct FlowNormalizer<'a, C: Catalog + ?Sized> {
    catalog: &'a C,
    policy: UnknownStepPolicy,
    warnings: Vec<String>,
}

impl<'a, C: Catalog + ?Sized> FlowNormalizer<'a, C> {
    pub fn new(catalog: &'a C) -> Self {
        Self {
            catalog,
            policy: UnknownStepPolicy::default(),
            warnings: Vec::new(),
        }
    }

    pub fn with_policy(mut self, policy: UnknownStepPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn into_warnings(self) -> Vec<String> {
        self.warnings
    }

    fn note(&mut self, message: String) {
        warn!("{}", message);
        self.warnings.push(message);
    }

    pub fn normalize_trigger(&mut self, step: &CandidateStep) -> Result<Trigger, NormalizeError> {
        let next_action =
            self.normalize_child(step.next_action.as_deref(), &root_sequence(), ChildRole::Next)?;

        let kind = match classify_trigger(step.step_type.as_deref()) {
            TriggerClass::Piece => self.resolve_piece_trigger(step),
            TriggerClass::Schedule => TriggerKind::Schedule {
                settings: ScheduleSettings {
                    cron_expression: step.settings.cron_expression.clone(),
                },
            },
            TriggerClass::Webhook => webhook(),
            TriggerClass::Unknown => {
                self.note(format!(
                    "Trigger type {:?} not recognised, using a webhook trigger",
                    step.step_type
                ));
                webhook()
            }
        };

        Ok(Trigger {
            name: TRIGGER_NAME.to_string(),
            display_name: step
                .display_name
                .clone()
                .unwrap_or_else(|| UNTITLED_TRIGGER.to_string()),
            valid: false,
            kind,
            next_action,
        })
    }

    fn resolve_piece_trigger(&mut self, step: &CandidateStep) -> TriggerKind {
        let catalog = self.catalog;
        let piece_name = step.settings.piece_name.as_deref();
        match piece_name.and_then(|name| catalog.find_integration(name)) {
            Some(integration) => TriggerKind::Piece {
                settings: PieceTriggerSettings {
                    piece_name: integration.id.clone(),
                    trigger_name: step.settings.trigger_name.clone(),
                    piece_version: DEFAULT_PIECE_VERSION.to_string(),
                    input: Map::new(),
                },
            },
            None => {
                self.note(format!(
                    "Trigger integration {:?} not in catalog, using a webhook trigger",
                    piece_name
                ));
                webhook()
            }
        }
    }

    /// Normalize the child of the node at `parent` in position `role`.
    /// An absent child stays absent.
    fn normalize_child(
        &mut self,
        step: Option<&CandidateStep>,
        parent: &Sequence,
        role: ChildRole,
    ) -> Result<Option<Box<Action>>, NormalizeError> {
        let Some(step) = step else {
            return Ok(None);
        };
        self.normalize_action(step, &sequence_value(parent, role))
            .map(|action| Some(Box::new(action)))
    }

    fn normalize_action(
        &mut self,
        step: &CandidateStep,
        sequence: &Sequence,
    ) -> Result<Action, NormalizeError> {
        let name = step_name(sequence);
        let next_action =
            self.normalize_child(step.next_action.as_deref(), sequence, ChildRole::Next)?;
        let untitled = || {
            step.display_name
                .clone()
                .unwrap_or_else(|| UNTITLED_STEP.to_string())
        };

        let (kind, display_name) = match classify_action(step.step_type.as_deref()) {
            Some(ActionClass::Piece) => match self.resolve_piece_action(&name, step) {
                Some(settings) => {
                    let display_name = step
                        .display_name
                        .clone()
                        .unwrap_or_else(|| humanize_operation(&settings.action_name));
                    (ActionKind::Piece { settings }, display_name)
                }
                None => (code_fallback(), untitled()),
            },
            Some(ActionClass::Code) => {
                self.note(format!("{}: code step replaced with a no-op", name));
                (code_fallback(), untitled())
            }
            Some(ActionClass::Branch) => {
                let on_failure_action = self.normalize_child(
                    step.on_failure_action.as_deref(),
                    sequence,
                    ChildRole::FailureArm,
                )?;
                let on_success_action = self.normalize_child(
                    step.on_success_action.as_deref(),
                    sequence,
                    ChildRole::SuccessArm,
                )?;
                (
                    ActionKind::Branch {
                        settings: BranchSettings::placeholder(),
                        on_success_action,
                        on_failure_action,
                    },
                    untitled(),
                )
            }
            None => match self.policy {
                UnknownStepPolicy::Reject => {
                    return Err(NormalizeError::UnsupportedNodeType {
                        step_type: step.step_type.clone(),
                        name,
                    });
                }
                UnknownStepPolicy::Fallback => {
                    self.note(format!(
                        "{}: unsupported step type {:?} replaced with a no-op",
                        name, step.step_type
                    ));
                    (code_fallback(), untitled())
                }
            },
        };

        Ok(Action {
            name,
            display_name,
            valid: false,
            kind,
            next_action,
        })
    }

    /// Resolve a piece step against the catalog. `None` (with a warning) when
    /// the integration or its operation is unknown.
    fn resolve_piece_action(
        &mut self,
        name: &str,
        step: &CandidateStep,
    ) -> Option<PieceActionSettings> {
        let catalog = self.catalog;
        let piece_name = step.settings.piece_name.as_deref();
        let Some(integration) = piece_name.and_then(|p| catalog.find_integration(p)) else {
            self.note(format!(
                "{}: integration {:?} not in catalog, replaced with a no-op",
                name, piece_name
            ));
            return None;
        };

        let action_name = step.settings.action_name.as_deref();
        let Some(descriptor) = action_name.and_then(|a| catalog.find_action(integration, a)) else {
            self.note(format!(
                "{}: {} has no operation {:?}, replaced with a no-op",
                name, integration.id, action_name
            ));
            return None;
        };

        Some(PieceActionSettings {
            piece_name: descriptor.integration_id,
            action_name: descriptor.action_id,
            piece_version: DEFAULT_PIECE_VERSION.to_string(),
            input: Map::new(),
        })
    }
}
