use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Reserved name of the root node of every flow.
pub const TRIGGER_NAME: &str = "trigger";

/// Version tag pinned on every generated piece step.
pub const DEFAULT_PIECE_VERSION: &str = "0.0.1";

pub const UNTITLED_TRIGGER: &str = "Untitled Trigger";
pub const UNTITLED_STEP: &str = "Untitled Step";

/// Base64-encoded zip of a code unit whose `code` export returns `true`
/// without doing anything. Used wherever a step cannot be resolved.
pub const NOOP_CODE_ARTIFACT: &str = include_str!("../assets/noop-artifact.zip.b64");

/// Root of a generated flow graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trigger {
    pub name: String,
    pub display_name: String,
    pub valid: bool,
    #[serde(flatten)]
    pub kind: TriggerKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_action: Option<Box<Action>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TriggerKind {
    #[serde(rename = "PIECE_TRIGGER")]
    Piece { settings: PieceTriggerSettings },
    Schedule { settings: ScheduleSettings },
    Webhook { settings: EmptySettings },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PieceTriggerSettings {
    pub piece_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_name: Option<String>,
    pub piece_version: String,
    #[serde(default)]
    pub input: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleSettings {
    /// Copied from the model output as-is; cron syntax is not checked here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cron_expression: Option<String>,
}

/// Serializes as `{}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmptySettings {}

/// A non-root step of a flow graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    pub name: String,
    pub display_name: String,
    pub valid: bool,
    #[serde(flatten)]
    pub kind: ActionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_action: Option<Box<Action>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum ActionKind {
    Piece {
        settings: PieceActionSettings,
    },
    Code {
        settings: CodeSettings,
    },
    Branch {
        settings: BranchSettings,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        on_success_action: Option<Box<Action>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        on_failure_action: Option<Box<Action>>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PieceActionSettings {
    pub piece_name: String,
    pub action_name: String,
    pub piece_version: String,
    #[serde(default)]
    pub input: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeSettings {
    pub artifact: String,
    #[serde(default)]
    pub input: Map<String, Value>,
}

impl CodeSettings {
    /// Settings for the inert fallback step.
    pub fn noop() -> Self {
        Self {
            artifact: NOOP_CODE_ARTIFACT.trim().to_string(),
            input: Map::new(),
        }
    }

    pub fn is_noop(&self) -> bool {
        self.artifact == NOOP_CODE_ARTIFACT.trim() && self.input.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchSettings {
    pub conditions: Vec<Vec<BranchCondition>>,
}

impl BranchSettings {
    /// A single condition group with empty operands.
    pub fn placeholder() -> Self {
        Self {
            conditions: vec![vec![BranchCondition::default()]],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchCondition {
    pub first_value: String,
    pub second_value: String,
}

impl Trigger {
    /// All actions in the tree, depth-first: next chain first, then the
    /// failure arm, then the success arm of each branch.
    pub fn actions(&self) -> Vec<&Action> {
        let mut out = Vec::new();
        let mut stack: Vec<&Action> = self.next_action.iter().map(|a| a.as_ref()).collect();
        while let Some(action) = stack.pop() {
            out.push(action);
            // Pushed in reverse so `next` is visited first.
            if let ActionKind::Branch {
                on_success_action,
                on_failure_action,
                ..
            } = &action.kind
            {
                stack.extend(on_success_action.as_deref());
                stack.extend(on_failure_action.as_deref());
            }
            stack.extend(action.next_action.as_deref());
        }
        out
    }

    pub fn find_action(&self, name: &str) -> Option<&Action> {
        self.actions().into_iter().find(|a| a.name == name)
    }
}

impl Action {
    pub fn is_code_fallback(&self) -> bool {
        matches!(&self.kind, ActionKind::Code { settings } if settings.is_noop())
    }

    pub fn type_name(&self) -> &'static str {
        match self.kind {
            ActionKind::Piece { .. } => "PIECE",
            ActionKind::Code { .. } => "CODE",
            ActionKind::Branch { .. } => "BRANCH",
        }
    }
}

impl TriggerKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            TriggerKind::Piece { .. } => "PIECE_TRIGGER",
            TriggerKind::Schedule { .. } => "SCHEDULE",
            TriggerKind::Webhook { .. } => "WEBHOOK",
        }
    }
}

/// Turns a snake_case operation id into a label: `send_message` → `Send Message`.
pub fn humanize_operation(operation: &str) -> String {
    operation
        .split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
