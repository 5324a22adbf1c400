//! Lenient reading of the step tree a model writes.
//!
//! Models misname and miscapitalize fields (`OnSuccessAction`, `next_action`,
//! `trigerName`), so each field is looked up through a short alias list,
//! compared case-insensitively. Values of the wrong JSON type read as absent.

use serde_json::{Map, Value};

const TRIGGER_KEYS: &[&str] = &["trigger"];
const TYPE_KEYS: &[&str] = &["type", "stepType", "step_type"];
const DISPLAY_NAME_KEYS: &[&str] = &["displayName", "display_name", "title"];
const SETTINGS_KEYS: &[&str] = &["settings"];
const NEXT_ACTION_KEYS: &[&str] = &["nextAction", "next_action", "next", "nextStep"];
const SUCCESS_KEYS: &[&str] = &[
    "onSuccessAction",
    "on_success_action",
    "successAction",
    "onSuccess",
];
const FAILURE_KEYS: &[&str] = &[
    "onFailureAction",
    "on_failure_action",
    "failureAction",
    "onFailure",
];

const PIECE_NAME_KEYS: &[&str] = &["pieceName", "piece_name", "piece", "integration"];
const ACTION_NAME_KEYS: &[&str] = &["actionName", "action_name", "action", "operation"];
const TRIGGER_NAME_KEYS: &[&str] = &["triggerName", "trigger_name", "trigerName", "trigger"];
const CRON_KEYS: &[&str] = &["cronExpression", "cron_expression", "cron"];

/// One step as the model described it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidateStep {
    pub step_type: Option<String>,
    pub display_name: Option<String>,
    pub settings: CandidateSettings,
    pub next_action: Option<Box<CandidateStep>>,
    pub on_success_action: Option<Box<CandidateStep>>,
    pub on_failure_action: Option<Box<CandidateStep>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidateSettings {
    pub piece_name: Option<String>,
    pub action_name: Option<String>,
    pub trigger_name: Option<String>,
    pub cron_expression: Option<String>,
}

impl CandidateStep {
    /// Read a step from a JSON object. `None` for anything that isn't one.
    pub fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        Some(Self {
            step_type: string_field(object, TYPE_KEYS),
            display_name: string_field(object, DISPLAY_NAME_KEYS),
            settings: field(object, SETTINGS_KEYS)
                .and_then(Value::as_object)
                .map(CandidateSettings::from_object)
                .unwrap_or_default(),
            next_action: child(object, NEXT_ACTION_KEYS),
            on_success_action: child(object, SUCCESS_KEYS),
            on_failure_action: child(object, FAILURE_KEYS),
        })
    }

    /// Locate the trigger in a parsed model payload: its `trigger` member, or
    /// the payload itself when it is a bare step.
    pub fn trigger_from_payload(payload: &Value) -> Option<Self> {
        let object = payload.as_object()?;
        match field(object, TRIGGER_KEYS) {
            Some(trigger) => Self::from_value(trigger),
            None if field(object, TYPE_KEYS).is_some() => Self::from_value(payload),
            None => None,
        }
    }
}

impl CandidateSettings {
    fn from_object(object: &Map<String, Value>) -> Self {
        Self {
            piece_name: string_field(object, PIECE_NAME_KEYS),
            action_name: string_field(object, ACTION_NAME_KEYS),
            trigger_name: string_field(object, TRIGGER_NAME_KEYS),
            cron_expression: string_field(object, CRON_KEYS),
        }
    }
}

/// First non-null value under any alias; exact spellings win over
/// case-insensitive matches.
fn field<'a>(object: &'a Map<String, Value>, aliases: &[&str]) -> Option<&'a Value> {
    aliases
        .iter()
        .find_map(|alias| object.get(*alias).filter(|v| !v.is_null()))
        .or_else(|| {
            object
                .iter()
                .find(|(key, value)| {
                    !value.is_null() && aliases.iter().any(|a| a.eq_ignore_ascii_case(key))
                })
                .map(|(_, value)| value)
        })
}

fn string_field(object: &Map<String, Value>, aliases: &[&str]) -> Option<String> {
    field(object, aliases)
        .and_then(Value::as_str)
        .map(String::from)
}

fn child(object: &Map<String, Value>, aliases: &[&str]) -> Option<Box<CandidateStep>> {
    field(object, aliases)
        .and_then(CandidateStep::from_value)
        .map(Box::new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_reads_canonical_fields() {
        let step = CandidateStep::from_value(&json!({
            "type": "PIECE",
            "displayName": "Post it",
            "settings": {"pieceName": "slack", "actionName": "send_message"},
            "nextAction": {"type": "CODE"}
        }))
        .unwrap();
        assert_eq!(step.step_type.as_deref(), Some("PIECE"));
        assert_eq!(step.display_name.as_deref(), Some("Post it"));
        assert_eq!(step.settings.piece_name.as_deref(), Some("slack"));
        assert_eq!(step.settings.action_name.as_deref(), Some("send_message"));
        assert_eq!(
            step.next_action.unwrap().step_type.as_deref(),
            Some("CODE")
        );
    }

    #[test]
    fn test_branch_arm_aliases_and_casing() {
        let step = CandidateStep::from_value(&json!({
            "type": "BRANCH",
            "OnSuccessAction": {"type": "CODE", "displayName": "yes"},
            "ONFAILUREACTION": {"type": "CODE", "displayName": "no"}
        }))
        .unwrap();
        assert_eq!(
            step.on_success_action.unwrap().display_name.as_deref(),
            Some("yes")
        );
        assert_eq!(
            step.on_failure_action.unwrap().display_name.as_deref(),
            Some("no")
        );

        let step = CandidateStep::from_value(&json!({
            "type": "BRANCH",
            "successAction": {"type": "CODE"},
            "on_failure_action": {"type": "CODE"}
        }))
        .unwrap();
        assert!(step.on_success_action.is_some());
        assert!(step.on_failure_action.is_some());
    }

    #[test]
    fn test_exact_alias_preferred_over_case_insensitive() {
        let step = CandidateStep::from_value(&json!({
            "NextAction": {"type": "BRANCH"},
            "nextAction": {"type": "CODE"}
        }))
        .unwrap();
        assert_eq!(step.next_action.unwrap().step_type.as_deref(), Some("CODE"));
    }

    #[test]
    fn test_wrong_types_read_as_absent() {
        let step = CandidateStep::from_value(&json!({
            "type": 7,
            "displayName": ["x"],
            "settings": "slack",
            "nextAction": "step-2",
            "onSuccessAction": null
        }))
        .unwrap();
        assert_eq!(step, CandidateStep::default());
        assert!(CandidateStep::from_value(&json!("PIECE")).is_none());
        assert!(CandidateStep::from_value(&Value::Null).is_none());
    }

    #[test]
    fn test_setting_aliases() {
        let step = CandidateStep::from_value(&json!({
            "type": "PIECE_TRIGGER",
            "settings": {"piece_name": "gmail", "trigerName": "new_email", "CRON": "* * * * *"}
        }))
        .unwrap();
        assert_eq!(step.settings.piece_name.as_deref(), Some("gmail"));
        assert_eq!(step.settings.trigger_name.as_deref(), Some("new_email"));
        assert_eq!(step.settings.cron_expression.as_deref(), Some("* * * * *"));
    }

    #[test]
    fn test_cron_expression_copied_verbatim() {
        let step = CandidateStep::from_value(&json!({
            "type": "SCHEDULE",
            "settings": {"cronExpression": "  not a cron  "}
        }))
        .unwrap();
        assert_eq!(
            step.settings.cron_expression.as_deref(),
            Some("  not a cron  ")
        );
    }

    #[test]
    fn test_trigger_from_payload() {
        let wrapped = json!({"trigger": {"type": "WEBHOOK"}});
        assert_eq!(
            CandidateStep::trigger_from_payload(&wrapped)
                .unwrap()
                .step_type
                .as_deref(),
            Some("WEBHOOK")
        );

        let bare = json!({"type": "SCHEDULE", "settings": {"cronExpression": "0 * * * *"}});
        assert_eq!(
            CandidateStep::trigger_from_payload(&bare)
                .unwrap()
                .step_type
                .as_deref(),
            Some("SCHEDULE")
        );

        assert!(CandidateStep::trigger_from_payload(&json!({"steps": []})).is_none());
        assert!(CandidateStep::trigger_from_payload(&json!({"trigger": "WEBHOOK"})).is_none());
        assert!(CandidateStep::trigger_from_payload(&json!([{"type": "WEBHOOK"}])).is_none());
    }
}
