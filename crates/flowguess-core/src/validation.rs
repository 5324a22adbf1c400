use std::collections::HashSet;

use crate::{TRIGGER_NAME, Trigger};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Trigger must be named 'trigger', found '{0}'")]
    TriggerName(String),

    #[error("Action has an empty name")]
    EmptyActionName,

    #[error("Action uses the reserved name 'trigger'")]
    ReservedActionName,

    #[error("Duplicate step name: {0}")]
    DuplicateName(String),
}

/// Check the structural invariants downstream consumers rely on.
pub fn validate_flow(trigger: &Trigger) -> Result<(), ValidationError> {
    if trigger.name != TRIGGER_NAME {
        return Err(ValidationError::TriggerName(trigger.name.clone()));
    }

    let mut names = HashSet::new();
    for action in trigger.actions() {
        if action.name.is_empty() {
            return Err(ValidationError::EmptyActionName);
        }
        if action.name == TRIGGER_NAME {
            return Err(ValidationError::ReservedActionName);
        }
        if !names.insert(action.name.as_str()) {
            return Err(ValidationError::DuplicateName(action.name.clone()));
        }
    }

    Ok(())
}
