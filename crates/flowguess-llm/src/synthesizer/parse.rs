use super::repair::repair_json;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Model output contains no JSON object")]
    NoJsonObject,

    #[error("Model output is not valid JSON even after repair: {0}")]
    Unrepairable(String),
}

/// Pull the JSON object out of free-form model output.
///
/// Takes everything from the first `{` to the last `}` so commentary around
/// the payload is ignored. Strict JSON is returned as parsed; anything else
/// goes through the syntax repairer first.
pub fn extract_json(text: &str) -> Result<Value, ExtractError> {
    let start = text.find('{').ok_or(ExtractError::NoJsonObject)?;
    let end = text
        .rfind('}')
        .filter(|&end| end > start)
        .ok_or(ExtractError::NoJsonObject)?;
    let payload = &text[start..=end];

    if let Ok(value) = serde_json::from_str(payload) {
        return Ok(value);
    }

    let repaired = repair_json(payload).ok_or_else(|| {
        ExtractError::Unrepairable("no readable value or nesting too deep".to_string())
    })?;
    debug!("Repaired model JSON: {}", repaired);

    serde_json::from_str(&repaired).map_err(|e| ExtractError::Unrepairable(e.to_string()))
}

/// Extract the body of a markdown code fence, if the text has one.
pub(crate) fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    if let Some(start) = trimmed.find("```json") {
        let after_fence = &trimmed[start + 7..];
        if let Some(end) = after_fence.find("```") {
            return after_fence[..end].trim();
        }
    }
    if let Some(start) = trimmed.find("```") {
        let after_fence = &trimmed[start + 3..];
        if let Some(end) = after_fence.find("```") {
            return after_fence[..end].trim();
        }
    }
    trimmed
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_valid_json_parses_unchanged() {
        for text in [
            r#"{"trigger": {"type": "WEBHOOK", "displayName": "it's \"quoted\""}}"#,
            r#"{"a": [1, 2.5e3, -0, true, null], "b": {"c": "é\n"}}"#,
            "{}",
        ] {
            let expected: Value = serde_json::from_str(text).unwrap();
            assert_eq!(extract_json(text).unwrap(), expected);
        }
    }

    #[test]
    fn test_surrounding_prose_is_ignored() {
        let value = extract_json("Sure! Here it is:\n{\"trigger\": {}}\nHope that helps {:").unwrap();
        assert_eq!(value, json!({"trigger": {}}));
    }

    #[test]
    fn test_recovers_trailing_commas_and_single_quotes() {
        let value = extract_json("{'trigger': {'type': 'SCHEDULE', 'settings': {'cronExpression': '0 * * * *',},},}").unwrap();
        assert_eq!(
            value,
            json!({"trigger": {"type": "SCHEDULE", "settings": {"cronExpression": "0 * * * *"}}})
        );
    }

    #[test]
    fn test_no_object() {
        assert!(matches!(extract_json("no json here"), Err(ExtractError::NoJsonObject)));
        assert!(matches!(extract_json("} backwards {"), Err(ExtractError::NoJsonObject)));
        assert!(matches!(extract_json(""), Err(ExtractError::NoJsonObject)));
    }

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("```json\n[1]\n```"), "[1]");
        assert_eq!(strip_code_fence("text\n```\n[2]\n```\nmore"), "[2]");
        assert_eq!(strip_code_fence("  [3]  "), "[3]");
    }
}
