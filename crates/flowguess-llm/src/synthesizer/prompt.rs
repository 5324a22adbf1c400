use anyhow::{Context, Result};
use std::path::Path;
use tracing::debug;

const FIND_EXAMPLES_PROMPT: &str = include_str!("../../prompts/find_examples.txt");
const SYNTHESIZE_PROMPT: &str = include_str!("../../prompts/synthesize.txt");

const FIND_EXAMPLES_FILE: &str = "find_examples.txt";
const SYNTHESIZE_FILE: &str = "synthesize.txt";

const QUESTION_PLACEHOLDER: &str = "{question}";
const CONTEXT_PLACEHOLDER: &str = "{context}";

/// The two prompt templates used per request. `{question}` and `{context}`
/// are the only placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplates {
    pub find_examples: String,
    pub synthesize: String,
}

impl Default for PromptTemplates {
    fn default() -> Self {
        Self {
            find_examples: FIND_EXAMPLES_PROMPT.to_string(),
            synthesize: SYNTHESIZE_PROMPT.to_string(),
        }
    }
}

impl PromptTemplates {
    /// Load templates from a directory. A file that doesn't exist keeps the
    /// built-in template; one that can't be read is an error.
    pub fn load(dir: &Path) -> Result<Self> {
        let mut templates = Self::default();
        for (file, slot) in [
            (FIND_EXAMPLES_FILE, &mut templates.find_examples),
            (SYNTHESIZE_FILE, &mut templates.synthesize),
        ] {
            let path = dir.join(file);
            if !path.exists() {
                continue;
            }
            *slot = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read prompt template {}", path.display()))?;
            debug!("Loaded prompt template from {}", path.display());
        }
        Ok(templates)
    }
}

/// Substitute `{question}` and `{context}` in one left-to-right pass.
/// Substituted text is never scanned again, so a question that itself
/// contains `{context}` stays literal.
pub fn render_template(template: &str, question: &str, context: &str) -> String {
    let mut out = String::with_capacity(template.len() + question.len() + context.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        if let Some(after) = tail.strip_prefix(QUESTION_PLACEHOLDER) {
            out.push_str(question);
            rest = after;
        } else if let Some(after) = tail.strip_prefix(CONTEXT_PLACEHOLDER) {
            out.push_str(context);
            rest = after;
        } else {
            out.push('{');
            rest = &tail[1..];
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_replaces_every_placeholder() {
        let rendered = render_template("Q: {question}\nC: {context}\nQ again: {question}", "a", "b");
        assert_eq!(rendered, "Q: a\nC: b\nQ again: a");
    }

    #[test]
    fn test_render_does_not_rescan_substituted_text() {
        let rendered = render_template("{question} / {context}", "what is {context}?", "ctx");
        assert_eq!(rendered, "what is {context}? / ctx");

        let rendered = render_template("{context}|{question}", "q", "{question}");
        assert_eq!(rendered, "{question}|q");
    }

    #[test]
    fn test_render_leaves_other_braces_alone() {
        let rendered = render_template(r#"{"trigger": {...}} {question"#, "q", "c");
        assert_eq!(rendered, r#"{"trigger": {...}} {question"#);
    }

    #[test]
    fn test_default_templates_have_placeholders() {
        let templates = PromptTemplates::default();
        for template in [&templates.find_examples, &templates.synthesize] {
            assert!(template.contains("{question}"));
            assert!(template.contains("{context}"));
        }
    }

    #[test]
    fn test_load_overrides_present_files_only() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("synthesize.txt"), "custom {question}").unwrap();

        let templates = PromptTemplates::load(dir.path()).unwrap();
        assert_eq!(templates.synthesize, "custom {question}");
        assert_eq!(templates.find_examples, PromptTemplates::default().find_examples);
    }
}
