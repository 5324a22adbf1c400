use crate::ChatBackend;
use crate::types::*;
use anyhow::{Context, Result, anyhow};
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub frequency_penalty: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
            model: "gpt-3.5-turbo".to_string(),
            temperature: Some(0.3),
            top_p: Some(1.0),
            frequency_penalty: Some(0.0),
            max_tokens: None,
        }
    }
}

/// Client for an OpenAI-compatible `/chat/completions` endpoint.
pub struct LlmClient {
    config: LlmConfig,
    http: reqwest::Client,
}

impl LlmClient {
    pub fn new(config: LlmConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }
}

impl ChatBackend for LlmClient {
    fn model_name(&self) -> &str {
        &self.config.model
    }

    async fn chat(&self, messages: Vec<Message>) -> Result<ChatResponse> {
        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );

        let request = ChatRequest {
            model: self.config.model.clone(),
            messages,
            temperature: self.config.temperature,
            top_p: self.config.top_p,
            frequency_penalty: self.config.frequency_penalty,
            max_tokens: self.config.max_tokens,
        };

        debug!("LLM request to {}: {} messages", url, request.messages.len());

        let mut req_builder = self.http.post(&url).json(&request);

        if let Some(api_key) = &self.config.api_key {
            req_builder = req_builder.bearer_auth(api_key);
        }

        let response = req_builder
            .send()
            .await
            .context("Failed to send request to LLM")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("LLM request failed ({}): {}", status, error_text);
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .context("Failed to parse LLM response")?;

        info!(
            "LLM response: finish_reason={:?}, total_tokens={:?}",
            chat_response
                .choices
                .first()
                .and_then(|c| c.finish_reason.as_ref()),
            chat_response.usage.as_ref().map(|u| u.total_tokens)
        );

        Ok(chat_response)
    }
}

/// Send `prompt` as a single user message and return the text of the first choice.
pub async fn complete(backend: &impl ChatBackend, prompt: &str) -> Result<String> {
    let response = backend.chat(vec![Message::user(prompt)]).await?;

    let choice = response
        .choices
        .first()
        .ok_or_else(|| anyhow!("No choices in response from {}", backend.model_name()))?;

    let content = choice
        .message
        .text_content()
        .ok_or_else(|| anyhow!("{} returned no text content", backend.model_name()))?;

    Ok(content.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_matches_deployment_defaults() {
        let config = LlmConfig::default();
        assert_eq!(config.model, "gpt-3.5-turbo");
        assert_eq!(config.temperature, Some(0.3));
        assert_eq!(config.top_p, Some(1.0));
        assert_eq!(config.frequency_penalty, Some(0.0));
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_request_omits_unset_sampling_fields() {
        let request = ChatRequest {
            model: "m".to_string(),
            messages: vec![Message::user("hi")],
            temperature: Some(0.3),
            top_p: None,
            frequency_penalty: None,
            max_tokens: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "hi");
        assert!(json.get("top_p").is_none());
        assert!(json.get("max_tokens").is_none());
    }

    #[test]
    fn test_response_parses_minimal_openai_payload() {
        let response: ChatResponse = serde_json::from_str(
            r#"{"choices": [{"message": {"role": "assistant", "content": "{}"}}]}"#,
        )
        .unwrap();
        assert_eq!(response.choices[0].message.text_content(), Some("{}"));
        assert!(response.usage.is_none());
    }
}
