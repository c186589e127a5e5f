//! OpenAI-compatible chat completions client.
//!
//! Groq, OpenAI and Ollama all accept the same
//! `POST {base}/v1/chat/completions` request shape, so one client covers
//! all three; only the base URL and API key differ.
//!
//! | `provider` | Base URL | Key |
//! |------------|----------|-----|
//! | `groq`     | `https://api.groq.com/openai` | `GROQ_API_KEY` |
//! | `openai`   | `https://api.openai.com` | `OPENAI_API_KEY` |
//! | `ollama`   | `http://localhost:11434` | none |
//!
//! `completion.url` overrides the base URL for any provider.

use std::sync::Arc;
use std::time::Duration;

use anyhow::bail;
use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use daybrief_core::completion::{ChatMessage, CompletionModel, DisabledCompletion};
use daybrief_core::error::{Error, Result};

use crate::config::CompletionConfig;

/// Build the completion model named by `config.provider`.
pub fn create_completion_model(
    config: &CompletionConfig,
) -> anyhow::Result<Arc<dyn CompletionModel>> {
    match config.provider.as_str() {
        "disabled" => Ok(Arc::new(DisabledCompletion)),
        "groq" | "openai" | "ollama" => Ok(Arc::new(ChatCompletionsClient::new(config)?)),
        other => bail!("Unknown completion provider: {}", other),
    }
}

/// HTTP client for `/v1/chat/completions`.
pub struct ChatCompletionsClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl ChatCompletionsClient {
    pub fn new(config: &CompletionConfig) -> anyhow::Result<Self> {
        let (default_base, key_var) = match config.provider.as_str() {
            "groq" => ("https://api.groq.com/openai", Some("GROQ_API_KEY")),
            "openai" => ("https://api.openai.com", Some("OPENAI_API_KEY")),
            "ollama" => ("http://localhost:11434", None),
            other => bail!("Unsupported completion provider: {}", other),
        };

        let api_key = match key_var {
            Some(var) => Some(
                std::env::var(var)
                    .map_err(|_| anyhow::anyhow!("{} environment variable not set", var))?,
            ),
            None => None,
        };

        let base = config.url.as_deref().unwrap_or(default_base);
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/v1/chat/completions", base.trim_end_matches('/')),
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl CompletionModel for ChatCompletionsClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn invoke(&self, messages: &[ChatMessage]) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
        });

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {}", key));
        }

        let response = request.send().await.map_err(Error::model)?;
        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(Error::ModelInvocation(format!(
                "completion API error {}: {}",
                status, body_text
            )));
        }

        let json: Value = response.json().await.map_err(Error::model)?;
        let text = parse_chat_response(&json)?;
        debug!(model = %self.model, chars = text.len(), "completion received");
        Ok(text)
    }
}

/// Extract `choices[0].message.content`.
fn parse_chat_response(json: &Value) -> Result<String> {
    let content = json
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .ok_or_else(|| {
            Error::ModelInvocation("Invalid completion response: missing message content".into())
        })?;

    if content.trim().is_empty() {
        return Err(Error::ModelInvocation("model returned an empty response".into()));
    }
    Ok(content.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_chat_response() {
        let json = json!({
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "All clear today."}}]
        });
        assert_eq!(parse_chat_response(&json).unwrap(), "All clear today.");
    }

    #[test]
    fn test_parse_rejects_missing_or_blank_content() {
        assert!(matches!(
            parse_chat_response(&json!({"choices": []})),
            Err(Error::ModelInvocation(_))
        ));
        let blank = json!({"choices": [{"message": {"content": "  \n"}}]});
        assert!(parse_chat_response(&blank).is_err());
    }

    #[test]
    fn test_ollama_endpoint_honours_url_override() {
        let config = CompletionConfig {
            provider: "ollama".into(),
            url: Some("http://gpu-box:11434/".into()),
            ..Default::default()
        };
        let client = ChatCompletionsClient::new(&config).unwrap();
        assert_eq!(client.endpoint(), "http://gpu-box:11434/v1/chat/completions");
        assert_eq!(client.model_name(), "llama-3.1-8b-instant");
    }

    #[test]
    fn test_create_disabled_and_unknown() {
        let model = create_completion_model(&CompletionConfig::default()).unwrap();
        assert_eq!(model.model_name(), "disabled");

        let config = CompletionConfig {
            provider: "magic".into(),
            ..Default::default()
        };
        assert!(create_completion_model(&config).is_err());
    }
}
