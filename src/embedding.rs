//! Network embedding gateways.
//!
//! Implements [`Embedder`] for two HTTP backends:
//! - **[`OllamaEmbedder`]**: `POST {url}/api/embed` on a local Ollama server.
//! - **[`OpenAIEmbedder`]**: `POST https://api.openai.com/v1/embeddings`.
//!
//! Requests are not retried. A failed call surfaces as
//! [`Error::Embedding`] and the caller decides what to do with it.
//!
//! Use [`create_embedder`] to pick an implementation from configuration:
//!
//! | `provider` | Embedder |
//! |------------|----------|
//! | `disabled` | [`DisabledEmbedder`] |
//! | `hash`     | [`HashEmbedder`] (offline, deterministic) |
//! | `ollama`   | [`OllamaEmbedder`] |
//! | `openai`   | [`OpenAIEmbedder`] |

use std::sync::Arc;
use std::time::Duration;

use anyhow::bail;
use async_trait::async_trait;
use serde_json::Value;

use daybrief_core::embedding::{DisabledEmbedder, Embedder, HashEmbedder};
use daybrief_core::error::{Error, Result};

use crate::config::EmbeddingConfig;

const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
const OPENAI_EMBEDDINGS_URL: &str = "https://api.openai.com/v1/embeddings";

/// Build the embedder named by `config.provider`.
pub fn create_embedder(config: &EmbeddingConfig) -> anyhow::Result<Arc<dyn Embedder>> {
    match config.provider.as_str() {
        "disabled" => Ok(Arc::new(DisabledEmbedder)),
        "hash" => Ok(Arc::new(HashEmbedder::new(
            config.dims.unwrap_or(HashEmbedder::DEFAULT_DIMS),
        ))),
        "ollama" => Ok(Arc::new(OllamaEmbedder::new(config)?)),
        "openai" => Ok(Arc::new(OpenAIEmbedder::new(config)?)),
        other => bail!("Unknown embedding provider: {}", other),
    }
}

fn http_client(timeout_secs: u64) -> anyhow::Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()?)
}

async fn read_json(response: reqwest::Response, backend: &str) -> Result<Value> {
    let status = response.status();
    if !status.is_success() {
        let body_text = response.text().await.unwrap_or_default();
        return Err(Error::Embedding(format!(
            "{} API error {}: {}",
            backend, status, body_text
        )));
    }
    response.json().await.map_err(Error::embedding)
}

// ═══════════════════════════════════════════════════════════════════════
// Ollama
// ═══════════════════════════════════════════════════════════════════════

/// Embedder backed by a local Ollama instance.
///
/// Requires the model to be pulled first (e.g. `ollama pull nomic-embed-text`).
pub struct OllamaEmbedder {
    client: reqwest::Client,
    model: String,
    dims: usize,
    url: String,
}

impl OllamaEmbedder {
    pub fn new(config: &EmbeddingConfig) -> anyhow::Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("embedding.model required for Ollama provider"))?;
        let dims = config
            .dims
            .ok_or_else(|| anyhow::anyhow!("embedding.dims required for Ollama provider"))?;
        let url = config
            .url
            .clone()
            .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string());

        Ok(Self {
            client: http_client(config.timeout_secs)?,
            model,
            dims,
            url: url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });

        let response = self
            .client
            .post(format!("{}/api/embed", self.url))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                Error::Embedding(format!(
                    "Ollama connection error (is Ollama running at {}?): {}",
                    self.url, e
                ))
            })?;

        let json = read_json(response, "Ollama").await?;
        parse_ollama_response(&json)
    }
}

/// Extract `embeddings[]` from an Ollama `/api/embed` response.
fn parse_ollama_response(json: &Value) -> Result<Vec<Vec<f32>>> {
    let embeddings = json
        .get("embeddings")
        .and_then(|e| e.as_array())
        .ok_or_else(|| Error::Embedding("Invalid Ollama response: missing embeddings".into()))?;

    embeddings
        .iter()
        .map(|item| {
            item.as_array()
                .map(|values| to_f32(values))
                .ok_or_else(|| Error::Embedding("Invalid Ollama response: bad embedding".into()))
        })
        .collect()
}

// ═══════════════════════════════════════════════════════════════════════
// OpenAI
// ═══════════════════════════════════════════════════════════════════════

/// Embedder backed by the OpenAI embeddings API.
///
/// Reads the key from `OPENAI_API_KEY` at construction time.
pub struct OpenAIEmbedder {
    client: reqwest::Client,
    model: String,
    dims: usize,
    api_key: String,
}

impl OpenAIEmbedder {
    pub fn new(config: &EmbeddingConfig) -> anyhow::Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("embedding.model required for OpenAI provider"))?;
        let dims = config
            .dims
            .ok_or_else(|| anyhow::anyhow!("embedding.dims required for OpenAI provider"))?;
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY environment variable not set"))?;

        Ok(Self {
            client: http_client(config.timeout_secs)?,
            model,
            dims,
            api_key,
        })
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });

        let response = self
            .client
            .post(OPENAI_EMBEDDINGS_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(Error::embedding)?;

        let json = read_json(response, "OpenAI").await?;
        parse_openai_response(&json)
    }
}

/// Extract `data[].embedding` from an OpenAI response, ordered by `index`.
fn parse_openai_response(json: &Value) -> Result<Vec<Vec<f32>>> {
    let data = json
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or_else(|| Error::Embedding("Invalid OpenAI response: missing data array".into()))?;

    let mut indexed = Vec::with_capacity(data.len());
    for (position, item) in data.iter().enumerate() {
        let embedding = item
            .get("embedding")
            .and_then(|e| e.as_array())
            .ok_or_else(|| Error::Embedding("Invalid OpenAI response: missing embedding".into()))?;
        let index = item
            .get("index")
            .and_then(|i| i.as_u64())
            .map(|i| i as usize)
            .unwrap_or(position);
        indexed.push((index, to_f32(embedding)));
    }

    indexed.sort_by_key(|(index, _)| *index);
    Ok(indexed.into_iter().map(|(_, v)| v).collect())
}

fn to_f32(values: &[Value]) -> Vec<f32> {
    values
        .iter()
        .map(|v| v.as_f64().unwrap_or(0.0) as f32)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_ollama_response() {
        let json = json!({"model": "m", "embeddings": [[0.1, 0.2], [0.3, 0.4]]});
        let vectors = parse_ollama_response(&json).unwrap();
        assert_eq!(vectors.len(), 2);
        assert!((vectors[1][0] - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_parse_ollama_rejects_missing_field() {
        let err = parse_ollama_response(&json!({"error": "model not found"})).unwrap_err();
        assert!(matches!(err, Error::Embedding(_)));
    }

    #[test]
    fn test_parse_openai_orders_by_index() {
        let json = json!({
            "data": [
                {"index": 1, "embedding": [2.0]},
                {"index": 0, "embedding": [1.0]}
            ]
        });
        let vectors = parse_openai_response(&json).unwrap();
        assert_eq!(vectors, vec![vec![1.0], vec![2.0]]);
    }

    #[test]
    fn test_parse_openai_rejects_missing_data() {
        assert!(parse_openai_response(&json!({})).is_err());
        assert!(parse_openai_response(&json!({"data": [{"index": 0}]})).is_err());
    }

    #[test]
    fn test_create_local_embedders() {
        let hash = create_embedder(&EmbeddingConfig::default()).unwrap();
        assert_eq!(hash.model_name(), "hash");
        assert_eq!(hash.dims(), HashEmbedder::DEFAULT_DIMS);

        let config = EmbeddingConfig {
            provider: "disabled".into(),
            ..Default::default()
        };
        assert_eq!(create_embedder(&config).unwrap().dims(), 0);
    }

    #[test]
    fn test_create_ollama_embedder() {
        let config = EmbeddingConfig {
            provider: "ollama".into(),
            model: Some("nomic-embed-text".into()),
            dims: Some(768),
            url: Some("http://127.0.0.1:11434/".into()),
            ..Default::default()
        };
        let embedder = create_embedder(&config).unwrap();
        assert_eq!(embedder.model_name(), "nomic-embed-text");
        assert_eq!(embedder.dims(), 768);
    }

    #[test]
    fn test_create_rejects_unknown_provider() {
        let config = EmbeddingConfig {
            provider: "magic".into(),
            ..Default::default()
        };
        assert!(create_embedder(&config).is_err());
    }
}
