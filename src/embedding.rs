//! Query embedder abstraction and provider implementations.
//!
//! The engine only needs one thing from the embedding side: turn the user's
//! query text into a vector in the same space as the stored chunk
//! embeddings. Chunk embeddings themselves are produced upstream at
//! ingestion time and arrive precomputed.
//!
//! Providers:
//! - **[`OpenAiEmbedder`]** — `POST /v1/embeddings`, needs `OPENAI_API_KEY`.
//! - **[`OllamaEmbedder`]** — `POST {url}/api/embed` on a local Ollama.
//! - **[`DisabledEmbedder`]** — always fails; used when no provider is
//!   configured.
//!
//! Each call is a single attempt with a bounded timeout. The retry policy
//! (exactly one retry with backoff) belongs to the orchestrator, which is
//! also where a second failure turns into a 500.

use async_trait::async_trait;
use std::time::Duration;

use crate::config::EmbeddingConfig;
use crate::error::{Result, RetrievalError};

/// Converts query text into the corpus embedding space.
#[async_trait]
pub trait QueryEmbedder: Send + Sync {
    /// Embed a single query text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Model identifier (e.g. `"text-embedding-3-small"`).
    fn model_name(&self) -> &str;

    /// Embedding vector dimensionality (e.g. `1536`).
    fn dims(&self) -> usize;
}

/// Build the configured [`QueryEmbedder`].
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Box<dyn QueryEmbedder>> {
    match config.provider.as_str() {
        "disabled" => Ok(Box::new(DisabledEmbedder)),
        "openai" => Ok(Box::new(OpenAiEmbedder::new(config)?)),
        "ollama" => Ok(Box::new(OllamaEmbedder::new(config)?)),
        other => Err(RetrievalError::EmbeddingUnavailable(format!(
            "unknown embedding provider: {}",
            other
        ))),
    }
}

// ============ Disabled ============

/// A no-op embedder that always fails.
pub struct DisabledEmbedder;

#[async_trait]
impl QueryEmbedder for DisabledEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(RetrievalError::EmbeddingUnavailable(
            "embedding provider is disabled".to_string(),
        ))
    }

    fn model_name(&self) -> &str {
        "disabled"
    }

    fn dims(&self) -> usize {
        0
    }
}

// ============ OpenAI ============

/// Embedder backed by the OpenAI embeddings API.
pub struct OpenAiEmbedder {
    model: String,
    dims: usize,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let model = config.model.clone().ok_or_else(|| {
            RetrievalError::EmbeddingUnavailable(
                "embedding.model required for OpenAI provider".to_string(),
            )
        })?;
        let dims = config.dims.ok_or_else(|| {
            RetrievalError::EmbeddingUnavailable(
                "embedding.dims required for OpenAI provider".to_string(),
            )
        })?;
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| {
            RetrievalError::EmbeddingUnavailable(
                "OPENAI_API_KEY environment variable not set".to_string(),
            )
        })?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RetrievalError::EmbeddingUnavailable(e.to_string()))?;

        Ok(Self {
            model,
            dims,
            api_key,
            client,
        })
    }
}

#[async_trait]
impl QueryEmbedder for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let body = serde_json::json!({
            "model": self.model,
            "input": [text],
        });

        let response = self
            .client
            .post("https://api.openai.com/v1/embeddings")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| RetrievalError::EmbeddingUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(RetrievalError::EmbeddingUnavailable(format!(
                "OpenAI API error {}: {}",
                status, body_text
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| RetrievalError::EmbeddingUnavailable(e.to_string()))?;
        parse_openai_response(&json)
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        self.dims
    }
}

fn parse_openai_response(json: &serde_json::Value) -> Result<Vec<f32>> {
    let embedding = json
        .get("data")
        .and_then(|d| d.as_array())
        .and_then(|d| d.first())
        .and_then(|item| item.get("embedding"))
        .and_then(|e| e.as_array())
        .ok_or_else(|| {
            RetrievalError::EmbeddingUnavailable(
                "invalid OpenAI response: missing data[0].embedding".to_string(),
            )
        })?;

    Ok(embedding
        .iter()
        .map(|v| v.as_f64().unwrap_or(0.0) as f32)
        .collect())
}

// ============ Ollama ============

/// Embedder backed by a local Ollama instance.
pub struct OllamaEmbedder {
    model: String,
    dims: usize,
    url: String,
    client: reqwest::Client,
}

impl OllamaEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let model = config.model.clone().ok_or_else(|| {
            RetrievalError::EmbeddingUnavailable(
                "embedding.model required for Ollama provider".to_string(),
            )
        })?;
        let dims = config.dims.ok_or_else(|| {
            RetrievalError::EmbeddingUnavailable(
                "embedding.dims required for Ollama provider".to_string(),
            )
        })?;
        let url = config
            .url
            .clone()
            .unwrap_or_else(|| "http://localhost:11434".to_string());
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RetrievalError::EmbeddingUnavailable(e.to_string()))?;

        Ok(Self {
            model,
            dims,
            url,
            client,
        })
    }
}

#[async_trait]
impl QueryEmbedder for OllamaEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let body = serde_json::json!({
            "model": self.model,
            "input": [text],
        });

        let response = self
            .client
            .post(format!("{}/api/embed", self.url))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                RetrievalError::EmbeddingUnavailable(format!(
                    "Ollama connection error (is Ollama running at {}?): {}",
                    self.url, e
                ))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(RetrievalError::EmbeddingUnavailable(format!(
                "Ollama API error {}: {}",
                status, body_text
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| RetrievalError::EmbeddingUnavailable(e.to_string()))?;
        parse_ollama_response(&json)
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        self.dims
    }
}

fn parse_ollama_response(json: &serde_json::Value) -> Result<Vec<f32>> {
    let embedding = json
        .get("embeddings")
        .and_then(|e| e.as_array())
        .and_then(|e| e.first())
        .and_then(|e| e.as_array())
        .ok_or_else(|| {
            RetrievalError::EmbeddingUnavailable(
                "invalid Ollama response: missing embeddings[0]".to_string(),
            )
        })?;

    Ok(embedding
        .iter()
        .map(|v| v.as_f64().unwrap_or(0.0) as f32)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disabled_embedder_fails() {
        let err = DisabledEmbedder.embed("anything").await.unwrap_err();
        assert!(matches!(err, RetrievalError::EmbeddingUnavailable(_)));
    }

    #[test]
    fn test_create_disabled() {
        let embedder = create_embedder(&EmbeddingConfig::default()).unwrap();
        assert_eq!(embedder.model_name(), "disabled");
        assert_eq!(embedder.dims(), 0);
    }

    #[test]
    fn test_create_unknown_provider() {
        let config = EmbeddingConfig {
            provider: "qdrant".to_string(),
            ..EmbeddingConfig::default()
        };
        assert!(create_embedder(&config).is_err());
    }

    #[test]
    fn test_parse_openai_response() {
        let json = serde_json::json!({
            "data": [ { "embedding": [0.25, -1.0, 0.5] } ]
        });
        let vec = parse_openai_response(&json).unwrap();
        assert_eq!(vec, vec![0.25, -1.0, 0.5]);
    }

    #[test]
    fn test_parse_openai_response_missing_data() {
        let json = serde_json::json!({ "object": "list" });
        assert!(parse_openai_response(&json).is_err());
    }

    #[test]
    fn test_parse_ollama_response() {
        let json = serde_json::json!({
            "embeddings": [ [1.0, 2.0] ]
        });
        let vec = parse_ollama_response(&json).unwrap();
        assert_eq!(vec, vec![1.0, 2.0]);
    }
}
