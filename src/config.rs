use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "disabled".to_string(),
            model: None,
            dims: None,
            url: None,
            timeout_secs: 30,
        }
    }
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// Recency window applied when the request omits `days`.
    #[serde(default = "default_days")]
    pub default_days: i64,
    /// Result cap applied when the request omits `max_results`.
    #[serde(default = "default_max_results")]
    pub default_max_results: usize,
    /// Delay before the single embedding retry.
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_days: default_days(),
            default_max_results: default_max_results(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

fn default_days() -> i64 {
    7
}
fn default_max_results() -> usize {
    10
}
fn default_retry_backoff_ms() -> u64 {
    500
}

#[derive(Debug, Deserialize, Clone)]
pub struct RateLimitConfig {
    /// Burst capacity of each caller's bucket.
    #[serde(default = "default_capacity")]
    pub capacity: u32,
    /// Sustained refill rate, tokens per minute.
    #[serde(default = "default_refill_per_minute")]
    pub refill_per_minute: f64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            refill_per_minute: default_refill_per_minute(),
        }
    }
}

fn default_capacity() -> u32 {
    30
}
fn default_refill_per_minute() -> f64 {
    30.0
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.retrieval.default_days < 1 {
        anyhow::bail!("retrieval.default_days must be >= 1");
    }

    if !(crate::models::MIN_RESULTS..=crate::models::MAX_RESULTS)
        .contains(&config.retrieval.default_max_results)
    {
        anyhow::bail!(
            "retrieval.default_max_results must be in [{}, {}]",
            crate::models::MIN_RESULTS,
            crate::models::MAX_RESULTS
        );
    }

    if config.rate_limit.capacity == 0 {
        anyhow::bail!("rate_limit.capacity must be > 0");
    }

    if config.rate_limit.refill_per_minute <= 0.0 {
        anyhow::bail!("rate_limit.refill_per_minute must be > 0");
    }

    if config.embedding.is_enabled() {
        if config.embedding.dims.is_none() || config.embedding.dims == Some(0) {
            anyhow::bail!(
                "embedding.dims must be > 0 when provider is '{}'",
                config.embedding.provider
            );
        }
        if config.embedding.model.is_none() {
            anyhow::bail!(
                "embedding.model must be specified when provider is '{}'",
                config.embedding.provider
            );
        }
    }

    match config.embedding.provider.as_str() {
        "disabled" | "openai" | "ollama" => {}
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be disabled, openai, or ollama.",
            other
        ),
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    #[test]
    fn test_minimal_config_defaults() {
        let f = write_config("[server]\nbind = \"127.0.0.1:5000\"\n");
        let cfg = load_config(f.path()).unwrap();
        assert_eq!(cfg.retrieval.default_days, 7);
        assert_eq!(cfg.retrieval.default_max_results, 10);
        assert_eq!(cfg.rate_limit.capacity, 30);
        assert!(!cfg.embedding.is_enabled());
    }

    #[test]
    fn test_enabled_embedding_requires_model_and_dims() {
        let f = write_config(
            "[server]\nbind = \"127.0.0.1:5000\"\n[embedding]\nprovider = \"openai\"\n",
        );
        assert!(load_config(f.path()).is_err());

        let f = write_config(
            "[server]\nbind = \"127.0.0.1:5000\"\n\
             [embedding]\nprovider = \"openai\"\nmodel = \"text-embedding-3-small\"\ndims = 1536\n",
        );
        let cfg = load_config(f.path()).unwrap();
        assert!(cfg.embedding.is_enabled());
        assert_eq!(cfg.embedding.dims, Some(1536));
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let f = write_config(
            "[server]\nbind = \"127.0.0.1:5000\"\n\
             [embedding]\nprovider = \"qdrant\"\nmodel = \"m\"\ndims = 4\n",
        );
        assert!(load_config(f.path()).is_err());
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let f = write_config(
            "[server]\nbind = \"127.0.0.1:5000\"\n[rate_limit]\ncapacity = 0\n",
        );
        assert!(load_config(f.path()).is_err());
    }
}
