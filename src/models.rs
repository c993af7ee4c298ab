//! Core data models for the newsletter retrieval engine.
//!
//! These types represent the newsletters, chunks, and query/response shapes
//! that flow through the ingestion and retrieval pipeline. Newsletters and
//! chunks are immutable once ingested; the corpus only ever grows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::RetrievalError;

/// Lower bound on `max_results` for a query.
pub const MIN_RESULTS: usize = 1;
/// Upper bound on `max_results` for a query.
pub const MAX_RESULTS: usize = 50;

/// An ingested newsletter. Carries the provenance metadata attached to every
/// chunk returned from a query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Newsletter {
    /// Stable unique identifier (e.g. the RFC 5322 Message-ID).
    pub message_id: String,
    pub newsletter_name: String,
    pub subject: String,
    /// Canonical web URL for the issue.
    pub primary_url: String,
    pub published_at: DateTime<Utc>,
}

/// A bounded text fragment extracted from a newsletter, paired with its
/// precomputed embedding vector. Created exactly once at ingestion time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub chunk_id: String,
    /// Back-reference to the owning [`Newsletter`].
    pub message_id: String,
    pub content: String,
    pub embedding: Vec<f32>,
}

/// A validated retrieval request.
#[derive(Debug, Clone)]
pub struct ContextQuery {
    pub user_query: String,
    /// Recency window in days; candidates must fall in `[now - days, now]`.
    pub days: i64,
    pub max_results: usize,
}

impl ContextQuery {
    /// Check the API-level parameter contract. Runs at the orchestrator
    /// boundary, before admission control and ranking.
    pub fn validate(&self) -> Result<(), RetrievalError> {
        if self.user_query.trim().is_empty() {
            return Err(RetrievalError::Validation(
                "user_query must not be empty".to_string(),
            ));
        }
        if self.days < 1 {
            return Err(RetrievalError::Validation(format!(
                "days must be >= 1, got {}",
                self.days
            )));
        }
        if !(MIN_RESULTS..=MAX_RESULTS).contains(&self.max_results) {
            return Err(RetrievalError::Validation(format!(
                "max_results must be in [{}, {}], got {}",
                MIN_RESULTS, MAX_RESULTS, self.max_results
            )));
        }
        Ok(())
    }
}

/// Provenance metadata resolved from a chunk's owning newsletter.
///
/// All five fields are mandatory on every returned chunk.
#[derive(Debug, Clone, Serialize)]
pub struct ChunkMetadata {
    pub primary_url: String,
    pub date: DateTime<Utc>,
    pub subject: String,
    pub newsletter_name: String,
    pub message_id: String,
}

/// One scored chunk in a retrieval response.
#[derive(Debug, Clone, Serialize)]
pub struct ContextChunk {
    pub content: String,
    pub metadata: ChunkMetadata,
    /// Cosine similarity against the query embedding, in `[-1, 1]`.
    pub score: f64,
}

/// Response body for the newsletter-context query endpoint.
///
/// `count` is always the literal length of `chunks`.
#[derive(Debug, Clone, Serialize)]
pub struct ContextResponse {
    pub count: usize,
    pub chunks: Vec<ContextChunk>,
}

impl ContextResponse {
    pub fn new(chunks: Vec<ContextChunk>) -> Self {
        Self {
            count: chunks.len(),
            chunks,
        }
    }
}
