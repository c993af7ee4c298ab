//! Error types for the retrieval engine.
//!
//! Every failure a query can surface maps to exactly one variant, and each
//! variant maps to one HTTP status class at the server boundary:
//!
//! | Variant | Status |
//! |---------|--------|
//! | [`Validation`](RetrievalError::Validation) | 400 |
//! | [`NotFound`](RetrievalError::NotFound) | 404 |
//! | [`RateLimited`](RetrievalError::RateLimited) | 429 |
//! | [`EmbeddingUnavailable`](RetrievalError::EmbeddingUnavailable) | 500 |
//! | [`IndexUnavailable`](RetrievalError::IndexUnavailable) | 500 |
//!
//! [`DuplicateId`](RetrievalError::DuplicateId) only occurs on the ingestion
//! path and never reaches the query API.

use thiserror::Error;

/// Result type alias for retrieval operations.
pub type Result<T> = std::result::Result<T, RetrievalError>;

/// Errors that can occur in the retrieval engine.
#[derive(Error, Debug)]
pub enum RetrievalError {
    /// Bad or missing query parameters.
    #[error("invalid query: {0}")]
    Validation(String),

    /// Unknown route or a reference that does not resolve.
    #[error("not found: {0}")]
    NotFound(String),

    /// Admission denied by the token-bucket limiter.
    #[error("rate limit exceeded")]
    RateLimited,

    /// The query embedder failed to produce a vector, retry included.
    #[error("embedding unavailable: {0}")]
    EmbeddingUnavailable(String),

    /// The chunk store or recency index failed; fatal to the current query.
    #[error("index unavailable: {0}")]
    IndexUnavailable(String),

    /// An append tried to reuse an existing chunk_id.
    #[error("duplicate chunk_id: {0}")]
    DuplicateId(String),
}
