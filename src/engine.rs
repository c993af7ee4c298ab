//! Retrieval engine orchestration.
//!
//! Composes the admission controller, recency index, query embedder, and
//! similarity ranker into the single query path behind the API:
//!
//! ```text
//! request ──▶ validate ──▶ admission ──▶ candidates ──▶ embed ──▶ rank ──▶ response
//!              (400)         (429)      (recency idx)  (1 retry)  (top-K)
//! ```
//!
//! Validation runs first and never consumes a token; admission runs before
//! any expensive work and its token is never refunded, even if the query is
//! later aborted. The embedder call is the only external suspension point;
//! it gets exactly one retry after a backoff, and a second failure surfaces
//! as [`RetrievalError::EmbeddingUnavailable`] rather than a partial result.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::embedding::QueryEmbedder;
use crate::error::{Result, RetrievalError};
use crate::limiter::AdmissionController;
use crate::models::{ChunkMetadata, ContextChunk, ContextQuery, ContextResponse};
use crate::ranker;
use crate::store::ChunkStore;

/// Orchestrates one retrieval query end to end.
pub struct RetrievalEngine {
    store: Arc<ChunkStore>,
    embedder: Arc<dyn QueryEmbedder>,
    limiter: Arc<AdmissionController>,
    retry_backoff: Duration,
}

impl RetrievalEngine {
    pub fn new(
        store: Arc<ChunkStore>,
        embedder: Arc<dyn QueryEmbedder>,
        limiter: Arc<AdmissionController>,
        retry_backoff: Duration,
    ) -> Self {
        Self {
            store,
            embedder,
            limiter,
            retry_backoff,
        }
    }

    /// Run a query for `caller_id`, with the recency window anchored at the
    /// current time.
    pub async fn query(&self, caller_id: &str, query: &ContextQuery) -> Result<ContextResponse> {
        self.query_at(caller_id, query, Utc::now()).await
    }

    /// Like [`query`](Self::query), with an explicit `now` anchor.
    pub async fn query_at(
        &self,
        caller_id: &str,
        query: &ContextQuery,
        now: DateTime<Utc>,
    ) -> Result<ContextResponse> {
        query.validate()?;

        if !self.limiter.allow(caller_id) {
            return Err(RetrievalError::RateLimited);
        }

        let window = self.store.candidates(now, query.days)?;
        debug!(
            days = query.days,
            candidates = window.len(),
            "selected recency window"
        );

        if window.is_empty() {
            // A valid "no content in window" state, not an error.
            return Ok(ContextResponse::new(Vec::new()));
        }

        let query_vec = self.embed_with_retry(&query.user_query).await?;

        let ranked = ranker::rank(&query_vec, &window, query.max_results);

        let chunks: Vec<ContextChunk> = ranked
            .into_iter()
            .map(|(record, score)| ContextChunk {
                content: record.chunk.content.clone(),
                metadata: ChunkMetadata {
                    primary_url: record.newsletter.primary_url.clone(),
                    date: record.newsletter.published_at,
                    subject: record.newsletter.subject.clone(),
                    newsletter_name: record.newsletter.newsletter_name.clone(),
                    message_id: record.newsletter.message_id.clone(),
                },
                score,
            })
            .collect();

        info!(
            caller = caller_id,
            results = chunks.len(),
            "retrieval complete"
        );
        Ok(ContextResponse::new(chunks))
    }

    /// One attempt plus one bounded retry. Anything past that is a hard
    /// failure for the current query.
    async fn embed_with_retry(&self, text: &str) -> Result<Vec<f32>> {
        match self.embedder.embed(text).await {
            Ok(vec) => Ok(vec),
            Err(first) => {
                warn!(error = %first, "embedding failed, retrying once");
                tokio::time::sleep(self.retry_backoff).await;
                self.embedder.embed(text).await
            }
        }
    }
}
