//! Ingestion boundary: load pre-embedded newsletter bundles into the store.
//!
//! The engine never parses raw newsletter bodies. Upstream tooling (mail
//! fetching, chunking, embedding) produces a JSON file of bundles, one per
//! newsletter issue:
//!
//! ```json
//! [
//!   {
//!     "newsletter": {
//!       "message_id": "<abc@mail.example>",
//!       "newsletter_name": "AI Digest",
//!       "subject": "Issue 42",
//!       "primary_url": "https://digest.example/42",
//!       "published_at": "2025-11-03T09:00:00Z"
//!     },
//!     "chunks": [
//!       { "content": "…", "embedding": [0.1, 0.2] },
//!       { "chunk_id": "42-intro", "content": "…", "embedding": [0.3, 0.4] }
//!     ]
//!   }
//! ]
//! ```
//!
//! `chunk_id` is optional; a UUID is assigned when omitted. Appends are
//! atomic per bundle, so a duplicate id rejects that bundle whole.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::info;

use crate::models::{Chunk, Newsletter};
use crate::store::ChunkStore;

#[derive(Debug, Deserialize)]
pub struct NewsletterBundle {
    pub newsletter: Newsletter,
    pub chunks: Vec<BundleChunk>,
}

/// A chunk as it appears in an ingest file. The `message_id` back-reference
/// is implied by the enclosing bundle.
#[derive(Debug, Deserialize)]
pub struct BundleChunk {
    #[serde(default)]
    pub chunk_id: Option<String>,
    pub content: String,
    pub embedding: Vec<f32>,
}

/// Counts reported after an ingest run.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub newsletters: usize,
    pub chunks: usize,
}

/// Append every bundle in `bundles` to the store.
pub fn ingest_bundles(store: &ChunkStore, bundles: Vec<NewsletterBundle>) -> Result<IngestStats> {
    let mut stats = IngestStats::default();

    for bundle in bundles {
        let message_id = bundle.newsletter.message_id.clone();
        anyhow::ensure!(
            !message_id.trim().is_empty(),
            "newsletter with empty message_id"
        );

        let chunks: Vec<Chunk> = bundle
            .chunks
            .into_iter()
            .map(|c| {
                anyhow::ensure!(
                    !c.embedding.is_empty(),
                    "chunk in {} has an empty embedding",
                    message_id
                );
                Ok(Chunk {
                    chunk_id: c
                        .chunk_id
                        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
                    message_id: message_id.clone(),
                    content: c.content,
                    embedding: c.embedding,
                })
            })
            .collect::<Result<_>>()?;

        stats.chunks += chunks.len();
        stats.newsletters += 1;
        store
            .append(bundle.newsletter, chunks)
            .with_context(|| format!("appending newsletter {}", message_id))?;
    }

    info!(
        newsletters = stats.newsletters,
        chunks = stats.chunks,
        "ingest complete"
    );
    Ok(stats)
}

/// Load a JSON bundle file and append its contents.
pub fn ingest_file(store: &ChunkStore, path: &Path) -> Result<IngestStats> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read ingest file: {}", path.display()))?;
    let bundles: Vec<NewsletterBundle> =
        serde_json::from_str(&content).with_context(|| "Failed to parse ingest file")?;
    ingest_bundles(store, bundles)
}
