//! Append-only chunk store with an integrated recency index.
//!
//! The store owns two views of the same records, maintained in one critical
//! section so they can never disagree:
//!
//! - a primary map keyed by `chunk_id`, and
//! - a recency index keyed by publication timestamp, used for range
//!   selection of candidates inside a query's `[now - days, now]` window.
//!
//! Records are shared via `Arc` behind a `std::sync::RwLock`: reads never
//! block each other, and a [`CandidateWindow`] taken before an append keeps
//! pointing at the records it saw. No update or delete operations exist;
//! corrections arrive as new chunks.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::error::{Result, RetrievalError};
use crate::models::{Chunk, Newsletter};

/// A chunk joined with its owning newsletter, as stored.
#[derive(Debug)]
pub struct ChunkRecord {
    pub chunk: Chunk,
    pub newsletter: Arc<Newsletter>,
}

impl ChunkRecord {
    pub fn published_at(&self) -> DateTime<Utc> {
        self.newsletter.published_at
    }
}

struct StoreInner {
    newsletters: HashMap<String, Arc<Newsletter>>,
    by_id: HashMap<String, Arc<ChunkRecord>>,
    /// Recency index: publication timestamp (seconds) to the records
    /// published at that instant.
    by_date: BTreeMap<i64, Vec<Arc<ChunkRecord>>>,
}

/// Append-only repository of ingested chunks.
pub struct ChunkStore {
    inner: RwLock<StoreInner>,
}

impl ChunkStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(StoreInner {
                newsletters: HashMap::new(),
                by_id: HashMap::new(),
                by_date: BTreeMap::new(),
            }),
        }
    }

    /// Append a newsletter and its chunks atomically.
    ///
    /// Both the primary map and the recency index are updated under one
    /// write lock, so a concurrent query sees either all of the appended
    /// chunks or none of them. Fails without writing anything if any
    /// `chunk_id` already exists or a chunk does not reference `newsletter`.
    pub fn append(&self, newsletter: Newsletter, chunks: Vec<Chunk>) -> Result<()> {
        let mut inner = self
            .inner
            .write()
            .map_err(|_| RetrievalError::IndexUnavailable("store lock poisoned".to_string()))?;

        {
            let mut batch_ids = HashSet::with_capacity(chunks.len());
            for chunk in &chunks {
                if chunk.message_id != newsletter.message_id {
                    return Err(RetrievalError::Validation(format!(
                        "chunk {} references message_id {} but is being appended to {}",
                        chunk.chunk_id, chunk.message_id, newsletter.message_id
                    )));
                }
                // An id is a duplicate whether it was stored earlier or
                // repeats within this batch.
                if inner.by_id.contains_key(&chunk.chunk_id)
                    || !batch_ids.insert(chunk.chunk_id.as_str())
                {
                    return Err(RetrievalError::DuplicateId(chunk.chunk_id.clone()));
                }
            }
        }

        // Reuse the stored newsletter when later chunks arrive for an issue
        // that was already ingested.
        let newsletter = inner
            .newsletters
            .entry(newsletter.message_id.clone())
            .or_insert_with(|| Arc::new(newsletter))
            .clone();

        let ts = newsletter.published_at.timestamp();
        let appended = chunks.len();

        for chunk in chunks {
            let record = Arc::new(ChunkRecord {
                chunk,
                newsletter: newsletter.clone(),
            });
            inner
                .by_id
                .insert(record.chunk.chunk_id.clone(), record.clone());
            inner.by_date.entry(ts).or_default().push(record);
        }

        debug!(
            message_id = %newsletter.message_id,
            chunks = appended,
            "appended newsletter chunks"
        );
        Ok(())
    }

    /// Look up a chunk by id.
    pub fn get(&self, chunk_id: &str) -> Result<Arc<ChunkRecord>> {
        let inner = self
            .inner
            .read()
            .map_err(|_| RetrievalError::IndexUnavailable("store lock poisoned".to_string()))?;
        inner
            .by_id
            .get(chunk_id)
            .cloned()
            .ok_or_else(|| RetrievalError::NotFound(format!("chunk {}", chunk_id)))
    }

    /// Select the chunks published within `[now - days, now]`.
    ///
    /// Returns a consistent snapshot: the window holds `Arc` pointers taken
    /// under the read lock, so appends that land afterwards are not
    /// observable through it. The range scan is bounded by the recency
    /// index, not a full corpus walk.
    pub fn candidates(&self, now: DateTime<Utc>, days: i64) -> Result<CandidateWindow> {
        // A `days` value large enough to overflow the date arithmetic just
        // means an unbounded lower edge.
        let from = Duration::try_days(days)
            .and_then(|d| now.checked_sub_signed(d))
            .map(|t| t.timestamp())
            .unwrap_or(i64::MIN);
        let to = now.timestamp();

        let inner = self
            .inner
            .read()
            .map_err(|_| RetrievalError::IndexUnavailable("store lock poisoned".to_string()))?;

        let records: Vec<Arc<ChunkRecord>> = inner
            .by_date
            .range(from..=to)
            .flat_map(|(_, recs)| recs.iter().cloned())
            .collect();

        Ok(CandidateWindow { records })
    }

    pub fn chunk_count(&self) -> usize {
        self.inner.read().map(|i| i.by_id.len()).unwrap_or(0)
    }

    pub fn newsletter_count(&self) -> usize {
        self.inner.read().map(|i| i.newsletters.len()).unwrap_or(0)
    }
}

impl Default for ChunkStore {
    fn default() -> Self {
        Self::new()
    }
}

/// A finite, restartable sequence of candidate records for one query.
///
/// The window is immutable once taken; [`iter`](CandidateWindow::iter) can
/// be called any number of times.
pub struct CandidateWindow {
    records: Vec<Arc<ChunkRecord>>,
}

impl CandidateWindow {
    pub fn iter(&self) -> impl Iterator<Item = &Arc<ChunkRecord>> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
