//! Token-bucket admission control, applied before any retrieval work.
//!
//! Each caller (API key or client IP) owns one bucket with a fixed burst
//! capacity and a steady refill rate. A query consumes its token before the
//! engine does anything, so abandoned requests still count against the
//! caller and overload protection holds.
//!
//! Buckets live in a fixed set of hash-sharded maps, each behind its own
//! `Mutex`. Contention is scoped to a shard; unrelated callers on other
//! shards never serialize against each other.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Mutex;
use std::time::Instant;

use tracing::debug;

use crate::config::RateLimitConfig;

const SHARD_COUNT: usize = 16;

struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// Per-caller token-bucket rate limiter.
pub struct AdmissionController {
    shards: Vec<Mutex<HashMap<String, Bucket>>>,
    capacity: f64,
    refill_per_sec: f64,
}

impl AdmissionController {
    pub fn new(config: &RateLimitConfig) -> Self {
        let shards = (0..SHARD_COUNT)
            .map(|_| Mutex::new(HashMap::new()))
            .collect();
        Self {
            shards,
            capacity: f64::from(config.capacity),
            refill_per_sec: config.refill_per_minute / 60.0,
        }
    }

    /// Try to consume one token for `caller_id`. Returns `false` when the
    /// bucket is empty; the caller maps that to a 429.
    pub fn allow(&self, caller_id: &str) -> bool {
        self.allow_at(caller_id, Instant::now())
    }

    fn allow_at(&self, caller_id: &str, now: Instant) -> bool {
        let shard = &self.shards[self.shard_index(caller_id)];
        let mut buckets = match shard.lock() {
            Ok(guard) => guard,
            // A poisoned shard still holds valid bucket state.
            Err(poisoned) => poisoned.into_inner(),
        };

        let bucket = buckets.entry(caller_id.to_string()).or_insert(Bucket {
            tokens: self.capacity,
            last_refill: now,
        });

        let elapsed = now.saturating_duration_since(bucket.last_refill);
        bucket.tokens =
            (bucket.tokens + elapsed.as_secs_f64() * self.refill_per_sec).min(self.capacity);
        bucket.last_refill = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            debug!(caller = caller_id, "admission denied");
            false
        }
    }

    fn shard_index(&self, caller_id: &str) -> usize {
        let mut hasher = DefaultHasher::new();
        caller_id.hash(&mut hasher);
        (hasher.finish() as usize) % SHARD_COUNT
    }
}
