use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde::Serialize;

#[derive(Debug, Clone)]
struct CacheEntry {
    body: String,
    fetched_at: Instant,
}

/// Process-lifetime cache of provider bodies that already parsed cleanly.
///
/// Expiry is checked lazily on read; nothing is evicted unless the owner calls
/// `purge_expired`, so the map grows with the number of distinct requests.
#[derive(Debug)]
pub struct ResponseCache {
    ttl: Duration,
    entries: HashMap<String, CacheEntry>,
}

impl ResponseCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn get(&self, key: &str, now: Instant) -> Option<String> {
        let entry = self.entries.get(key)?;
        if now.saturating_duration_since(entry.fetched_at) < self.ttl {
            Some(entry.body.clone())
        } else {
            None
        }
    }

    pub fn insert(&mut self, key: String, body: String, now: Instant) {
        self.entries.insert(
            key,
            CacheEntry {
                body,
                fetched_at: now,
            },
        );
    }

    /// Drops every expired entry and returns how many were removed.
    pub fn purge_expired(&mut self, now: Instant) -> usize {
        let before = self.entries.len();
        let ttl = self.ttl;
        self.entries
            .retain(|_, entry| now.saturating_duration_since(entry.fetched_at) < ttl);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Literal endpoint followed by the JSON-serialized params.
pub fn cache_key<P: Serialize + ?Sized>(endpoint: &str, params: &P) -> String {
    let serialized = serde_json::to_string(params).unwrap_or_default();
    format!("{endpoint}{serialized}")
}
