//! Ephemeral audio cache.
//!
//! Bridges generation and delivery: synthesized audio is stored under a
//! fresh unguessable id and fetched by the client shortly after. Entries
//! live for ten minutes and the store never holds more than
//! [`MAX_ENTRIES`] clips; everything is in-memory and lost on restart by
//! design.

use std::time::{Duration, Instant};

use bytes::Bytes;
use dashmap::DashMap;
use tracing::{debug, warn};
use uuid::Uuid;

const DEFAULT_TTL: Duration = Duration::from_secs(600);
const MAX_ENTRIES: usize = 1000;

struct AudioEntry {
    /// Immutable once stored; replaced wholesale under a new id, never edited.
    data: Bytes,
    stored_at: Instant,
}

/// TTL-bounded, capacity-bounded id → bytes cache. Share behind an `Arc`.
pub struct AudioStore {
    entries: DashMap<String, AudioEntry>,
    ttl: Duration,
    max_entries: usize,
}

impl Default for AudioStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioStore {
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_TTL, MAX_ENTRIES)
    }

    fn with_limits(ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            max_entries,
        }
    }

    /// Store a clip and return its generated id.
    ///
    /// Ids are random UUIDv4 in canonical form; a theoretical collision
    /// silently overwrites the older entry.
    pub fn put(&self, data: Bytes) -> String {
        if self.entries.len() >= self.max_entries {
            self.evict();
        }

        let id = Uuid::new_v4().to_string();
        debug!("stored audio {id}: {} bytes", data.len());
        self.entries.insert(
            id.clone(),
            AudioEntry {
                data,
                stored_at: Instant::now(),
            },
        );
        id
    }

    /// Fetch a clip. `None` for unknown ids and for entries past their TTL;
    /// an expired entry is dropped on the way out.
    pub fn get(&self, id: &str) -> Option<Bytes> {
        match self.entries.get(id) {
            Some(entry) if entry.stored_at.elapsed() < self.ttl => {
                debug!("retrieved audio {id}: {} bytes", entry.data.len());
                return Some(entry.data.clone());
            }
            Some(_) => {} // expired, fall through to remove
            None => {
                warn!("audio not found: {id}");
                return None;
            }
        }
        self.entries.remove(id);
        None
    }

    /// Explicit eviction. Removing an absent id is not an error.
    pub fn remove(&self, id: &str) {
        self.entries.remove(id);
        debug!("removed audio {id}");
    }

    /// Approximate entry count, diagnostics only.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop entries past their TTL. Called periodically from a background
    /// task; `get` also expires lazily.
    pub fn sweep(&self) {
        let now = Instant::now();
        self.entries
            .retain(|_, e| now.duration_since(e.stored_at) < self.ttl);
    }

    /// Make room for one insert: sweep expired entries, then drop the oldest
    /// clips until under capacity.
    fn evict(&self) {
        self.sweep();
        while self.entries.len() >= self.max_entries {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|e| e.stored_at)
                .map(|e| e.key().clone());
            match oldest {
                Some(id) => {
                    warn!("audio store over capacity, evicting {id}");
                    self.entries.remove(&id);
                }
                None => break,
            }
        }
    }
}
