//! Per-client rate limiting over fixed time windows.
//!
//! Three independent counters per client: requests per minute, requests per
//! hour, and synthesized characters per hour. Each counter lives in its own
//! capacity-bounded map and is visible for a fixed window measured from its
//! first increment; after that it is logically gone and the next access
//! starts a fresh window at zero.
//!
//! `check` increments before comparing and never rolls an increment back on
//! rejection, so a rejected-but-retried request is never free. Any internal
//! storage fault degrades to "allowed" (fail open): admission control is
//! advisory and must not become an outage.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::{debug, error, warn};

use sibyl_core::types::{RateLimitConfig, RateLimitSnapshot};

const MINUTE_WINDOW: Duration = Duration::from_secs(60);
const HOUR_WINDOW: Duration = Duration::from_secs(3600);

/// Maximum distinct client keys tracked per window-kind. Under pressure the
/// limiter fails open for new clients rather than evicting live counters.
const MAX_TRACKED_CLIENTS: usize = 10_000;

/// Fault raised by counter storage. Recovered inside [`RateLimiter::check`],
/// never surfaced to callers.
#[derive(Debug, thiserror::Error)]
pub enum CounterError {
    #[error("counter storage full ({0} tracked keys)")]
    CapacityExhausted(usize),
}

// ─── Counter storage ───────────────────────────────────────────────────────

/// One client's counter for a single window-kind.
struct CounterWindow {
    value: AtomicU64,
    created_at: Instant,
}

impl Default for CounterWindow {
    fn default() -> Self {
        Self {
            value: AtomicU64::new(0),
            created_at: Instant::now(),
        }
    }
}

impl CounterWindow {
    fn expired(&self, ttl: Duration) -> bool {
        self.created_at.elapsed() >= ttl
    }
}

/// Capacity-bounded map of expiring counters for one window-kind.
///
/// Expired entries are replaced lazily on access; [`CounterStore::sweep`]
/// reclaims the rest. The capacity bound is advisory: concurrent inserts may
/// overshoot it by a few keys.
struct CounterStore {
    entries: DashMap<String, CounterWindow>,
    ttl: Duration,
    max_keys: usize,
}

impl CounterStore {
    fn new(ttl: Duration, max_keys: usize) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            max_keys,
        }
    }

    /// Add `amount` to the client's counter, starting a fresh window if none
    /// is live, and return the post-increment value.
    fn increment(&self, key: &str, amount: u64) -> Result<u64, CounterError> {
        if !self.entries.contains_key(key) && self.entries.len() >= self.max_keys {
            self.sweep();
            if self.entries.len() >= self.max_keys {
                return Err(CounterError::CapacityExhausted(self.max_keys));
            }
        }

        let mut window = self.entries.entry(key.to_owned()).or_default();
        if window.expired(self.ttl) {
            *window = CounterWindow::default();
        }
        Ok(window.value.fetch_add(amount, Ordering::Relaxed) + amount)
    }

    /// Current value, 0 when absent or expired. Read-only.
    fn get(&self, key: &str) -> u64 {
        self.entries
            .get(key)
            .filter(|w| !w.expired(self.ttl))
            .map(|w| w.value.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Drop every entry past its TTL.
    fn sweep(&self) {
        self.entries.retain(|_, w| !w.expired(self.ttl));
    }
}

// ─── Rate limiter ──────────────────────────────────────────────────────────

/// Multi-window rate limiter. Cheap to share behind an `Arc`; all methods
/// take `&self`.
pub struct RateLimiter {
    config: RateLimitConfig,
    minute_requests: CounterStore,
    hourly_requests: CounterStore,
    hourly_characters: CounterStore,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self::with_windows(config, MINUTE_WINDOW, HOUR_WINDOW)
    }

    fn with_windows(config: RateLimitConfig, minute_window: Duration, hour_window: Duration) -> Self {
        Self {
            config,
            minute_requests: CounterStore::new(minute_window, MAX_TRACKED_CLIENTS),
            hourly_requests: CounterStore::new(hour_window, MAX_TRACKED_CLIENTS),
            hourly_characters: CounterStore::new(hour_window, MAX_TRACKED_CLIENTS),
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Decide whether `client_id` may synthesize `text_length` characters.
    ///
    /// Counters are incremented in order (minute requests, hourly requests,
    /// hourly characters); the first exceeded limit rejects, and later
    /// counters are then left untouched. Increments already applied stay
    /// applied either way.
    pub fn check(&self, client_id: &str, text_length: usize) -> bool {
        if !self.config.enabled {
            return true;
        }

        match self.try_check(client_id, text_length as u64) {
            Ok(allowed) => allowed,
            Err(e) => {
                error!("rate limit check failed for {client_id}, failing open: {e}");
                true
            }
        }
    }

    fn try_check(&self, client_id: &str, text_length: u64) -> Result<bool, CounterError> {
        let minute = self.minute_requests.increment(client_id, 1)?;
        if minute > self.config.max_requests_per_minute {
            warn!("rate limit exceeded for {client_id}: {minute} requests this minute");
            return Ok(false);
        }

        let hourly = self.hourly_requests.increment(client_id, 1)?;
        if hourly > self.config.max_requests_per_hour {
            warn!("hourly request limit exceeded for {client_id}: {hourly} requests this hour");
            return Ok(false);
        }

        let chars = self.hourly_characters.increment(client_id, text_length)?;
        if chars > self.config.max_characters_per_hour {
            warn!("hourly character limit exceeded for {client_id}: {chars} characters this hour");
            return Ok(false);
        }

        debug!(
            "rate limit check passed for {client_id}: minute={minute}, hourly_requests={hourly}, hourly_chars={chars}"
        );
        Ok(true)
    }

    /// Current usage for `client_id` alongside the configured maxima.
    /// Read-only, no side effects.
    pub fn snapshot(&self, client_id: &str) -> RateLimitSnapshot {
        RateLimitSnapshot {
            current_minute_requests: self.minute_requests.get(client_id),
            max_minute_requests: self.config.max_requests_per_minute,
            current_hourly_requests: self.hourly_requests.get(client_id),
            max_hourly_requests: self.config.max_requests_per_hour,
            current_hourly_characters: self.hourly_characters.get(client_id),
            max_hourly_characters: self.config.max_characters_per_hour,
        }
    }

    /// Reclaim expired counters. Called periodically from a background task.
    pub fn sweep(&self) {
        self.minute_requests.sweep();
        self.hourly_requests.sweep();
        self.hourly_characters.sweep();
    }
}
