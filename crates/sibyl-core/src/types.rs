//! Shared types for the sibyl speech service.
//!
//! These are used across sibyl-lib and sibyl-cli. Keeping them here means
//! downstream consumers can depend on the types without the engine.

use serde::{Deserialize, Serialize};

/// Voices accepted by the synthesis backend.
pub const AVAILABLE_VOICES: &[&str] = &[
    "alloy", "ash", "ballad", "coral", "echo", "fable", "nova", "onyx", "sage", "shimmer", "verse",
];

// ─── Rate limiting ─────────────────────────────────────────────────────────

/// Rate limiter configuration. Read once at startup, immutable afterward.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// When false, every check is admitted and no counters are touched.
    pub enabled: bool,
    pub max_requests_per_minute: u64,
    pub max_requests_per_hour: u64,
    pub max_characters_per_hour: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_requests_per_minute: 10,
            max_requests_per_hour: 100,
            max_characters_per_hour: 50_000,
        }
    }
}

/// Point-in-time view of one client's usage against the configured maxima.
///
/// Computed on demand, never persisted. Absent or expired counters read
/// as zero.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitSnapshot {
    pub current_minute_requests: u64,
    pub max_minute_requests: u64,
    pub current_hourly_requests: u64,
    pub max_hourly_requests: u64,
    pub current_hourly_characters: u64,
    pub max_hourly_characters: u64,
}

impl RateLimitSnapshot {
    pub fn remaining_minute_requests(&self) -> u64 {
        self.max_minute_requests
            .saturating_sub(self.current_minute_requests)
    }

    pub fn remaining_hourly_requests(&self) -> u64 {
        self.max_hourly_requests
            .saturating_sub(self.current_hourly_requests)
    }

    pub fn remaining_hourly_characters(&self) -> u64 {
        self.max_hourly_characters
            .saturating_sub(self.current_hourly_characters)
    }
}

// ─── Audio ─────────────────────────────────────────────────────────────────

/// Output audio container format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    #[default]
    Mp3,
    Wav,
    Opus,
}

impl AudioFormat {
    pub fn content_type(self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "audio/mpeg",
            AudioFormat::Wav => "audio/wav",
            AudioFormat::Opus => "audio/opus",
        }
    }

    /// File extension, also the `response_format` value sent to the backend.
    pub fn as_str(self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Wav => "wav",
            AudioFormat::Opus => "opus",
        }
    }
}

// ─── Vibes ─────────────────────────────────────────────────────────────────

/// A voice-style preset: a named delivery instruction plus a sample script.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vibe {
    pub name: String,
    pub description: String,
    pub script: String,
}
