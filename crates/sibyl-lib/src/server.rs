//! HTTP API for the sibyl speech service.
//!
//! JSON only. CORS-permissive so a browser front-end can call from another
//! origin. All shared state lives in [`AppState`], constructed once at
//! startup and handed to the router; nothing here is a global.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{ConnectInfo, Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tower_http::cors::CorsLayer;
use tracing::{debug, error, info};

use sibyl_core::types::{AVAILABLE_VOICES, AudioFormat, RateLimitSnapshot};

use crate::audio_store::AudioStore;
use crate::client_id::client_identifier;
use crate::limiter::RateLimiter;
use crate::synth::SpeechSynthesizer;
use crate::vibes::VibeCatalog;

/// Longer texts are truncated, not rejected.
const MAX_TEXT_CHARS: usize = 4000;

const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Shared service objects, created at startup and torn down at shutdown.
#[derive(Clone)]
pub struct AppState {
    pub limiter: Arc<RateLimiter>,
    pub audio: Arc<AudioStore>,
    pub vibes: Arc<VibeCatalog>,
    pub synth: Arc<dyn SpeechSynthesizer>,
}

/// Build the axum router over a shared [`AppState`].
///
/// Serve with `into_make_service_with_connect_info::<SocketAddr>()` so the
/// peer address is available for client identification.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/tts", post(generate))
        .route("/audio/{id}", get(serve_audio))
        .route("/health", get(health))
        .route("/api/rate-limit-status", get(rate_limit_status))
        .route("/api/vibes", get(list_vibes))
        .route("/api/vibe/{name}", get(get_vibe))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Reclaim expired counters and audio clips every minute.
pub fn spawn_sweeper(
    limiter: Arc<RateLimiter>,
    audio: Arc<AudioStore>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            limiter.sweep();
            audio.sweep();
            debug!("sweep complete: {} cached clips", audio.len());
        }
    })
}

// ─── Synthesis ─────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct TtsRequest {
    text: String,
    voice: String,
    #[serde(default)]
    style: Option<String>,
    #[serde(default)]
    format: AudioFormat,
}

async fn generate(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(req): Json<TtsRequest>,
) -> Response {
    let client_id = client_identifier(&headers, peer);
    info!(
        "tts request from {client_id}: voice={}, format={}, text_length={}",
        req.voice,
        req.format.as_str(),
        req.text.len()
    );

    let text = req.text.trim();
    if text.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "Text cannot be empty");
    }
    if !AVAILABLE_VOICES.contains(&req.voice.as_str()) {
        return error_response(StatusCode::BAD_REQUEST, "Invalid voice selected");
    }

    let (text, truncated) = truncate_chars(text, MAX_TEXT_CHARS);
    let char_count = text.chars().count();

    if !state.limiter.check(&client_id, char_count) {
        return rate_limited_response(state.limiter.snapshot(&client_id));
    }

    let audio = match state
        .synth
        .synthesize(text, &req.voice, req.style.as_deref(), req.format)
        .await
    {
        Ok(audio) => audio,
        Err(e) => {
            error!("synthesis failed for {client_id}: {e}");
            return error_response(StatusCode::BAD_GATEWAY, "Failed to generate voice");
        }
    };

    let size = audio.len();
    let id = state.audio.put(audio);
    let snap = state.limiter.snapshot(&client_id);
    info!("tts generated for {client_id}: audio {id}, {size} bytes");

    Json(serde_json::json!({
        "audioId": id,
        "audioUrl": format!("/audio/{id}?format={}", req.format.as_str()),
        "size": size,
        "truncated": truncated,
        "rateLimit": {
            "remainingMinuteRequests": snap.remaining_minute_requests(),
            "remainingHourlyRequests": snap.remaining_hourly_requests(),
            "remainingHourlyCharacters": snap.remaining_hourly_characters(),
        },
    }))
    .into_response()
}

fn rate_limited_response(snap: RateLimitSnapshot) -> Response {
    (
        StatusCode::TOO_MANY_REQUESTS,
        Json(serde_json::json!({
            "error": "Rate limit exceeded",
            "details": format!(
                "You have used {}/{} requests this minute, {}/{} requests this hour, and {}/{} characters this hour",
                snap.current_minute_requests, snap.max_minute_requests,
                snap.current_hourly_requests, snap.max_hourly_requests,
                snap.current_hourly_characters, snap.max_hourly_characters,
            ),
            "remainingMinuteRequests": snap.remaining_minute_requests(),
            "remainingHourlyRequests": snap.remaining_hourly_requests(),
            "remainingHourlyCharacters": snap.remaining_hourly_characters(),
        })),
    )
        .into_response()
}

// ─── Audio delivery ────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct AudioQuery {
    #[serde(default)]
    download: bool,
    #[serde(default)]
    format: AudioFormat,
}

async fn serve_audio(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(q): Query<AudioQuery>,
) -> Response {
    let Some(data) = state.audio.get(&id) else {
        return error_response(StatusCode::NOT_FOUND, "Audio not found or expired");
    };

    let disposition = if q.download {
        format!("attachment; filename=\"audio_{id}.{}\"", q.format.as_str())
    } else {
        "inline".to_string()
    };

    info!("serving audio {id}: {} bytes, download={}", data.len(), q.download);
    (
        [
            (header::CONTENT_TYPE, q.format.content_type().to_string()),
            (
                header::CACHE_CONTROL,
                "no-cache, no-store, must-revalidate".to_string(),
            ),
            (header::ACCEPT_RANGES, "bytes".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        data,
    )
        .into_response()
}

// ─── Diagnostics ───────────────────────────────────────────────────────────

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let config = state.limiter.config();
    Json(serde_json::json!({
        "status": "ok",
        "audioCacheSize": state.audio.len(),
        "rateLimits": {
            "enabled": config.enabled,
            "maxRequestsPerMinute": config.max_requests_per_minute,
            "maxRequestsPerHour": config.max_requests_per_hour,
            "maxCharactersPerHour": config.max_characters_per_hour,
        },
    }))
}

async fn rate_limit_status(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Json<RateLimitSnapshot> {
    let client_id = client_identifier(&headers, peer);
    Json(state.limiter.snapshot(&client_id))
}

// ─── Vibes ─────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct VibeQuery {
    #[serde(default = "default_vibe_count")]
    count: usize,
}

fn default_vibe_count() -> usize {
    6
}

async fn list_vibes(State(state): State<AppState>, Query(q): Query<VibeQuery>) -> Response {
    Json(state.vibes.random(q.count)).into_response()
}

async fn get_vibe(State(state): State<AppState>, Path(name): Path<String>) -> Response {
    match state.vibes.by_name(&name) {
        Some(vibe) => Json(vibe).into_response(),
        None => error_response(StatusCode::NOT_FOUND, "Unknown vibe"),
    }
}

// ─── Helpers ───────────────────────────────────────────────────────────────

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

/// Cut `text` to at most `max` characters on a char boundary.
fn truncate_chars(text: &str, max: usize) -> (&str, bool) {
    match text.char_indices().nth(max) {
        Some((idx, _)) => (&text[..idx], true),
        None => (text, false),
    }
}
