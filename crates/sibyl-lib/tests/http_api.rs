//! End-to-end tests for the HTTP API over a loopback listener, with the
//! synthesis backend stubbed out.

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use sibyl_core::types::{AudioFormat, RateLimitConfig};
use sibyl_lib::audio_store::AudioStore;
use sibyl_lib::limiter::RateLimiter;
use sibyl_lib::server::{AppState, router};
use sibyl_lib::synth::{SpeechSynthesizer, SynthError};
use sibyl_lib::vibes::VibeCatalog;

/// Echoes the request back as fake audio bytes.
struct StubSynth;

#[async_trait]
impl SpeechSynthesizer for StubSynth {
    async fn synthesize(
        &self,
        text: &str,
        voice: &str,
        _style: Option<&str>,
        _format: AudioFormat,
    ) -> Result<Bytes, SynthError> {
        Ok(Bytes::from(format!("audio:{voice}:{text}")))
    }
}

struct FailingSynth;

#[async_trait]
impl SpeechSynthesizer for FailingSynth {
    async fn synthesize(
        &self,
        _text: &str,
        _voice: &str,
        _style: Option<&str>,
        _format: AudioFormat,
    ) -> Result<Bytes, SynthError> {
        Err(SynthError::Backend {
            status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            body: "backend exploded".into(),
        })
    }
}

async fn spawn_app(config: RateLimitConfig, synth: Arc<dyn SpeechSynthesizer>) -> String {
    let state = AppState {
        limiter: Arc::new(RateLimiter::new(config)),
        audio: Arc::new(AudioStore::new()),
        vibes: Arc::new(VibeCatalog::load()),
        synth,
    };
    let app = router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });
    format!("http://{addr}")
}

async fn default_app() -> String {
    spawn_app(RateLimitConfig::default(), Arc::new(StubSynth)).await
}

#[tokio::test]
async fn synthesize_then_fetch_round_trip() {
    let base = default_app().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/api/tts"))
        .json(&serde_json::json!({ "text": "hello there", "voice": "alloy" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["truncated"], false);
    assert_eq!(body["size"], "audio:alloy:hello there".len());
    let audio_url = body["audioUrl"].as_str().unwrap();

    let audio = client
        .get(format!("{base}{audio_url}"))
        .send()
        .await
        .unwrap();
    assert_eq!(audio.status(), 200);
    assert_eq!(
        audio.headers()["content-type"].to_str().unwrap(),
        "audio/mpeg"
    );
    assert_eq!(audio.bytes().await.unwrap().as_ref(), b"audio:alloy:hello there");
}

#[tokio::test]
async fn blank_text_and_unknown_voice_are_rejected() {
    let base = default_app().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/api/tts"))
        .json(&serde_json::json!({ "text": "   ", "voice": "alloy" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let resp = client
        .post(format!("{base}/api/tts"))
        .json(&serde_json::json!({ "text": "hi", "voice": "darth-vader" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Invalid voice selected");
}

#[tokio::test]
async fn unknown_audio_id_is_404() {
    let base = default_app().await;
    let resp = reqwest::get(format!("{base}/audio/not-a-real-id")).await.unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn rate_limit_returns_429_per_client() {
    let config = RateLimitConfig {
        max_requests_per_minute: 2,
        ..Default::default()
    };
    let base = spawn_app(config, Arc::new(StubSynth)).await;
    let client = reqwest::Client::new();

    let post = |xff: &'static str| {
        client
            .post(format!("{base}/api/tts"))
            .header("x-forwarded-for", xff)
            .json(&serde_json::json!({ "text": "hi", "voice": "nova" }))
            .send()
    };

    assert_eq!(post("203.0.113.7").await.unwrap().status(), 200);
    assert_eq!(post("203.0.113.7").await.unwrap().status(), 200);

    let resp = post("203.0.113.7").await.unwrap();
    assert_eq!(resp.status(), 429);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Rate limit exceeded");
    assert_eq!(body["remainingMinuteRequests"], 0);

    // A different client is unaffected.
    assert_eq!(post("198.51.100.1").await.unwrap().status(), 200);
}

#[tokio::test]
async fn rate_limit_status_tracks_usage() {
    let base = default_app().await;
    let client = reqwest::Client::new();

    client
        .post(format!("{base}/api/tts"))
        .json(&serde_json::json!({ "text": "count me", "voice": "echo" }))
        .send()
        .await
        .unwrap();

    let status: serde_json::Value = client
        .get(format!("{base}/api/rate-limit-status"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["currentMinuteRequests"], 1);
    assert_eq!(status["currentHourlyCharacters"], "count me".len());
    assert_eq!(status["maxMinuteRequests"], 10);
}

#[tokio::test]
async fn synthesis_failure_maps_to_502() {
    let base = spawn_app(RateLimitConfig::default(), Arc::new(FailingSynth)).await;

    let resp = reqwest::Client::new()
        .post(format!("{base}/api/tts"))
        .json(&serde_json::json!({ "text": "hi", "voice": "sage" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 502);
}

#[tokio::test]
async fn health_reports_cache_and_limits() {
    let base = default_app().await;

    let body: serde_json::Value = reqwest::get(format!("{base}/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["audioCacheSize"], 0);
    assert_eq!(body["rateLimits"]["enabled"], true);
    assert_eq!(body["rateLimits"]["maxRequestsPerMinute"], 10);
}

#[tokio::test]
async fn vibe_endpoints_sample_and_look_up() {
    let base = default_app().await;

    let vibes: serde_json::Value = reqwest::get(format!("{base}/api/vibes?count=3"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(vibes.as_array().unwrap().len(), 3);

    let resp = reqwest::get(format!("{base}/api/vibe/calm")).await.unwrap();
    assert_eq!(resp.status(), 200);
    let vibe: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(vibe["name"], "Calm");

    let resp = reqwest::get(format!("{base}/api/vibe/does-not-exist"))
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}
