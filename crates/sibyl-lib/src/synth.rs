//! Outbound speech synthesis.
//!
//! Thin client for an OpenAI-compatible `/v1/audio/speech` endpoint. The
//! [`SpeechSynthesizer`] trait is the seam the HTTP layer calls through, so
//! handlers can be exercised with a stub backend in tests. The call is
//! time-bounded here; the rate limiter and audio store hold no locks while
//! it is in flight.

use async_trait::async_trait;
use bytes::Bytes;
use tracing::{debug, error, info};

use sibyl_core::types::AudioFormat;

/// Request timeout for the synthesis call.
const REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(120);

#[derive(Debug, thiserror::Error)]
pub enum SynthError {
    #[error("synthesis request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("synthesis backend returned {status}: {body}")]
    Backend {
        status: reqwest::StatusCode,
        body: String,
    },
}

#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Turn `text` into encoded audio. `style` is a free-form delivery
    /// instruction forwarded to the backend when present.
    async fn synthesize(
        &self,
        text: &str,
        voice: &str,
        style: Option<&str>,
        format: AudioFormat,
    ) -> Result<Bytes, SynthError>;
}

/// Synthesis backend configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct SynthConfig {
    /// Base URL, e.g. `https://api.openai.com`.
    pub endpoint: String,
    pub model: String,
    /// Bearer token. Optional for local backends that skip auth.
    pub api_key: Option<String>,
}

/// reqwest-backed [`SpeechSynthesizer`].
pub struct HttpSynthesizer {
    client: reqwest::Client,
    config: SynthConfig,
}

impl HttpSynthesizer {
    pub fn new(config: SynthConfig) -> Self {
        info!(
            "synthesis backend: {} (model {})",
            config.endpoint, config.model
        );
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("failed to build HTTP client");
        Self { client, config }
    }
}

#[async_trait]
impl SpeechSynthesizer for HttpSynthesizer {
    async fn synthesize(
        &self,
        text: &str,
        voice: &str,
        style: Option<&str>,
        format: AudioFormat,
    ) -> Result<Bytes, SynthError> {
        let url = format!("{}/v1/audio/speech", self.config.endpoint);

        let mut body = serde_json::json!({
            "model": self.config.model,
            "input": text,
            "voice": voice,
            "response_format": format.as_str(),
        });
        if let Some(style) = style.map(str::trim).filter(|s| !s.is_empty()) {
            body["instructions"] = serde_json::Value::from(style);
        }

        debug!("POST {url}: {} chars, voice {voice}", text.len());

        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let resp = request.send().await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            error!("synthesis backend error {status}: {body}");
            return Err(SynthError::Backend { status, body });
        }

        let audio = resp.bytes().await?;
        debug!("synthesized {} bytes of {}", audio.len(), format.as_str());
        Ok(audio)
    }
}
