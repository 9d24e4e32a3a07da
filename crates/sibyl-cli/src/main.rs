//! sibyl CLI — speech service front-end.
//!
//! ```text
//! sibyl serve [--port 8080] [--host 127.0.0.1] [--no-rate-limit] [limit flags]
//! sibyl speak "hello world" --voice nova [--server http://localhost:8080]
//! sibyl status / limits [--server ...]
//! ```
//!
//! The API key for the synthesis backend is read from `SIBYL_API_KEY`
//! (falling back to `OPENAI_API_KEY`); local backends may run without one.

use std::net::SocketAddr;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use sibyl_core::types::RateLimitConfig;
use sibyl_lib::audio_store::AudioStore;
use sibyl_lib::limiter::RateLimiter;
use sibyl_lib::server::{AppState, router, spawn_sweeper};
use sibyl_lib::synth::{HttpSynthesizer, SynthConfig};
use sibyl_lib::vibes::VibeCatalog;

/// sibyl — text-to-speech web service
#[derive(Parser)]
#[command(name = "sibyl", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the sibyl service
    Serve {
        /// Listen port
        #[arg(long, default_value = "8080")]
        port: u16,
        /// Listen host
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        /// Synthesis backend base URL
        #[arg(long, default_value = "https://api.openai.com")]
        synth_url: String,
        /// Synthesis model
        #[arg(long, default_value = "gpt-4o-mini-tts")]
        model: String,
        /// Disable rate limiting entirely
        #[arg(long)]
        no_rate_limit: bool,
        /// Requests allowed per client per minute
        #[arg(long, default_value = "10")]
        max_requests_per_minute: u64,
        /// Requests allowed per client per hour
        #[arg(long, default_value = "100")]
        max_requests_per_hour: u64,
        /// Characters allowed per client per hour
        #[arg(long, default_value = "50000")]
        max_characters_per_hour: u64,
    },
    /// Synthesize text through a running server and print the audio URL
    Speak {
        /// Text to synthesize
        text: String,
        /// Voice name
        #[arg(long, default_value = "alloy")]
        voice: String,
        /// Optional delivery style instruction
        #[arg(long)]
        style: Option<String>,
        /// Server URL
        #[arg(long, default_value = "http://localhost:8080")]
        server: String,
    },
    /// Get server health
    Status {
        #[arg(long, default_value = "http://localhost:8080")]
        server: String,
    },
    /// Get your current rate-limit usage
    Limits {
        #[arg(long, default_value = "http://localhost:8080")]
        server: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve {
            port,
            host,
            synth_url,
            model,
            no_rate_limit,
            max_requests_per_minute,
            max_requests_per_hour,
            max_characters_per_hour,
        } => {
            let config = RateLimitConfig {
                enabled: !no_rate_limit,
                max_requests_per_minute,
                max_requests_per_hour,
                max_characters_per_hour,
            };
            let api_key = std::env::var("SIBYL_API_KEY")
                .or_else(|_| std::env::var("OPENAI_API_KEY"))
                .ok();

            let limiter = Arc::new(RateLimiter::new(config));
            let audio = Arc::new(AudioStore::new());
            spawn_sweeper(limiter.clone(), audio.clone());

            let state = AppState {
                limiter,
                audio,
                vibes: Arc::new(VibeCatalog::load()),
                synth: Arc::new(HttpSynthesizer::new(SynthConfig {
                    endpoint: synth_url,
                    model,
                    api_key,
                })),
            };
            let app = router(state);

            let addr = format!("{host}:{port}");
            eprintln!("sibyl listening on {addr}");

            let listener = tokio::net::TcpListener::bind(&addr)
                .await
                .expect("failed to bind");

            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .expect("server error");
        }

        Command::Speak {
            text,
            voice,
            style,
            server,
        } => {
            let resp = reqwest::Client::new()
                .post(format!("{server}/api/tts"))
                .json(&serde_json::json!({ "text": text, "voice": voice, "style": style }))
                .send()
                .await
                .expect("request failed");
            println!("{}", resp.text().await.unwrap_or_default());
        }

        Command::Status { server } => get_simple(&server, "health").await,
        Command::Limits { server } => get_simple(&server, "api/rate-limit-status").await,
    }
}

async fn get_simple(server: &str, endpoint: &str) {
    let resp = reqwest::Client::new()
        .get(format!("{server}/{endpoint}"))
        .send()
        .await
        .expect("request failed");
    println!("{}", resp.text().await.unwrap_or_default());
}
