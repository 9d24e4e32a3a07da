//! Client identification for rate limiting.
//!
//! Behind a reverse proxy the peer address is the proxy, so the forwarded
//! headers are consulted first. The result is an opaque key; the limiter
//! does not validate it.

use std::net::SocketAddr;

use axum::http::HeaderMap;

/// Headers consulted in order. X-Forwarded-For may carry a chain of
/// addresses; only the first (the originating client) is used.
const FORWARDED_HEADERS: &[&str] = &["x-forwarded-for", "x-real-ip", "x-original-forwarded-for"];

/// Derive the rate-limiting key for a request: the first usable forwarded
/// header, else the peer socket's IP.
pub fn client_identifier(headers: &HeaderMap, peer: SocketAddr) -> String {
    for name in FORWARDED_HEADERS {
        if let Some(value) = headers.get(*name).and_then(|v| v.to_str().ok()) {
            let first = value.split(',').next().unwrap_or("").trim();
            if !first.is_empty() && !first.eq_ignore_ascii_case("unknown") {
                return first.to_string();
            }
        }
    }
    peer.ip().to_string()
}
