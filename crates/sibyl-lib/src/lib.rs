//! sibyl-lib — Speech service engine.
//!
//! Rate limiting, ephemeral audio caching, the outbound synthesis call, and
//! the HTTP API. Depends on sibyl-core for pure types.

pub mod audio_store;
pub mod client_id;
pub mod limiter;
pub mod server;
pub mod synth;
pub mod vibes;

// Re-export sibyl-core for convenience
pub use sibyl_core;
