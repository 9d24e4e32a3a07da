//! sibyl-core — Pure shared types.
//!
//! No async runtime, no I/O, no platform dependencies. Consumers that only
//! need the config and snapshot types can depend on this without pulling in
//! tokio or axum.

pub mod types;
