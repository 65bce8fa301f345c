//! Structured logging and optional OpenTelemetry span export.
//!
//! # Telemetry invariants
//!
//! - **No plaintext card field, ciphertext, key byte or user id** may appear in
//!   any span attribute or log field. Under legacy key derivation the user id
//!   is enough to recompute a key.
//! - Log level is configurable via `LOG_LEVEL` (default: `info`); `RUST_LOG`
//!   takes precedence when set.

pub mod init;

pub use init::init_telemetry;
