//! Per-user field key derivation.
//!
//! # Lifecycle
//!
//! 1. At startup the [`KeyProvider`] is built from `KEY_DERIVATION` and
//!    `KEY_DERIVATION_SECRET`.
//! 2. Every seal or reveal asks the provider for the caller's key. The key is
//!    recomputed each time and dropped (and zeroed) when the operation ends.
//! 3. Nothing derived here is cached, persisted, or shared between users.
//!
//! # Security invariants
//!
//! - Key bytes and the server secret are **never** logged or included in traces.
//! - `legacy` derivation makes the key exactly as secret as the user id; it is
//!   kept only so rows written before keyed derivation stay readable.

pub mod provider;

pub use provider::{KeyDerivation, KeyProvider};
