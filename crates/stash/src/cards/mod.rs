//! Payment-card sealing and reveal.
//!
//! # Module invariants
//!
//! - Plaintext card attributes exist only inside [`PlaintextCardFields`] and
//!   the reveal results handed back to the caller. They are never logged.
//! - Every row produced here carries three independent `v1` envelopes.

pub mod codec;
pub mod model;

pub use codec::{CardCodec, CodecError};
pub use model::{CardField, CardMetadata, PlaintextCardFields};
