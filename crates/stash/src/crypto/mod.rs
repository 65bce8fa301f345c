//! AES-256-GCM-SIV field encryption primitives.
//!
//! This module is intentionally free of storage and HTTP dependencies.
//! It provides the stateless encrypt/decrypt operations used by the card codec.
//!
//! # Ciphertext format
//!
//! ```text
//! v1.<base64url-no-pad(nonce)>.<base64url-no-pad(ciphertext+tag)>
//! ```
//!
//! The `v1` prefix pins the algorithm (AES-256-GCM-SIV, 96-bit random nonce).
//! A future scheme gets a new prefix so existing rows remain decryptable.

pub mod cipher;

pub use cipher::{
    decrypt, encrypt, is_envelope, DecryptError, EncryptError, EncryptionKey, KEY_LEN,
};
