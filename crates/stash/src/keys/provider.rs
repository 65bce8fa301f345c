//! [`KeyProvider`]: deterministic per-user field key derivation.

use std::fmt;

use common::UserId;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::warn;

use crate::crypto::{EncryptionKey, KEY_LEN};

/// Identifier substituted when a call arrives without a user session.
///
/// The resulting key is documented and shared by every unauthenticated
/// caller; it protects nothing and exists so such calls degrade instead of
/// failing.
pub const FALLBACK_KEY_ID: &str = "fallback-key";

/// Domain-separation label mixed into keyed derivations.
const KEYED_CONTEXT: &[u8] = b"card-stash/field-key/v1:";

type HmacSha256 = Hmac<Sha256>;

/// How a user's field key is computed from their identifier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyDerivation {
    /// `HMAC-SHA256(server_secret, context || user_id)`.
    #[default]
    Keyed,
    /// `SHA-256(user_id)`. Anyone who knows the identifier can compute the key.
    Legacy,
}

impl KeyDerivation {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyDerivation::Keyed => "keyed",
            KeyDerivation::Legacy => "legacy",
        }
    }
}

/// Errors produced while building a [`KeyProvider`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyError {
    /// Keyed derivation was requested without a server secret.
    #[error("keyed derivation requires a non-empty server secret")]
    MissingSecret,

    /// The HMAC implementation refused the secret.
    #[error("server secret rejected by HMAC")]
    InvalidSecret,
}

#[derive(Clone)]
enum Mode {
    Legacy,
    Keyed(HmacSha256),
}

/// Stateless derivation of [`EncryptionKey`]s from user identifiers.
///
/// Keeps no database of derived keys; every call recomputes. Cheap to clone.
#[derive(Clone)]
pub struct KeyProvider {
    mode: Mode,
}

impl KeyProvider {
    /// Provider that hashes the identifier alone.
    pub fn legacy() -> Self {
        Self { mode: Mode::Legacy }
    }

    /// Provider that mixes a server-side secret into every key.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::MissingSecret`] if `secret` is empty.
    pub fn keyed(secret: &[u8]) -> Result<Self, KeyError> {
        if secret.is_empty() {
            return Err(KeyError::MissingSecret);
        }
        let mac = HmacSha256::new_from_slice(secret).map_err(|_| KeyError::InvalidSecret)?;
        Ok(Self {
            mode: Mode::Keyed(mac),
        })
    }

    /// Build the provider selected by configuration.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::MissingSecret`] when `mode` is keyed and no usable
    /// secret is supplied.
    pub fn from_config(mode: KeyDerivation, secret: Option<&str>) -> Result<Self, KeyError> {
        match mode {
            KeyDerivation::Legacy => Ok(Self::legacy()),
            KeyDerivation::Keyed => {
                let secret = secret
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .ok_or(KeyError::MissingSecret)?;
                Self::keyed(secret.as_bytes())
            }
        }
    }

    pub fn derivation(&self) -> KeyDerivation {
        match self.mode {
            Mode::Legacy => KeyDerivation::Legacy,
            Mode::Keyed(_) => KeyDerivation::Keyed,
        }
    }

    /// Derive the field key for `user_id`, or the fallback key when there is
    /// no session.
    pub fn derive_key(&self, user_id: Option<&UserId>) -> EncryptionKey {
        let id = match user_id {
            Some(user) => user.as_str(),
            None => {
                warn!("no user session; deriving the fallback field key");
                FALLBACK_KEY_ID
            }
        };
        self.derive_from(id.as_bytes())
    }

    fn derive_from(&self, id: &[u8]) -> EncryptionKey {
        let bytes: [u8; KEY_LEN] = match &self.mode {
            Mode::Legacy => Sha256::digest(id).into(),
            Mode::Keyed(mac) => {
                let mut mac = mac.clone();
                mac.update(KEYED_CONTEXT);
                mac.update(id);
                mac.finalize().into_bytes().into()
            }
        };
        EncryptionKey::from_bytes(bytes)
    }
}

impl fmt::Debug for KeyProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyProvider")
            .field("derivation", &self.derivation().as_str())
            .finish()
    }
}
