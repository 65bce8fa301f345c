//! In-memory card types that never cross the storage boundary.

use std::fmt;

use common::model::CardType;
use serde::Deserialize;
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::crypto::DecryptError;

/// Plaintext secret attributes of a card, held only for the duration of a
/// save or reveal. Zeroized on drop; `Debug` never prints them.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct PlaintextCardFields {
    pub card_number: String,
    pub expiry: String,
    pub cvv: String,
}

impl fmt::Debug for PlaintextCardFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PlaintextCardFields([REDACTED])")
    }
}

/// Non-secret attributes supplied with a card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardMetadata {
    pub card_name: String,
    pub card_type: CardType,
    pub bank_name: Option<String>,
}

/// One of the three encrypted card attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardField {
    CardNumber,
    Expiry,
    Cvv,
}

impl CardField {
    pub const ALL: [CardField; 3] = [CardField::CardNumber, CardField::Expiry, CardField::Cvv];

    pub fn as_str(&self) -> &'static str {
        match self {
            CardField::CardNumber => "card_number",
            CardField::Expiry => "expiry",
            CardField::Cvv => "cvv",
        }
    }
}

impl fmt::Display for CardField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decrypt failure tagged with the field that could not be read.
// Only produced by `CardCodec::reveal_fields`.
#[allow(dead_code)]
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("{field}: {source}")]
pub struct FieldDecryptError {
    pub field: CardField,
    #[source]
    pub source: DecryptError,
}

/// Per-field reveal outcome: each field succeeds or fails on its own.
pub struct RevealReport {
    pub card_number: Result<String, DecryptError>,
    pub expiry: Result<String, DecryptError>,
    pub cvv: Result<String, DecryptError>,
}

impl RevealReport {
    pub fn get(&self, field: CardField) -> &Result<String, DecryptError> {
        match field {
            CardField::CardNumber => &self.card_number,
            CardField::Expiry => &self.expiry,
            CardField::Cvv => &self.cvv,
        }
    }
}

impl fmt::Debug for RevealReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn outcome(r: &Result<String, DecryptError>) -> &'static str {
            match r {
                Ok(_) => "ok",
                Err(e) => e.reason(),
            }
        }
        f.debug_struct("RevealReport")
            .field("card_number", &outcome(&self.card_number))
            .field("expiry", &outcome(&self.expiry))
            .field("cvv", &outcome(&self.cvv))
            .finish()
    }
}
