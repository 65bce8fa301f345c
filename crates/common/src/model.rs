//! Row shapes exchanged with the persistence collaborator.
//!
//! Card rows carry only ciphertext envelopes in their `encrypted_*` fields;
//! plaintext card attributes never appear in any type defined here.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Primary key of every stored record.
pub type RecordId = Uuid;

/// Stable user identifier issued by the authentication collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Parse a raw identifier. Blank input means "no session" and yields `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_owned()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A record that belongs to exactly one user.
pub trait Owned {
    fn owner(&self) -> &UserId;
}

/// Payment card kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardType {
    #[default]
    Debit,
    Credit,
}

/// A payment card as it is persisted: secret attributes are ciphertext envelopes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedCardRecord {
    pub id: RecordId,
    pub user_id: UserId,
    pub card_name: String,
    pub card_type: CardType,
    pub encrypted_card_number: String,
    pub encrypted_expiry: String,
    pub encrypted_cvv: String,
    pub bank_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Owned for EncryptedCardRecord {
    fn owner(&self) -> &UserId {
        &self.user_id
    }
}

/// A travel ticket. QR decoding and image upload happen before it reaches us.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: RecordId,
    pub user_id: UserId,
    pub passenger_name: String,
    pub pnr: String,
    pub ticket_type: Option<String>,
    pub departure_location: Option<String>,
    pub arrival_location: Option<String>,
    pub travel_date: Option<NaiveDate>,
    pub travel_time: Option<String>,
    pub seat_coach: Option<String>,
    pub qr_data: Option<String>,
    pub ticket_image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Owned for Ticket {
    fn owner(&self) -> &UserId {
        &self.user_id
    }
}

/// A bill or receipt. `file_url` is the public URL issued by the upload collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bill {
    pub id: RecordId,
    pub user_id: UserId,
    pub bill_name: String,
    pub bill_type: Option<String>,
    pub amount: Option<f64>,
    pub bill_date: Option<NaiveDate>,
    pub file_url: String,
    pub file_type: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Owned for Bill {
    fn owner(&self) -> &UserId {
        &self.user_id
    }
}
