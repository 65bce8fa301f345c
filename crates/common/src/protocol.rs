//! Request and response types exchanged over the public JSON API.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::model::{Bill, CardType, EncryptedCardRecord, RecordId, Ticket};

// ---------------------------------------------------------------------------
// Cards
// ---------------------------------------------------------------------------

/// Request body for `POST /cards` and `PUT /cards/{id}`.
///
/// Carries plaintext card attributes; its `Debug` output never shows them.
#[derive(Clone, Serialize, Deserialize)]
pub struct SaveCardRequest {
    pub card_name: String,
    #[serde(default)]
    pub card_type: CardType,
    pub card_number: String,
    pub expiry: String,
    pub cvv: String,
    #[serde(default)]
    pub bank_name: Option<String>,
}

impl fmt::Debug for SaveCardRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SaveCardRequest")
            .field("card_name", &self.card_name)
            .field("card_type", &self.card_type)
            .field("card_number", &"[REDACTED]")
            .field("expiry", &"[REDACTED]")
            .field("cvv", &"[REDACTED]")
            .field("bank_name", &self.bank_name)
            .finish()
    }
}

/// Response body for a successful create.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedResponse {
    pub id: RecordId,
}

/// Response body for `GET /cards`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardListResponse {
    pub cards: Vec<EncryptedCardRecord>,
}

/// Outcome of revealing a single card field.
///
/// A field that cannot be decrypted is reported as such, never as an empty value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldReveal {
    Revealed { value: String },
    Unreadable { error: String, reason: String },
}

impl FieldReveal {
    /// Build the unreadable variant with the standard error code.
    pub fn unreadable(reason: impl Into<String>) -> Self {
        FieldReveal::Unreadable {
            error: "unable_to_decrypt".into(),
            reason: reason.into(),
        }
    }
}

/// Response body for `GET /cards/{id}/reveal`.
///
/// When a single field is requested only that field is present.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RevealResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_number: Option<FieldReveal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<FieldReveal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cvv: Option<FieldReveal>,
}

// ---------------------------------------------------------------------------
// Tickets and bills
// ---------------------------------------------------------------------------

/// Request body for `POST /tickets`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NewTicketRequest {
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
}

/// Request body for `POST /bills`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NewBillRequest {
    pub bill_name: String,
    pub bill_type: Option<String>,
    pub amount: Option<f64>,
    pub bill_date: Option<NaiveDate>,
    pub file_url: String,
    pub file_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketListResponse {
    pub tickets: Vec<Ticket>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillListResponse {
    pub bills: Vec<Bill>,
}

// ---------------------------------------------------------------------------
// Dashboard
// ---------------------------------------------------------------------------

/// One independently loaded dashboard section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section<T> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<T>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> Section<T> {
    pub fn loaded(items: Vec<T>) -> Self {
        Self {
            items: Some(items),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            items: None,
            error: Some(error.into()),
        }
    }
}

/// Response body for `GET /dashboard`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardResponse {
    pub tickets: Section<Ticket>,
    pub cards: Section<EncryptedCardRecord>,
    pub bills: Section<Bill>,
}

// ---------------------------------------------------------------------------
// Error response
// ---------------------------------------------------------------------------

/// Standard error response body returned on any non-2xx status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Short machine-readable error code (e.g. `"bad_request"`).
    pub code: String,
    /// Human-readable description safe to expose to callers.
    pub message: String,
}

impl ErrorResponse {
    /// Construct an [`ErrorResponse`] from a code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Health check
// ---------------------------------------------------------------------------

/// Response body for `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    /// Active key derivation mode (`"keyed"` or `"legacy"`).
    pub key_derivation: String,
}
