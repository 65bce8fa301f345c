//! Tickets and bills: owner-scoped insert and list, plus the dashboard load.
//!
//! Neither record kind carries secrets, so rows are stored as submitted.
//! QR decoding and attachment upload happen upstream; only their results
//! (`qr_data`, `ticket_image_url`, `file_url`) arrive here.

use std::sync::Arc;

use chrono::Utc;
use common::model::{Bill, Owned, Ticket};
use common::protocol::{DashboardResponse, NewBillRequest, NewTicketRequest, Section};
use common::UserId;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::warn;
use uuid::Uuid;

use crate::store::SecureCardStore;

/// Validation errors for new tickets and bills.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("{0} is required")]
    Missing(&'static str),
}

/// In-memory collection of owned rows, newest first.
#[derive(Debug)]
pub struct RecordStore<T> {
    rows: Arc<RwLock<Vec<T>>>,
}

impl<T> Clone for RecordStore<T> {
    fn clone(&self) -> Self {
        Self {
            rows: Arc::clone(&self.rows),
        }
    }
}

impl<T> Default for RecordStore<T> {
    fn default() -> Self {
        Self {
            rows: Arc::new(RwLock::new(Vec::new())),
        }
    }
}

impl<T: Owned + Clone> RecordStore<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, row: T) {
        self.rows.write().await.insert(0, row);
    }

    pub async fn list_for_owner(&self, user_id: &UserId) -> Vec<T> {
        self.rows
            .read()
            .await
            .iter()
            .filter(|r| r.owner() == user_id)
            .cloned()
            .collect()
    }
}

/// Build a ticket row from a submitted form.
///
/// # Errors
///
/// [`RecordError::Missing`] if `passenger_name` or `pnr` is blank.
pub fn new_ticket(user_id: &UserId, req: NewTicketRequest) -> Result<Ticket, RecordError> {
    let passenger_name = required(req.passenger_name, "passenger_name")?;
    let pnr = required(req.pnr, "pnr")?;
    let now = Utc::now();
    Ok(Ticket {
        id: Uuid::new_v4(),
        user_id: user_id.clone(),
        passenger_name,
        pnr,
        ticket_type: optional(req.ticket_type),
        departure_location: optional(req.departure_location),
        arrival_location: optional(req.arrival_location),
        travel_date: req.travel_date,
        travel_time: optional(req.travel_time),
        seat_coach: optional(req.seat_coach),
        qr_data: optional(req.qr_data),
        ticket_image_url: optional(req.ticket_image_url),
        created_at: now,
        updated_at: now,
    })
}

/// Build a bill row from a submitted form.
///
/// # Errors
///
/// [`RecordError::Missing`] if `bill_name` or `file_url` is blank.
pub fn new_bill(user_id: &UserId, req: NewBillRequest) -> Result<Bill, RecordError> {
    let bill_name = required(req.bill_name, "bill_name")?;
    let file_url = required(req.file_url, "file_url")?;
    let now = Utc::now();
    Ok(Bill {
        id: Uuid::new_v4(),
        user_id: user_id.clone(),
        bill_name,
        bill_type: optional(req.bill_type),
        amount: req.amount,
        bill_date: req.bill_date,
        file_url,
        file_type: optional(req.file_type),
        created_at: now,
        updated_at: now,
    })
}

/// Load all three record kinds for `user_id` concurrently.
///
/// A section that fails reports its error; the others still populate.
pub async fn load_dashboard(
    tickets: &RecordStore<Ticket>,
    cards: &SecureCardStore,
    bills: &RecordStore<Bill>,
    user_id: &UserId,
) -> DashboardResponse {
    let (tickets, cards, bills) = tokio::join!(
        tickets.list_for_owner(user_id),
        cards.list_for_owner(user_id),
        bills.list_for_owner(user_id),
    );
    let cards = match cards {
        Ok(rows) => Section::loaded(rows),
        Err(e) => {
            warn!(error = %e, "card section failed to load");
            Section::failed(e.to_string())
        }
    };
    DashboardResponse {
        tickets: Section::loaded(tickets),
        cards,
        bills: Section::loaded(bills),
    }
}

fn required(value: String, name: &'static str) -> Result<String, RecordError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(RecordError::Missing(name));
    }
    Ok(trimmed.to_owned())
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}
