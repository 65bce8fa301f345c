//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use common::model::{Bill, Ticket};

use crate::cards::CardCodec;
use crate::keys::KeyProvider;
use crate::records::RecordStore;
use crate::store::{MemoryPersistence, SecureCardStore};

/// Application state shared across all request handlers.
///
/// All fields are cheaply cloneable (`Arc`-wrapped or already `Arc`-backed) so
/// that Axum can clone the state for each request without copying expensive data.
#[derive(Clone)]
pub struct AppState {
    /// Seals and reveals card rows.
    pub codec: CardCodec,
    /// Validating, owner-scoped card store.
    pub cards: SecureCardStore,
    pub tickets: RecordStore<Ticket>,
    pub bills: RecordStore<Bill>,
    /// Name of the HTTP header carrying the authenticated user id.
    pub user_header_name: Arc<String>,
}

impl AppState {
    /// Create a new [`AppState`] with the provided codec, card store and header name.
    pub fn new(codec: CardCodec, cards: SecureCardStore, user_header_name: String) -> Self {
        Self {
            codec,
            cards,
            tickets: RecordStore::new(),
            bills: RecordStore::new(),
            user_header_name: Arc::new(user_header_name),
        }
    }
}

impl Default for AppState {
    /// In-memory stores and legacy key derivation, suitable for tests.
    fn default() -> Self {
        Self::new(
            CardCodec::new(KeyProvider::legacy()),
            SecureCardStore::new(Arc::new(MemoryPersistence::new())),
            "X-User-Id".into(),
        )
    }
}
