//! Secure card store: the only path between sealed card rows and persistence.
//!
//! # Responsibilities
//!
//! - Refuse any row whose secret columns are not `v1` ciphertext envelopes, so a
//!   caller that bypasses [`crate::cards::CardCodec`] cannot write plaintext.
//! - Scope every read, replace and delete to the calling owner.
//! - Surface backend failures as [`StoreError::Unavailable`] without
//!   retrying; retry policy belongs to the caller.
//!
//! # Module invariants
//!
//! - No decryption happens here; this module never sees plaintext.
//! - User ids are not logged: under legacy key derivation they are key material.

pub mod memory;

pub use memory::MemoryPersistence;

use std::sync::Arc;

use async_trait::async_trait;
use common::model::EncryptedCardRecord;
use common::{RecordId, UserId};
use thiserror::Error;
use tracing::{debug, warn};

use crate::crypto;

/// Errors produced by [`SecureCardStore`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The row is malformed or carries something other than ciphertext.
    #[error("record rejected: {0}")]
    Rejected(String),

    /// The persistence collaborator failed; the caller decides whether to retry.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// No row with this id exists for the calling owner.
    #[error("record not found: {0}")]
    NotFound(RecordId),
}

/// A failure reported by the persistence collaborator.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PersistenceError {
    /// The row collides with an existing key. Retrying will not help.
    #[error("{0}")]
    Conflict(String),

    /// The backend could not serve the call.
    #[error("{0}")]
    Backend(String),
}

impl From<PersistenceError> for StoreError {
    fn from(e: PersistenceError) -> Self {
        match e {
            PersistenceError::Conflict(m) => StoreError::Rejected(m),
            PersistenceError::Backend(m) => StoreError::Unavailable(m),
        }
    }
}

/// Row-level access to the `encrypted_cards` table.
///
/// Implementations store rows verbatim; validation is done by [`SecureCardStore`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CardPersistence: Send + Sync {
    /// Insert a new row.
    async fn insert(&self, row: EncryptedCardRecord) -> Result<(), PersistenceError>;

    /// All rows whose `user_id` equals `user_id`.
    async fn select_by_owner(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<EncryptedCardRecord>, PersistenceError>;

    /// Replace the row with the same id and owner. Returns `false` if none matched.
    async fn update(&self, row: EncryptedCardRecord) -> Result<bool, PersistenceError>;

    /// Delete the row with this id and owner. Returns `false` if none matched.
    async fn delete(&self, user_id: &UserId, id: RecordId) -> Result<bool, PersistenceError>;
}

/// Validating, owner-scoped adapter over a [`CardPersistence`] collaborator.
///
/// Cheap to clone; clones share the same collaborator.
#[derive(Clone)]
pub struct SecureCardStore {
    persistence: Arc<dyn CardPersistence>,
}

impl SecureCardStore {
    pub fn new(persistence: Arc<dyn CardPersistence>) -> Self {
        Self { persistence }
    }

    /// Validate and insert a sealed row.
    ///
    /// # Errors
    ///
    /// [`StoreError::Rejected`] if the row fails validation (nothing is written)
    /// or its id is already taken, [`StoreError::Unavailable`] if the
    /// collaborator fails.
    pub async fn save(&self, record: EncryptedCardRecord) -> Result<RecordId, StoreError> {
        validate_row(&record)?;
        let id = record.id;
        self.persistence.insert(record).await?;
        debug!(record_id = %id, "card row saved");
        Ok(id)
    }

    /// Every row owned by `user_id`, and nothing else.
    ///
    /// Rows the collaborator returns for any other owner are dropped.
    ///
    /// # Errors
    ///
    /// [`StoreError::Unavailable`] if the collaborator fails.
    pub async fn list_for_owner(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<EncryptedCardRecord>, StoreError> {
        let rows = self.persistence.select_by_owner(user_id).await?;
        let total = rows.len();
        let owned: Vec<_> = rows.into_iter().filter(|r| &r.user_id == user_id).collect();
        if owned.len() != total {
            warn!(
                dropped = total - owned.len(),
                "persistence returned rows for another owner; dropped"
            );
        }
        Ok(owned)
    }

    /// One row owned by `user_id`, read through [`SecureCardStore::list_for_owner`].
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] if the caller owns no row with this id.
    pub async fn get_for_owner(
        &self,
        user_id: &UserId,
        id: RecordId,
    ) -> Result<EncryptedCardRecord, StoreError> {
        self.list_for_owner(user_id)
            .await?
            .into_iter()
            .find(|r| r.id == id)
            .ok_or(StoreError::NotFound(id))
    }

    /// Replace a row wholesale (re-save).
    ///
    /// # Errors
    ///
    /// [`StoreError::Rejected`] if the row is invalid or owned by someone else,
    /// [`StoreError::NotFound`] if there is no such row for `user_id`.
    pub async fn replace(
        &self,
        user_id: &UserId,
        record: EncryptedCardRecord,
    ) -> Result<(), StoreError> {
        if &record.user_id != user_id {
            return Err(StoreError::Rejected(
                "record owner does not match caller".into(),
            ));
        }
        validate_row(&record)?;
        let id = record.id;
        if !self.persistence.update(record).await? {
            return Err(StoreError::NotFound(id));
        }
        debug!(record_id = %id, "card row replaced");
        Ok(())
    }

    /// Delete a row owned by `user_id`.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] if the caller owns no row with this id.
    pub async fn delete(&self, user_id: &UserId, id: RecordId) -> Result<(), StoreError> {
        if !self.persistence.delete(user_id, id).await? {
            return Err(StoreError::NotFound(id));
        }
        debug!(record_id = %id, "card row deleted");
        Ok(())
    }
}

/// Check required columns and that every secret column holds an envelope.
fn validate_row(record: &EncryptedCardRecord) -> Result<(), StoreError> {
    if record.user_id.as_str().trim().is_empty() {
        return Err(StoreError::Rejected("user_id is required".into()));
    }
    if record.card_name.trim().is_empty() {
        return Err(StoreError::Rejected("card_name is required".into()));
    }
    let secret_columns = [
        ("encrypted_card_number", &record.encrypted_card_number),
        ("encrypted_expiry", &record.encrypted_expiry),
        ("encrypted_cvv", &record.encrypted_cvv),
    ];
    for (column, value) in secret_columns {
        if value.is_empty() {
            return Err(StoreError::Rejected(format!("{column} is required")));
        }
        if !crypto::is_envelope(value) {
            return Err(StoreError::Rejected(format!(
                "{column} is not a ciphertext envelope"
            )));
        }
    }
    Ok(())
}
