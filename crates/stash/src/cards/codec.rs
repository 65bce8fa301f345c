//! [`CardCodec`]: plaintext card fields ⇄ encrypted card rows.
//!
//! Each secret attribute is encrypted with its own cipher call (its own nonce),
//! so any one field can be revealed, or fail, without touching the others.

use chrono::{DateTime, Utc};
use common::model::EncryptedCardRecord;
use common::{RecordId, UserId};
use thiserror::Error;
use uuid::Uuid;

use super::model::{CardField, CardMetadata, FieldDecryptError, PlaintextCardFields, RevealReport};
use crate::crypto::{self, cipher::check_field_len, DecryptError, EncryptError, EncryptionKey};
use crate::keys::KeyProvider;

/// Errors produced while sealing a card.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    /// A required attribute is blank.
    #[error("{0} is required")]
    Missing(&'static str),

    /// A secret attribute could not be encrypted (too long, or an AEAD fault).
    #[error("{field}: {source}")]
    Encrypt {
        field: CardField,
        #[source]
        source: EncryptError,
    },
}

/// Seals and reveals card rows with keys from a [`KeyProvider`].
#[derive(Debug, Clone)]
pub struct CardCodec {
    keys: KeyProvider,
}

impl CardCodec {
    pub fn new(keys: KeyProvider) -> Self {
        Self { keys }
    }

    pub fn keys(&self) -> &KeyProvider {
        &self.keys
    }

    /// Encrypt `fields` into a new row owned by `user_id`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Missing`] for a blank card name or secret field and
    /// [`CodecError::Encrypt`] for a secret field longer than the cipher accepts.
    /// Validation runs before any encryption.
    pub fn seal(
        &self,
        fields: &PlaintextCardFields,
        user_id: &UserId,
        metadata: CardMetadata,
    ) -> Result<EncryptedCardRecord, CodecError> {
        let now = Utc::now();
        self.seal_as(Uuid::new_v4(), user_id, now, now, fields, metadata)
    }

    /// Re-encrypt every secret field of `existing` from fresh plaintext.
    ///
    /// The row keeps its id, owner and creation time; all three ciphertexts are
    /// replaced and `updated_at` is bumped.
    ///
    /// # Errors
    ///
    /// Same as [`CardCodec::seal`].
    pub fn reseal(
        &self,
        existing: &EncryptedCardRecord,
        fields: &PlaintextCardFields,
        metadata: CardMetadata,
    ) -> Result<EncryptedCardRecord, CodecError> {
        self.seal_as(
            existing.id,
            &existing.user_id,
            existing.created_at,
            Utc::now(),
            fields,
            metadata,
        )
    }

    fn seal_as(
        &self,
        id: RecordId,
        user_id: &UserId,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
        fields: &PlaintextCardFields,
        metadata: CardMetadata,
    ) -> Result<EncryptedCardRecord, CodecError> {
        let card_name = metadata.card_name.trim();
        if card_name.is_empty() {
            return Err(CodecError::Missing("card_name"));
        }
        for field in CardField::ALL {
            let value = plaintext_of(fields, field);
            if value.trim().is_empty() {
                return Err(CodecError::Missing(field.as_str()));
            }
            check_field_len(value).map_err(|source| CodecError::Encrypt { field, source })?;
        }

        let key = self.keys.derive_key(Some(user_id));
        let encrypt = |field: CardField| -> Result<String, CodecError> {
            crypto::encrypt(plaintext_of(fields, field), &key)
                .map(String::from)
                .map_err(|source| CodecError::Encrypt { field, source })
        };

        Ok(EncryptedCardRecord {
            id,
            user_id: user_id.clone(),
            card_name: card_name.to_owned(),
            card_type: metadata.card_type,
            encrypted_card_number: encrypt(CardField::CardNumber)?,
            encrypted_expiry: encrypt(CardField::Expiry)?,
            encrypted_cvv: encrypt(CardField::Cvv)?,
            bank_name: metadata
                .bank_name
                .map(|b| b.trim().to_owned())
                .filter(|b| !b.is_empty()),
            created_at,
            updated_at,
        })
    }

    /// Decrypt a single field of `record` with `user_id`'s key.
    ///
    /// # Errors
    ///
    /// Returns the [`DecryptError`] for that field; other fields are not read.
    pub fn reveal_field(
        &self,
        record: &EncryptedCardRecord,
        field: CardField,
        user_id: &UserId,
    ) -> Result<String, DecryptError> {
        let key = self.keys.derive_key(Some(user_id));
        open_with(record, field, &key)
    }

    /// Decrypt all three fields, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// Returns a [`FieldDecryptError`] naming the field that failed.
    // Retained for callers that need all three fields or none; HTTP reveals per field.
    #[allow(dead_code)]
    pub fn reveal_fields(
        &self,
        record: &EncryptedCardRecord,
        user_id: &UserId,
    ) -> Result<PlaintextCardFields, FieldDecryptError> {
        let key = self.keys.derive_key(Some(user_id));
        let open = |field: CardField| {
            open_with(record, field, &key).map_err(|source| FieldDecryptError { field, source })
        };
        Ok(PlaintextCardFields {
            card_number: open(CardField::CardNumber)?,
            expiry: open(CardField::Expiry)?,
            cvv: open(CardField::Cvv)?,
        })
    }

    /// Decrypt all three fields independently, keeping every outcome.
    pub fn reveal_each(&self, record: &EncryptedCardRecord, user_id: &UserId) -> RevealReport {
        let key = self.keys.derive_key(Some(user_id));
        let open = |field: CardField| open_with(record, field, &key);
        RevealReport {
            card_number: open(CardField::CardNumber),
            expiry: open(CardField::Expiry),
            cvv: open(CardField::Cvv),
        }
    }
}

fn open_with(
    record: &EncryptedCardRecord,
    field: CardField,
    key: &EncryptionKey,
) -> Result<String, DecryptError> {
    crypto::decrypt(ciphertext_of(record, field), key)
}

fn plaintext_of(fields: &PlaintextCardFields, field: CardField) -> &str {
    match field {
        CardField::CardNumber => &fields.card_number,
        CardField::Expiry => &fields.expiry,
        CardField::Cvv => &fields.cvv,
    }
}

/// The stored envelope for `field`.
pub fn ciphertext_of(record: &EncryptedCardRecord, field: CardField) -> &str {
    match field {
        CardField::CardNumber => &record.encrypted_card_number,
        CardField::Expiry => &record.encrypted_expiry,
        CardField::Cvv => &record.encrypted_cvv,
    }
}
