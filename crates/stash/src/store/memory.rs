//! [`MemoryPersistence`]: in-process `encrypted_cards` table.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use common::model::EncryptedCardRecord;
use common::{RecordId, UserId};
use tokio::sync::RwLock;

use super::{CardPersistence, PersistenceError};

/// Card rows held in process memory behind an `Arc<RwLock<_>>`.
///
/// Rows are returned newest first, matching how the dashboard lists them.
#[derive(Clone, Debug, Default)]
pub struct MemoryPersistence {
    rows: Arc<RwLock<HashMap<RecordId, EncryptedCardRecord>>>,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CardPersistence for MemoryPersistence {
    async fn insert(&self, row: EncryptedCardRecord) -> Result<(), PersistenceError> {
        let mut rows = self.rows.write().await;
        if rows.contains_key(&row.id) {
            return Err(PersistenceError::Conflict(format!("duplicate key: {}", row.id)));
        }
        rows.insert(row.id, row);
        Ok(())
    }

    async fn select_by_owner(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<EncryptedCardRecord>, PersistenceError> {
        let rows = self.rows.read().await;
        let mut owned: Vec<_> = rows
            .values()
            .filter(|r| &r.user_id == user_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(owned)
    }

    async fn update(&self, row: EncryptedCardRecord) -> Result<bool, PersistenceError> {
        let mut rows = self.rows.write().await;
        match rows.get_mut(&row.id) {
            Some(existing) if existing.user_id == row.user_id => {
                *existing = row;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete(&self, user_id: &UserId, id: RecordId) -> Result<bool, PersistenceError> {
        let mut rows = self.rows.write().await;
        let owned = rows.get(&id).is_some_and(|r| &r.user_id == user_id);
        if owned {
            rows.remove(&id);
        }
        Ok(owned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use common::model::CardType;
    use uuid::Uuid;

    fn row(owner: &str, age_secs: i64) -> EncryptedCardRecord {
        let at = Utc::now() - Duration::seconds(age_secs);
        EncryptedCardRecord {
            id: Uuid::new_v4(),
            user_id: UserId::parse(owner).unwrap(),
            card_name: "card".into(),
            card_type: CardType::Debit,
            encrypted_card_number: "v1.a.b".into(),
            encrypted_expiry: "v1.a.b".into(),
            encrypted_cvv: "v1.a.b".into(),
            bank_name: None,
            created_at: at,
            updated_at: at,
        }
    }

    #[tokio::test]
    async fn select_returns_newest_first() {
        let p = MemoryPersistence::new();
        let old = row("u", 60);
        let new = row("u", 0);
        p.insert(old.clone()).await.unwrap();
        p.insert(new.clone()).await.unwrap();
        let rows = p.select_by_owner(&UserId::parse("u").unwrap()).await.unwrap();
        assert_eq!(rows, vec![new, old]);
    }

    #[tokio::test]
    async fn duplicate_insert_fails() {
        let p = MemoryPersistence::new();
        let r = row("u", 0);
        p.insert(r.clone()).await.unwrap();
        assert!(matches!(
            p.insert(r).await,
            Err(PersistenceError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn update_refuses_owner_change() {
        let p = MemoryPersistence::new();
        let r = row("u", 0);
        p.insert(r.clone()).await.unwrap();
        let mut hijack = r.clone();
        hijack.user_id = UserId::parse("other").unwrap();
        assert!(!p.update(hijack).await.unwrap());
        assert_eq!(p.select_by_owner(&r.user_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn clones_share_rows() {
        let p = MemoryPersistence::new();
        let q = p.clone();
        let r = row("u", 0);
        p.insert(r.clone()).await.unwrap();
        assert!(q.delete(&r.user_id, r.id).await.unwrap());
        assert!(p.select_by_owner(&r.user_id).await.unwrap().is_empty());
    }
}
