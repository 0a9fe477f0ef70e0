//! In-process repository

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use super::{merge_snapshot, stamp_auth_user, Repository};
use crate::error::RepositoryError;
use crate::models::{AuthUserRecord, Category, TasteSnapshot};

#[derive(Debug, Default)]
pub struct MemoryRepository {
    snapshots: DashMap<(String, Category), TasteSnapshot>,
    users: DashMap<String, AuthUserRecord>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn get_data(
        &self,
        user_id: &str,
        category: Category,
    ) -> Result<TasteSnapshot, RepositoryError> {
        self.snapshots
            .get(&(user_id.to_string(), category))
            .map(|s| s.value().clone())
            .ok_or_else(|| {
                RepositoryError::NotFound(format!("{} snapshot for {}", category, user_id))
            })
    }

    async fn save(&self, snapshot: TasteSnapshot) -> Result<TasteSnapshot, RepositoryError> {
        let key = (snapshot.user_id.clone(), snapshot.category);
        let stored = match self.snapshots.entry(key) {
            Entry::Occupied(mut slot) => {
                let merged = merge_snapshot(Some(slot.get().clone()), snapshot);
                slot.insert(merged.clone());
                merged
            }
            Entry::Vacant(slot) => slot.insert(merge_snapshot(None, snapshot)).value().clone(),
        };
        Ok(stored)
    }

    async fn get_auth_user(&self, user_id: &str) -> Result<AuthUserRecord, RepositoryError> {
        self.users
            .get(user_id)
            .map(|r| r.value().clone())
            .ok_or_else(|| RepositoryError::NotFound(format!("auth user {}", user_id)))
    }

    async fn save_auth_user(
        &self,
        record: AuthUserRecord,
    ) -> Result<AuthUserRecord, RepositoryError> {
        let stored = match self.users.entry(record.user_id.clone()) {
            Entry::Occupied(mut slot) => {
                let stamped = stamp_auth_user(Some(slot.get()), record);
                slot.insert(stamped.clone());
                stamped
            }
            Entry::Vacant(slot) => slot.insert(stamp_auth_user(None, record)).value().clone(),
        };
        Ok(stored)
    }
}
