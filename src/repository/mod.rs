//! Durable storage for taste snapshots and authenticated users

mod file;
mod memory;

use async_trait::async_trait;
use chrono::Utc;

pub use file::FileRepository;
pub use memory::MemoryRepository;

use crate::error::RepositoryError;
use crate::models::{AuthUserRecord, Category, TasteSnapshot};

#[async_trait]
pub trait Repository: Send + Sync {
    /// Stored snapshot for `(user_id, category)`, or [`RepositoryError::NotFound`].
    async fn get_data(
        &self,
        user_id: &str,
        category: Category,
    ) -> Result<TasteSnapshot, RepositoryError>;

    /// Overwrite the snapshot for its `(user_id, category)`. Returns what is
    /// stored afterwards.
    async fn save(&self, snapshot: TasteSnapshot) -> Result<TasteSnapshot, RepositoryError>;

    async fn get_auth_user(&self, user_id: &str) -> Result<AuthUserRecord, RepositoryError>;

    async fn save_auth_user(
        &self,
        record: AuthUserRecord,
    ) -> Result<AuthUserRecord, RepositoryError>;
}

/// Resolve an overwrite against what is already stored.
///
/// `last_updated` never moves backwards: an older incoming snapshot loses and
/// the stored one is kept. `created_at` is carried over from the first save.
fn merge_snapshot(existing: Option<TasteSnapshot>, mut incoming: TasteSnapshot) -> TasteSnapshot {
    match existing {
        Some(current) if current.last_updated > incoming.last_updated => {
            tracing::debug!(
                "Ignoring older {} snapshot for {}",
                incoming.category,
                incoming.user_id
            );
            current
        }
        Some(current) => {
            incoming.created_at = current.created_at.or(Some(current.last_updated));
            incoming
        }
        None => {
            incoming.created_at.get_or_insert(incoming.last_updated);
            incoming
        }
    }
}

fn stamp_auth_user(
    existing: Option<&AuthUserRecord>,
    mut record: AuthUserRecord,
) -> AuthUserRecord {
    let now = Utc::now();
    record.created_at = existing
        .and_then(|r| r.created_at)
        .or(record.created_at)
        .or(Some(now));
    record.updated_at = Some(now);
    record
}
