//! JSON-file repository
//!
//! Layout under the data directory:
//!
//! ```text
//! snapshots/<hex(user_id)>/<category>.json
//! users/<hex(user_id)>.json
//! ```
//!
//! User ids are hex-encoded so any provider id is a safe file name. Writes go
//! to a temp file that is renamed into place.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::fs;
use tokio::sync::Mutex;

use super::{merge_snapshot, stamp_auth_user, Repository};
use crate::error::RepositoryError;
use crate::models::{AuthUserRecord, Category, TasteSnapshot};

#[derive(Debug)]
pub struct FileRepository {
    root: PathBuf,
    /// Serializes read-merge-write cycles.
    write_lock: Mutex<()>,
}

impl FileRepository {
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, RepositoryError> {
        let root = root.into();
        fs::create_dir_all(root.join("snapshots")).await?;
        fs::create_dir_all(root.join("users")).await?;
        tracing::debug!("File repository at {}", root.display());

        Ok(Self {
            root,
            write_lock: Mutex::new(()),
        })
    }

    fn snapshot_path(&self, user_id: &str, category: Category) -> PathBuf {
        self.root
            .join("snapshots")
            .join(hex::encode(user_id))
            .join(format!("{}.json", category))
    }

    fn user_path(&self, user_id: &str) -> PathBuf {
        self.root
            .join("users")
            .join(format!("{}.json", hex::encode(user_id)))
    }
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, RepositoryError> {
    match fs::read(path).await {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), RepositoryError> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).await?;
    }
    let content = serde_json::to_vec_pretty(value)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, content).await?;

    // Records carry refresh tokens
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o600)).await?;
    }

    fs::rename(&tmp, path).await?;
    Ok(())
}

#[async_trait]
impl Repository for FileRepository {
    async fn get_data(
        &self,
        user_id: &str,
        category: Category,
    ) -> Result<TasteSnapshot, RepositoryError> {
        read_json(&self.snapshot_path(user_id, category))
            .await?
            .ok_or_else(|| {
                RepositoryError::NotFound(format!("{} snapshot for {}", category, user_id))
            })
    }

    async fn save(&self, snapshot: TasteSnapshot) -> Result<TasteSnapshot, RepositoryError> {
        let path = self.snapshot_path(&snapshot.user_id, snapshot.category);
        let _guard = self.write_lock.lock().await;

        let existing: Option<TasteSnapshot> = read_json(&path).await?;
        let merged = merge_snapshot(existing, snapshot);
        write_json(&path, &merged).await?;
        Ok(merged)
    }

    async fn get_auth_user(&self, user_id: &str) -> Result<AuthUserRecord, RepositoryError> {
        read_json(&self.user_path(user_id))
            .await?
            .ok_or_else(|| RepositoryError::NotFound(format!("auth user {}", user_id)))
    }

    async fn save_auth_user(
        &self,
        record: AuthUserRecord,
    ) -> Result<AuthUserRecord, RepositoryError> {
        let path = self.user_path(&record.user_id);
        let _guard = self.write_lock.lock().await;

        let existing: Option<AuthUserRecord> = read_json(&path).await?;
        let stamped = stamp_auth_user(existing.as_ref(), record);
        write_json(&path, &stamped).await?;
        Ok(stamped)
    }
}
