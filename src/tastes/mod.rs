//! Taste data retrieval
//!
//! [`TasteService::fetch`] answers from the repository while the stored
//! snapshot is fresh, and otherwise refreshes it from the provider. New
//! snapshots and renewed credentials are written back in the background; the
//! caller never waits on those writes.

mod mapping;
mod pipeline;

use std::sync::Arc;

use chrono::Utc;

pub use pipeline::Pipeline;

use crate::auth::{AccessToken, TokenCache, TokenSource};
use crate::background::Background;
use crate::error::{Error, Result};
use crate::models::{Category, TasteSnapshot};
use crate::provider::Provider;
use crate::repository::Repository;

pub struct TasteService {
    repository: Arc<dyn Repository>,
    provider: Arc<dyn Provider>,
    token_source: Arc<dyn TokenSource>,
    tokens: TokenCache,
    background: Background,
    refresh_ttl_days: u32,
}

impl TasteService {
    pub fn new(
        repository: Arc<dyn Repository>,
        provider: Arc<dyn Provider>,
        token_source: Arc<dyn TokenSource>,
        tokens: TokenCache,
        background: Background,
        refresh_ttl_days: u32,
    ) -> Self {
        Self {
            repository,
            provider,
            token_source,
            tokens,
            background,
            refresh_ttl_days,
        }
    }

    /// Taste data for `user_id` in `category` (`tracks` or `artists`).
    pub async fn fetch(&self, user_id: &str, category: &str) -> Result<TasteSnapshot> {
        let category: Category = category.parse()?;
        let pipeline = Pipeline::for_category(category)?;

        let existing = match self.repository.get_data(user_id, category).await {
            Ok(snapshot) => Some(snapshot),
            Err(e) if e.is_not_found() => None,
            Err(e) => return Err(e.into()),
        };

        if let Some(snapshot) = existing
            .as_ref()
            .filter(|s| s.is_fresh(self.refresh_ttl_days, Utc::now()))
        {
            tracing::debug!("Serving stored {} for {}", category, user_id);
            return Ok(snapshot.clone());
        }

        let token = self.resolve_token(user_id).await?;
        tracing::info!(
            "Refreshing {} for {} from {}",
            category,
            user_id,
            self.provider.source()
        );
        let snapshot = pipeline.run(self.provider.as_ref(), &token, user_id).await?;

        if snapshot.items.is_empty() && existing.is_none() {
            return Err(Error::NotFound {
                user_id: user_id.to_string(),
                category,
            });
        }

        let repository = Arc::clone(&self.repository);
        let pending = snapshot.clone();
        self.background.spawn("save_snapshot", async move {
            repository.save(pending).await?;
            Ok(())
        });

        Ok(snapshot)
    }

    /// Cached token for `user_id`, or a new one renewed from the stored
    /// refresh token.
    async fn resolve_token(&self, user_id: &str) -> Result<AccessToken> {
        if let Some(token) = self.tokens.get(user_id) {
            return Ok(token);
        }

        let record = match self.repository.get_auth_user(user_id).await {
            Ok(record) => record,
            Err(e) if e.is_not_found() => {
                return Err(Error::TokenRenewalFailed(format!(
                    "no stored credentials for {}",
                    user_id
                )))
            }
            Err(e) => return Err(e.into()),
        };
        let refresh_token = record.refresh_token.as_deref().ok_or_else(|| {
            Error::TokenRenewalFailed(format!("no refresh token stored for {}", user_id))
        })?;

        let mut token = self.token_source.refresh(refresh_token).await.map_err(|e| {
            tracing::warn!("Token renewal for {} failed: {}", user_id, e);
            Error::TokenRenewalFailed(e.to_string())
        })?;
        if token.refresh_token.is_none() {
            token.refresh_token = record.refresh_token.clone();
        }
        tracing::debug!("Renewed access token for {}", user_id);

        self.tokens.store(user_id, &token);

        let renewed = record.renewed(&token);
        let repository = Arc::clone(&self.repository);
        self.background.spawn("save_auth_user", async move {
            repository.save_auth_user(renewed).await?;
            Ok(())
        });

        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::models::{AuthUserRecord, TasteItem};
    use crate::repository::MemoryRepository;
    use crate::testing::{profile, track, StubProvider, StubTokenSource};
    use std::time::Duration;

    struct Harness {
        service: TasteService,
        repository: Arc<MemoryRepository>,
        provider: Arc<StubProvider>,
        token_source: Arc<StubTokenSource>,
        tokens: TokenCache,
        background: Background,
    }

    fn harness_with(provider: StubProvider) -> Harness {
        let repository = Arc::new(MemoryRepository::new());
        let provider = Arc::new(provider);
        let token_source = Arc::new(StubTokenSource::new());
        let tokens = TokenCache::new(
            Arc::new(MemoryCache::new("tokens", 100, Duration::from_secs(3600))),
            Duration::from_secs(3600),
        );
        let background = Background::new(4);

        let service = TasteService::new(
            repository.clone(),
            provider.clone(),
            token_source.clone(),
            tokens.clone(),
            background.clone(),
            30,
        );

        Harness {
            service,
            repository,
            provider,
            token_source,
            tokens,
            background,
        }
    }

    fn harness() -> Harness {
        let tracks = vec![track("t1", "Song A", ("a1", "Artist A"), "2020")];
        harness_with(StubProvider::new().with_tracks(tracks))
    }

    fn stored_token() -> AccessToken {
        AccessToken::new(
            "OLD".into(),
            "Bearer".into(),
            Some("R-old".into()),
            Some(3600),
        )
    }

    async fn seed_auth_user(repo: &MemoryRepository) {
        repo.save_auth_user(AuthUserRecord::new(profile("u1"), &stored_token()))
            .await
            .unwrap();
    }

    async fn seed_snapshot(repo: &MemoryRepository, age_days: i64) -> TasteSnapshot {
        let mut snapshot = TasteSnapshot::new("u1", Category::Tracks, vec![], "SPOTIFY");
        snapshot.last_updated = Utc::now() - chrono::Duration::days(age_days);
        repo.save(snapshot).await.unwrap()
    }

    #[tokio::test]
    async fn test_fresh_snapshot_skips_provider() {
        let h = harness();
        let stored = seed_snapshot(&h.repository, 1).await;

        let snapshot = h.service.fetch("u1", "tracks").await.unwrap();

        assert_eq!(snapshot, stored);
        assert_eq!(h.provider.data_calls(), 0);
        assert_eq!(h.token_source.refresh_calls(), 0);
    }

    #[tokio::test]
    async fn test_cold_fetch_renews_before_provider_call() {
        let h = harness();
        seed_auth_user(&h.repository).await;

        let snapshot = h.service.fetch("u1", "tracks").await.unwrap();

        assert_eq!(h.token_source.refresh_calls(), 1);
        // The provider only ever saw the renewed token.
        assert_eq!(h.provider.tokens_seen(), vec!["T".to_string()]);
        assert_eq!(snapshot.count, 1);
        assert_eq!(snapshot.source, "SPOTIFY");
        assert!(matches!(&snapshot.items[0], TasteItem::Track(t) if t.id == "t1"));
        assert_eq!(h.tokens.get("u1").unwrap().access_token, "T");

        h.background.drain().await;
        let persisted = h.repository.get_data("u1", Category::Tracks).await.unwrap();
        assert_eq!(persisted.items, snapshot.items);
        let record = h.repository.get_auth_user("u1").await.unwrap();
        assert_eq!(record.refresh_token.as_deref(), Some("R"));
    }

    #[tokio::test]
    async fn test_renewal_failure_never_calls_provider() {
        let h = harness();
        seed_auth_user(&h.repository).await;
        h.token_source.fail_refresh();

        let result = h.service.fetch("u1", "tracks").await;

        assert!(matches!(result, Err(Error::TokenRenewalFailed(_))));
        assert_eq!(h.provider.data_calls(), 0);
        assert!(h.tokens.get("u1").is_none());
    }

    #[tokio::test]
    async fn test_unknown_user_cannot_renew() {
        let h = harness();

        let result = h.service.fetch("u1", "artists").await;

        assert!(matches!(result, Err(Error::TokenRenewalFailed(_))));
        assert_eq!(h.token_source.refresh_calls(), 0);
        assert_eq!(h.provider.data_calls(), 0);
    }

    #[tokio::test]
    async fn test_cached_token_skips_renewal() {
        let h = harness();
        h.tokens.store("u1", &stored_token());

        h.service.fetch("u1", "tracks").await.unwrap();

        assert_eq!(h.token_source.refresh_calls(), 0);
        assert_eq!(h.provider.tokens_seen(), vec!["OLD".to_string()]);
    }

    #[tokio::test]
    async fn test_stale_snapshot_is_refreshed() {
        let h = harness();
        seed_auth_user(&h.repository).await;
        let stale = seed_snapshot(&h.repository, 40).await;

        let before = Utc::now();
        let snapshot = h.service.fetch("u1", "tracks").await.unwrap();

        assert_eq!(h.provider.tracks_calls(), 1);
        assert!(snapshot.last_updated >= before);
        assert_eq!(snapshot.count, 1);

        h.background.drain().await;
        let persisted = h.repository.get_data("u1", Category::Tracks).await.unwrap();
        assert_eq!(persisted.last_updated, snapshot.last_updated);
        assert_eq!(persisted.created_at, stale.created_at);
    }

    #[tokio::test]
    async fn test_category_errors() {
        let h = harness();

        assert!(matches!(
            h.service.fetch("u1", "genres").await,
            Err(Error::NotImplemented(Category::Genres))
        ));
        assert!(matches!(
            h.service.fetch("u1", "albums").await,
            Err(Error::InvalidCategory(c)) if c == "albums"
        ));
        assert_eq!(h.provider.data_calls(), 0);
    }

    #[tokio::test]
    async fn test_empty_everywhere_is_not_found() {
        let h = harness_with(StubProvider::new());
        seed_auth_user(&h.repository).await;

        let result = h.service.fetch("u1", "tracks").await;
        assert!(matches!(result, Err(Error::NotFound { .. })));

        h.background.drain().await;
        assert!(h
            .repository
            .get_data("u1", Category::Tracks)
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn test_provider_failure_keeps_stored_snapshot() {
        let h = harness();
        seed_auth_user(&h.repository).await;
        let stale = seed_snapshot(&h.repository, 40).await;
        h.provider.fail();

        let result = h.service.fetch("u1", "tracks").await;
        assert!(matches!(result, Err(Error::Provider(_))));

        h.background.drain().await;
        let persisted = h.repository.get_data("u1", Category::Tracks).await.unwrap();
        assert_eq!(persisted.last_updated, stale.last_updated);
    }
}
