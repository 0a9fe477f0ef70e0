//! Access token model and the per-user token cache

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cache::{Lookup, MemoryCache};

/// Extra lifetime granted to a cached token past its expiry instant.
const CACHE_GRACE_MINUTES: i64 = 15;

/// Tokens this close to expiry are treated as already expired.
const EXPIRY_MARGIN_SECS: i64 = 300;

/// Provider-issued bearer credential. Replaced on renewal, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    pub token_type: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    pub fn new(
        access_token: String,
        token_type: String,
        refresh_token: Option<String>,
        expires_in_secs: Option<u64>,
    ) -> Self {
        // Out-of-range lifetimes are treated as no expiry
        let expires_at = expires_in_secs
            .and_then(|secs| i64::try_from(secs).ok())
            .and_then(chrono::Duration::try_seconds)
            .and_then(|lifetime| Utc::now().checked_add_signed(lifetime));

        Self {
            access_token,
            token_type,
            refresh_token,
            expires_at,
        }
    }

    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(exp) => Utc::now() + chrono::Duration::seconds(EXPIRY_MARGIN_SECS) >= exp,
            None => false,
        }
    }

    /// Cache lifetime: `(expires_at + 15 min) - now`, or `default` for tokens
    /// without a (representable) expiry.
    pub fn cache_ttl(&self, default: Duration) -> Duration {
        let Some(exp) = self.expires_at else {
            return default;
        };
        match exp.checked_add_signed(chrono::Duration::minutes(CACHE_GRACE_MINUTES)) {
            Some(evict_at) => (evict_at - Utc::now()).to_std().unwrap_or(Duration::ZERO),
            None => default,
        }
    }
}

/// Shared handle over the token cache, keyed by user id.
///
/// Each user maps to at most one entry; storing a renewed token replaces it.
/// The backing cache may be built with `return_expired(true)`; expired
/// entries found on read are then dropped here.
#[derive(Debug, Clone)]
pub struct TokenCache {
    cache: Arc<MemoryCache<AccessToken>>,
    default_ttl: Duration,
}

impl TokenCache {
    pub fn new(cache: Arc<MemoryCache<AccessToken>>, default_ttl: Duration) -> Self {
        Self { cache, default_ttl }
    }

    /// Cached token for `user_id`, unless it is (nearly) expired.
    pub fn get(&self, user_id: &str) -> Option<AccessToken> {
        match self.cache.get(user_id) {
            Lookup::Hit(token) if !token.is_expired() => Some(token),
            Lookup::Hit(_) => None,
            Lookup::Expired(_) => {
                tracing::debug!("Cached token for {} expired", user_id);
                self.cache.delete(user_id);
                None
            }
            Lookup::Miss => None,
        }
    }

    pub fn store(&self, user_id: &str, token: &AccessToken) {
        let ttl = token.cache_ttl(self.default_ttl);
        tracing::debug!("Caching token for {} (ttl {}s)", user_id, ttl.as_secs());
        self.cache.save_with_ttl(user_id, token.clone(), ttl);
    }
}
