//! CSRF state for the authorization-code redirect
//!
//! A state is issued at login and consumed at most once at callback. Consuming
//! removes the cache entry atomically, so a replayed callback can never match.

use std::sync::Arc;

use url::Url;

use crate::cache::MemoryCache;
use crate::error::{Error, Result};

/// Random bytes per state (hex-encoded to twice this length).
pub const STATE_BYTES: usize = 32;

/// Fresh random state, 64 lowercase hex characters.
pub fn generate_state() -> Result<String> {
    let mut buf = [0u8; STATE_BYTES];
    getrandom::getrandom(&mut buf).map_err(Error::Entropy)?;
    Ok(hex::encode(buf))
}

/// Shape of every issued state. Anything else never reaches the cache.
fn is_well_formed(state: &str) -> bool {
    state.len() == STATE_BYTES * 2
        && state
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

fn state_key(state: &str) -> String {
    format!("state-{}", state)
}

fn url_key(state: &str) -> String {
    format!("state-url-{}", state)
}

/// Pending login attempts, backed by the shared state cache.
#[derive(Debug, Clone)]
pub struct StateStore {
    cache: Arc<MemoryCache<String>>,
}

impl StateStore {
    pub fn new(cache: Arc<MemoryCache<String>>) -> Self {
        Self { cache }
    }

    /// Record an issued state, plus its callback URL when it differs from the
    /// configured default.
    pub fn issue(&self, state: &str, callback_url: Option<&Url>) {
        self.cache.save(state_key(state), state.to_string());
        if let Some(url) = callback_url {
            self.cache.save(url_key(state), url.to_string());
        }
    }

    /// Consume `state`. Returns the callback URL recorded at issue time, if any.
    ///
    /// Fails with [`Error::InvalidState`] when the state is malformed, was
    /// never issued, has expired, or was already consumed. The callback URL
    /// entry is only removed once the state itself has matched.
    pub fn consume(&self, state: &str) -> Result<Option<String>> {
        if !is_well_formed(state) {
            return Err(Error::InvalidState);
        }
        match self.cache.take(&state_key(state)) {
            Some(stored) if stored == state => Ok(self.cache.take(&url_key(state))),
            _ => Err(Error::InvalidState),
        }
    }
}
