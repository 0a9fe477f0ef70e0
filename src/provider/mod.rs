//! Music provider API: top tracks, top artists, and the current user's profile

mod client;
mod models;

use async_trait::async_trait;

pub use client::SpotifyClient;
pub use models::*;

use crate::auth::AccessToken;
use crate::error::ProviderError;
use crate::models::ProviderProfile;

/// Authenticated calls against the external provider.
///
/// Every call takes the bearer token explicitly so one client serves all users.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Identifier stamped on snapshots built from this provider's data.
    fn source(&self) -> &str;

    async fn top_tracks(&self, token: &AccessToken) -> Result<Vec<ProviderTrack>, ProviderError>;

    async fn top_artists(&self, token: &AccessToken)
        -> Result<Vec<ProviderArtist>, ProviderError>;

    async fn user_profile(&self, token: &AccessToken) -> Result<ProviderProfile, ProviderError>;
}
