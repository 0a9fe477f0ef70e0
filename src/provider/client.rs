//! Authenticated HTTP client for the Spotify Web API

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use super::{Paging, Provider, ProviderArtist, ProviderTrack};
use crate::auth::AccessToken;
use crate::config::ProviderConfig;
use crate::error::ProviderError;
use crate::models::ProviderProfile;

/// Items requested per top-items call (API maximum).
const TOP_ITEMS_LIMIT: u32 = 50;
const TIME_RANGE: &str = "long_term";

pub struct SpotifyClient {
    http: reqwest::Client,
    api_base: String,
    source: String,
}

impl SpotifyClient {
    pub fn new(config: &ProviderConfig) -> Self {
        Self::with_http(reqwest::Client::new(), config)
    }

    pub fn with_http(http: reqwest::Client, config: &ProviderConfig) -> Self {
        Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            source: config.source.clone(),
        }
    }

    fn top_items_path(&self, kind: &str) -> String {
        format!(
            "{}/me/top/{}?time_range={}&limit={}",
            self.api_base, kind, TIME_RANGE, TOP_ITEMS_LIMIT
        )
    }

    /// GET with bearer auth, decoded as JSON.
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        token: &AccessToken,
    ) -> Result<T, ProviderError> {
        tracing::debug!("Provider GET {}", url);

        let resp = self
            .http
            .get(url)
            .bearer_auth(&token.access_token)
            .send()
            .await?;

        let resp = check_response(resp, url).await?;
        Ok(resp.json().await?)
    }
}

#[async_trait]
impl Provider for SpotifyClient {
    fn source(&self) -> &str {
        &self.source
    }

    async fn top_tracks(&self, token: &AccessToken) -> Result<Vec<ProviderTrack>, ProviderError> {
        let url = self.top_items_path("tracks");
        let page: Paging<ProviderTrack> = self.get_json(&url, token).await?;
        Ok(page.items)
    }

    async fn top_artists(
        &self,
        token: &AccessToken,
    ) -> Result<Vec<ProviderArtist>, ProviderError> {
        let url = self.top_items_path("artists");
        let page: Paging<ProviderArtist> = self.get_json(&url, token).await?;
        Ok(page.items)
    }

    async fn user_profile(&self, token: &AccessToken) -> Result<ProviderProfile, ProviderError> {
        let url = format!("{}/me", self.api_base);
        self.get_json(&url, token).await
    }
}

/// Check HTTP response status code and return a clear error on failure.
async fn check_response(
    resp: reqwest::Response,
    url: &str,
) -> Result<reqwest::Response, ProviderError> {
    let status = resp.status();
    if status == reqwest::StatusCode::UNAUTHORIZED {
        tracing::warn!("401 Unauthorized for {}. Token may be invalid or revoked.", url);
    }
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(ProviderError::Status {
            status,
            url: url.to_string(),
            body,
        });
    }
    Ok(resp)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_items_path() {
        let config = ProviderConfig {
            api_base: "https://api.example.com/v1/".into(),
            ..ProviderConfig::default()
        };
        let client = SpotifyClient::new(&config);

        assert_eq!(
            client.top_items_path("tracks"),
            "https://api.example.com/v1/me/top/tracks?time_range=long_term&limit=50"
        );
        assert_eq!(client.source(), "SPOTIFY");
    }
}
