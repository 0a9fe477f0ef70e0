//! Test doubles for the provider and token source seams

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::StatusCode;
use url::Url;

use crate::auth::{AccessToken, TokenSource};
use crate::error::ProviderError;
use crate::models::ProviderProfile;
use crate::provider::{Provider, ProviderAlbum, ProviderArtist, ProviderTrack, SimpleArtist};

pub fn profile(id: &str) -> ProviderProfile {
    ProviderProfile {
        id: id.to_string(),
        display_name: Some(format!("User {}", id)),
        email: None,
        country: Some("DK".to_string()),
        product: None,
    }
}

/// Track with a single artist `(artist_id, artist_name)`.
pub fn track(id: &str, name: &str, artist: (&str, &str), release_date: &str) -> ProviderTrack {
    ProviderTrack {
        id: id.to_string(),
        name: name.to_string(),
        artists: vec![SimpleArtist {
            id: artist.0.to_string(),
            name: artist.1.to_string(),
        }],
        album: ProviderAlbum {
            release_date: release_date.to_string(),
            ..ProviderAlbum::default()
        },
    }
}

pub fn artist(id: &str, name: &str, genres: &[&str]) -> ProviderArtist {
    ProviderArtist {
        id: id.to_string(),
        name: name.to_string(),
        genres: genres.iter().map(|g| g.to_string()).collect(),
    }
}

fn unavailable(path: &str) -> ProviderError {
    ProviderError::Status {
        status: StatusCode::SERVICE_UNAVAILABLE,
        url: format!("https://provider.test{}", path),
        body: "unavailable".to_string(),
    }
}

/// Canned provider that counts its calls.
#[derive(Default)]
pub struct StubProvider {
    tracks: Vec<ProviderTrack>,
    artists: Vec<ProviderArtist>,
    profile: Option<ProviderProfile>,
    failing: AtomicBool,
    tracks_calls: AtomicUsize,
    artists_calls: AtomicUsize,
    profile_calls: AtomicUsize,
    tokens_seen: Mutex<Vec<String>>,
}

impl StubProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tracks(mut self, tracks: Vec<ProviderTrack>) -> Self {
        self.tracks = tracks;
        self
    }

    pub fn with_artists(mut self, artists: Vec<ProviderArtist>) -> Self {
        self.artists = artists;
        self
    }

    pub fn with_profile(mut self, profile: ProviderProfile) -> Self {
        self.profile = Some(profile);
        self
    }

    /// Every later call answers 503.
    pub fn fail(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    pub fn tracks_calls(&self) -> usize {
        self.tracks_calls.load(Ordering::SeqCst)
    }

    pub fn artists_calls(&self) -> usize {
        self.artists_calls.load(Ordering::SeqCst)
    }

    pub fn profile_calls(&self) -> usize {
        self.profile_calls.load(Ordering::SeqCst)
    }

    pub fn data_calls(&self) -> usize {
        self.tracks_calls() + self.artists_calls()
    }

    /// Bearer tokens presented so far, in call order.
    pub fn tokens_seen(&self) -> Vec<String> {
        self.tokens_seen
            .lock()
            .map(|seen| seen.clone())
            .unwrap_or_default()
    }

    fn record(
        &self,
        counter: &AtomicUsize,
        token: &AccessToken,
        path: &str,
    ) -> Result<(), ProviderError> {
        counter.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut seen) = self.tokens_seen.lock() {
            seen.push(token.access_token.clone());
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(unavailable(path));
        }
        Ok(())
    }
}

#[async_trait]
impl Provider for StubProvider {
    fn source(&self) -> &str {
        "SPOTIFY"
    }

    async fn top_tracks(&self, token: &AccessToken) -> Result<Vec<ProviderTrack>, ProviderError> {
        self.record(&self.tracks_calls, token, "/me/top/tracks")?;
        Ok(self.tracks.clone())
    }

    async fn top_artists(
        &self,
        token: &AccessToken,
    ) -> Result<Vec<ProviderArtist>, ProviderError> {
        self.record(&self.artists_calls, token, "/me/top/artists")?;
        Ok(self.artists.clone())
    }

    async fn user_profile(&self, token: &AccessToken) -> Result<ProviderProfile, ProviderError> {
        self.record(&self.profile_calls, token, "/me")?;
        self.profile.clone().ok_or_else(|| unavailable("/me"))
    }
}

/// Token endpoint double: always issues access token `T` / refresh token `R`.
#[derive(Default)]
pub struct StubTokenSource {
    fail_exchange: AtomicBool,
    fail_refresh: AtomicBool,
    exchange_calls: AtomicUsize,
    refresh_calls: AtomicUsize,
    exchanged: Mutex<Vec<(String, String)>>,
}

impl StubTokenSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_exchange(&self) {
        self.fail_exchange.store(true, Ordering::SeqCst);
    }

    pub fn fail_refresh(&self) {
        self.fail_refresh.store(true, Ordering::SeqCst);
    }

    pub fn exchange_calls(&self) -> usize {
        self.exchange_calls.load(Ordering::SeqCst)
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    /// `(code, redirect_uri)` pairs presented to the exchange.
    pub fn exchanged_codes(&self) -> Vec<(String, String)> {
        self.exchanged
            .lock()
            .map(|codes| codes.clone())
            .unwrap_or_default()
    }

    fn token() -> AccessToken {
        AccessToken::new(
            "T".to_string(),
            "Bearer".to_string(),
            Some("R".to_string()),
            Some(3600),
        )
    }
}

#[async_trait]
impl TokenSource for StubTokenSource {
    fn authorize_url(&self, state: &str, redirect: &Url) -> Result<Url, ProviderError> {
        let mut url = Url::parse("https://accounts.provider.test/authorize")?;
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("state", state)
            .append_pair("redirect_uri", redirect.as_str());
        Ok(url)
    }

    async fn exchange_code(
        &self,
        code: &str,
        redirect: &Url,
    ) -> Result<AccessToken, ProviderError> {
        self.exchange_calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut exchanged) = self.exchanged.lock() {
            exchanged.push((code.to_string(), redirect.to_string()));
        }
        if self.fail_exchange.load(Ordering::SeqCst) {
            return Err(ProviderError::Token("invalid_grant".to_string()));
        }
        Ok(Self::token())
    }

    async fn refresh(&self, _refresh_token: &str) -> Result<AccessToken, ProviderError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_refresh.load(Ordering::SeqCst) {
            return Err(ProviderError::Token("invalid_grant".to_string()));
        }
        Ok(Self::token())
    }
}
