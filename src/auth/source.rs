//! Token sources: where access tokens come from
//!
//! `OAuthTokenSource` runs the authorization-code and refresh-token grants
//! against the provider's token endpoint. `StaticTokenSource` hands out a
//! configured token and is meant for local runs against a stub provider.

use std::borrow::Cow;

use async_trait::async_trait;
use oauth2::basic::{BasicClient, BasicErrorResponse, BasicTokenResponse};
use oauth2::reqwest::async_http_client;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, RedirectUrl, RefreshToken,
    RequestTokenError, Scope, TokenResponse, TokenUrl,
};
use url::Url;

use super::AccessToken;
use crate::config::{ProviderConfig, TokenSourceConfig};
use crate::error::ProviderError;

#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Provider authorization URL carrying `state` and the required scopes.
    fn authorize_url(&self, state: &str, redirect: &Url) -> Result<Url, ProviderError>;

    /// Authorization-code grant. `redirect` must equal the one used to authorize.
    async fn exchange_code(&self, code: &str, redirect: &Url)
        -> Result<AccessToken, ProviderError>;

    /// Refresh-token grant.
    async fn refresh(&self, refresh_token: &str) -> Result<AccessToken, ProviderError>;
}

/// Build the configured token source.
pub fn from_config(
    provider: &ProviderConfig,
    source: &TokenSourceConfig,
) -> Result<Box<dyn TokenSource>, ProviderError> {
    match source {
        TokenSourceConfig::OAuth => Ok(Box::new(OAuthTokenSource::new(provider)?)),
        TokenSourceConfig::Static {
            access_token,
            expires_in,
        } => Ok(Box::new(StaticTokenSource::new(
            access_token.clone(),
            *expires_in,
        ))),
    }
}

pub struct OAuthTokenSource {
    client: BasicClient,
    scopes: Vec<String>,
}

impl OAuthTokenSource {
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        Ok(Self {
            client: build_client(config)?,
            scopes: config.scopes.clone(),
        })
    }
}

/// Build the OAuth2 client from a ProviderConfig
fn build_client(config: &ProviderConfig) -> Result<BasicClient, ProviderError> {
    let auth_url = AuthUrl::new(config.auth_url.clone())?;
    let token_url = TokenUrl::new(config.token_url.clone())?;

    Ok(BasicClient::new(
        ClientId::new(config.client_id.clone()),
        Some(ClientSecret::new(config.client_secret.clone())),
        auth_url,
        Some(token_url),
    ))
}

fn into_access_token(response: &BasicTokenResponse) -> AccessToken {
    AccessToken::new(
        response.access_token().secret().to_string(),
        response.token_type().as_ref().to_string(),
        response.refresh_token().map(|rt| rt.secret().to_string()),
        response.expires_in().map(|d| d.as_secs()),
    )
}

fn token_error<E: std::error::Error + 'static>(
    err: RequestTokenError<E, BasicErrorResponse>,
) -> ProviderError {
    match err {
        RequestTokenError::ServerResponse(resp) => ProviderError::Token(resp.to_string()),
        other => ProviderError::Token(other.to_string()),
    }
}

#[async_trait]
impl TokenSource for OAuthTokenSource {
    fn authorize_url(&self, state: &str, redirect: &Url) -> Result<Url, ProviderError> {
        let state = state.to_string();
        let (url, _) = self
            .client
            .authorize_url(move || CsrfToken::new(state))
            .add_scopes(self.scopes.iter().cloned().map(Scope::new))
            .set_redirect_uri(Cow::Owned(RedirectUrl::from_url(redirect.clone())))
            .url();
        Ok(url)
    }

    async fn exchange_code(
        &self,
        code: &str,
        redirect: &Url,
    ) -> Result<AccessToken, ProviderError> {
        tracing::debug!("Exchanging authorization code at token endpoint");
        let response = self
            .client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .set_redirect_uri(Cow::Owned(RedirectUrl::from_url(redirect.clone())))
            .request_async(async_http_client)
            .await
            .map_err(token_error)?;

        Ok(into_access_token(&response))
    }

    async fn refresh(&self, refresh_token: &str) -> Result<AccessToken, ProviderError> {
        tracing::info!("Refreshing access token...");
        let response = self
            .client
            .exchange_refresh_token(&RefreshToken::new(refresh_token.to_string()))
            .request_async(async_http_client)
            .await
            .map_err(token_error)?;

        Ok(into_access_token(&response))
    }
}

/// Fixed token; the authorization URL loops straight back to the callback.
pub struct StaticTokenSource {
    access_token: String,
    expires_in: u64,
}

impl StaticTokenSource {
    pub fn new(access_token: String, expires_in: u64) -> Self {
        Self {
            access_token,
            expires_in,
        }
    }

    fn token(&self) -> AccessToken {
        AccessToken::new(
            self.access_token.clone(),
            "Bearer".to_string(),
            Some(self.access_token.clone()),
            Some(self.expires_in),
        )
    }
}

#[async_trait]
impl TokenSource for StaticTokenSource {
    fn authorize_url(&self, state: &str, redirect: &Url) -> Result<Url, ProviderError> {
        let mut url = redirect.clone();
        url.query_pairs_mut()
            .append_pair("code", "static")
            .append_pair("state", state);
        Ok(url)
    }

    async fn exchange_code(
        &self,
        _code: &str,
        _redirect: &Url,
    ) -> Result<AccessToken, ProviderError> {
        Ok(self.token())
    }

    async fn refresh(&self, _refresh_token: &str) -> Result<AccessToken, ProviderError> {
        Ok(self.token())
    }
}
