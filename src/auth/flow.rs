//! Authorization-code login: issue the redirect, then complete the callback

use std::sync::Arc;

use url::Url;

use super::state::{generate_state, StateStore};
use super::{TokenCache, TokenSource};
use crate::background::Background;
use crate::error::{ProviderError, Result};
use crate::models::{AuthUserRecord, ProviderProfile};
use crate::provider::Provider;
use crate::repository::Repository;

/// Where to send the user, and the state the client must echo back.
#[derive(Debug, Clone)]
pub struct LoginRedirect {
    pub url: Url,
    pub state: String,
}

pub struct AuthFlow {
    provider_name: String,
    default_callback: Url,
    states: StateStore,
    tokens: TokenCache,
    token_source: Arc<dyn TokenSource>,
    provider: Arc<dyn Provider>,
    repository: Arc<dyn Repository>,
    background: Background,
}

impl AuthFlow {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        provider_name: impl Into<String>,
        default_callback: Url,
        states: StateStore,
        tokens: TokenCache,
        token_source: Arc<dyn TokenSource>,
        provider: Arc<dyn Provider>,
        repository: Arc<dyn Repository>,
        background: Background,
    ) -> Self {
        Self {
            provider_name: provider_name.into(),
            default_callback,
            states,
            tokens,
            token_source,
            provider,
            repository,
            background,
        }
    }

    /// `base` with the `provider=<name>` marker appended.
    fn effective_callback(&self, base: &Url) -> Url {
        let mut url = base.clone();
        url.query_pairs_mut().append_pair("provider", &self.provider_name);
        url
    }

    /// Start a login attempt.
    ///
    /// Falls back to the configured callback URL when none is given. The
    /// returned state must also reach the client (e.g. a cookie) so the
    /// callback can be matched.
    pub fn begin_login(&self, callback: Option<&Url>) -> Result<LoginRedirect> {
        let state = generate_state()?;
        let custom = callback.filter(|url| **url != self.default_callback);
        let redirect = self.effective_callback(custom.unwrap_or(&self.default_callback));

        let url = self.token_source.authorize_url(&state, &redirect)?;
        self.states.issue(&state, custom.is_some().then_some(&redirect));

        tracing::info!(
            "Issued login redirect (custom callback: {})",
            custom.is_some()
        );
        Ok(LoginRedirect { url, state })
    }

    /// Finish a login attempt from the provider's redirect.
    ///
    /// The state is consumed before anything else, so a replay fails with
    /// `InvalidState` even if this call later errors.
    pub async fn complete_callback(&self, code: &str, state: &str) -> Result<ProviderProfile> {
        let stored_callback = self.states.consume(state)?;
        let redirect = match stored_callback {
            Some(url) => Url::parse(&url).map_err(ProviderError::from)?,
            None => self.effective_callback(&self.default_callback),
        };

        let token = self.token_source.exchange_code(code, &redirect).await?;
        let profile = self.provider.user_profile(&token).await?;
        tracing::info!("Login completed for user {}", profile.id);

        self.tokens.store(&profile.id, &token);

        let record = AuthUserRecord::new(profile.clone(), &token);
        let repository = Arc::clone(&self.repository);
        self.background.spawn("save_auth_user", async move {
            repository.save_auth_user(record).await?;
            Ok(())
        });

        Ok(profile)
    }
}
