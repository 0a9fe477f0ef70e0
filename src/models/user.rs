//! User-related models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::AccessToken;

/// Provider user profile (`/me`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderProfile {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub product: Option<String>,
}

/// Durable link between a user id and its current token material.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUserRecord {
    pub user_id: String,
    pub provider_user_id: String,
    pub token_type: String,
    pub refresh_token: Option<String>,
    pub token_expiration: Option<DateTime<Utc>>,
    pub profile: ProviderProfile,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl AuthUserRecord {
    pub fn new(profile: ProviderProfile, token: &AccessToken) -> Self {
        Self {
            user_id: profile.id.clone(),
            provider_user_id: profile.id.clone(),
            token_type: token.token_type.clone(),
            refresh_token: token.refresh_token.clone(),
            token_expiration: token.expires_at,
            profile,
            created_at: None,
            updated_at: None,
        }
    }

    /// Same user and profile, new token material.
    pub fn renewed(&self, token: &AccessToken) -> Self {
        Self {
            token_type: token.token_type.clone(),
            refresh_token: token
                .refresh_token
                .clone()
                .or_else(|| self.refresh_token.clone()),
            token_expiration: token.expires_at,
            ..self.clone()
        }
    }
}
