//! Error taxonomy for the auth flow and taste orchestration.
//!
//! Errors on the synchronous request path are returned to the caller as-is.
//! Background write failures are wrapped in [`Error::Persistence`] and only
//! ever logged.

use reqwest::StatusCode;
use thiserror::Error;

use crate::models::Category;

/// Failures from the external music provider or its token endpoint.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("http client error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("HTTP {status} for {url}: {body}")]
    Status {
        status: StatusCode,
        url: String,
        body: String,
    },
    #[error("token endpoint error: {0}")]
    Token(String),
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
}

/// Failures from the durable repository.
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// Nothing stored under the key. Used as a control signal, not a failure.
    #[error("{0} not found")]
    NotFound(String),
    #[error("storage i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("stored record is malformed: {0}")]
    Serde(#[from] serde_json::Error),
}

impl RepositoryError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid or expired oauth state")]
    InvalidState,
    #[error("secure random source unavailable: {0}")]
    Entropy(getrandom::Error),
    #[error("invalid data category: {0}")]
    InvalidCategory(String),
    #[error("{0} data is not implemented")]
    NotImplemented(Category),
    #[error("token renewal failed: {0}")]
    TokenRenewalFailed(String),
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),
    /// A detached write failed. Logged, never returned to a caller.
    #[error("background write `{task}` failed: {source}")]
    Persistence {
        task: &'static str,
        #[source]
        source: Box<Error>,
    },
    #[error("no {category} data for user {user_id}")]
    NotFound { user_id: String, category: Category },
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// HTTP status an API boundary should answer with.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidState | Self::InvalidCategory(_) => StatusCode::BAD_REQUEST,
            Self::NotImplemented(_) => StatusCode::NOT_IMPLEMENTED,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::TokenRenewalFailed(_) | Self::Provider(_) => StatusCode::BAD_GATEWAY,
            Self::Entropy(_) | Self::Repository(_) | Self::Persistence { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}
