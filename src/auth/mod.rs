//! Authentication against the music provider
//!
//! Implements the OAuth2 authorization-code flow with single-use CSRF state,
//! and keeps per-user access tokens in a bounded in-memory cache.

pub mod flow;
pub mod source;
pub mod state;
pub mod tokens;

pub use flow::AuthFlow;
pub use source::TokenSource;
pub use state::StateStore;
pub use tokens::{AccessToken, TokenCache};
