//! Per-category fetch-and-map pipelines

use super::mapping::{map_artists, map_tracks};
use crate::auth::AccessToken;
use crate::error::{Error, ProviderError};
use crate::models::{Category, TasteSnapshot};
use crate::provider::Provider;

/// Provider endpoint plus mapper for one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pipeline {
    Tracks,
    Artists,
}

impl Pipeline {
    pub fn for_category(category: Category) -> Result<Self, Error> {
        match category {
            Category::Tracks => Ok(Self::Tracks),
            Category::Artists => Ok(Self::Artists),
            Category::Genres => Err(Error::NotImplemented(category)),
        }
    }

    pub fn category(&self) -> Category {
        match self {
            Self::Tracks => Category::Tracks,
            Self::Artists => Category::Artists,
        }
    }

    /// Fetch the user's top items and build a new snapshot stamped now.
    pub async fn run(
        &self,
        provider: &dyn Provider,
        token: &AccessToken,
        user_id: &str,
    ) -> Result<TasteSnapshot, ProviderError> {
        let items = match self {
            Self::Tracks => map_tracks(provider.top_tracks(token).await?),
            Self::Artists => map_artists(provider.top_artists(token).await?),
        };

        Ok(TasteSnapshot::new(
            user_id,
            self.category(),
            items,
            provider.source(),
        ))
    }
}
