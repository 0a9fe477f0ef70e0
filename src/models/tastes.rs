//! Taste snapshot models

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Kind of taste data kept per user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Tracks,
    Artists,
    Genres,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tracks => "tracks",
            Self::Artists => "artists",
            Self::Genres => "genres",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tracks" => Ok(Self::Tracks),
            "artists" => Ok(Self::Artists),
            "genres" => Ok(Self::Genres),
            other => Err(Error::InvalidCategory(other.to_string())),
        }
    }
}

/// Artist reference embedded in a track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtistRef {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackDetails {
    pub id: String,
    pub name: String,
    pub artists: Vec<ArtistRef>,
    pub release_date: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtistDetails {
    pub id: String,
    pub name: String,
    pub genres: Vec<String>,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenreDetails {
    pub id: String,
    pub name: String,
}

/// One entry of a snapshot. The variant always matches the snapshot's category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TasteItem {
    Track(TrackDetails),
    Artist(ArtistDetails),
    Genre(GenreDetails),
}

/// Persisted taste data for one (user, category) pair.
///
/// Overwritten wholesale on refresh; `last_updated` never moves backwards
/// for the same key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TasteSnapshot {
    pub user_id: String,
    pub category: Category,
    pub items: Vec<TasteItem>,
    /// Provider identifier, e.g. `SPOTIFY`
    pub source: String,
    pub count: usize,
    pub last_updated: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl TasteSnapshot {
    pub fn new(
        user_id: impl Into<String>,
        category: Category,
        items: Vec<TasteItem>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            category,
            count: items.len(),
            items,
            source: source.into(),
            last_updated: Utc::now(),
            created_at: None,
        }
    }

    /// True while the snapshot is younger than `refresh_ttl_days`.
    pub fn is_fresh(&self, refresh_ttl_days: u32, now: DateTime<Utc>) -> bool {
        let age = now.signed_duration_since(self.last_updated);
        age < chrono::Duration::days(i64::from(refresh_ttl_days))
    }
}
