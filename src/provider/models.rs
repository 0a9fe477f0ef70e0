//! Provider wire models

use serde::Deserialize;

/// One page of a paginated provider listing.
#[derive(Debug, Clone, Deserialize)]
pub struct Paging<T> {
    pub items: Vec<T>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SimpleArtist {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct ProviderAlbum {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub release_date: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProviderTrack {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<SimpleArtist>,
    #[serde(default)]
    pub album: ProviderAlbum,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProviderArtist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub genres: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_top_tracks_page() {
        let body = r#"{
            "items": [{
                "id": "t1",
                "name": "Song A",
                "popularity": 80,
                "artists": [{"id": "a1", "name": "Artist A", "type": "artist"}],
                "album": {"id": "al1", "name": "Album", "release_date": "2020"}
            }],
            "total": 1,
            "next": null
        }"#;

        let page: Paging<ProviderTrack> = serde_json::from_str(body).unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].artists[0].name, "Artist A");
        assert_eq!(page.items[0].album.release_date, "2020");
    }

    #[test]
    fn test_parse_artist_without_genres() {
        let artist: ProviderArtist =
            serde_json::from_str(r#"{"id": "a1", "name": "Artist A"}"#).unwrap();
        assert!(artist.genres.is_empty());
    }
}
