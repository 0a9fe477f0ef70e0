//! Provider items to taste items

use crate::models::{ArtistDetails, ArtistRef, TasteItem, TrackDetails};
use crate::provider::{ProviderArtist, ProviderTrack};

pub fn map_tracks(tracks: Vec<ProviderTrack>) -> Vec<TasteItem> {
    tracks
        .into_iter()
        .map(|track| {
            TasteItem::Track(TrackDetails {
                id: track.id,
                name: track.name,
                artists: track
                    .artists
                    .into_iter()
                    .map(|a| ArtistRef {
                        id: a.id,
                        name: a.name,
                    })
                    .collect(),
                release_date: track.album.release_date,
            })
        })
        .collect()
}

pub fn map_artists(artists: Vec<ProviderArtist>) -> Vec<TasteItem> {
    artists
        .into_iter()
        .map(|artist| {
            TasteItem::Artist(ArtistDetails {
                display_name: artist.name.clone(),
                id: artist.id,
                name: artist.name,
                genres: artist.genres,
            })
        })
        .collect()
}
