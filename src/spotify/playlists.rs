use reqwest::Client;
use serde::Deserialize;

use crate::{
    types::{PlaylistPage, PlaylistSummary, PlaylistTrackPage, Track, TrackSummary},
    utils,
};

use super::{SpotifyError, upstream_error};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackSort {
    Name,
    Duration,
    Artist,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// Retrieves one page of the current user's playlists.
///
/// Calls `GET {api_url}/me/playlists` and keeps id, name, first image and
/// track count of each playlist.
pub async fn get_playlists(
    client: &Client,
    api_url: &str,
    token: &str,
    limit: u32,
    offset: u32,
) -> Result<Vec<PlaylistSummary>, SpotifyError> {
    let response = client
        .get(format!("{}/me/playlists", api_url))
        .bearer_auth(token)
        .query(&[("limit", limit), ("offset", offset)])
        .send()
        .await?;
    if !response.status().is_success() {
        return Err(upstream_error(response).await);
    }

    let page: PlaylistPage = response.json().await?;
    Ok(page
        .items
        .into_iter()
        .map(|item| PlaylistSummary {
            id: item.id,
            name: item.name,
            image: item
                .images
                .and_then(|images| images.into_iter().next())
                .map(|image| image.url),
            tracks: item.tracks.map(|t| t.total).unwrap_or_default(),
        })
        .collect())
}

/// Retrieves one page of a playlist's tracks, optionally sorted.
///
/// Sorting only applies to the fetched page. Entries without a track (e.g.
/// removed local files) are dropped.
pub async fn get_playlist_tracks(
    client: &Client,
    api_url: &str,
    token: &str,
    playlist_id: &str,
    limit: u32,
    offset: u32,
    sort: Option<(TrackSort, SortOrder)>,
) -> Result<Vec<TrackSummary>, SpotifyError> {
    let response = client
        .get(format!("{}/playlists/{}/tracks", api_url, playlist_id))
        .bearer_auth(token)
        .query(&[("limit", limit), ("offset", offset)])
        .send()
        .await?;
    if !response.status().is_success() {
        return Err(upstream_error(response).await);
    }

    let page: PlaylistTrackPage = response.json().await?;
    let mut tracks: Vec<Track> = page.items.into_iter().filter_map(|i| i.track).collect();
    if let Some((by, order)) = sort {
        sort_tracks(&mut tracks, by, order);
    }

    Ok(tracks.into_iter().map(summarize).collect())
}

pub fn sort_tracks(tracks: &mut [Track], by: TrackSort, order: SortOrder) {
    tracks.sort_by(|a, b| {
        let ordering = match by {
            TrackSort::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
            TrackSort::Duration => a.duration_ms.cmp(&b.duration_ms),
            TrackSort::Artist => first_artist(a).cmp(&first_artist(b)),
        };
        match order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    });
}

fn first_artist(track: &Track) -> String {
    track
        .artists
        .first()
        .map(|a| a.name.to_lowercase())
        .unwrap_or_default()
}

fn summarize(track: Track) -> TrackSummary {
    TrackSummary {
        duration_formatted: utils::format_duration(track.duration_ms),
        artists: track.artists.into_iter().map(|a| a.name).collect(),
        id: track.id,
        name: track.name,
        duration_ms: track.duration_ms,
        preview_url: track.preview_url,
        external_url: track.external_urls.spotify,
        album: track.album.unwrap_or_default(),
    }
}
