use std::collections::HashMap;

use chrono::{DateTime, NaiveDate};
use color_eyre::eyre::{Result, WrapErr};

use crate::models::{Album, Artist, AudioFeatures, RecentPlay, RecentPlaysPage, Track};
use crate::ports::spotify::MetadataSource;
use crate::spotify_rs::client::SpotifyClient;
use crate::spotify_rs::types::{
    SpotifyAlbum, SpotifyArtist, SpotifyAudioFeatures, SpotifyRecentlyPlayed, SpotifyTrack,
};

/// Production adapter that delegates to the `spotify_rs` HTTP client.
pub struct SpotifyMetadataSource {
    client: SpotifyClient,
}

impl SpotifyMetadataSource {
    pub fn new(client: SpotifyClient) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl MetadataSource for SpotifyMetadataSource {
    async fn recent_plays(&self, after_ms: i64) -> Result<RecentPlaysPage> {
        let page = self
            .client
            .get_recently_played(after_ms)
            .await
            .wrap_err("Failed to fetch recently played tracks")?;
        to_recent_plays_page(page)
    }

    async fn tracks(&self, ids: &[String]) -> Result<Vec<Track>> {
        let tracks = self
            .client
            .get_tracks(ids)
            .await
            .wrap_err("Failed to fetch tracks")?;
        let found: Vec<String> = tracks.iter().filter_map(|track| track.id.clone()).collect();
        let features = self
            .client
            .get_audio_features(&found)
            .await
            .wrap_err("Failed to fetch audio features")?;

        let mut features_by_id: HashMap<String, AudioFeatures> = features
            .into_iter()
            .map(|features| (features.id.clone(), to_audio_features(features)))
            .collect();

        Ok(tracks
            .into_iter()
            .filter_map(|track| {
                let id = track.id.clone()?;
                let features = features_by_id.remove(&id);
                Some(to_track(id, track, features))
            })
            .collect())
    }

    async fn albums(&self, ids: &[String]) -> Result<Vec<Album>> {
        let albums = self
            .client
            .get_albums(ids)
            .await
            .wrap_err("Failed to fetch albums")?;
        Ok(albums.into_iter().map(to_album).collect())
    }

    async fn artists(&self, ids: &[String]) -> Result<Vec<Artist>> {
        let artists = self
            .client
            .get_artists(ids)
            .await
            .wrap_err("Failed to fetch artists")?;
        Ok(artists.into_iter().map(to_artist).collect())
    }
}

fn to_recent_plays_page(page: SpotifyRecentlyPlayed) -> Result<RecentPlaysPage> {
    // An empty page ends the feed whatever the cursor says.
    let exhausted = page.items.is_empty();

    let items = page
        .items
        .into_iter()
        .filter_map(|item| {
            let Some(track_id) = item.track.id.clone() else {
                tracing::debug!(
                    name = %item.track.name,
                    played_at = %item.played_at,
                    "Skipping play without a track id"
                );
                return None;
            };
            Some((track_id, item))
        })
        .map(|(track_id, item)| -> Result<RecentPlay> {
            let played_at = DateTime::parse_from_rfc3339(&item.played_at)
                .wrap_err_with(|| format!("Invalid played_at timestamp: {}", item.played_at))?;
            Ok(RecentPlay {
                track_id,
                played_at: played_at.timestamp_millis() as f64 / 1000.0,
                duration_ms: item.track.duration_ms,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let next_after_ms = if exhausted {
        None
    } else {
        page.cursors
            .and_then(|cursors| cursors.after)
            .map(|after| {
                after
                    .parse::<i64>()
                    .wrap_err_with(|| format!("Invalid recently played cursor: {}", after))
            })
            .transpose()?
    };

    Ok(RecentPlaysPage {
        items,
        next_after_ms,
    })
}

fn to_audio_features(features: SpotifyAudioFeatures) -> AudioFeatures {
    AudioFeatures {
        acousticness: features.acousticness,
        danceability: features.danceability,
        energy: features.energy,
        liveness: features.liveness,
        loudness: features.loudness,
        instrumentalness: features.instrumentalness,
        speechiness: features.speechiness,
        valence: features.valence,
        key: features.key,
        mode: features.mode,
        tempo: features.tempo,
        time_signature: features.time_signature,
    }
}

fn to_track(id: String, track: SpotifyTrack, audio_features: Option<AudioFeatures>) -> Track {
    Track {
        id,
        name: track.name,
        duration_ms: track.duration_ms,
        album_id: track.album.and_then(|album| album.id),
        artist_ids: track
            .artists
            .into_iter()
            .filter_map(|artist| artist.id)
            .collect(),
        popularity: track.popularity,
        explicit: track.explicit,
        audio_features,
    }
}

fn to_album(album: SpotifyAlbum) -> Album {
    let release_date = album
        .release_date
        .as_deref()
        .and_then(|date| parse_release_date(date, album.release_date_precision.as_deref()));
    if release_date.is_none() {
        tracing::debug!(album_id = %album.id, release_date = ?album.release_date, "Album has no usable release date");
    }

    Album {
        id: album.id,
        name: album.name,
        album_type: album.album_type,
        genres: album.genres,
        release_date,
        label: album.label,
        total_tracks: album.total_tracks,
        popularity: album.popularity,
    }
}

fn to_artist(artist: SpotifyArtist) -> Artist {
    Artist {
        id: artist.id,
        name: artist.name,
        genres: artist.genres,
        popularity: artist.popularity,
    }
}

/// Epoch seconds of the first day covered by a release date reported at
/// `year`, `month` or `day` precision. Without a precision it is guessed
/// from the shape of the date.
fn parse_release_date(date: &str, precision: Option<&str>) -> Option<f64> {
    let full = match precision {
        Some("year") => format!("{}-01-01", date),
        Some("month") => format!("{}-01", date),
        Some(_) => date.to_string(),
        None => match date.len() {
            4 => format!("{}-01-01", date),
            7 => format!("{}-01", date),
            _ => date.to_string(),
        },
    };

    let day = NaiveDate::parse_from_str(&full, "%Y-%m-%d").ok()?;
    let midnight = day.and_hms_opt(0, 0, 0)?;
    Some(midnight.and_utc().timestamp() as f64)
}
