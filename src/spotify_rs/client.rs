use std::time::Duration;

use color_eyre::Result;
use color_eyre::eyre::WrapErr;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::spotify_rs::types::{
    SpotifyAlbum, SpotifyArtist, SpotifyAudioFeatures, SpotifyRecentlyPlayed, SpotifyTrack,
};

pub const DEFAULT_API_BASE_URL: &str = "https://api.spotify.com/v1";

/// Largest page `me/player/recently-played` serves.
pub const RECENTLY_PLAYED_LIMIT: usize = 50;
pub const TRACKS_PER_REQUEST: usize = 50;
pub const AUDIO_FEATURES_PER_REQUEST: usize = 100;
pub const ALBUMS_PER_REQUEST: usize = 20;
pub const ARTISTS_PER_REQUEST: usize = 50;

/// Spotify API client
pub struct SpotifyClient {
    access_token: String,
    base_url: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl SpotifyClient {
    pub fn new(access_token: String, base_url: &str, timeout: Duration) -> Self {
        Self {
            access_token,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
            client: reqwest::Client::new(),
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.access_token)
            .timeout(self.timeout)
            .send()
            .await
            .wrap_err_with(|| format!("Request to {} failed", url))?
            .error_for_status()?;

        let body = response
            .json()
            .await
            .wrap_err_with(|| format!("Failed to decode response from {}", url))?;
        Ok(body)
    }

    /// Get one page of plays that started after `after_ms`
    pub async fn get_recently_played(&self, after_ms: i64) -> Result<SpotifyRecentlyPlayed> {
        let url = format!(
            "{}/me/player/recently-played?limit={}&after={}",
            self.base_url, RECENTLY_PLAYED_LIMIT, after_ms
        );
        self.get_json(&url).await
    }

    /// Get tracks by id; unknown ids and tracks without an id are skipped
    pub async fn get_tracks(&self, ids: &[String]) -> Result<Vec<SpotifyTrack>> {
        #[derive(Deserialize)]
        struct TracksResponse {
            tracks: Vec<Option<SpotifyTrack>>,
        }

        let mut all_tracks = Vec::with_capacity(ids.len());
        for url in batched_urls(&self.base_url, "tracks", ids, TRACKS_PER_REQUEST) {
            let page: TracksResponse = self.get_json(&url).await?;
            all_tracks.extend(
                page.tracks
                    .into_iter()
                    .flatten()
                    .filter(|track| track.id.is_some()),
            );
        }
        Ok(all_tracks)
    }

    /// Get audio features by track id; tracks without an analysis are skipped
    pub async fn get_audio_features(&self, ids: &[String]) -> Result<Vec<SpotifyAudioFeatures>> {
        #[derive(Deserialize)]
        struct AudioFeaturesResponse {
            audio_features: Vec<Option<SpotifyAudioFeatures>>,
        }

        let mut all_features = Vec::with_capacity(ids.len());
        for url in batched_urls(&self.base_url, "audio-features", ids, AUDIO_FEATURES_PER_REQUEST)
        {
            let page: AudioFeaturesResponse = self.get_json(&url).await?;
            all_features.extend(page.audio_features.into_iter().flatten());
        }
        Ok(all_features)
    }

    /// Get albums by id; unknown ids are skipped
    pub async fn get_albums(&self, ids: &[String]) -> Result<Vec<SpotifyAlbum>> {
        #[derive(Deserialize)]
        struct AlbumsResponse {
            albums: Vec<Option<SpotifyAlbum>>,
        }

        let mut all_albums = Vec::with_capacity(ids.len());
        for url in batched_urls(&self.base_url, "albums", ids, ALBUMS_PER_REQUEST) {
            let page: AlbumsResponse = self.get_json(&url).await?;
            all_albums.extend(page.albums.into_iter().flatten());
        }
        Ok(all_albums)
    }

    /// Get artists by id; unknown ids are skipped
    pub async fn get_artists(&self, ids: &[String]) -> Result<Vec<SpotifyArtist>> {
        #[derive(Deserialize)]
        struct ArtistsResponse {
            artists: Vec<Option<SpotifyArtist>>,
        }

        let mut all_artists = Vec::with_capacity(ids.len());
        for url in batched_urls(&self.base_url, "artists", ids, ARTISTS_PER_REQUEST) {
            let page: ArtistsResponse = self.get_json(&url).await?;
            all_artists.extend(page.artists.into_iter().flatten());
        }
        Ok(all_artists)
    }
}

/// One `{base}/{path}?ids=...` url per chunk of at most `per_request` ids.
fn batched_urls(base_url: &str, path: &str, ids: &[String], per_request: usize) -> Vec<String> {
    ids.chunks(per_request)
        .map(|chunk| format!("{}/{}?ids={}", base_url, path, chunk.join(",")))
        .collect()
}
