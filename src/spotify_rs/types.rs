use serde::{Deserialize, Serialize};

/// Simplified album object embedded in a track
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyAlbumRef {
    pub id: Option<String>,
}

/// Simplified artist object embedded in a track
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyArtistRef {
    pub id: Option<String>,
}

/// Spotify track from API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyTrack {
    /// Null for local files played through the client
    pub id: Option<String>,
    pub name: String,
    pub duration_ms: i64,
    #[serde(default)]
    pub popularity: i64,
    #[serde(default)]
    pub explicit: bool,
    pub album: Option<SpotifyAlbumRef>,
    #[serde(default)]
    pub artists: Vec<SpotifyArtistRef>,
}

/// Audio analysis summary for one track
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyAudioFeatures {
    pub id: String,
    pub acousticness: f64,
    pub danceability: f64,
    pub energy: f64,
    pub instrumentalness: f64,
    pub key: i64,
    pub liveness: f64,
    pub loudness: f64,
    pub mode: i64,
    pub speechiness: f64,
    pub tempo: f64,
    pub time_signature: i64,
    pub valence: f64,
}

/// Full album object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyAlbum {
    pub id: String,
    pub name: String,
    pub album_type: String,
    #[serde(default)]
    pub genres: Vec<String>,
    pub release_date: Option<String>,
    pub release_date_precision: Option<String>,
    pub label: Option<String>,
    #[serde(default)]
    pub total_tracks: i64,
    #[serde(default)]
    pub popularity: i64,
}

/// Full artist object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyArtist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub popularity: i64,
}

/// One entry of the recently-played history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyPlayHistory {
    pub track: SpotifyTrack,
    /// RFC 3339 timestamp of when the track started playing
    pub played_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyCursors {
    /// Epoch millis of the newest play on the page
    pub after: Option<String>,
}

/// Cursor-paged response of `me/player/recently-played`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyRecentlyPlayed {
    pub items: Vec<SpotifyPlayHistory>,
    pub cursors: Option<SpotifyCursors>,
}
