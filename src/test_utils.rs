use sea_orm::{ConnectOptions, Database as SeaDatabase};

use crate::models::{Album, Artist, AudioFeatures, ListeningEvent, Track};
use crate::services::archive::SqliteArchive;

pub async fn test_archive() -> SqliteArchive {
    // One connection, or every pooled connection would see its own database.
    let mut opt = ConnectOptions::new("sqlite::memory:");
    opt.max_connections(1).min_connections(1).sqlx_logging(false);
    let conn = SeaDatabase::connect(opt).await.unwrap();

    SqliteArchive::new(conn)
}

pub fn listened(track_id: &str, played_at: f64, listened_ms: i64) -> ListeningEvent {
    ListeningEvent {
        track_id: track_id.into(),
        played_at,
        listened_ms,
    }
}

pub fn track(id: &str, album_id: &str, artist_ids: &[&str], duration_ms: i64) -> Track {
    Track {
        id: id.into(),
        name: format!("Track {}", id),
        duration_ms,
        album_id: Some(album_id.into()),
        artist_ids: artist_ids.iter().map(|id| id.to_string()).collect(),
        popularity: 42,
        explicit: false,
        audio_features: Some(AudioFeatures {
            acousticness: 0.12,
            danceability: 0.5,
            energy: 0.8,
            liveness: 0.1,
            loudness: -6.5,
            instrumentalness: 0.0,
            speechiness: 0.04,
            valence: 0.3,
            key: 5,
            mode: 1,
            tempo: 120.25,
            time_signature: 4,
        }),
    }
}

pub fn album(id: &str, genres: &[&str]) -> Album {
    Album {
        id: id.into(),
        name: format!("Album {}", id),
        album_type: "album".into(),
        genres: genres.iter().map(|genre| genre.to_string()).collect(),
        release_date: Some(738_892_800.0),
        label: Some("Creation".into()),
        total_tracks: 10,
        popularity: 55,
    }
}

pub fn artist(id: &str, genres: &[&str]) -> Artist {
    Artist {
        id: id.into(),
        name: format!("Artist {}", id),
        genres: genres.iter().map(|genre| genre.to_string()).collect(),
        popularity: 61,
    }
}
