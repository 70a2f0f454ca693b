//! Typed entities produced by the metadata source and their flat-table form.

use crate::schema::fields::*;
use crate::schema::{Record, Schema, Table, Value};

/// A play as reported by the listening-history source: only its start.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayEvent {
    pub track_id: String,
    /// Epoch seconds, fractional part carrying milliseconds.
    pub played_at: f64,
}

impl PlayEvent {
    pub fn played_at_ms(&self) -> i64 {
        (self.played_at * 1000.0).round() as i64
    }
}

/// A play once its listened time has been inferred.
#[derive(Debug, Clone, PartialEq)]
pub struct ListeningEvent {
    pub track_id: String,
    pub played_at: f64,
    pub listened_ms: i64,
}

/// One item of the recently-played feed, carrying the track's nominal duration.
#[derive(Debug, Clone, PartialEq)]
pub struct RecentPlay {
    pub track_id: String,
    pub played_at: f64,
    pub duration_ms: i64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecentPlaysPage {
    pub items: Vec<RecentPlay>,
    /// Cursor for the following page; `None` when the feed is exhausted.
    pub next_after_ms: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AudioFeatures {
    pub acousticness: f64,
    pub danceability: f64,
    pub energy: f64,
    pub liveness: f64,
    pub loudness: f64,
    pub instrumentalness: f64,
    pub speechiness: f64,
    pub valence: f64,
    pub key: i64,
    pub mode: i64,
    pub tempo: f64,
    pub time_signature: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub id: String,
    pub name: String,
    pub duration_ms: i64,
    pub album_id: Option<String>,
    pub artist_ids: Vec<String>,
    pub popularity: i64,
    pub explicit: bool,
    /// Absent when the analysis is not available for the track.
    pub audio_features: Option<AudioFeatures>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Album {
    pub id: String,
    pub name: String,
    /// album / single / compilation
    pub album_type: String,
    pub genres: Vec<String>,
    /// Epoch seconds of the release day.
    pub release_date: Option<f64>,
    pub label: Option<String>,
    pub total_tracks: i64,
    pub popularity: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Artist {
    pub id: String,
    pub name: String,
    pub genres: Vec<String>,
    pub popularity: i64,
}

fn record<const N: usize>(cells: [(&str, Value); N]) -> Record {
    cells
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect()
}

fn table_of(schema: &Schema, records: impl IntoIterator<Item = Record>) -> Table {
    Table::new(schema.field_names(), records.into_iter().collect())
}

impl ListeningEvent {
    pub fn to_record(&self) -> Record {
        record([
            (PLAYED_AT, Value::Real(self.played_at)),
            (TRACK_ID, Value::from(self.track_id.as_str())),
            (LISTENED_MS, Value::Integer(self.listened_ms)),
        ])
    }
}

impl Track {
    pub fn to_record(&self) -> Record {
        let mut row = record([
            (TRACK_ID, Value::from(self.id.as_str())),
            (TRACK_NAME, Value::from(self.name.as_str())),
            (TRACK_DURATION_MS, Value::Integer(self.duration_ms)),
            (ALBUM_ID, Value::from(self.album_id.clone())),
            (ARTIST_ID, Value::List(self.artist_ids.clone())),
            (TRACK_POPULARITY, Value::Integer(self.popularity)),
            (TRACK_EXPLICIT, Value::Boolean(self.explicit)),
        ]);

        let features = self.audio_features.as_ref();
        let real = |pick: fn(&AudioFeatures) -> f64| Value::from(features.map(pick));
        let integer = |pick: fn(&AudioFeatures) -> i64| Value::from(features.map(pick));
        row.extend(
            record([
                (TRACK_ACOUSTICNESS, real(|f| f.acousticness)),
                (TRACK_DANCEABILITY, real(|f| f.danceability)),
                (TRACK_ENERGY, real(|f| f.energy)),
                (TRACK_LIVENESS, real(|f| f.liveness)),
                (TRACK_LOUDNESS, real(|f| f.loudness)),
                (TRACK_INSTRUMENTALNESS, real(|f| f.instrumentalness)),
                (TRACK_SPEECHINESS, real(|f| f.speechiness)),
                (TRACK_VALENCE, real(|f| f.valence)),
                (TRACK_KEY, integer(|f| f.key)),
                (TRACK_MODE, integer(|f| f.mode)),
                (TRACK_TEMPO, real(|f| f.tempo)),
                (TRACK_TIME_SIGNATURE, integer(|f| f.time_signature)),
            ]),
        );
        row
    }
}

impl Album {
    pub fn to_record(&self) -> Record {
        record([
            (ALBUM_ID, Value::from(self.id.as_str())),
            (ALBUM_NAME, Value::from(self.name.as_str())),
            (ALBUM_TYPE, Value::from(self.album_type.as_str())),
            (ALBUM_GENRE, Value::List(self.genres.clone())),
            (ALBUM_RELEASE_DATE, Value::from(self.release_date)),
            (ALBUM_LABEL, Value::from(self.label.clone())),
            (ALBUM_TRACK_COUNT, Value::Integer(self.total_tracks)),
            (ALBUM_POPULARITY, Value::Integer(self.popularity)),
        ])
    }
}

impl Artist {
    pub fn to_record(&self) -> Record {
        record([
            (ARTIST_ID, Value::from(self.id.as_str())),
            (ARTIST_NAME, Value::from(self.name.as_str())),
            (ARTIST_GENRE, Value::List(self.genres.clone())),
            (ARTIST_POPULARITY, Value::Integer(self.popularity)),
        ])
    }
}

pub fn listening_table(events: &[ListeningEvent]) -> Table {
    table_of(listening(), events.iter().map(ListeningEvent::to_record))
}

pub fn tracks_table(items: &[Track]) -> Table {
    table_of(tracks(), items.iter().map(Track::to_record))
}

pub fn albums_table(items: &[Album]) -> Table {
    table_of(albums(), items.iter().map(Album::to_record))
}

pub fn artists_table(items: &[Artist]) -> Table {
    table_of(artists(), items.iter().map(Artist::to_record))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{album, artist, track};

    #[test]
    fn test_played_at_ms_keeps_millisecond_precision() {
        let event = PlayEvent {
            track_id: "t".into(),
            played_at: 1_481_661_844.589,
        };
        assert_eq!(event.played_at_ms(), 1_481_661_844_589);
    }

    #[test]
    fn test_tables_carry_every_schema_column() {
        let tracks_table = tracks_table(&[track("t1", "al1", &["ar1", "ar2"], 200_000)]);
        tracks().validate(&tracks_table).unwrap();
        for field in tracks().fields() {
            assert!(tracks_table.rows()[0].contains_key(field.name), "{}", field.name);
        }

        let albums_table = albums_table(&[album("al1", &["rock"])]);
        albums().validate(&albums_table).unwrap();
        assert_eq!(albums_table.rows()[0].len(), albums().field_count());

        let artists_table = artists_table(&[artist("ar1", &[])]);
        artists().validate(&artists_table).unwrap();
        assert_eq!(artists_table.rows()[0][ARTIST_GENRE], Value::List(vec![]));
    }

    #[test]
    fn test_track_without_audio_features_has_null_cells() {
        let mut t = track("t1", "al1", &["ar1"], 1000);
        t.audio_features = None;
        let row = t.to_record();
        assert!(row[TRACK_TEMPO].is_null());
        assert!(row[TRACK_KEY].is_null());
        assert_eq!(row[TRACK_DURATION_MS], Value::Integer(1000));
    }

    #[test]
    fn test_track_record_packs_artist_ids() {
        let row = track("t1", "al1", &["ar1", "ar2"], 1000).to_record();
        assert_eq!(
            row[ARTIST_ID],
            Value::List(vec!["ar1".to_string(), "ar2".to_string()])
        );
        assert_eq!(row[ALBUM_ID], Value::from("al1"));
    }
}
