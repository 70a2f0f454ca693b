//! Reassembly of the four snapshot tables into the denormalized history table.

use std::collections::HashMap;

use crate::error::PipelineError;
use crate::normalize::flatten;
use crate::schema::fields::{self, ALBUM_ID, ARTIST_ID, PLAYED_AT, TRACK_ID};
use crate::schema::{PrimitiveType, Record, Table, Value};

type Index<'a> = HashMap<&'a str, Vec<&'a Record>>;

/// Inner-joins listening ⋈ tracks on track id, ⋈ albums on album id and
/// ⋈ artists on artist id.
///
/// Multi-valued fields are expanded first, so a play yields one row per
/// (track artist, album genre, artist genre) combination. Plays whose track,
/// album or artist is unknown are dropped rather than failing the run. The
/// result carries the joined schema's columns in declared order, sorted by
/// play time (stable for ties).
pub fn join(
    listening: &Table,
    tracks: &Table,
    albums: &Table,
    artists: &Table,
) -> Result<Table, PipelineError> {
    let unified = fields::joined();

    let columns = merged_columns(&[listening, tracks, albums, artists]);
    if columns.len() != unified.field_count() {
        return Err(PipelineError::ColumnCountMismatch {
            expected: unified.field_count(),
            actual: columns.len(),
        });
    }
    if unified
        .fields()
        .iter()
        .any(|field| !columns.iter().any(|column| column == field.name))
    {
        return Err(PipelineError::SchemaMismatch {
            table: unified.name().to_string(),
            expected: unified.field_names(),
            actual: columns,
        });
    }

    let tracks = flatten(tracks.clone(), fields::tracks());
    let albums = flatten(albums.clone(), fields::albums());
    let artists = flatten(artists.clone(), fields::artists());

    let text_keys: Vec<&str> = unified
        .fields()
        .iter()
        .filter(|field| {
            field.primitive == PrimitiveType::Text && unified.key().contains(&field.name)
        })
        .map(|field| field.name)
        .collect();

    let tracks_by_id = index_by(&tracks, TRACK_ID);
    let albums_by_id = index_by(&albums, ALBUM_ID);
    let artists_by_id = index_by(&artists, ARTIST_ID);

    let mut rows = Vec::new();
    let mut dropped = 0usize;
    for event in listening.rows() {
        let before = rows.len();
        for track in matching(&tracks_by_id, event.get(TRACK_ID)) {
            for album in matching(&albums_by_id, track.get(ALBUM_ID)) {
                for artist in matching(&artists_by_id, track.get(ARTIST_ID)) {
                    let mut row = Record::new();
                    for part in [event, *track, *album, *artist] {
                        row.extend(part.iter().map(|(name, value)| (name.clone(), value.clone())));
                    }
                    // Text key cells are never null; an absent genre is an empty one.
                    for key in &text_keys {
                        if row.get(*key).is_none_or(Value::is_null) {
                            row.insert(key.to_string(), Value::Text(String::new()));
                        }
                    }
                    rows.push(row);
                }
            }
        }
        if rows.len() == before {
            dropped += 1;
        }
    }

    if dropped > 0 {
        tracing::warn!(
            dropped,
            total = listening.len(),
            "Dropped listening events with no matching track, album or artist"
        );
    }

    rows.sort_by(|a, b| played_at(a).total_cmp(&played_at(b)));

    tracing::debug!(rows = rows.len(), "Joined listening history");
    Ok(Table::new(unified.field_names(), rows))
}

/// Distinct column names across `tables`, in first-seen order.
fn merged_columns(tables: &[&Table]) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    for column in tables.iter().flat_map(|table| table.columns()) {
        if !columns.contains(column) {
            columns.push(column.clone());
        }
    }
    columns
}

fn index_by<'a>(table: &'a Table, column: &str) -> Index<'a> {
    let mut index: Index<'a> = HashMap::new();
    for row in table.rows() {
        if let Some(key) = row.get(column).and_then(Value::as_text) {
            index.entry(key).or_default().push(row);
        }
    }
    index
}

fn matching<'a>(index: &'a Index<'a>, key: Option<&Value>) -> &'a [&'a Record] {
    key.and_then(Value::as_text)
        .and_then(|key| index.get(key))
        .map(Vec::as_slice)
        .unwrap_or_default()
}

fn played_at(row: &Record) -> f64 {
    row.get(PLAYED_AT)
        .and_then(Value::as_real)
        .unwrap_or(f64::NEG_INFINITY)
}
