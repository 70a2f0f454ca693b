use std::sync::LazyLock;

use super::{FieldDescriptor, Schema};

// Listening
pub const PLAYED_AT: &str = "PLAYED_AT";
pub const LISTENED_MS: &str = "LISTENED_MS";

// Track
pub const TRACK_ID: &str = "TRACK_ID";
pub const TRACK_NAME: &str = "TRACK_NAME";
pub const TRACK_DURATION_MS: &str = "TRACK_DURATION_MS";
pub const TRACK_POPULARITY: &str = "TRACK_POPULARITY";
pub const TRACK_EXPLICIT: &str = "TRACK_EXPLICIT";
pub const TRACK_ACOUSTICNESS: &str = "TRACK_ACOUSTICNESS";
pub const TRACK_DANCEABILITY: &str = "TRACK_DANCEABILITY";
pub const TRACK_ENERGY: &str = "TRACK_ENERGY";
pub const TRACK_LIVENESS: &str = "TRACK_LIVENESS";
pub const TRACK_LOUDNESS: &str = "TRACK_LOUDNESS";
pub const TRACK_INSTRUMENTALNESS: &str = "TRACK_INSTRUMENTALNESS";
pub const TRACK_SPEECHINESS: &str = "TRACK_SPEECHINESS";
pub const TRACK_VALENCE: &str = "TRACK_VALENCE";
pub const TRACK_KEY: &str = "TRACK_KEY";
pub const TRACK_MODE: &str = "TRACK_MODE";
pub const TRACK_TEMPO: &str = "TRACK_TEMPO";
pub const TRACK_TIME_SIGNATURE: &str = "TRACK_TIME_SIGNATURE";

// Album
pub const ALBUM_ID: &str = "ALBUM_ID";
pub const ALBUM_NAME: &str = "ALBUM_NAME";
pub const ALBUM_TYPE: &str = "ALBUM_TYPE";
pub const ALBUM_GENRE: &str = "ALBUM_GENRE";
pub const ALBUM_RELEASE_DATE: &str = "ALBUM_RELEASE_DATE";
pub const ALBUM_LABEL: &str = "ALBUM_LABEL";
pub const ALBUM_TRACK_COUNT: &str = "ALBUM_TRACK_COUNT";
pub const ALBUM_POPULARITY: &str = "ALBUM_POPULARITY";

// Artist
pub const ARTIST_ID: &str = "ARTIST_ID";
pub const ARTIST_NAME: &str = "ARTIST_NAME";
pub const ARTIST_GENRE: &str = "ARTIST_GENRE";
pub const ARTIST_POPULARITY: &str = "ARTIST_POPULARITY";

const F_PLAYED_AT: FieldDescriptor = FieldDescriptor::real(PLAYED_AT);
const F_LISTENED_MS: FieldDescriptor = FieldDescriptor::integer(LISTENED_MS);

const F_TRACK_ID: FieldDescriptor = FieldDescriptor::text(TRACK_ID);
const F_TRACK_NAME: FieldDescriptor = FieldDescriptor::text(TRACK_NAME);
const F_TRACK_DURATION_MS: FieldDescriptor = FieldDescriptor::integer(TRACK_DURATION_MS);
const F_TRACK_POPULARITY: FieldDescriptor = FieldDescriptor::integer(TRACK_POPULARITY);
const F_TRACK_EXPLICIT: FieldDescriptor = FieldDescriptor::boolean(TRACK_EXPLICIT);

/// Audio analysis columns, in the order every track-bearing schema lists them.
const F_AUDIO_FEATURES: [FieldDescriptor; 12] = [
    FieldDescriptor::real(TRACK_ACOUSTICNESS),
    FieldDescriptor::real(TRACK_DANCEABILITY),
    FieldDescriptor::real(TRACK_ENERGY),
    FieldDescriptor::real(TRACK_LIVENESS),
    FieldDescriptor::real(TRACK_LOUDNESS),
    FieldDescriptor::real(TRACK_INSTRUMENTALNESS),
    FieldDescriptor::real(TRACK_SPEECHINESS),
    FieldDescriptor::real(TRACK_VALENCE),
    FieldDescriptor::integer(TRACK_KEY),
    FieldDescriptor::integer(TRACK_MODE),
    FieldDescriptor::real(TRACK_TEMPO),
    FieldDescriptor::integer(TRACK_TIME_SIGNATURE),
];

const F_ALBUM_ID: FieldDescriptor = FieldDescriptor::text(ALBUM_ID);
const F_ALBUM_NAME: FieldDescriptor = FieldDescriptor::text(ALBUM_NAME);
const F_ALBUM_TYPE: FieldDescriptor = FieldDescriptor::text(ALBUM_TYPE);
const F_ALBUM_GENRE: FieldDescriptor = FieldDescriptor::text(ALBUM_GENRE).multi();
const F_ALBUM_RELEASE_DATE: FieldDescriptor = FieldDescriptor::real(ALBUM_RELEASE_DATE);
const F_ALBUM_LABEL: FieldDescriptor = FieldDescriptor::text(ALBUM_LABEL);
const F_ALBUM_TRACK_COUNT: FieldDescriptor = FieldDescriptor::integer(ALBUM_TRACK_COUNT);
const F_ALBUM_POPULARITY: FieldDescriptor = FieldDescriptor::integer(ALBUM_POPULARITY);

const F_ARTIST_ID: FieldDescriptor = FieldDescriptor::text(ARTIST_ID);
const F_ARTIST_IDS: FieldDescriptor = F_ARTIST_ID.multi();
const F_ARTIST_NAME: FieldDescriptor = FieldDescriptor::text(ARTIST_NAME);
const F_ARTIST_GENRE: FieldDescriptor = FieldDescriptor::text(ARTIST_GENRE).multi();
const F_ARTIST_POPULARITY: FieldDescriptor = FieldDescriptor::integer(ARTIST_POPULARITY);

static LISTENING: LazyLock<Schema> = LazyLock::new(|| {
    Schema::new(
        "listening",
        vec![F_PLAYED_AT, F_TRACK_ID, F_LISTENED_MS],
        vec![PLAYED_AT, TRACK_ID],
    )
});

static TRACKS: LazyLock<Schema> = LazyLock::new(|| {
    let mut fields = vec![
        F_TRACK_ID,
        F_TRACK_NAME,
        F_TRACK_DURATION_MS,
        F_ALBUM_ID,
        F_ARTIST_IDS,
        F_TRACK_POPULARITY,
        F_TRACK_EXPLICIT,
    ];
    fields.extend(F_AUDIO_FEATURES);
    Schema::new("tracks", fields, vec![TRACK_ID])
});

static ALBUMS: LazyLock<Schema> = LazyLock::new(|| {
    Schema::new(
        "albums",
        vec![
            F_ALBUM_ID,
            F_ALBUM_NAME,
            F_ALBUM_TYPE,
            F_ALBUM_GENRE,
            F_ALBUM_RELEASE_DATE,
            F_ALBUM_LABEL,
            F_ALBUM_TRACK_COUNT,
            F_ALBUM_POPULARITY,
        ],
        vec![ALBUM_ID],
    )
});

static ARTISTS: LazyLock<Schema> = LazyLock::new(|| {
    Schema::new(
        "artists",
        vec![
            F_ARTIST_ID,
            F_ARTIST_NAME,
            F_ARTIST_GENRE,
            F_ARTIST_POPULARITY,
        ],
        vec![ARTIST_ID],
    )
});

static JOINED: LazyLock<Schema> = LazyLock::new(|| {
    let mut fields = vec![
        F_PLAYED_AT,
        F_LISTENED_MS,
        F_TRACK_ID,
        F_TRACK_NAME,
        F_TRACK_DURATION_MS,
        F_TRACK_POPULARITY,
        F_TRACK_EXPLICIT,
    ];
    fields.extend(F_AUDIO_FEATURES);
    fields.extend([
        F_ALBUM_ID,
        F_ALBUM_TYPE,
        F_ALBUM_GENRE.flattened(),
        F_ALBUM_LABEL,
        F_ALBUM_NAME,
        F_ALBUM_POPULARITY,
        F_ALBUM_RELEASE_DATE,
        F_ALBUM_TRACK_COUNT,
        F_ARTIST_ID,
        F_ARTIST_NAME,
        F_ARTIST_GENRE.flattened(),
        F_ARTIST_POPULARITY,
    ]);
    Schema::new(
        "joined",
        fields,
        vec![
            PLAYED_AT,
            TRACK_ID,
            ALBUM_ID,
            ALBUM_GENRE,
            ARTIST_ID,
            ARTIST_GENRE,
        ],
    )
});

/// One row per play: when it started, what played and for how long.
pub fn listening() -> &'static Schema {
    &LISTENING
}

/// One row per track, artist ids packed into one cell.
pub fn tracks() -> &'static Schema {
    &TRACKS
}

pub fn albums() -> &'static Schema {
    &ALBUMS
}

pub fn artists() -> &'static Schema {
    &ARTISTS
}

/// The denormalized output: every list expanded, keyed for idempotent upserts.
pub fn joined() -> &'static Schema {
    &JOINED
}
