//! Snapshot orchestration: the fetch-and-transform stages and the runs that
//! chain them through the table store.

use std::time::Duration;

use chrono::{DateTime, Utc};
use color_eyre::eyre::{Result, WrapErr};

use crate::inference::{extract_plays, infer_listened_durations};
use crate::join::join;
use crate::models::{RecentPlay, albums_table, artists_table, listening_table, tracks_table};
use crate::ports::archive::PersistenceSink;
use crate::ports::spotify::MetadataSource;
use crate::ports::store::TableStore;
use crate::schema::Table;
use crate::schema::fields::{self, ALBUM_ID, ARTIST_ID, TRACK_ID};
use crate::services::store::SnapshotKeys;

/// What one full snapshot run produced.
#[derive(Debug)]
pub struct SnapshotOutcome {
    pub keys: SnapshotKeys,
    pub plays: usize,
    pub joined: Table,
}

pub struct SnapshotPipeline<M: MetadataSource, S: TableStore> {
    source: M,
    store: S,
    lookback: Duration,
}

impl<M: MetadataSource, S: TableStore> SnapshotPipeline<M, S> {
    pub fn new(source: M, store: S, lookback: Duration) -> Self {
        Self {
            source,
            store,
            lookback,
        }
    }

    /// Drains the recently-played feed from `after_ms` on, following the
    /// cursor until a page comes back without one.
    pub async fn fetch_recent_plays(&self, after_ms: i64) -> Result<Vec<RecentPlay>> {
        let mut plays = Vec::new();
        let mut cursor = Some(after_ms);

        while let Some(after) = cursor {
            let page = self.source.recent_plays(after).await?;
            tracing::debug!(after, items = page.items.len(), "Fetched recently played page");
            plays.extend(page.items);
            // A cursor that does not move forward would page forever.
            cursor = page.next_after_ms.filter(|next| *next > after);
        }

        Ok(plays)
    }

    /// Plays of the lookback window ending at `as_of`, with listened time
    /// inferred against `as_of`.
    pub async fn listening_stage(&self, as_of: DateTime<Utc>) -> Result<Table> {
        let as_of_ms = as_of.timestamp_millis();
        let lookback_ms = i64::try_from(self.lookback.as_millis()).unwrap_or(i64::MAX);
        let after_ms = as_of_ms.saturating_sub(lookback_ms);

        let plays = self
            .fetch_recent_plays(after_ms)
            .await
            .wrap_err("Failed to fetch listening history")?;
        let (events, durations) = extract_plays(plays);
        tracing::debug!(plays = events.len(), "Extracted recent plays");
        let listened = infer_listened_durations(events, &durations, as_of_ms)?;

        tracing::info!(plays = listened.len(), "Built listening table");
        Ok(listening_table(&listened))
    }

    /// Metadata of every distinct track in `listening`.
    pub async fn tracks_stage(&self, listening: &Table) -> Result<Table> {
        let ids = listening.distinct_text(TRACK_ID);
        if ids.is_empty() {
            return Ok(tracks_table(&[]));
        }
        let tracks = self
            .source
            .tracks(&ids)
            .await
            .wrap_err("Failed to fetch track metadata")?;

        tracing::info!(requested = ids.len(), found = tracks.len(), "Built tracks table");
        Ok(tracks_table(&tracks))
    }

    /// Metadata of every distinct album the tracks belong to.
    pub async fn albums_stage(&self, tracks: &Table) -> Result<Table> {
        let ids = tracks.distinct_text(ALBUM_ID);
        if ids.is_empty() {
            return Ok(albums_table(&[]));
        }
        let albums = self
            .source
            .albums(&ids)
            .await
            .wrap_err("Failed to fetch album metadata")?;

        tracing::info!(requested = ids.len(), found = albums.len(), "Built albums table");
        Ok(albums_table(&albums))
    }

    /// Metadata of every distinct artist credited on the tracks.
    pub async fn artists_stage(&self, tracks: &Table) -> Result<Table> {
        let ids = tracks.distinct_text(ARTIST_ID);
        if ids.is_empty() {
            return Ok(artists_table(&[]));
        }
        let artists = self
            .source
            .artists(&ids)
            .await
            .wrap_err("Failed to fetch artist metadata")?;

        tracing::info!(requested = ids.len(), found = artists.len(), "Built artists table");
        Ok(artists_table(&artists))
    }

    /// Runs every stage for the window ending at `as_of`, storing the four
    /// source tables and the joined table under the snapshot's keys.
    #[tracing::instrument(skip(self))]
    pub async fn run(&self, as_of: DateTime<Utc>) -> Result<SnapshotOutcome> {
        let keys = SnapshotKeys::at(as_of);

        let listening = self.listening_stage(as_of).await?;
        let tracks = self.tracks_stage(&listening).await?;
        let (albums, artists) =
            tokio::try_join!(self.albums_stage(&tracks), self.artists_stage(&tracks))?;

        let (listening_key, tracks_key, albums_key, artists_key) =
            (keys.listening(), keys.tracks(), keys.albums(), keys.artists());
        tokio::try_join!(
            self.store.save(&listening, fields::listening(), &listening_key),
            self.store.save(&tracks, fields::tracks(), &tracks_key),
            self.store.save(&albums, fields::albums(), &albums_key),
            self.store.save(&artists, fields::artists(), &artists_key),
        )?;

        let joined = join(&listening, &tracks, &albums, &artists)?;
        self.store
            .save(&joined, fields::joined(), &keys.joined())
            .await?;

        tracing::info!(
            plays = listening.len(),
            rows = joined.len(),
            key = %keys.joined(),
            "Snapshot complete"
        );
        Ok(SnapshotOutcome {
            keys,
            plays: listening.len(),
            joined,
        })
    }
}

/// Re-joins an already stored snapshot and stores the joined table.
pub async fn join_snapshot<S: TableStore + ?Sized>(store: &S, keys: &SnapshotKeys) -> Result<Table> {
    let (listening_key, tracks_key, albums_key, artists_key) =
        (keys.listening(), keys.tracks(), keys.albums(), keys.artists());
    let (listening, tracks, albums, artists) = tokio::try_join!(
        store.load(&listening_key, fields::listening()),
        store.load(&tracks_key, fields::tracks()),
        store.load(&albums_key, fields::albums()),
        store.load(&artists_key, fields::artists()),
    )?;

    let joined = join(&listening, &tracks, &albums, &artists)?;
    store
        .save(&joined, fields::joined(), &keys.joined())
        .await?;

    tracing::info!(rows = joined.len(), key = %keys.joined(), "Joined stored snapshot");
    Ok(joined)
}

/// Loads a stored joined table and upserts it into the archive.
pub async fn archive_snapshot<S, A>(store: &S, sink: &A, key: &str) -> Result<u64>
where
    S: TableStore + ?Sized,
    A: PersistenceSink + ?Sized,
{
    let joined = store
        .load(key, fields::joined())
        .await
        .wrap_err_with(|| format!("Failed to load joined table: {}", key))?;
    sink.archive(&joined, fields::joined()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RecentPlaysPage, Track};
    use crate::ports::archive::MockPersistenceSink;
    use crate::ports::spotify::MockMetadataSource;
    use crate::ports::store::MockTableStore;
    use crate::schema::Value;
    use crate::schema::fields::{ALBUM_GENRE, LISTENED_MS, PLAYED_AT};
    use crate::services::store::CsvTableStore;
    use crate::test_utils::{album, artist, track};
    use chrono::TimeZone;
    use mockall::predicate::eq;

    const HOUR_MS: i64 = 3_600_000;

    fn as_of() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2021, 3, 7, 5, 0, 0).unwrap()
    }

    fn play(track_id: &str, played_at: f64, duration_ms: i64) -> RecentPlay {
        RecentPlay {
            track_id: track_id.into(),
            played_at,
            duration_ms,
        }
    }

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    /// Two plays of t1 and one of t2 in the hour before `as_of`, over two pages.
    fn source_with_plays() -> MockMetadataSource {
        let start = as_of().timestamp() as f64;
        let mut source = MockMetadataSource::new();
        source
            .expect_recent_plays()
            .returning(move |after| {
                Ok(if after == as_of().timestamp_millis() - HOUR_MS {
                    RecentPlaysPage {
                        items: vec![play("t1", start - 900.0, 240_000), play("t2", start - 600.0, 180_000)],
                        next_after_ms: Some(after + 1),
                    }
                } else if after == as_of().timestamp_millis() - HOUR_MS + 1 {
                    RecentPlaysPage {
                        items: vec![play("t1", start - 100.0, 240_000)],
                        next_after_ms: Some(after + 1),
                    }
                } else {
                    RecentPlaysPage::default()
                })
            });
        source
    }

    /// [`source_with_plays`] plus the metadata of every track, album and artist.
    fn source_with_history() -> MockMetadataSource {
        let mut source = source_with_plays();
        source
            .expect_tracks()
            .withf(|requested| requested == ids(&["t1", "t2"]).as_slice())
            .times(1)
            .returning(|_| {
                Ok(vec![
                    track("t1", "al1", &["ar1", "ar2"], 240_000),
                    track("t2", "al2", &["ar2"], 180_000),
                ])
            });
        source
            .expect_albums()
            .withf(|requested| requested == ids(&["al1", "al2"]).as_slice())
            .times(1)
            .returning(|_| Ok(vec![album("al1", &["rock", "indie"]), album("al2", &[])]));
        source
            .expect_artists()
            .withf(|requested| requested == ids(&["ar1", "ar2"]).as_slice())
            .times(1)
            .returning(|_| Ok(vec![artist("ar1", &["shoegaze"]), artist("ar2", &[])]));
        source
    }

    #[tokio::test]
    async fn test_fetch_recent_plays_drains_pages() {
        let pipeline = SnapshotPipeline::new(
            source_with_plays(),
            MockTableStore::new(),
            Duration::from_secs(3600),
        );

        let plays = pipeline
            .fetch_recent_plays(as_of().timestamp_millis() - HOUR_MS)
            .await
            .unwrap();

        let tracks: Vec<&str> = plays.iter().map(|play| play.track_id.as_str()).collect();
        assert_eq!(tracks, vec!["t1", "t2", "t1"]);
    }

    #[tokio::test]
    async fn test_fetch_recent_plays_stops_on_stalled_cursor() {
        let mut source = MockMetadataSource::new();
        source
            .expect_recent_plays()
            .with(eq(10))
            .times(1)
            .returning(|_| {
                Ok(RecentPlaysPage {
                    items: vec![play("t1", 1.0, 1)],
                    next_after_ms: Some(10),
                })
            });
        let pipeline =
            SnapshotPipeline::new(source, MockTableStore::new(), Duration::from_secs(60));

        let plays = pipeline.fetch_recent_plays(10).await.unwrap();

        assert_eq!(plays.len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_recent_plays_follows_cursor_past_page_without_plays() {
        let mut source = MockMetadataSource::new();
        source
            .expect_recent_plays()
            .with(eq(10))
            .times(1)
            .returning(|_| {
                Ok(RecentPlaysPage {
                    items: vec![],
                    next_after_ms: Some(20),
                })
            });
        source
            .expect_recent_plays()
            .with(eq(20))
            .times(1)
            .returning(|_| {
                Ok(RecentPlaysPage {
                    items: vec![play("t1", 1.0, 1)],
                    next_after_ms: None,
                })
            });
        let pipeline =
            SnapshotPipeline::new(source, MockTableStore::new(), Duration::from_secs(60));

        let plays = pipeline.fetch_recent_plays(10).await.unwrap();

        assert_eq!(plays, vec![play("t1", 1.0, 1)]);
    }

    #[tokio::test]
    async fn test_listening_stage_queries_lookback_window() {
        let start = as_of().timestamp() as f64;
        let mut source = MockMetadataSource::new();
        source
            .expect_recent_plays()
            .with(eq(as_of().timestamp_millis() - 2 * HOUR_MS))
            .times(1)
            .returning(move |_| {
                Ok(RecentPlaysPage {
                    items: vec![play("t1", start - 30.0, 200_000)],
                    next_after_ms: None,
                })
            });
        let pipeline =
            SnapshotPipeline::new(source, MockTableStore::new(), Duration::from_secs(7200));

        let listening = pipeline.listening_stage(as_of()).await.unwrap();

        assert_eq!(listening.len(), 1);
        assert_eq!(listening.rows()[0][LISTENED_MS], Value::Integer(30_000));
        fields::listening().validate(&listening).unwrap();
    }

    #[tokio::test]
    async fn test_empty_history_skips_metadata_calls() {
        let mut source = MockMetadataSource::new();
        source
            .expect_recent_plays()
            .returning(|_| Ok(RecentPlaysPage::default()));
        source.expect_tracks().never();
        source.expect_albums().never();
        source.expect_artists().never();
        let dir = tempfile::tempdir().unwrap();
        let pipeline = SnapshotPipeline::new(
            source,
            CsvTableStore::new(dir.path()),
            Duration::from_secs(3600),
        );

        let outcome = pipeline.run(as_of()).await.unwrap();

        assert_eq!(outcome.plays, 0);
        assert!(outcome.joined.is_empty());
        assert!(dir.path().join(outcome.keys.joined()).is_file());
    }

    #[tokio::test]
    async fn test_tracks_without_album_are_not_requested() {
        let mut source = MockMetadataSource::new();
        source.expect_albums().never();
        let pipeline =
            SnapshotPipeline::new(source, MockTableStore::new(), Duration::from_secs(60));
        let tracks = tracks_table(&[Track {
            album_id: None,
            ..track("t1", "unused", &["ar1"], 1)
        }]);

        let albums = pipeline.albums_stage(&tracks).await.unwrap();

        assert!(albums.is_empty());
    }

    #[tokio::test]
    async fn test_run_stores_every_table_and_joins() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = SnapshotPipeline::new(
            source_with_history(),
            CsvTableStore::new(dir.path()),
            Duration::from_secs(3600),
        );

        let outcome = pipeline.run(as_of()).await.unwrap();

        assert_eq!(outcome.keys, SnapshotKeys::at(as_of()));
        assert_eq!(outcome.plays, 3);
        // Each t1 play: 2 album genres x (ar1 shoegaze + ar2 placeholder) = 4 rows.
        // The t2 play: 1 album placeholder x 1 ar2 placeholder.
        assert_eq!(outcome.joined.len(), 4 + 1 + 4);

        let times: Vec<f64> = outcome
            .joined
            .rows()
            .iter()
            .filter_map(|row| row[PLAYED_AT].as_real())
            .collect();
        assert!(times.windows(2).all(|pair| pair[0] <= pair[1]));

        let store = CsvTableStore::new(dir.path());
        let stored = store
            .load(&outcome.keys.joined(), fields::joined())
            .await
            .unwrap();
        assert_eq!(stored.len(), outcome.joined.len());
        assert!(
            stored
                .rows()
                .iter()
                .any(|row| row[ALBUM_GENRE] == Value::from(""))
        );
    }

    #[tokio::test]
    async fn test_join_snapshot_matches_run() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = SnapshotPipeline::new(
            source_with_history(),
            CsvTableStore::new(dir.path()),
            Duration::from_secs(3600),
        );
        let outcome = pipeline.run(as_of()).await.unwrap();

        let store = CsvTableStore::new(dir.path());
        let rejoined = join_snapshot(&store, &outcome.keys).await.unwrap();

        assert_eq!(rejoined.len(), outcome.joined.len());
        let listened: Vec<&Value> = rejoined.rows().iter().map(|row| &row[LISTENED_MS]).collect();
        let expected: Vec<&Value> = outcome
            .joined
            .rows()
            .iter()
            .map(|row| &row[LISTENED_MS])
            .collect();
        assert_eq!(listened, expected);
    }

    #[tokio::test]
    async fn test_archive_snapshot_hands_joined_table_to_sink() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = SnapshotPipeline::new(
            source_with_history(),
            CsvTableStore::new(dir.path()),
            Duration::from_secs(3600),
        );
        let outcome = pipeline.run(as_of()).await.unwrap();
        let expected_rows = outcome.joined.len();

        let mut sink = MockPersistenceSink::new();
        sink.expect_archive()
            .withf(move |table, schema| table.len() == expected_rows && schema.name() == "joined")
            .times(1)
            .returning(|table, _| Ok(table.len() as u64));

        let store = CsvTableStore::new(dir.path());
        let archived = archive_snapshot(&store, &sink, &outcome.keys.joined())
            .await
            .unwrap();

        assert_eq!(archived, expected_rows as u64);
    }

    #[tokio::test]
    async fn test_archive_snapshot_reports_missing_table() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvTableStore::new(dir.path());
        let mut sink = MockPersistenceSink::new();
        sink.expect_archive().never();

        let result = archive_snapshot(&store, &sink, "history/data/2021/1/1/0-1-1-2021.csv").await;

        assert!(result.is_err());
    }
}
