//! Listened-time inference from start-only play events.
//!
//! The listening-history feed reports when each track started, never when it
//! stopped. A play is taken to last until the next play started (or until the
//! query was issued, for the most recent one), capped at the track's nominal
//! duration; any remaining gap is dead air owned by no track.

use std::collections::HashMap;

use crate::error::PipelineError;
use crate::models::{ListeningEvent, PlayEvent, RecentPlay};

/// Track id to nominal duration in milliseconds.
///
/// Built once while extracting plays and only read afterwards, so it can be
/// shared freely between concurrent stages.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DurationLookup {
    durations: HashMap<String, i64>,
}

impl DurationLookup {
    pub fn get(&self, track_id: &str) -> Option<i64> {
        self.durations.get(track_id).copied()
    }
}

impl FromIterator<(String, i64)> for DurationLookup {
    fn from_iter<I: IntoIterator<Item = (String, i64)>>(iter: I) -> Self {
        Self {
            durations: iter.into_iter().collect(),
        }
    }
}

/// Splits the recently-played feed into play events and the duration lookup
/// the inference step needs.
pub fn extract_plays(items: Vec<RecentPlay>) -> (Vec<PlayEvent>, DurationLookup) {
    let mut durations = HashMap::new();
    let events = items
        .into_iter()
        .map(|item| {
            durations.insert(item.track_id.clone(), item.duration_ms);
            PlayEvent {
                track_id: item.track_id,
                played_at: item.played_at,
            }
        })
        .collect();
    (events, DurationLookup { durations })
}

/// Computes the listened time of every play.
///
/// `as_of_ms` is the moment the feed was queried and bounds the most recent
/// play. The result is in chronological order whatever the input order, and
/// every listened time lies within `0..=duration`.
pub fn infer_listened_durations(
    mut events: Vec<PlayEvent>,
    durations: &DurationLookup,
    as_of_ms: i64,
) -> Result<Vec<ListeningEvent>, PipelineError> {
    events.sort_by(|a, b| b.played_at.total_cmp(&a.played_at));

    let mut next_event_ms = as_of_ms;
    let mut inferred = Vec::with_capacity(events.len());
    for event in events {
        let duration_ms =
            durations
                .get(&event.track_id)
                .ok_or_else(|| PipelineError::MissingDurationData {
                    track_id: event.track_id.clone(),
                })?;
        let played_at_ms = event.played_at_ms();

        // A play reported after `as_of` (clock skew) gets a zero listen.
        let gap_ms = (next_event_ms - played_at_ms).max(0);
        inferred.push(ListeningEvent {
            track_id: event.track_id,
            played_at: event.played_at,
            listened_ms: gap_ms.min(duration_ms.max(0)),
        });

        next_event_ms = played_at_ms;
    }

    inferred.sort_by(|a, b| a.played_at.total_cmp(&b.played_at));
    Ok(inferred)
}
