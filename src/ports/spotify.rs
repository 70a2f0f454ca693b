use color_eyre::eyre::Result;

use crate::models::{Album, Artist, RecentPlaysPage, Track};

/// Port trait wrapping the Spotify Web API capabilities the pipeline uses.
///
/// Implementations live in `services::spotify::client` (production) or test mocks.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait MetadataSource: Send + Sync {
    /// One page of plays that started strictly after `after_ms` (epoch millis).
    async fn recent_plays(&self, after_ms: i64) -> Result<RecentPlaysPage>;

    async fn tracks(&self, ids: &[String]) -> Result<Vec<Track>>;

    async fn albums(&self, ids: &[String]) -> Result<Vec<Album>>;

    async fn artists(&self, ids: &[String]) -> Result<Vec<Artist>>;
}
