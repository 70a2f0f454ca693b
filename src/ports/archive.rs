use color_eyre::eyre::Result;

use crate::schema::{Schema, Table};

/// Long-term store for joined history.
///
/// Implementations live in `services::archive` (production) or test mocks.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait PersistenceSink: Send + Sync {
    /// Upserts every row of `table` on `schema`'s key and returns the number
    /// of rows written. Archiving the same table twice leaves one copy.
    async fn archive(&self, table: &Table, schema: &Schema) -> Result<u64>;
}
