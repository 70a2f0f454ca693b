use color_eyre::eyre::Result;

use crate::schema::{Schema, Table};

/// Keyed storage for snapshot tables.
///
/// Implementations live in `services::store` (production) or test mocks.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait TableStore: Send + Sync {
    /// Loads the table stored under `key`, failing with a schema mismatch
    /// when its header disagrees with `schema`.
    async fn load(&self, key: &str, schema: &Schema) -> Result<Table>;

    /// Writes `table` under `key` in `schema`'s column order.
    async fn save(&self, table: &Table, schema: &Schema, key: &str) -> Result<()>;
}
