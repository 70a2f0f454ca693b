use std::path::{Component, Path, PathBuf};

use chrono::{DateTime, Datelike, Timelike, Utc};
use color_eyre::eyre::{Result, WrapErr, eyre};

use crate::ports::store::TableStore;
use crate::schema::{Schema, Table};

pub const LISTENING_PREFIX: &str = "history/listening/";
pub const TRACKS_PREFIX: &str = "history/tracks/";
pub const ALBUMS_PREFIX: &str = "history/albums/";
pub const ARTISTS_PREFIX: &str = "history/artists/";
pub const DATA_PREFIX: &str = "history/data/";

/// Keys of the five tables one snapshot produces. They share a suffix
/// derived from the hour the listening history was queried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotKeys {
    suffix: String,
}

impl SnapshotKeys {
    /// `{Y}/{M}/{D}/{H}-{D}-{M}-{Y}.csv`, unpadded, in UTC.
    pub fn at(as_of: DateTime<Utc>) -> Self {
        let (year, month, day, hour) = (as_of.year(), as_of.month(), as_of.day(), as_of.hour());
        Self {
            suffix: format!(
                "{}/{}/{}/{}-{}-{}-{}.csv",
                year, month, day, hour, day, month, year
            ),
        }
    }

    /// Recovers the snapshot from the key of its listening table.
    pub fn from_listening_key(key: &str) -> Result<Self> {
        let suffix = key
            .strip_prefix(LISTENING_PREFIX)
            .filter(|suffix| !suffix.is_empty())
            .ok_or_else(|| eyre!("`{}` is not a listening table key", key))?;
        ensure_csv(key)?;
        Ok(Self {
            suffix: suffix.to_string(),
        })
    }

    pub fn listening(&self) -> String {
        format!("{}{}", LISTENING_PREFIX, self.suffix)
    }

    pub fn tracks(&self) -> String {
        format!("{}{}", TRACKS_PREFIX, self.suffix)
    }

    pub fn albums(&self) -> String {
        format!("{}{}", ALBUMS_PREFIX, self.suffix)
    }

    pub fn artists(&self) -> String {
        format!("{}{}", ARTISTS_PREFIX, self.suffix)
    }

    pub fn joined(&self) -> String {
        format!("{}{}", DATA_PREFIX, self.suffix)
    }
}

fn ensure_csv(key: &str) -> Result<()> {
    if key.ends_with(".csv") {
        Ok(())
    } else {
        Err(eyre!("`{}` does not end with .csv", key))
    }
}

/// Table store writing header-bearing CSV files below a root directory.
pub struct CsvTableStore {
    root: PathBuf,
}

impl CsvTableStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a key to a file below the root. Keys are relative, `/`-separated
    /// and end with `.csv`.
    fn path_for(&self, key: &str) -> Result<PathBuf> {
        ensure_csv(key)?;
        let relative = Path::new(key);
        if !relative
            .components()
            .all(|component| matches!(component, Component::Normal(_)))
        {
            return Err(eyre!("`{}` is not a relative table key", key));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait::async_trait]
impl TableStore for CsvTableStore {
    async fn load(&self, key: &str, schema: &Schema) -> Result<Table> {
        let path = self.path_for(key)?;
        let contents = tokio::fs::read(&path)
            .await
            .wrap_err_with(|| format!("Failed to read table: {}", path.display()))?;

        let mut reader = csv::Reader::from_reader(contents.as_slice());
        let headers: Vec<String> = reader
            .headers()
            .wrap_err_with(|| format!("Failed to read header of: {}", path.display()))?
            .iter()
            .map(String::from)
            .collect();
        let rows = reader
            .records()
            .map(|record| record.map(|record| record.iter().map(String::from).collect()))
            .collect::<Result<Vec<Vec<String>>, csv::Error>>()
            .wrap_err_with(|| format!("Failed to parse table: {}", path.display()))?;

        let table = schema
            .decode_table(headers, rows)
            .wrap_err_with(|| format!("Failed to load table: {}", key))?;
        tracing::debug!(key, rows = table.len(), "Loaded table");
        Ok(table)
    }

    async fn save(&self, table: &Table, schema: &Schema, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        schema
            .validate(table)
            .wrap_err_with(|| format!("Refusing to save table: {}", key))?;

        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(table.columns())?;
        for row in table.rows() {
            let cells = schema
                .encode_record(row)
                .wrap_err_with(|| format!("Failed to encode table: {}", key))?;
            writer.write_record(cells)?;
        }
        let contents = writer
            .into_inner()
            .map_err(|err| eyre!("Failed to flush table {}: {}", key, err))?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .wrap_err_with(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        tokio::fs::write(&path, contents)
            .await
            .wrap_err_with(|| format!("Failed to write table: {}", path.display()))?;

        tracing::debug!(key, rows = table.len(), "Saved table");
        Ok(())
    }
}
