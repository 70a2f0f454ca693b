use std::path::Path;
use std::time::Duration;

use color_eyre::{Result, eyre::Context};
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database as SeaDatabase, DatabaseBackend, DatabaseConnection,
    Statement, TransactionTrait, Value as SqlValue,
};

use crate::error::PipelineError;
use crate::ports::archive::PersistenceSink;
use crate::schema::{FieldDescriptor, PrimitiveType, Schema, Table, Value, codec};

pub const HISTORY_TABLE: &str = "listening_history";

/// Archive of joined snapshots in a SQLite table keyed on the schema's
/// identity key.
pub struct SqliteArchive {
    conn: DatabaseConnection,
    table: String,
}

impl SqliteArchive {
    pub fn new(conn: DatabaseConnection) -> Self {
        Self {
            conn,
            table: HISTORY_TABLE.to_string(),
        }
    }

    /// Open or create an archive database at the given path
    pub async fn open(path: &Path) -> Result<Self> {
        tracing::debug!("Opening archive at: {}", path.display());

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context(format!(
                "Failed to create archive directory: {}",
                parent.display()
            ))?;
        }

        let url = format!("sqlite://{}?mode=rwc", path.display());

        let mut opt = ConnectOptions::new(url);
        opt.max_connections(4)
            .min_connections(1)
            .connect_timeout(Duration::from_secs(8))
            .acquire_timeout(Duration::from_secs(8))
            .sqlx_logging(false);

        let conn = SeaDatabase::connect(opt)
            .await
            .context(format!("Failed to open archive: {}", path.display()))?;

        Ok(Self::new(conn))
    }

    async fn create_table_if_not_exists(&self, schema: &Schema) -> Result<()> {
        let sql = create_table_sql(&self.table, schema);
        self.conn
            .execute_unprepared(&sql)
            .await
            .context(format!("Failed to create table {}", self.table))?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl PersistenceSink for SqliteArchive {
    async fn archive(&self, table: &Table, schema: &Schema) -> Result<u64> {
        if table.is_empty() {
            tracing::info!("No rows to archive");
            return Ok(0);
        }
        schema
            .validate(table)
            .context("Refusing to archive table")?;

        self.create_table_if_not_exists(schema).await?;

        let sql = upsert_sql(&self.table, schema);
        let txn = self
            .conn
            .begin()
            .await
            .context("Failed to start archive transaction")?;
        for row in table.rows() {
            let values = schema
                .fields()
                .iter()
                .map(|field| to_sql_value(field, row.get(field.name)))
                .collect::<Result<Vec<SqlValue>, PipelineError>>()
                .context("Refusing to archive row")?;
            txn.execute_raw(Statement::from_sql_and_values(
                DatabaseBackend::Sqlite,
                sql.as_str(),
                values,
            ))
            .await
            .context(format!("Failed to upsert into {}", self.table))?;
        }
        txn.commit()
            .await
            .context("Failed to commit archive transaction")?;

        let archived = table.len() as u64;
        tracing::info!(rows = archived, table = %self.table, "Archived joined history");
        Ok(archived)
    }
}

fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

fn sql_type(primitive: PrimitiveType) -> &'static str {
    match primitive {
        PrimitiveType::Text => "TEXT",
        PrimitiveType::Integer => "INTEGER",
        PrimitiveType::Real => "REAL",
        PrimitiveType::Boolean => "BOOLEAN",
    }
}

fn create_table_sql(table: &str, schema: &Schema) -> String {
    let mut definitions: Vec<String> = schema
        .fields()
        .iter()
        .map(|field| format!("{} {}", quote(field.name), sql_type(field.primitive)))
        .collect();
    if !schema.key().is_empty() {
        let key: Vec<String> = schema.key().iter().map(|name| quote(name)).collect();
        definitions.push(format!("PRIMARY KEY ({})", key.join(", ")));
    }
    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n    {}\n)",
        quote(table),
        definitions.join(",\n    ")
    )
}

/// `INSERT ... ON CONFLICT (key) DO UPDATE` over every field, so writing a
/// row twice leaves the latest copy.
fn upsert_sql(table: &str, schema: &Schema) -> String {
    let columns: Vec<String> = schema.fields().iter().map(|field| quote(field.name)).collect();
    let placeholders = vec!["?"; columns.len()].join(", ");
    let mut sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote(table),
        columns.join(", "),
        placeholders
    );

    let key: Vec<String> = schema.key().iter().map(|name| quote(name)).collect();
    if key.is_empty() {
        return sql;
    }
    let updates: Vec<String> = schema
        .fields()
        .iter()
        .filter(|field| !schema.key().contains(&field.name))
        .map(|field| format!("{0} = excluded.{0}", quote(field.name)))
        .collect();
    if updates.is_empty() {
        sql.push_str(&format!(" ON CONFLICT ({}) DO NOTHING", key.join(", ")));
    } else {
        sql.push_str(&format!(
            " ON CONFLICT ({}) DO UPDATE SET {}",
            key.join(", "),
            updates.join(", ")
        ));
    }
    sql
}

fn to_sql_value(field: &FieldDescriptor, value: Option<&Value>) -> Result<SqlValue, PipelineError> {
    Ok(match value {
        Some(Value::Text(text)) => text.clone().into(),
        Some(Value::Integer(value)) => (*value).into(),
        Some(Value::Real(value)) => (*value).into(),
        Some(Value::Boolean(value)) => (*value).into(),
        Some(Value::List(values)) => codec::encode(field.name, values)?.into(),
        Some(Value::Null) | None => match field.primitive {
            PrimitiveType::Text => Option::<String>::None.into(),
            PrimitiveType::Integer => Option::<i64>::None.into(),
            PrimitiveType::Real => Option::<f64>::None.into(),
            PrimitiveType::Boolean => Option::<bool>::None.into(),
        },
    })
}
