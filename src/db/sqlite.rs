//! SQLite database client implementation.
//!
//! Provides the `SqliteClient` struct that implements the `DatabaseClient` trait
//! over a read-only sqlx connection pool.

use crate::db::{
    Column, ColumnInfo, DatabaseClient, ForeignKey, QueryResult, Row, Schema, Table, Value,
};
use crate::error::{GateError, Result};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column as SqlxColumn, Row as SqlxRow, TypeInfo, ValueRef};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Maximum rows to return from a query.
const MAX_ROWS: usize = 1000;

/// SQLite database client.
///
/// The file is always opened read-only, so a write that slips past
/// validation still fails at the driver.
#[derive(Debug)]
pub struct SqliteClient {
    pool: SqlitePool,
}

impl SqliteClient {
    /// Opens the database file at `path` in read-only mode.
    pub async fn connect(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(GateError::connection(format!(
                "Database file '{}' does not exist.",
                path.display()
            )));
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .read_only(true)
            .create_if_missing(false);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await
            .map_err(|e| {
                GateError::connection(format!(
                    "Cannot open database '{}': {e}",
                    path.display()
                ))
            })?;

        debug!(path = %path.display(), "Opened read-only SQLite database");
        Ok(Self { pool })
    }

    /// Creates a client from an existing pool.
    ///
    /// The caller is responsible for the pool's access mode.
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DatabaseClient for SqliteClient {
    async fn introspect_schema(&self) -> Result<Schema> {
        let mut tables = Vec::new();
        let mut foreign_keys = Vec::new();

        for name in self.fetch_table_names().await? {
            let (columns, primary_key) = self.fetch_columns(&name).await?;
            foreign_keys.extend(self.fetch_foreign_keys(&name).await?);
            tables.push(Table {
                name,
                columns,
                primary_key,
            });
        }

        Ok(Schema {
            tables,
            foreign_keys,
        })
    }

    async fn execute_query(&self, sql: &str) -> Result<QueryResult> {
        let start = Instant::now();

        let result = sqlx::query(sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| GateError::query(format_query_error(e)))?;

        let execution_time = start.elapsed();

        let columns: Vec<ColumnInfo> = result
            .first()
            .map(|first_row| {
                first_row
                    .columns()
                    .iter()
                    .map(|col| ColumnInfo::new(col.name(), col.type_info().name()))
                    .collect()
            })
            .unwrap_or_default();

        let total_rows = result.len();
        let was_truncated = total_rows > MAX_ROWS;
        if was_truncated {
            warn!(
                "Query returned {} rows, truncating to {} rows",
                total_rows, MAX_ROWS
            );
        }

        let rows: Vec<Row> = result.iter().take(MAX_ROWS).map(convert_row).collect();
        let row_count = rows.len();

        Ok(QueryResult {
            columns,
            rows,
            execution_time,
            row_count,
            was_truncated,
        })
    }

    async fn close(&self) -> Result<()> {
        self.pool.close().await;
        Ok(())
    }
}

impl SqliteClient {
    async fn fetch_table_names(&self) -> Result<Vec<String>> {
        let rows = sqlx::query(
            "SELECT name FROM sqlite_master \
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%' \
             ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| GateError::query(format!("Failed to fetch tables: {e}")))?;

        rows.iter()
            .map(|row| {
                row.try_get::<String, _>("name")
                    .map_err(|e| GateError::query(format!("Failed to read table name: {e}")))
            })
            .collect()
    }

    /// Returns the table's columns and its primary key columns in key order.
    async fn fetch_columns(&self, table_name: &str) -> Result<(Vec<Column>, Vec<String>)> {
        let rows = sqlx::query(&format!("PRAGMA table_info({})", quote_identifier(table_name)))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                GateError::query(format!("Failed to fetch columns for {table_name}: {e}"))
            })?;

        let mut columns = Vec::with_capacity(rows.len());
        let mut key_parts = Vec::new();

        for row in &rows {
            let name: String = row.try_get("name").unwrap_or_default();
            let data_type: String = row.try_get("type").unwrap_or_default();
            let not_null: i64 = row.try_get("notnull").unwrap_or(0);
            let pk_position: i64 = row.try_get("pk").unwrap_or(0);

            if pk_position > 0 {
                key_parts.push((pk_position, name.clone()));
            }
            columns.push(Column::new(name, data_type).nullable(not_null == 0));
        }

        key_parts.sort();
        let primary_key = key_parts.into_iter().map(|(_, name)| name).collect();

        Ok((columns, primary_key))
    }

    async fn fetch_foreign_keys(&self, table_name: &str) -> Result<Vec<ForeignKey>> {
        let rows = sqlx::query(&format!(
            "PRAGMA foreign_key_list({})",
            quote_identifier(table_name)
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            GateError::query(format!("Failed to fetch foreign keys for {table_name}: {e}"))
        })?;

        // Composite keys arrive as one row per column sharing an id.
        let mut grouped: BTreeMap<i64, ForeignKey> = BTreeMap::new();
        for row in &rows {
            let id: i64 = row.try_get("id").unwrap_or(0);
            let to_table: String = row.try_get("table").unwrap_or_default();
            let from: String = row.try_get("from").unwrap_or_default();
            let to: Option<String> = row.try_get("to").ok().flatten();

            let fk = grouped.entry(id).or_insert_with(|| {
                ForeignKey::new(table_name, Vec::new(), to_table, Vec::new())
            });
            fk.from_columns.push(from);
            if let Some(to) = to {
                fk.to_columns.push(to);
            }
        }

        Ok(grouped.into_values().collect())
    }
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Converts a sqlx SqliteRow to our Row type.
fn convert_row(row: &SqliteRow) -> Row {
    (0..row.columns().len())
        .map(|i| convert_value(row, i))
        .collect()
}

/// Converts a single cell by its runtime storage class.
///
/// SQLite typing is per value, so the declared column type is not trusted.
fn convert_value(row: &SqliteRow, index: usize) -> Value {
    let storage_class = match row.try_get_raw(index) {
        Ok(raw) if raw.is_null() => return Value::Null,
        Ok(raw) => raw.type_info().name().to_uppercase(),
        Err(_) => return Value::Null,
    };

    match storage_class.as_str() {
        "INTEGER" | "BOOLEAN" => row
            .try_get_unchecked::<Option<i64>, _>(index)
            .ok()
            .flatten()
            .map(Value::Int)
            .unwrap_or(Value::Null),

        "REAL" => row
            .try_get_unchecked::<Option<f64>, _>(index)
            .ok()
            .flatten()
            .map(Value::Float)
            .unwrap_or(Value::Null),

        "BLOB" => row
            .try_get_unchecked::<Option<Vec<u8>>, _>(index)
            .ok()
            .flatten()
            .map(Value::Bytes)
            .unwrap_or(Value::Null),

        _ => row
            .try_get_unchecked::<Option<String>, _>(index)
            .ok()
            .flatten()
            .map(Value::String)
            .unwrap_or(Value::Null),
    }
}

/// Extracts the driver's message, without sqlx's wrapping text.
fn format_query_error(error: sqlx::Error) -> String {
    match error.as_database_error() {
        Some(db_error) => db_error.message().to_string(),
        None => error.to_string(),
    }
}
