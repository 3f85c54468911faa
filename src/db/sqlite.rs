//! SQLite query executor.
//!
//! Provides the `SqliteExecutor` struct that implements the `QueryExecutor`
//! trait for SQLite database files using sqlx.

use crate::db::{ExecutionOutcome, QueryExecutor, Row, Schema, Table, Value};
use crate::error::{EvalError, Result};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqliteRow};
use sqlx::{ConnectOptions, Connection, Row as SqlxRow, TypeInfo, ValueRef};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Default query timeout in seconds.
pub const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 30;

/// SQLite executor.
///
/// Each call opens the database file read-only, runs one query and closes the
/// connection again, so generated SQL can never modify the ground-truth data.
#[derive(Debug, Clone)]
pub struct SqliteExecutor {
    query_timeout: Duration,
}

impl SqliteExecutor {
    /// Creates an executor with the default query timeout.
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(DEFAULT_QUERY_TIMEOUT_SECS))
    }

    /// Creates an executor with a custom per-query timeout.
    pub fn with_timeout(query_timeout: Duration) -> Self {
        Self { query_timeout }
    }

    /// Returns the per-query timeout.
    pub fn query_timeout(&self) -> Duration {
        self.query_timeout
    }

    async fn connect(database: &str) -> Result<SqliteConnection> {
        SqliteConnectOptions::new()
            .filename(database)
            .read_only(true)
            .create_if_missing(false)
            .connect()
            .await
            .map_err(|e| EvalError::database(format!("Failed to open {database}: {e}")))
    }

    async fn fetch_rows(database: &str, sql: &str) -> std::result::Result<Vec<Row>, String> {
        let mut conn = Self::connect(database).await.map_err(|e| e.to_string())?;
        let result = sqlx::query(sql).fetch_all(&mut conn).await;

        if let Err(e) = conn.close().await {
            debug!("Error closing connection to {}: {}", database, e);
        }

        let rows = result.map_err(format_query_error)?;
        Ok(rows.iter().map(convert_row).collect())
    }
}

impl Default for SqliteExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QueryExecutor for SqliteExecutor {
    async fn execute(&self, database: &str, sql: &str) -> ExecutionOutcome {
        let start = Instant::now();

        let outcome =
            match tokio::time::timeout(self.query_timeout, Self::fetch_rows(database, sql)).await {
                Ok(Ok(rows)) => ExecutionOutcome::Rows(rows),
                Ok(Err(diagnostic)) => ExecutionOutcome::failed(diagnostic),
                Err(_) => ExecutionOutcome::failed(format!(
                    "Query timed out after {:?}",
                    self.query_timeout
                )),
            };

        match &outcome {
            ExecutionOutcome::Rows(rows) => {
                debug!("Query returned {} rows in {:?}", rows.len(), start.elapsed())
            }
            ExecutionOutcome::ExecutionFailed { diagnostic } => {
                warn!("Database error: {}", diagnostic)
            }
        }

        outcome
    }

    async fn introspect_schema(&self, database: &str) -> Result<Schema> {
        let mut conn = Self::connect(database).await?;

        let table_names: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
        .fetch_all(&mut conn)
        .await
        .map_err(|e| EvalError::database(format!("Failed to fetch tables: {e}")))?;

        let mut tables = Vec::with_capacity(table_names.len());

        for table_name in table_names {
            let columns: Vec<String> =
                sqlx::query_scalar("SELECT name FROM pragma_table_info(?1) ORDER BY cid")
                    .bind(&table_name)
                    .fetch_all(&mut conn)
                    .await
                    .map_err(|e| {
                        EvalError::database(format!(
                            "Failed to fetch columns for {table_name}: {e}"
                        ))
                    })?;

            tables.push(Table {
                name: table_name,
                columns,
            });
        }

        if let Err(e) = conn.close().await {
            debug!("Error closing connection to {}: {}", database, e);
        }

        Ok(Schema { tables })
    }
}

/// Converts a SqliteRow to our Row type.
fn convert_row(row: &SqliteRow) -> Row {
    (0..row.columns().len())
        .map(|i| convert_value(row, i))
        .collect()
}

/// Converts a single column value using its runtime storage class.
///
/// SQLite is dynamically typed, so the declared column type is ignored.
fn convert_value(row: &SqliteRow, index: usize) -> Value {
    let storage_class = match row.try_get_raw(index) {
        Ok(raw) if raw.is_null() => return Value::Null,
        Ok(raw) => raw.type_info().name().to_uppercase(),
        Err(_) => return Value::Null,
    };

    match storage_class.as_str() {
        "INTEGER" => row
            .try_get::<i64, _>(index)
            .map(Value::Int)
            .unwrap_or(Value::Null),

        "REAL" => row
            .try_get::<f64, _>(index)
            .map(Value::Float)
            .unwrap_or(Value::Null),

        "BLOB" => row
            .try_get::<Vec<u8>, _>(index)
            .map(Value::Blob)
            .unwrap_or(Value::Null),

        "TEXT" => row
            .try_get::<String, _>(index)
            .map(Value::Text)
            .unwrap_or(Value::Null),

        // Unexpected affinity names: try the numeric decodings before text
        _ => row
            .try_get::<i64, _>(index)
            .map(Value::Int)
            .or_else(|_| row.try_get::<f64, _>(index).map(Value::Float))
            .or_else(|_| row.try_get::<String, _>(index).map(Value::Text))
            .unwrap_or(Value::Null),
    }
}

/// Formats a sqlx error into a readable diagnostic.
fn format_query_error(error: sqlx::Error) -> String {
    match error.as_database_error() {
        Some(db_error) => format!("ERROR: {}", db_error.message()),
        None => error.to_string(),
    }
}
