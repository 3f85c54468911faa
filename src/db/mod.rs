//! Database abstraction layer for nl2sql-eval.
//!
//! Provides a trait-based interface for executing queries and introspecting
//! schemas, so the evaluation pipeline can run against SQLite files or
//! in-memory fakes interchangeably.

mod mock;
mod schema;
mod sqlite;
mod types;

pub use mock::MockExecutor;
pub use schema::{Schema, Table};
pub use sqlite::SqliteExecutor;
pub use types::{ExecutionOutcome, Row, Value};

use crate::error::Result;
use async_trait::async_trait;

/// Trait defining the interface for query executors.
///
/// `database` identifies the target database; for SQLite it is a file path.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Executes a SQL query and returns its outcome.
    ///
    /// Never fails for caller-supplied SQL: database errors (bad syntax,
    /// unknown tables or columns, timeouts) become
    /// [`ExecutionOutcome::ExecutionFailed`] and are logged.
    async fn execute(&self, database: &str, sql: &str) -> ExecutionOutcome;

    /// Introspects the schema: user tables and their ordered column names.
    async fn introspect_schema(&self, database: &str) -> Result<Schema>;
}
