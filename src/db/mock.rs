//! Mock query executor for testing.
//!
//! Maps query text to canned outcomes and records every call.

use super::{ExecutionOutcome, QueryExecutor, Row, Schema};
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

/// A mock executor that returns predefined outcomes.
///
/// Queries are matched after trimming whitespace and a trailing `;`.
/// Unknown queries fail the way an unknown table would.
#[derive(Debug, Default)]
pub struct MockExecutor {
    schema: Schema,
    outcomes: HashMap<String, ExecutionOutcome>,
    calls: Mutex<Vec<String>>,
}

impl MockExecutor {
    /// Creates a new mock executor with an empty schema and no canned results.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the schema returned by introspection.
    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = schema;
        self
    }

    /// Registers rows for a query.
    pub fn with_rows(self, sql: impl AsRef<str>, rows: Vec<Row>) -> Self {
        self.with_outcome(sql, ExecutionOutcome::Rows(rows))
    }

    /// Registers an execution failure for a query.
    pub fn with_failure(self, sql: impl AsRef<str>, diagnostic: impl Into<String>) -> Self {
        self.with_outcome(sql, ExecutionOutcome::failed(diagnostic))
    }

    /// Registers an arbitrary outcome for a query.
    pub fn with_outcome(mut self, sql: impl AsRef<str>, outcome: ExecutionOutcome) -> Self {
        self.outcomes.insert(normalize(sql.as_ref()), outcome);
        self
    }

    /// Returns the queries executed so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }
}

fn normalize(sql: &str) -> String {
    sql.trim().trim_end_matches(';').trim_end().to_string()
}

#[async_trait]
impl QueryExecutor for MockExecutor {
    async fn execute(&self, _database: &str, sql: &str) -> ExecutionOutcome {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(sql.to_string());
        }

        self.outcomes
            .get(&normalize(sql))
            .cloned()
            .unwrap_or_else(|| ExecutionOutcome::failed(format!("ERROR: no canned result for: {sql}")))
    }

    async fn introspect_schema(&self, _database: &str) -> Result<Schema> {
        Ok(self.schema.clone())
    }
}
